//! Circular geofence regions.
//!
//! A [`GeoRegion`] contains a point when the point is within `radius_meters`
//! of its center (edge inclusive). [`RegionIndex`] answers "which regions
//! contain this point" for many regions, nearest center first, and turns two
//! successive fixes into enter/exit events.

use std::collections::HashSet;

use log::debug;
use rstar::{RTree, RTreeObject, AABB};
use serde::{Deserialize, Serialize};

use crate::geo_utils::{haversine_distance, within_radius};
use crate::spatial::radius_envelope;
use crate::{FrequentPlace, GpsPoint};

/// A circular region of interest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoRegion {
    pub id: String,
    pub name: Option<String>,
    pub center: GpsPoint,
    pub radius_meters: f64,
}

impl GeoRegion {
    pub fn new(id: &str, center: GpsPoint, radius_meters: f64) -> Self {
        Self {
            id: id.to_string(),
            name: None,
            center,
            radius_meters,
        }
    }

    /// Geofence around a frequent place, using the place's radius.
    pub fn from_place(place: &FrequentPlace) -> Self {
        Self {
            id: place.id.clone(),
            name: place.user_label.clone().or_else(|| place.name.clone()),
            center: place.center(),
            radius_meters: place.radius_meters,
        }
    }

    pub fn contains(&self, point: &GpsPoint) -> bool {
        within_radius(&self.center, point, self.radius_meters)
    }

    pub fn distance_to(&self, point: &GpsPoint) -> f64 {
        haversine_distance(&self.center, point)
    }
}

/// A region containing a queried point.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegionMatch<'a> {
    pub region: &'a GeoRegion,
    /// Distance from the region's center in meters
    pub distance_meters: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GeofenceEventKind {
    Enter,
    Exit,
}

/// A region boundary crossing between two fixes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeofenceEvent {
    pub region_id: String,
    pub kind: GeofenceEventKind,
}

/// Region envelope for R-tree indexing
#[derive(Debug, Clone)]
struct RegionBounds {
    idx: usize,
    envelope: AABB<[f64; 2]>,
}

impl RTreeObject for RegionBounds {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.envelope
    }
}

/// Spatial index over a fixed set of regions.
pub struct RegionIndex {
    regions: Vec<GeoRegion>,
    tree: RTree<RegionBounds>,
    /// Regions whose envelope can't be indexed (poles, antimeridian, huge radius)
    unindexed: Vec<usize>,
}

impl RegionIndex {
    pub fn new(regions: Vec<GeoRegion>) -> Self {
        let mut bounds = Vec::with_capacity(regions.len());
        let mut unindexed = Vec::new();
        for (idx, region) in regions.iter().enumerate() {
            match radius_envelope(&region.center, region.radius_meters) {
                Some(envelope) => bounds.push(RegionBounds { idx, envelope }),
                None => unindexed.push(idx),
            }
        }

        debug!(
            "[Regions] Indexed {} regions ({} scanned linearly)",
            bounds.len(),
            unindexed.len()
        );

        Self {
            regions,
            tree: RTree::bulk_load(bounds),
            unindexed,
        }
    }

    pub fn regions(&self) -> &[GeoRegion] {
        &self.regions
    }

    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    /// Regions containing `point`, nearest center first.
    pub fn regions_containing(&self, point: &GpsPoint) -> Vec<RegionMatch<'_>> {
        // Envelopes live in WGS84 ranges, so unnormalized points scan every region
        let candidates: Vec<usize> = if point.is_valid() {
            let query = AABB::from_point([point.longitude, point.latitude]);
            let mut found: Vec<usize> = self
                .tree
                .locate_in_envelope_intersecting(&query)
                .map(|b| b.idx)
                .chain(self.unindexed.iter().copied())
                .collect();
            found.sort_unstable();
            found
        } else {
            (0..self.regions.len()).collect()
        };

        let mut matches: Vec<RegionMatch<'_>> = candidates
            .into_iter()
            .map(|idx| &self.regions[idx])
            .filter(|region| region.contains(point))
            .map(|region| RegionMatch {
                region,
                distance_meters: region.distance_to(point),
            })
            .collect();

        matches.sort_by(|a, b| a.distance_meters.total_cmp(&b.distance_meters));
        matches
    }

    /// True when any region contains `point`.
    pub fn contains(&self, point: &GpsPoint) -> bool {
        !self.regions_containing(point).is_empty()
    }

    /// Enter/exit events when moving from `previous` to `current`.
    ///
    /// With no previous fix, every region containing `current` is entered.
    /// Exits are listed before enters, each ordered by region position.
    pub fn transitions(
        &self,
        previous: Option<&GpsPoint>,
        current: &GpsPoint,
    ) -> Vec<GeofenceEvent> {
        let before: HashSet<&str> = previous
            .map(|p| {
                self.regions_containing(p)
                    .into_iter()
                    .map(|m| m.region.id.as_str())
                    .collect()
            })
            .unwrap_or_default();
        let after: HashSet<&str> = self
            .regions_containing(current)
            .into_iter()
            .map(|m| m.region.id.as_str())
            .collect();

        let exits = self
            .regions
            .iter()
            .filter(|r| before.contains(r.id.as_str()) && !after.contains(r.id.as_str()))
            .map(|r| GeofenceEvent {
                region_id: r.id.clone(),
                kind: GeofenceEventKind::Exit,
            });
        let enters = self
            .regions
            .iter()
            .filter(|r| after.contains(r.id.as_str()) && !before.contains(r.id.as_str()))
            .map(|r| GeofenceEvent {
                region_id: r.id.clone(),
                kind: GeofenceEventKind::Enter,
            });

        exits.chain(enters).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo_utils::destination_point;

    #[test]
    fn test_contains_at_boundary() {
        let origin = GpsPoint::new(0.0, 0.0);
        let region = GeoRegion::new("r", origin, 100.0);
        assert!(region.contains(&destination_point(&origin, 0.0, 99.0)));
        assert!(!region.contains(&destination_point(&origin, 0.0, 101.0)));
        assert!(region.contains(&origin));
    }

    #[test]
    fn test_overlapping_regions_sorted_by_distance() {
        let origin = GpsPoint::new(0.0, 0.0);
        let far_center = destination_point(&origin, 90.0, 80.0);
        let index = RegionIndex::new(vec![
            GeoRegion::new("far", far_center, 100.0),
            GeoRegion::new("near", origin, 100.0),
            GeoRegion::new("elsewhere", GpsPoint::new(10.0, 10.0), 100.0),
        ]);

        let point = destination_point(&origin, 90.0, 20.0);
        let matches = index.regions_containing(&point);
        let ids: Vec<&str> = matches.iter().map(|m| m.region.id.as_str()).collect();
        assert_eq!(ids, vec!["near", "far"]);
        assert!(matches[0].distance_meters < matches[1].distance_meters);
    }

    #[test]
    fn test_no_match_outside_all_regions() {
        let region = GeoRegion::new("r", GpsPoint::new(0.0, 0.0), 100.0);
        let index = RegionIndex::new(vec![region]);
        assert!(!index.contains(&GpsPoint::new(1.0, 1.0)));

        let empty = RegionIndex::new(vec![]);
        assert!(empty.regions_containing(&GpsPoint::new(0.0, 0.0)).is_empty());
    }

    #[test]
    fn test_region_near_antimeridian_still_found() {
        let center = GpsPoint::new(0.0, 179.9999);
        let index = RegionIndex::new(vec![GeoRegion::new("edge", center, 100.0)]);
        let across = destination_point(&center, 90.0, 50.0);
        assert!(across.longitude < 0.0);
        assert!(index.contains(&across));
    }

    #[test]
    fn test_unnormalized_longitude_still_matches() {
        let region = GeoRegion::new("r", GpsPoint::new(45.0, 10.0), 100.0);
        let index = RegionIndex::new(vec![region]);
        // 370 degrees is the same meridian as 10
        assert!(index.contains(&GpsPoint::new(45.0, 370.0)));
    }

    #[test]
    fn test_transitions() {
        let home = GpsPoint::new(51.5, -0.12);
        let index = RegionIndex::new(vec![GeoRegion::new("home", home, 100.0)]);
        let away = destination_point(&home, 0.0, 500.0);

        assert_eq!(
            index.transitions(Some(&away), &home),
            vec![GeofenceEvent {
                region_id: "home".to_string(),
                kind: GeofenceEventKind::Enter
            }]
        );
        assert_eq!(
            index.transitions(Some(&home), &away),
            vec![GeofenceEvent {
                region_id: "home".to_string(),
                kind: GeofenceEventKind::Exit
            }]
        );
        assert!(index.transitions(Some(&home), &home).is_empty());
        assert_eq!(index.transitions(None, &home).len(), 1);
    }
}
