//! R-tree candidate lookup for radius queries.
//!
//! The index only pre-filters: it returns a superset of the points that can be
//! within a radius, and callers still apply the exact Haversine test. Queries
//! whose envelope would be unreliable (near the poles, across the antimeridian,
//! very large radii) fall back to returning every point, and points outside
//! WGS84 ranges are returned for every query.

use rstar::{RTree, RTreeObject, AABB};

use crate::geo_utils::meters_to_degrees;
use crate::GpsPoint;

/// Envelope slack over the equatorial meters-per-degree approximation.
const ENVELOPE_SLACK: f64 = 1.1;

/// Envelopes are only trusted up to this latitude.
const MAX_INDEXED_LATITUDE: f64 = 85.0;

/// Radii above this skip the index.
const MAX_INDEXED_RADIUS_METERS: f64 = 100_000.0;

/// A GPS point with its index for R-tree queries
#[derive(Debug, Clone, Copy)]
pub(crate) struct IndexedPoint {
    pub idx: usize,
    pub lat: f64,
    pub lng: f64,
}

impl RTreeObject for IndexedPoint {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_point([self.lng, self.lat])
    }
}

/// Search envelope guaranteed to contain every point within `radius_meters`
/// of `center`, or `None` when no such box can be expressed safely.
pub(crate) fn radius_envelope(center: &GpsPoint, radius_meters: f64) -> Option<AABB<[f64; 2]>> {
    if !center.latitude.is_finite()
        || !center.longitude.is_finite()
        || !radius_meters.is_finite()
        || radius_meters > MAX_INDEXED_RADIUS_METERS
    {
        return None;
    }
    let radius = radius_meters.max(0.0) * ENVELOPE_SLACK;
    let lat_span = meters_to_degrees(radius, 0.0);
    let lng_span = meters_to_degrees(radius, center.latitude);

    let min_lat = center.latitude - lat_span;
    let max_lat = center.latitude + lat_span;
    let min_lng = center.longitude - lng_span;
    let max_lng = center.longitude + lng_span;

    if min_lat < -MAX_INDEXED_LATITUDE
        || max_lat > MAX_INDEXED_LATITUDE
        || min_lng < -180.0
        || max_lng > 180.0
    {
        return None;
    }

    Some(AABB::from_corners([min_lng, min_lat], [max_lng, max_lat]))
}

/// Point index answering "which points might be within r of here".
pub(crate) struct PointIndex {
    tree: RTree<IndexedPoint>,
    /// Points outside WGS84 ranges, always returned as candidates
    unindexed: Vec<usize>,
    len: usize,
}

impl PointIndex {
    pub fn new(points: &[GpsPoint]) -> Self {
        let mut indexed = Vec::with_capacity(points.len());
        let mut unindexed = Vec::new();
        for (idx, p) in points.iter().enumerate() {
            if p.is_valid() {
                indexed.push(IndexedPoint {
                    idx,
                    lat: p.latitude,
                    lng: p.longitude,
                });
            } else {
                unindexed.push(idx);
            }
        }

        Self {
            tree: RTree::bulk_load(indexed),
            unindexed,
            len: points.len(),
        }
    }

    /// Candidate indices in ascending order.
    pub fn candidates(&self, center: &GpsPoint, radius_meters: f64) -> Vec<usize> {
        let Some(envelope) = radius_envelope(center, radius_meters) else {
            return (0..self.len).collect();
        };

        let mut found: Vec<usize> = self
            .tree
            .locate_in_envelope(&envelope)
            .map(|p| p.idx)
            .chain(self.unindexed.iter().copied())
            .collect();
        found.sort_unstable();
        found
    }
}
