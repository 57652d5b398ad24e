//! Frequent place clustering.
//!
//! Two entry points with different guarantees:
//!
//! - [`cluster_visits`] runs full seed-radius clustering over a visit set and
//!   computes every aggregate (centroid, category vote, metadata) from scratch.
//! - [`update_frequent_places`] folds new visits into an existing place set.
//!   Counts, durations, time span and significance are updated; centroid and
//!   category stay frozen until the next full clustering run.
//!
//! ## Seed-radius clustering
//!
//! Visits are processed in start-time order. Each unassigned visit seeds a new
//! cluster, and every other unassigned visit within `cluster_radius_meters`
//! of the *seed* joins it. Membership is never tested against other members,
//! so a chain A-B-C with A-B and B-C in range but A-C out of range yields
//! `{A, B}` and `{C}`.

use chrono::{DateTime, Duration, Utc};
use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::categorize::{Category, CategoryConfidence, PlaceCategorizer, Significance};
use crate::error::{PlaceMatchError, Result};
use crate::geo_utils::{compute_centroid, haversine_distance, within_radius};
use crate::spatial::PointIndex;
use crate::{GpsPoint, PlaceVisit};

/// Configuration for place clustering.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusterConfig {
    /// Maximum distance from a cluster seed (and, incrementally, from a place
    /// centroid) for a visit to join. Default: 50.0 meters
    pub cluster_radius_meters: f64,

    /// Minimum members for a cluster to become a frequent place.
    /// Default: 2
    pub min_visits_for_place: usize,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            cluster_radius_meters: 50.0,
            min_visits_for_place: 2,
        }
    }
}

impl ClusterConfig {
    pub fn validate(&self) -> Result<()> {
        if !self.cluster_radius_meters.is_finite() || self.cluster_radius_meters <= 0.0 {
            return Err(PlaceMatchError::Config {
                message: format!(
                    "cluster_radius_meters must be positive, got {}",
                    self.cluster_radius_meters
                ),
            });
        }
        if self.min_visits_for_place == 0 {
            return Err(PlaceMatchError::Config {
                message: "min_visits_for_place must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

/// A recurring location inferred from several visits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrequentPlace {
    /// Deterministic id from user, cluster index and centroid hash
    pub id: String,
    pub user_id: String,
    pub center_latitude: f64,
    pub center_longitude: f64,
    pub radius_meters: f64,
    pub name: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub country_code: Option<String>,
    pub category: Category,
    pub category_confidence: CategoryConfidence,
    pub significance: Significance,
    pub visit_count: u32,
    /// Sum of member durations in seconds. Negative only for malformed visits.
    pub total_duration_secs: i64,
    pub first_visit_time: DateTime<Utc>,
    pub last_visit_time: DateTime<Utc>,
    /// Ids of the member visits, in the order they were added
    #[serde(default)]
    pub visit_ids: Vec<String>,
    // User-editable fields, never set by clustering
    #[serde(default)]
    pub user_label: Option<String>,
    #[serde(default)]
    pub user_notes: Option<String>,
    #[serde(default)]
    pub user_category: Option<Category>,
    #[serde(default)]
    pub is_favorite: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl FrequentPlace {
    pub fn center(&self) -> GpsPoint {
        GpsPoint::new(self.center_latitude, self.center_longitude)
    }

    pub fn total_duration(&self) -> Duration {
        Duration::seconds(self.total_duration_secs)
    }

    /// Category shown to the user: their override if set, else the voted one.
    pub fn effective_category(&self) -> Category {
        self.user_category.unwrap_or(self.category)
    }

    /// Fold one visit into the aggregates. Centroid and category are untouched.
    fn absorb<C>(&mut self, visit: &PlaceVisit, categorizer: &C, now: DateTime<Utc>)
    where
        C: PlaceCategorizer + ?Sized,
    {
        self.visit_count += 1;
        self.total_duration_secs += visit.duration().num_seconds();
        if visit.start_time < self.first_visit_time {
            self.first_visit_time = visit.start_time;
        }
        if visit.end_time > self.last_visit_time {
            self.last_visit_time = visit.end_time;
        }
        self.visit_ids.push(visit.id.clone());
        self.significance = categorizer.determine_significance(
            self.visit_count,
            self.total_duration(),
            self.last_visit_time,
        );
        self.updated_at = now;
    }
}

/// Cluster visits into frequent places.
///
/// Returns places sorted by visit count, most visited first. Clusters smaller
/// than `min_visits_for_place` are dropped. Input is not validated: visits
/// with `end_time < start_time` contribute negative durations.
pub fn cluster_visits<C>(
    visits: &[PlaceVisit],
    user_id: &str,
    config: &ClusterConfig,
    categorizer: &C,
) -> Vec<FrequentPlace>
where
    C: PlaceCategorizer + ?Sized,
{
    cluster_visit_refs(visits.iter().collect(), user_id, config, categorizer, Utc::now())
}

fn cluster_visit_refs<C>(
    mut visits: Vec<&PlaceVisit>,
    user_id: &str,
    config: &ClusterConfig,
    categorizer: &C,
    now: DateTime<Utc>,
) -> Vec<FrequentPlace>
where
    C: PlaceCategorizer + ?Sized,
{
    if visits.is_empty() {
        return vec![];
    }

    // Stable: equal start times keep input order
    visits.sort_by_key(|v| v.start_time);

    let clusters: Vec<Vec<&PlaceVisit>> =
        seed_radius_clusters(&visits, config.cluster_radius_meters)
            .into_iter()
            .filter(|members| members.len() >= config.min_visits_for_place)
            .map(|members| members.into_iter().map(|i| visits[i]).collect())
            .collect();

    #[cfg(feature = "parallel")]
    let mut places: Vec<FrequentPlace> = {
        use rayon::prelude::*;
        clusters
            .par_iter()
            .enumerate()
            .filter_map(|(i, members)| build_place(i, members, user_id, config, categorizer, now))
            .collect()
    };
    #[cfg(not(feature = "parallel"))]
    let mut places: Vec<FrequentPlace> = clusters
        .iter()
        .enumerate()
        .filter_map(|(i, members)| build_place(i, members, user_id, config, categorizer, now))
        .collect();

    places.sort_by(|a, b| b.visit_count.cmp(&a.visit_count));

    info!(
        "[Clustering] {} visits -> {} places (radius={}m, min_visits={})",
        visits.len(),
        places.len(),
        config.cluster_radius_meters,
        config.min_visits_for_place
    );

    places
}

/// Seed-radius clustering over visits already sorted by start time.
///
/// Returns member indices per cluster, seed first, ascending.
fn seed_radius_clusters(visits: &[&PlaceVisit], radius_meters: f64) -> Vec<Vec<usize>> {
    let centers: Vec<GpsPoint> = visits.iter().map(|v| v.center()).collect();
    let index = PointIndex::new(&centers);
    let mut assigned = vec![false; visits.len()];
    let mut clusters = Vec::new();

    for seed in 0..visits.len() {
        if assigned[seed] {
            continue;
        }
        assigned[seed] = true;
        let mut members = vec![seed];

        for candidate in index.candidates(&centers[seed], radius_meters) {
            if assigned[candidate] {
                continue;
            }
            if within_radius(&centers[seed], &centers[candidate], radius_meters) {
                assigned[candidate] = true;
                members.push(candidate);
            }
        }

        clusters.push(members);
    }

    debug!(
        "[Clustering] Seeded {} clusters from {} visits",
        clusters.len(),
        visits.len()
    );
    clusters
}

fn build_place<C>(
    index: usize,
    members: &[&PlaceVisit],
    user_id: &str,
    config: &ClusterConfig,
    categorizer: &C,
    now: DateTime<Utc>,
) -> Option<FrequentPlace>
where
    C: PlaceCategorizer + ?Sized,
{
    let centers: Vec<GpsPoint> = members.iter().map(|v| v.center()).collect();
    let centroid = compute_centroid(&centers)?;

    let visit_count = members.len() as u32;
    let total_duration_secs: i64 = members.iter().map(|v| v.duration().num_seconds()).sum();
    let first_visit_time = members.iter().map(|v| v.start_time).min()?;
    let last_visit_time = members.iter().map(|v| v.end_time).max()?;

    let (category, category_confidence) = vote_category(members, categorizer);
    let significance = categorizer.determine_significance(
        visit_count,
        Duration::seconds(total_duration_secs),
        last_visit_time,
    );

    Some(FrequentPlace {
        id: place_id(user_id, index, &centroid),
        user_id: user_id.to_string(),
        center_latitude: centroid.latitude,
        center_longitude: centroid.longitude,
        radius_meters: config.cluster_radius_meters,
        name: most_recent(members, |v| v.poi_name.as_ref()),
        address: most_recent(members, |v| v.approximate_address.as_ref()),
        city: most_recent(members, |v| v.city.as_ref()),
        country_code: most_recent(members, |v| v.country_code.as_ref()),
        category,
        category_confidence,
        significance,
        visit_count,
        total_duration_secs,
        first_visit_time,
        last_visit_time,
        visit_ids: members.iter().map(|v| v.id.clone()).collect(),
        user_label: None,
        user_notes: None,
        user_category: None,
        is_favorite: false,
        created_at: now,
        updated_at: now,
    })
}

/// Majority vote over per-member categorizations.
///
/// Ties go to the category that was voted for first.
fn vote_category<C>(members: &[&PlaceVisit], categorizer: &C) -> (Category, CategoryConfidence)
where
    C: PlaceCategorizer + ?Sized,
{
    let mut tally: Vec<(Category, u32)> = Vec::new();
    for (i, visit) in members.iter().enumerate() {
        let siblings: Vec<&PlaceVisit> = members
            .iter()
            .enumerate()
            .filter(|(j, _)| *j != i)
            .map(|(_, v)| *v)
            .collect();
        let vote = categorizer.categorize(visit, &siblings);
        match tally.iter_mut().find(|(c, _)| *c == vote.category) {
            Some((_, count)) => *count += 1,
            None => tally.push((vote.category, 1)),
        }
    }

    let total: u32 = tally.iter().map(|(_, n)| n).sum();
    let mut winner: Option<(Category, u32)> = None;
    for &(category, votes) in &tally {
        if winner.map_or(true, |(_, best)| votes > best) {
            winner = Some((category, votes));
        }
    }

    match winner {
        Some((category, votes)) if total > 0 => (
            category,
            CategoryConfidence::from_vote_share(votes as f64 / total as f64),
        ),
        _ => (Category::Unknown, CategoryConfidence::Low),
    }
}

/// Latest member (by start time) carrying a value for the field.
///
/// Members are in ascending start-time order.
fn most_recent<F>(members: &[&PlaceVisit], field: F) -> Option<String>
where
    F: Fn(&PlaceVisit) -> Option<&String>,
{
    members.iter().rev().find_map(|v| field(*v)).cloned()
}

/// `{user_id}_place_{index}_{hash}` where `hash` is the first 16 hex digits of
/// the BLAKE3 digest of the centroid's coordinate bits, so persisted ids do not
/// depend on the toolchain.
fn place_id(user_id: &str, index: usize, centroid: &GpsPoint) -> String {
    let mut hasher = blake3::Hasher::new();
    hasher.update(&centroid.latitude.to_bits().to_le_bytes());
    hasher.update(&centroid.longitude.to_bits().to_le_bytes());
    let digest = hasher.finalize().to_hex();
    format!("{}_place_{}_{}", user_id, index, &digest[..16])
}

/// Fold new visits into an existing set of frequent places.
///
/// Each visit joins the nearest place whose centroid is within
/// `cluster_radius_meters`. Visits matching no place are clustered among
/// themselves and any resulting places are appended. The input slice is not
/// modified; a new list sorted by visit count is returned.
pub fn update_frequent_places<C>(
    new_visits: &[PlaceVisit],
    existing_places: &[FrequentPlace],
    user_id: &str,
    config: &ClusterConfig,
    categorizer: &C,
) -> Vec<FrequentPlace>
where
    C: PlaceCategorizer + ?Sized,
{
    let mut places = existing_places.to_vec();
    if new_visits.is_empty() {
        return places;
    }

    let now = Utc::now();
    let centers: Vec<GpsPoint> = places.iter().map(|p| p.center()).collect();
    let index = PointIndex::new(&centers);
    let mut unmatched: Vec<&PlaceVisit> = Vec::new();

    for visit in new_visits {
        match nearest_place(&index, &centers, &visit.center(), config.cluster_radius_meters) {
            Some(i) => places[i].absorb(visit, categorizer, now),
            None => unmatched.push(visit),
        }
    }

    let matched = new_visits.len() - unmatched.len();
    let minted = cluster_visit_refs(unmatched, user_id, config, categorizer, now);

    debug!(
        "[Clustering] Incremental update: {} visits folded into existing places, {} new places",
        matched,
        minted.len()
    );

    places.extend(minted);
    places.sort_by(|a, b| b.visit_count.cmp(&a.visit_count));
    places
}

/// Index of the nearest center within the radius. Equal distances keep the
/// earlier place.
fn nearest_place(
    index: &PointIndex,
    centers: &[GpsPoint],
    point: &GpsPoint,
    radius_meters: f64,
) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for i in index.candidates(point, radius_meters) {
        let distance = haversine_distance(point, &centers[i]);
        if distance > radius_meters {
            continue;
        }
        if best.map_or(true, |(_, d)| distance < d) {
            best = Some((i, distance));
        }
    }
    best.map(|(i, _)| i)
}

// ============================================================================
// Clusterer
// ============================================================================

/// Clustering configuration bundled with an injected categorizer.
pub struct PlaceClusterer<C: PlaceCategorizer> {
    config: ClusterConfig,
    categorizer: C,
}

impl<C: PlaceCategorizer> PlaceClusterer<C> {
    pub fn new(config: ClusterConfig, categorizer: C) -> Self {
        Self {
            config,
            categorizer,
        }
    }

    pub fn config(&self) -> &ClusterConfig {
        &self.config
    }

    /// See [`cluster_visits`].
    pub fn cluster_visits(&self, visits: &[PlaceVisit], user_id: &str) -> Vec<FrequentPlace> {
        cluster_visits(visits, user_id, &self.config, &self.categorizer)
    }

    /// Like [`cluster_visits`], but rejects invalid configuration and visits
    /// with bad coordinates or `end_time < start_time` instead of aggregating
    /// them.
    pub fn cluster_visits_checked(
        &self,
        visits: &[PlaceVisit],
        user_id: &str,
    ) -> Result<Vec<FrequentPlace>> {
        self.config.validate()?;
        for visit in visits {
            visit.validate()?;
        }
        Ok(self.cluster_visits(visits, user_id))
    }

    /// See [`update_frequent_places`].
    pub fn update_frequent_places(
        &self,
        new_visits: &[PlaceVisit],
        existing_places: &[FrequentPlace],
        user_id: &str,
    ) -> Vec<FrequentPlace> {
        update_frequent_places(
            new_visits,
            existing_places,
            user_id,
            &self.config,
            &self.categorizer,
        )
    }
}
