//! # Place Matcher
//!
//! Place intelligence for recorded GPS visits.
//!
//! This library provides:
//! - Seed-radius clustering of place visits into frequent places
//! - Incremental folding of new visits into an existing place set
//! - Per-day trip timelines mixing visits and route segments
//! - Circular geofence membership and enter/exit detection
//!
//! ## Features
//!
//! - **`parallel`** - Build frequent places from clusters in parallel with rayon
//!
//! ## Quick Start
//!
//! ```rust
//! use chrono::{FixedOffset, TimeZone, Utc};
//! use place_matcher::{ClusterConfig, HeuristicCategorizer, PlaceClusterer, PlaceVisit};
//!
//! let t0 = Utc.with_ymd_and_hms(2024, 10, 1, 9, 0, 0).unwrap();
//! let visits = vec![
//!     PlaceVisit::new("v1", "user-1", 48.8566, 2.3522, t0, t0 + chrono::Duration::hours(1)),
//!     PlaceVisit::new("v2", "user-1", 48.8568, 2.3525, t0 + chrono::Duration::days(1),
//!         t0 + chrono::Duration::days(1) + chrono::Duration::hours(2)),
//! ];
//!
//! let categorizer = HeuristicCategorizer::new(FixedOffset::east_opt(3600).unwrap(), t0);
//! let clusterer = PlaceClusterer::new(ClusterConfig::default(), categorizer);
//! let places = clusterer.cluster_visits(&visits, "user-1");
//! assert_eq!(places.len(), 1);
//! assert_eq!(places[0].visit_count, 2);
//! ```

use serde::{Deserialize, Serialize};

// Unified error handling
pub mod error;
pub use error::{OptionExt, PlaceMatchError, Result};

// Geographic utilities (distance, bearing, centroid, bounds)
pub mod geo_utils;

// Visit and route segment value types
pub mod visit;
pub use visit::{PlaceVisit, RouteSegment};

// Category / significance collaborator contract
pub mod categorize;
pub use categorize::{
    Category, CategoryConfidence, CategoryVote, HeuristicCategorizer, HeuristicThresholds,
    PlaceCategorizer, Significance,
};

// Frequent place clustering (batch and incremental)
pub mod clustering;
pub use clustering::{
    cluster_visits, update_frequent_places, ClusterConfig, FrequentPlace, PlaceClusterer,
};

// R-tree candidate lookup shared by clustering and regions
mod spatial;

// Per-day trip timelines
pub mod timeline;
pub use timeline::{TimelineItem, Trip, TripDay, TripDayAggregator};

// Geofence membership
pub mod regions;
pub use regions::{GeoRegion, GeofenceEvent, GeofenceEventKind, RegionIndex, RegionMatch};

// JSON helpers for host bindings
pub mod json;

// ============================================================================
// Core Types
// ============================================================================

/// A GPS coordinate with latitude and longitude.
///
/// # Example
/// ```
/// use place_matcher::GpsPoint;
/// let point = GpsPoint::new(51.5074, -0.1278); // London
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GpsPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GpsPoint {
    /// Create a new GPS point.
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Check if the point has valid coordinates.
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && self.latitude >= -90.0
            && self.latitude <= 90.0
            && self.longitude >= -180.0
            && self.longitude <= 180.0
    }
}

/// Axis-aligned latitude/longitude bounding box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lng: f64,
    pub max_lng: f64,
}

impl Bounds {
    /// South-west corner (min lat, min lng).
    pub fn southwest(&self) -> GpsPoint {
        GpsPoint::new(self.min_lat, self.min_lng)
    }

    /// North-east corner (max lat, max lng).
    pub fn northeast(&self) -> GpsPoint {
        GpsPoint::new(self.max_lat, self.max_lng)
    }

    /// Get the center point of the bounds.
    pub fn center(&self) -> GpsPoint {
        GpsPoint::new(
            (self.min_lat + self.max_lat) / 2.0,
            (self.min_lng + self.max_lng) / 2.0,
        )
    }

    /// Check whether a point lies inside the box (edges inclusive).
    pub fn contains(&self, point: &GpsPoint) -> bool {
        point.latitude >= self.min_lat
            && point.latitude <= self.max_lat
            && point.longitude >= self.min_lng
            && point.longitude <= self.max_lng
    }
}

// ============================================================================
// Tests
// ============================================================================
