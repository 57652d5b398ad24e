//! Input value types: place visits and route segments.
//!
//! Both are owned by the caller. The algorithms only read them, and do not
//! check the `end_time >= start_time` precondition. Use [`PlaceVisit::validate`]
//! upstream to reject malformed visits.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::categorize::{Category, CategoryConfidence};
use crate::error::{PlaceMatchError, Result};
use crate::geo_utils::polyline_length;
use crate::GpsPoint;

/// A detected stationary period at one location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceVisit {
    pub id: String,
    pub user_id: String,
    pub center_latitude: f64,
    pub center_longitude: f64,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    #[serde(default)]
    pub poi_name: Option<String>,
    #[serde(default)]
    pub approximate_address: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub country_code: Option<String>,
    /// Prior category from visit detection
    #[serde(default)]
    pub category: Category,
    #[serde(default)]
    pub category_confidence: CategoryConfidence,
    #[serde(default)]
    pub user_label: Option<String>,
    #[serde(default)]
    pub user_notes: Option<String>,
    #[serde(default)]
    pub is_favorite: bool,
    /// Back-reference assigned by the caller after clustering
    #[serde(default)]
    pub frequent_place_id: Option<String>,
}

impl PlaceVisit {
    /// Create a visit with no metadata.
    pub fn new(
        id: &str,
        user_id: &str,
        center_latitude: f64,
        center_longitude: f64,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.to_string(),
            user_id: user_id.to_string(),
            center_latitude,
            center_longitude,
            start_time,
            end_time,
            poi_name: None,
            approximate_address: None,
            city: None,
            country_code: None,
            category: Category::Unknown,
            category_confidence: CategoryConfidence::Low,
            user_label: None,
            user_notes: None,
            is_favorite: false,
            frequent_place_id: None,
        }
    }

    /// Set the point-of-interest name.
    pub fn with_poi_name(mut self, name: &str) -> Self {
        self.poi_name = Some(name.to_string());
        self
    }

    /// Set address, city and country code.
    pub fn with_address(mut self, address: &str, city: &str, country_code: &str) -> Self {
        self.approximate_address = Some(address.to_string());
        self.city = Some(city.to_string());
        self.country_code = Some(country_code.to_string());
        self
    }

    /// Set the prior category.
    pub fn with_category(mut self, category: Category, confidence: CategoryConfidence) -> Self {
        self.category = category;
        self.category_confidence = confidence;
        self
    }

    pub fn center(&self) -> GpsPoint {
        GpsPoint::new(self.center_latitude, self.center_longitude)
    }

    /// Time spent at the place. Negative when `end_time < start_time`.
    pub fn duration(&self) -> Duration {
        self.end_time - self.start_time
    }

    /// Check the preconditions the clustering algorithms assume.
    pub fn validate(&self) -> Result<()> {
        if !self.center().is_valid() {
            return Err(PlaceMatchError::InvalidCoordinates {
                id: self.id.clone(),
                latitude: self.center_latitude,
                longitude: self.center_longitude,
            });
        }
        if self.end_time < self.start_time {
            return Err(PlaceMatchError::InvalidTimeRange {
                visit_id: self.id.clone(),
                start_time: self.start_time,
                end_time: self.end_time,
            });
        }
        Ok(())
    }
}

/// Movement between two visits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteSegment {
    pub id: String,
    pub user_id: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    #[serde(default)]
    pub points: Vec<GpsPoint>,
    /// e.g. "walking", "driving"
    #[serde(default)]
    pub transport_mode: Option<String>,
}

impl RouteSegment {
    pub fn new(
        id: &str,
        user_id: &str,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
        points: Vec<GpsPoint>,
    ) -> Self {
        Self {
            id: id.to_string(),
            user_id: user_id.to_string(),
            start_time,
            end_time,
            points,
            transport_mode: None,
        }
    }

    pub fn duration(&self) -> Duration {
        self.end_time - self.start_time
    }

    /// Length of the recorded path in meters.
    pub fn distance_meters(&self) -> f64 {
        polyline_length(&self.points)
    }
}
