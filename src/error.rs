//! Unified error handling for the place-matcher library.
//!
//! The clustering, timeline and region algorithms are total functions and never
//! fail. Errors only surface from the explicit checking entry points
//! (visit validation, config validation) and from JSON import/export.

use chrono::{DateTime, Utc};
use thiserror::Error;

/// Unified error type for place-matcher operations.
#[derive(Debug, Error)]
pub enum PlaceMatchError {
    /// Visit ends before it starts
    #[error("Visit '{visit_id}' ends at {end_time} before it starts at {start_time}")]
    InvalidTimeRange {
        visit_id: String,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
    },
    /// Coordinates outside WGS84 ranges or not finite
    #[error("'{id}' has invalid coordinates ({latitude}, {longitude})")]
    InvalidCoordinates {
        id: String,
        latitude: f64,
        longitude: f64,
    },
    /// Configuration error
    #[error("Configuration error: {message}")]
    Config { message: String },
    /// JSON encode/decode failure
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for place-matcher operations.
pub type Result<T> = std::result::Result<T, PlaceMatchError>;

/// Extension trait for converting Option to PlaceMatchError.
pub trait OptionExt<T> {
    /// Convert Option to Result with a configuration error.
    fn ok_or_config(self, message: &str) -> Result<T>;
}

impl<T> OptionExt<T> for Option<T> {
    fn ok_or_config(self, message: &str) -> Result<T> {
        self.ok_or_else(|| PlaceMatchError::Config {
            message: message.to_string(),
        })
    }
}
