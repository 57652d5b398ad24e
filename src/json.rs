//! JSON helpers for host bindings.
//!
//! Hosts typically hold visits and places in their own storage and exchange
//! them with the engine as JSON arrays (camelCase keys, RFC 3339 instants).

use log::debug;

use crate::error::Result;
use crate::{FrequentPlace, PlaceVisit, RouteSegment};

/// Parse a JSON array of place visits.
pub fn visits_from_json(json: &str) -> Result<Vec<PlaceVisit>> {
    let visits: Vec<PlaceVisit> = serde_json::from_str(json)?;
    debug!("[Json] Parsed {} visits", visits.len());
    Ok(visits)
}

/// Parse a JSON array of route segments.
pub fn routes_from_json(json: &str) -> Result<Vec<RouteSegment>> {
    Ok(serde_json::from_str(json)?)
}

/// Parse a JSON array of frequent places.
pub fn places_from_json(json: &str) -> Result<Vec<FrequentPlace>> {
    Ok(serde_json::from_str(json)?)
}

/// Serialize frequent places to a JSON array.
pub fn places_to_json(places: &[FrequentPlace]) -> Result<String> {
    Ok(serde_json::to_string(places)?)
}
