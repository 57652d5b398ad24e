//! Geographic utilities: distance, bearing, centroid and bounds.
//!
//! All distances are in meters on a spherical Earth of radius 6,371 km.
//! Coordinates are not validated here; callers supply WGS84 values.

use geo::{BoundingRect, MultiPoint, Point};

use crate::{Bounds, GpsPoint};

/// Mean Earth radius in meters.
pub const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

/// Meters per degree of latitude (and of longitude at the equator).
const METERS_PER_DEGREE: f64 = 111_320.0;

/// Great-circle distance between two points using the Haversine formula.
///
/// # Example
/// ```
/// use place_matcher::GpsPoint;
/// use place_matcher::geo_utils::haversine_distance;
///
/// let london = GpsPoint::new(51.5074, -0.1278);
/// let paris = GpsPoint::new(48.8566, 2.3522);
/// let km = haversine_distance(&london, &paris) / 1000.0;
/// assert!((km - 343.5).abs() < 5.0);
/// ```
pub fn haversine_distance(p1: &GpsPoint, p2: &GpsPoint) -> f64 {
    let lat1 = p1.latitude.to_radians();
    let lat2 = p2.latitude.to_radians();
    let dlat = (p2.latitude - p1.latitude).to_radians();
    let dlng = (p2.longitude - p1.longitude).to_radians();

    let a = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlng / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_METERS * c
}

/// Initial bearing from `from` towards `to`, in degrees within `[0, 360)`.
pub fn bearing_degrees(from: &GpsPoint, to: &GpsPoint) -> f64 {
    let lat1 = from.latitude.to_radians();
    let lat2 = to.latitude.to_radians();
    let dlng = (to.longitude - from.longitude).to_radians();

    let y = dlng.sin() * lat2.cos();
    let x = lat1.cos() * lat2.sin() - lat1.sin() * lat2.cos() * dlng.cos();

    let bearing = y.atan2(x).to_degrees().rem_euclid(360.0);
    // rem_euclid can round up to exactly 360.0 for tiny negative inputs
    if bearing >= 360.0 {
        0.0
    } else {
        bearing
    }
}

/// Point reached by travelling `distance_meters` from `origin` along `bearing` degrees.
pub fn destination_point(origin: &GpsPoint, bearing: f64, distance_meters: f64) -> GpsPoint {
    let angular = distance_meters / EARTH_RADIUS_METERS;
    let theta = bearing.to_radians();
    let lat1 = origin.latitude.to_radians();
    let lng1 = origin.longitude.to_radians();

    let lat2 = (lat1.sin() * angular.cos() + lat1.cos() * angular.sin() * theta.cos()).asin();
    let lng2 = lng1
        + (theta.sin() * angular.sin() * lat1.cos()).atan2(angular.cos() - lat1.sin() * lat2.sin());

    GpsPoint::new(
        lat2.to_degrees(),
        (lng2.to_degrees() + 540.0).rem_euclid(360.0) - 180.0,
    )
}

/// Centroid of a set of points.
///
/// Each point is converted to a 3-D unit vector, the vectors are averaged and
/// the mean is projected back to latitude/longitude. Returns `None` for empty
/// input and the point itself for a single point. When the mean vector
/// vanishes (antipodal inputs) the planar mean of lat/lng is returned.
pub fn compute_centroid(points: &[GpsPoint]) -> Option<GpsPoint> {
    match points {
        [] => return None,
        [single] => return Some(*single),
        _ => {}
    }

    let (mut x, mut y, mut z) = (0.0, 0.0, 0.0);
    for p in points {
        let lat = p.latitude.to_radians();
        let lng = p.longitude.to_radians();
        x += lat.cos() * lng.cos();
        y += lat.cos() * lng.sin();
        z += lat.sin();
    }

    let n = points.len() as f64;
    let (x, y, z) = (x / n, y / n, z / n);
    let hyp = (x * x + y * y).sqrt();

    if hyp.hypot(z) < 1e-12 {
        let lat = points.iter().map(|p| p.latitude).sum::<f64>() / n;
        let lng = points.iter().map(|p| p.longitude).sum::<f64>() / n;
        return Some(GpsPoint::new(lat, lng));
    }

    Some(GpsPoint::new(
        z.atan2(hyp).to_degrees(),
        y.atan2(x).to_degrees(),
    ))
}

/// Bounding box of a set of points, `None` when empty.
pub fn compute_bounds(points: &[GpsPoint]) -> Option<Bounds> {
    let multi: MultiPoint<f64> = points
        .iter()
        .map(|p| Point::new(p.longitude, p.latitude))
        .collect();
    let rect = multi.bounding_rect()?;

    Some(Bounds {
        min_lat: rect.min().y,
        max_lat: rect.max().y,
        min_lng: rect.min().x,
        max_lng: rect.max().x,
    })
}

/// True when the two points are at most `radius_meters` apart.
pub fn within_radius(a: &GpsPoint, b: &GpsPoint, radius_meters: f64) -> bool {
    haversine_distance(a, b) <= radius_meters
}

/// Total length of a polyline in meters.
pub fn polyline_length(points: &[GpsPoint]) -> f64 {
    points
        .windows(2)
        .map(|w| haversine_distance(&w[0], &w[1]))
        .sum()
}

/// Convert a distance to degrees of longitude at the given latitude.
///
/// Always at least the latitude-degree span, so it is a safe envelope size
/// in both axes. Clamped near the poles.
pub fn meters_to_degrees(meters: f64, latitude: f64) -> f64 {
    let cos_lat = latitude.to_radians().cos().abs().max(0.01);
    meters / (METERS_PER_DEGREE * cos_lat)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(a: f64, b: f64, epsilon: f64) -> bool {
        (a - b).abs() < epsilon
    }

    #[test]
    fn test_haversine_same_point() {
        let p = GpsPoint::new(51.5074, -0.1278);
        assert_eq!(haversine_distance(&p, &p), 0.0);
    }

    #[test]
    fn test_haversine_symmetric() {
        let a = GpsPoint::new(48.8566, 2.3522);
        let b = GpsPoint::new(48.8568, 2.3525);
        assert_eq!(haversine_distance(&a, &b), haversine_distance(&b, &a));
        // Roughly 30m apart
        assert!(approx_eq(haversine_distance(&a, &b), 31.0, 5.0));
    }

    #[test]
    fn test_bearing_cardinal_directions() {
        let origin = GpsPoint::new(0.0, 0.0);
        assert!(approx_eq(bearing_degrees(&origin, &GpsPoint::new(1.0, 0.0)), 0.0, 1e-9));
        assert!(approx_eq(bearing_degrees(&origin, &GpsPoint::new(0.0, 1.0)), 90.0, 1e-9));
        assert!(approx_eq(bearing_degrees(&origin, &GpsPoint::new(-1.0, 0.0)), 180.0, 1e-9));
        assert!(approx_eq(bearing_degrees(&origin, &GpsPoint::new(0.0, -1.0)), 270.0, 1e-9));
    }

    #[test]
    fn test_destination_round_trip_distance() {
        let origin = GpsPoint::new(45.0, 7.0);
        let dest = destination_point(&origin, 60.0, 250.0);
        assert!(approx_eq(haversine_distance(&origin, &dest), 250.0, 1e-6));
        assert!(approx_eq(bearing_degrees(&origin, &dest), 60.0, 0.01));
    }

    #[test]
    fn test_centroid_empty_and_single() {
        assert!(compute_centroid(&[]).is_none());
        let p = GpsPoint::new(10.123, -20.456);
        assert_eq!(compute_centroid(&[p]), Some(p));
    }

    #[test]
    fn test_centroid_close_points_matches_mean() {
        let points = vec![GpsPoint::new(51.50, -0.10), GpsPoint::new(51.52, -0.12)];
        let c = compute_centroid(&points).unwrap();
        assert!(approx_eq(c.latitude, 51.51, 0.001));
        assert!(approx_eq(c.longitude, -0.11, 0.001));
    }

    #[test]
    fn test_centroid_across_antimeridian() {
        let points = vec![GpsPoint::new(0.0, 179.9), GpsPoint::new(0.0, -179.9)];
        let c = compute_centroid(&points).unwrap();
        assert!(approx_eq(c.longitude.abs(), 180.0, 1e-6));
    }

    #[test]
    fn test_compute_bounds() {
        let track = vec![
            GpsPoint::new(51.50, -0.13),
            GpsPoint::new(51.51, -0.12),
            GpsPoint::new(51.505, -0.125),
        ];
        let bounds = compute_bounds(&track).unwrap();
        assert_eq!(bounds.min_lat, 51.50);
        assert_eq!(bounds.max_lat, 51.51);
        assert_eq!(bounds.min_lng, -0.13);
        assert_eq!(bounds.max_lng, -0.12);
        assert!(compute_bounds(&[]).is_none());
    }

    #[test]
    fn test_within_radius_inclusive() {
        let a = GpsPoint::new(0.0, 0.0);
        let b = destination_point(&a, 0.0, 50.0);
        let d = haversine_distance(&a, &b);
        assert!(within_radius(&a, &b, d));
        assert!(!within_radius(&a, &b, d - 0.01));
    }

    #[test]
    fn test_meters_to_degrees() {
        let deg = meters_to_degrees(111_320.0, 0.0);
        assert!(approx_eq(deg, 1.0, 0.01));
        assert!(meters_to_degrees(111_320.0, 45.0) > 1.0);
    }

    #[test]
    fn test_polyline_length() {
        let a = GpsPoint::new(0.0, 0.0);
        let b = destination_point(&a, 90.0, 100.0);
        let c = destination_point(&b, 0.0, 100.0);
        assert!(approx_eq(polyline_length(&[a, b, c]), 200.0, 1e-6));
        assert_eq!(polyline_length(&[a]), 0.0);
    }
}
