//! Integration tests for geofence membership.

use chrono::{DateTime, Duration, FixedOffset, TimeZone, Utc};
use place_matcher::geo_utils::{destination_point, haversine_distance};
use place_matcher::{
    ClusterConfig, GeoRegion, GeofenceEventKind, GpsPoint, HeuristicCategorizer, PlaceClusterer,
    PlaceVisit, RegionIndex,
};

fn t(day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 10, day, 9, 0, 0).unwrap()
}

#[test]
fn test_hundred_meter_region_boundary() {
    let origin = GpsPoint::new(0.0, 0.0);
    let region = GeoRegion::new("r", origin, 100.0);
    for bearing in [0.0, 45.0, 135.0, 270.0] {
        let inside = destination_point(&origin, bearing, 99.0);
        let outside = destination_point(&origin, bearing, 101.0);
        assert!(region.contains(&inside));
        assert!(!region.contains(&outside));
    }
}

#[test]
fn test_matches_sorted_by_distance_from_each_center() {
    let origin = GpsPoint::new(-33.9, 18.4);
    let regions: Vec<GeoRegion> = (0..5)
        .map(|i| {
            let center = destination_point(&origin, 30.0 * i as f64, 20.0 * i as f64);
            GeoRegion::new(&format!("r{}", i), center, 150.0)
        })
        .rev()
        .collect();
    let index = RegionIndex::new(regions);

    let matches = index.regions_containing(&origin);
    assert_eq!(matches.len(), 5);
    assert_eq!(matches[0].region.id, "r0");
    assert!(matches
        .windows(2)
        .all(|w| w[0].distance_meters <= w[1].distance_meters));
    for m in &matches {
        let expected = haversine_distance(&m.region.center, &origin);
        assert!((m.distance_meters - expected).abs() < 1e-9);
    }
}

#[test]
fn test_geofence_frequent_places() {
    let cafe = GpsPoint::new(59.33, 18.07);
    let visits: Vec<PlaceVisit> = (1..=3)
        .map(|d| {
            PlaceVisit::new(
                &format!("v{}", d),
                "u1",
                cafe.latitude,
                cafe.longitude,
                t(d),
                t(d) + Duration::hours(1),
            )
            .with_poi_name("Cafe")
        })
        .collect();
    let categorizer = HeuristicCategorizer::new(FixedOffset::east_opt(3600).unwrap(), t(20));
    let places =
        PlaceClusterer::new(ClusterConfig::default(), categorizer).cluster_visits(&visits, "u1");
    assert_eq!(places.len(), 1);

    let index = RegionIndex::new(places.iter().map(GeoRegion::from_place).collect());
    assert_eq!(index.len(), 1);
    assert_eq!(index.regions()[0].name.as_deref(), Some("Cafe"));

    let walking_in = destination_point(&cafe, 180.0, 30.0);
    let walking_away = destination_point(&cafe, 180.0, 300.0);
    let events = index.transitions(Some(&walking_away), &walking_in);
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].kind, GeofenceEventKind::Enter);
    assert_eq!(events[0].region_id, places[0].id);
}
