//! Integration tests for trip day aggregation.

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, TimeZone, Utc};
use place_matcher::{GpsPoint, PlaceVisit, RouteSegment, TimelineItem, Trip, TripDayAggregator};

fn t(day: u32, hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 10, day, hour, 0, 0).unwrap()
}

fn visit(id: &str, start: DateTime<Utc>) -> PlaceVisit {
    PlaceVisit::new(id, "u1", 45.46, 9.19, start, start + Duration::hours(2))
}

fn route(id: &str, start: DateTime<Utc>) -> RouteSegment {
    RouteSegment::new(
        id,
        "u1",
        start,
        start + Duration::minutes(45),
        vec![GpsPoint::new(45.46, 9.19), GpsPoint::new(45.47, 9.20)],
    )
}

#[test]
fn test_one_day_trip_has_four_items() {
    let trip = Trip::new("trip", "u1", t(5, 8), t(5, 22))
        .with_visits(&["v"])
        .with_routes(&["r"]);
    let visits = [visit("v", t(5, 10))];
    let routes = [route("r", t(5, 13))];

    let days = TripDayAggregator::new(Utc).aggregate(&trip, &visits, &routes);
    assert_eq!(days.len(), 1);
    let items = &days[0].items;
    assert_eq!(items.len(), 4);
    assert!(matches!(items[0], TimelineItem::DayStart { .. }));
    assert!(matches!(items[1], TimelineItem::Visit(v) if v.id == "v"));
    assert!(matches!(items[2], TimelineItem::Route(r) if r.id == "r"));
    assert!(matches!(items[3], TimelineItem::DayEnd { .. }));
    assert!(items.windows(2).all(|w| w[0].timestamp() <= w[1].timestamp()));
}

#[test]
fn test_two_midnights_give_three_days() {
    let trip = Trip::new("trip", "u1", t(5, 0), t(7, 0)).with_visits(&["v"]);
    let visits = [visit("v", t(6, 12))];

    let days = TripDayAggregator::new(Utc).aggregate(&trip, &visits, &[]);
    let dates: Vec<NaiveDate> = days.iter().map(|d| d.date).collect();
    assert_eq!(
        dates,
        vec![
            NaiveDate::from_ymd_opt(2024, 10, 5).unwrap(),
            NaiveDate::from_ymd_opt(2024, 10, 6).unwrap(),
            NaiveDate::from_ymd_opt(2024, 10, 7).unwrap(),
        ]
    );
    // Empty days still carry their markers
    assert_eq!(days[0].items.len(), 2);
    assert_eq!(days[2].items.len(), 2);
}

#[test]
fn test_oct_first_to_fourth_midnight_gives_four_days() {
    let trip = Trip::new("trip", "u1", t(1, 0), t(4, 0))
        .with_visits(&["a", "b"])
        .with_routes(&["r"]);
    let visits = [visit("a", t(1, 9)), visit("b", t(3, 18))];
    let routes = [route("r", t(2, 7))];

    let days = TripDayAggregator::new(Utc).aggregate(&trip, &visits, &routes);
    assert_eq!(days.len(), 4);
    assert_eq!(days[0].visits().count(), 1);
    assert_eq!(days[1].routes().count(), 1);
    assert_eq!(days[2].visits().count(), 1);
    assert!(days[3].is_empty());
    assert!(days[1].route_distance_meters() > 1000.0);
}

#[test]
fn test_day_markers_bracket_the_local_day() {
    let tz = FixedOffset::west_opt(5 * 3600).unwrap();
    let trip = Trip::new("trip", "u1", t(5, 12), t(5, 20)).with_visits(&["v"]);
    let visits = [visit("v", t(5, 14))];

    let days = TripDayAggregator::new(tz).aggregate(&trip, &visits, &[]);
    assert_eq!(days.len(), 1);
    // Local midnight at UTC-5 is 05:00 UTC
    assert_eq!(days[0].items[0].timestamp(), t(5, 5));
    assert_eq!(days[0].items[2].timestamp(), t(6, 5));
}
