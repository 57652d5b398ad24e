//! Per-day trip timelines.
//!
//! A [`Trip`] references visits and route segments by id. The aggregator
//! places each referenced item on the calendar day (in the configured time
//! zone) of its start time, and wraps every day of the trip in synthetic
//! `DayStart` / `DayEnd` markers.
//!
//! ## Example
//! ```rust
//! use chrono::{TimeZone, Utc};
//! use place_matcher::{PlaceVisit, Trip, TripDayAggregator};
//!
//! let start = Utc.with_ymd_and_hms(2024, 10, 1, 0, 0, 0).unwrap();
//! let end = Utc.with_ymd_and_hms(2024, 10, 3, 0, 0, 0).unwrap();
//! let visit = PlaceVisit::new("v1", "u1", 48.85, 2.35, start, start + chrono::Duration::hours(2));
//! let trip = Trip::new("t1", "u1", start, end).with_visits(&["v1"]);
//!
//! let visits = [visit];
//! let days = TripDayAggregator::new(Utc).aggregate(&trip, &visits, &[]);
//! assert_eq!(days.len(), 3);
//! ```

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use log::debug;
use serde::{Deserialize, Serialize};

use crate::{PlaceVisit, RouteSegment};

/// A span of travel grouping visits and route segments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Trip {
    pub id: String,
    pub user_id: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    #[serde(default)]
    pub visit_ids: Vec<String>,
    #[serde(default)]
    pub route_ids: Vec<String>,
}

impl Trip {
    pub fn new(
        id: &str,
        user_id: &str,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.to_string(),
            user_id: user_id.to_string(),
            start_time,
            end_time,
            visit_ids: Vec::new(),
            route_ids: Vec::new(),
        }
    }

    pub fn with_visits(mut self, ids: &[&str]) -> Self {
        self.visit_ids.extend(ids.iter().map(|s| s.to_string()));
        self
    }

    pub fn with_routes(mut self, ids: &[&str]) -> Self {
        self.route_ids.extend(ids.iter().map(|s| s.to_string()));
        self
    }
}

/// One entry of a day's timeline.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TimelineItem<'a> {
    DayStart {
        date: NaiveDate,
        timestamp: DateTime<Utc>,
    },
    Visit(&'a PlaceVisit),
    Route(&'a RouteSegment),
    DayEnd {
        date: NaiveDate,
        timestamp: DateTime<Utc>,
    },
}

impl TimelineItem<'_> {
    /// Instant used for ordering within a day.
    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            TimelineItem::DayStart { timestamp, .. } | TimelineItem::DayEnd { timestamp, .. } => {
                *timestamp
            }
            TimelineItem::Visit(visit) => visit.start_time,
            TimelineItem::Route(route) => route.start_time,
        }
    }
}

/// A calendar day of a trip with its ordered items.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TripDay<'a> {
    pub date: NaiveDate,
    pub items: Vec<TimelineItem<'a>>,
}

impl<'a> TripDay<'a> {
    pub fn visits(&self) -> impl Iterator<Item = &'a PlaceVisit> + '_ {
        self.items.iter().filter_map(|item| match item {
            TimelineItem::Visit(visit) => Some(*visit),
            _ => None,
        })
    }

    pub fn routes(&self) -> impl Iterator<Item = &'a RouteSegment> + '_ {
        self.items.iter().filter_map(|item| match item {
            TimelineItem::Route(route) => Some(*route),
            _ => None,
        })
    }

    /// True when the day only holds its boundary markers.
    pub fn is_empty(&self) -> bool {
        self.visits().next().is_none() && self.routes().next().is_none()
    }

    /// Distance covered by the day's route segments.
    pub fn route_distance_meters(&self) -> f64 {
        self.routes().map(|r| r.distance_meters()).sum()
    }
}

/// Splits trips into per-day timelines in a fixed time zone.
#[derive(Debug, Clone)]
pub struct TripDayAggregator<Tz: TimeZone> {
    tz: Tz,
}

impl<Tz: TimeZone> TripDayAggregator<Tz> {
    pub fn new(tz: Tz) -> Self {
        Self { tz }
    }

    /// Build the day-by-day timeline of `trip`.
    ///
    /// Only visits and routes whose ids the trip references are used. Days run
    /// from the local date of `start_time` to the local date of `end_time`,
    /// both inclusive, so a trip ending exactly at midnight still gets that
    /// day. Items dated outside that range are dropped. A trip with no
    /// referenced visit or route inside that range produces no days.
    pub fn aggregate<'a>(
        &self,
        trip: &Trip,
        visits: &'a [PlaceVisit],
        routes: &'a [RouteSegment],
    ) -> Vec<TripDay<'a>> {
        let visit_ids: HashSet<&str> = trip.visit_ids.iter().map(String::as_str).collect();
        let route_ids: HashSet<&str> = trip.route_ids.iter().map(String::as_str).collect();

        // Visits are pushed before routes so they win timestamp ties
        let items: Vec<TimelineItem<'a>> = visits
            .iter()
            .filter(|v| visit_ids.contains(v.id.as_str()))
            .map(TimelineItem::Visit)
            .chain(
                routes
                    .iter()
                    .filter(|r| route_ids.contains(r.id.as_str()))
                    .map(TimelineItem::Route),
            )
            .collect();

        let first_day = self.local_date(trip.start_time);
        let last_day = self.local_date(trip.end_time);

        let mut by_day: HashMap<NaiveDate, Vec<TimelineItem<'a>>> = HashMap::new();
        for item in items {
            by_day
                .entry(self.local_date(item.timestamp()))
                .or_default()
                .push(item);
        }

        if !by_day.keys().any(|date| (first_day..=last_day).contains(date)) {
            debug!("[Timeline] Trip {} has no visits or routes within its days", trip.id);
            return vec![];
        }

        let days: Vec<TripDay<'a>> = first_day
            .iter_days()
            .take_while(|date| *date <= last_day)
            .map(|date| {
                let mut day_items = by_day.remove(&date).unwrap_or_default();
                day_items.sort_by_key(|item| item.timestamp());

                let mut ordered = Vec::with_capacity(day_items.len() + 2);
                ordered.push(TimelineItem::DayStart {
                    date,
                    timestamp: self.local_midnight(date),
                });
                ordered.extend(day_items);
                ordered.push(TimelineItem::DayEnd {
                    date,
                    timestamp: date
                        .succ_opt()
                        .map(|next| self.local_midnight(next))
                        .unwrap_or_else(|| self.local_midnight(date) + Duration::days(1)),
                });

                TripDay {
                    date,
                    items: ordered,
                }
            })
            .collect();

        let dropped: usize = by_day.values().map(Vec::len).sum();
        debug!(
            "[Timeline] Trip {} -> {} days ({} items outside the trip's days)",
            trip.id,
            days.len(),
            dropped
        );

        days
    }

    fn local_date(&self, instant: DateTime<Utc>) -> NaiveDate {
        instant.with_timezone(&self.tz).date_naive()
    }

    /// First instant of `date` in the configured zone.
    fn local_midnight(&self, date: NaiveDate) -> DateTime<Utc> {
        let midnight = date.and_time(NaiveTime::MIN);
        // Midnight may fall into a DST gap; the day then starts at the first valid hour
        (0..=2)
            .find_map(|h| {
                self.tz
                    .from_local_datetime(&(midnight + Duration::hours(h)))
                    .earliest()
            })
            .map(|t| t.with_timezone(&Utc))
            .unwrap_or_else(|| Utc.from_utc_datetime(&midnight))
    }
}
