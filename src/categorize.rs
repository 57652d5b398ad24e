//! Category and significance classification.
//!
//! The clustering code only depends on the [`PlaceCategorizer`] trait: one
//! vote per member visit, and one significance tier per cluster from its
//! aggregate statistics. Hosts inject their own implementation; the core never
//! falls back to built-in rules.
//!
//! [`HeuristicCategorizer`] is a ready-made implementation based on local time
//! of day. It has to be constructed and passed in explicitly.

use chrono::{DateTime, Datelike, Duration, FixedOffset, Timelike, Utc, Weekday};
use serde::{Deserialize, Serialize};

use crate::error::{OptionExt, Result};
use crate::PlaceVisit;

/// Semantic category of a place.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Home,
    Work,
    School,
    Gym,
    Food,
    Shopping,
    Leisure,
    Transit,
    Healthcare,
    Other,
    #[default]
    Unknown,
}

/// Confidence attached to a category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CategoryConfidence {
    #[default]
    Low,
    Medium,
    High,
}

impl CategoryConfidence {
    /// Map a winning vote share to a confidence tier.
    ///
    /// `>= 0.8` is high, `>= 0.5` medium, anything else low.
    pub fn from_vote_share(share: f64) -> Self {
        if share >= 0.8 {
            CategoryConfidence::High
        } else if share >= 0.5 {
            CategoryConfidence::Medium
        } else {
            CategoryConfidence::Low
        }
    }
}

/// Coarse importance tier of a frequent place.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Significance {
    Primary,
    Frequent,
    Occasional,
    #[default]
    Rare,
}

/// A single visit's category vote.
///
/// Every vote counts once in the cluster tally; `confidence` is informational.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryVote {
    pub category: Category,
    pub confidence: CategoryConfidence,
}

impl CategoryVote {
    pub fn new(category: Category, confidence: CategoryConfidence) -> Self {
        Self {
            category,
            confidence,
        }
    }
}

/// Categorization capability injected into the clusterer.
///
/// Implementations must be deterministic and side-effect free.
pub trait PlaceCategorizer: Send + Sync {
    /// Classify one visit given the other members of its spatial cluster.
    fn categorize(&self, visit: &PlaceVisit, siblings: &[&PlaceVisit]) -> CategoryVote;

    /// Classify a cluster's importance from aggregate statistics.
    fn determine_significance(
        &self,
        visit_count: u32,
        total_duration: Duration,
        last_visit_time: DateTime<Utc>,
    ) -> Significance;
}

// ============================================================================
// Heuristic implementation
// ============================================================================

/// Thresholds for [`HeuristicCategorizer`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeuristicThresholds {
    /// Visits needed for a primary place. Default: 20
    pub primary_min_visits: u32,
    /// Alternatively, total dwell time for a primary place. Default: 50 hours
    pub primary_min_hours: f64,
    /// Visits needed for a frequent place. Default: 5
    pub frequent_min_visits: u32,
    /// Visits needed for an occasional place. Default: 3
    pub occasional_min_visits: u32,
    /// Places not visited for this many days drop to rare. Default: 90
    pub stale_after_days: i64,
    /// Minimum stay for a work vote. Default: 4 hours
    pub work_min_hours: f64,
    /// Local hour at which a stay counts as overnight. Default: 3 (03:00)
    pub night_hour: u32,
}

impl Default for HeuristicThresholds {
    fn default() -> Self {
        Self {
            primary_min_visits: 20,
            primary_min_hours: 50.0,
            frequent_min_visits: 5,
            occasional_min_visits: 3,
            stale_after_days: 90,
            work_min_hours: 4.0,
            night_hour: 3,
        }
    }
}

/// Time-of-day categorizer.
///
/// - Stays covering the local night hour vote `Home`
/// - Long weekday stays starting in the morning vote `Work`
/// - Everything else keeps its prior category, or `Other` when unknown
///
/// Significance is computed relative to a fixed `reference_time` so the
/// result does not depend on the wall clock.
#[derive(Debug, Clone)]
pub struct HeuristicCategorizer {
    utc_offset: FixedOffset,
    reference_time: DateTime<Utc>,
    thresholds: HeuristicThresholds,
}

impl HeuristicCategorizer {
    pub fn new(utc_offset: FixedOffset, reference_time: DateTime<Utc>) -> Self {
        Self {
            utc_offset,
            reference_time,
            thresholds: HeuristicThresholds::default(),
        }
    }

    /// Build from a whole-hour UTC offset, e.g. `-5` for EST.
    pub fn from_utc_offset_hours(hours: i32, reference_time: DateTime<Utc>) -> Result<Self> {
        let offset = hours
            .checked_mul(3600)
            .and_then(FixedOffset::east_opt)
            .ok_or_config("UTC offset must be within +/-23 hours")?;
        Ok(Self::new(offset, reference_time))
    }

    pub fn with_thresholds(mut self, thresholds: HeuristicThresholds) -> Self {
        self.thresholds = thresholds;
        self
    }

    fn covers_night(&self, visit: &PlaceVisit) -> bool {
        let local_start = visit.start_time.with_timezone(&self.utc_offset);
        let Some(mut night) = local_start
            .with_hour(self.thresholds.night_hour)
            .and_then(|t| t.with_minute(0))
            .and_then(|t| t.with_second(0))
            .and_then(|t| t.with_nanosecond(0))
        else {
            return false;
        };
        if night < local_start {
            night += Duration::days(1);
        }
        night <= visit.end_time.with_timezone(&self.utc_offset)
    }

    fn is_work_shaped(&self, visit: &PlaceVisit) -> bool {
        let local_start = visit.start_time.with_timezone(&self.utc_offset);
        let weekday = !matches!(local_start.weekday(), Weekday::Sat | Weekday::Sun);
        let morning = (6..=11).contains(&local_start.hour());
        let hours = visit.duration().num_minutes() as f64 / 60.0;
        weekday && morning && hours >= self.thresholds.work_min_hours
    }

    fn pattern_confidence<F>(&self, siblings: &[&PlaceVisit], matches: F) -> CategoryConfidence
    where
        F: Fn(&PlaceVisit) -> bool,
    {
        if siblings.is_empty() {
            return CategoryConfidence::Medium;
        }
        let agreeing = siblings.iter().filter(|s| matches(**s)).count();
        if agreeing * 2 >= siblings.len() {
            CategoryConfidence::High
        } else {
            CategoryConfidence::Medium
        }
    }
}

impl PlaceCategorizer for HeuristicCategorizer {
    fn categorize(&self, visit: &PlaceVisit, siblings: &[&PlaceVisit]) -> CategoryVote {
        if self.covers_night(visit) {
            let confidence = self.pattern_confidence(siblings, |v| self.covers_night(v));
            return CategoryVote::new(Category::Home, confidence);
        }
        if self.is_work_shaped(visit) {
            let confidence = self.pattern_confidence(siblings, |v| self.is_work_shaped(v));
            return CategoryVote::new(Category::Work, confidence);
        }
        match visit.category {
            Category::Unknown => CategoryVote::new(Category::Other, CategoryConfidence::Low),
            prior => CategoryVote::new(prior, visit.category_confidence),
        }
    }

    fn determine_significance(
        &self,
        visit_count: u32,
        total_duration: Duration,
        last_visit_time: DateTime<Utc>,
    ) -> Significance {
        let t = &self.thresholds;
        if (self.reference_time - last_visit_time).num_days() > t.stale_after_days {
            return Significance::Rare;
        }

        let hours = total_duration.num_minutes() as f64 / 60.0;
        if visit_count >= t.primary_min_visits || hours >= t.primary_min_hours {
            Significance::Primary
        } else if visit_count >= t.frequent_min_visits {
            Significance::Frequent
        } else if visit_count >= t.occasional_min_visits {
            Significance::Occasional
        } else {
            Significance::Rare
        }
    }
}
