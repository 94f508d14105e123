//! Per-card spaced repetition state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::CardId;
use crate::config::SchedulerConfig;
use crate::error::{Result, SchedulerError};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SchedulingState {
    pub ease: f64,
    pub interval_days: i32,
    /// Consecutive passes since the last lapse.
    pub repetitions: i32,
    pub due_at: DateTime<Utc>,
    pub total_reviews: u32,
    pub successful_reviews: u32,
}

impl SchedulingState {
    /// State of a freshly created card: due immediately, never reviewed.
    pub fn new_card(now: DateTime<Utc>, config: &SchedulerConfig) -> Self {
        Self {
            ease: config.default_ease,
            interval_days: 0,
            repetitions: 0,
            due_at: now,
            total_reviews: 0,
            successful_reviews: 0,
        }
    }

    /// A card that has never been reviewed, whatever its `due_at`.
    pub fn is_new(&self) -> bool {
        self.total_reviews == 0
    }

    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        !self.is_new() && self.due_at <= now
    }

    /// Still in the initial learning steps (fewer than two passes in a row).
    pub fn is_learning(&self) -> bool {
        self.repetitions < 2
    }

    /// Share of reviews answered with a passing grade, as a percentage.
    pub fn success_rate(&self) -> f64 {
        if self.total_reviews == 0 {
            return 0.0;
        }
        f64::from(self.successful_reviews) / f64::from(self.total_reviews) * 100.0
    }

    /// Checks the invariants the interval algorithm relies on.
    ///
    /// Nothing is repaired here: a broken state points at a bug in whatever
    /// wrote it.
    pub fn validate(&self, card_id: Option<CardId>, config: &SchedulerConfig) -> Result<()> {
        if !self.ease.is_finite() || self.ease < config.ease_floor {
            return Err(SchedulerError::invariant(
                card_id,
                format!("ease {} is below the floor {}", self.ease, config.ease_floor),
            ));
        }
        if self.interval_days < 0 {
            return Err(SchedulerError::invariant(
                card_id,
                format!("interval {} is negative", self.interval_days),
            ));
        }
        if self.repetitions < 0 {
            return Err(SchedulerError::invariant(
                card_id,
                format!("repetitions {} is negative", self.repetitions),
            ));
        }
        if self.successful_reviews > self.total_reviews {
            return Err(SchedulerError::invariant(
                card_id,
                format!(
                    "{} successful reviews out of {} total",
                    self.successful_reviews, self.total_reviews
                ),
            ));
        }
        if u32::try_from(self.repetitions).map_or(true, |reps| reps > self.total_reviews) {
            return Err(SchedulerError::invariant(
                card_id,
                format!(
                    "{} repetitions but only {} reviews",
                    self.repetitions, self.total_reviews
                ),
            ));
        }
        Ok(())
    }
}
