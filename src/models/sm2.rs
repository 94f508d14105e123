//! SM-2 (SuperMemo 2) spaced repetition algorithm implementation.
//!
//! The SM-2 algorithm calculates review intervals based on recall quality:
//! - Each card has an ease factor that adjusts based on performance
//! - A lapse resets repetitions and schedules the card for the minimum interval
//! - Passes increase the interval progressively (1 day → 6 days → ease multiplier)
//! - Ease never falls below the configured floor (1.3 by default)
//! - Higher quality answers lead to longer intervals between reviews
//!
//! The computation is pure: the caller supplies `now` and persists the result.

use chrono::{DateTime, Duration, Utc};

use super::{Grade, RatingScale, ReviewRecord, SchedulingState};
use crate::config::SchedulerConfig;
use crate::error::{Result, SchedulerError};

#[derive(Clone, Debug, Default)]
pub struct Sm2Scheduler {
    config: SchedulerConfig,
    ratings: RatingScale,
}

impl Sm2Scheduler {
    pub fn new(config: SchedulerConfig, ratings: RatingScale) -> Result<Self> {
        config.validate()?;
        ratings.validate()?;
        Ok(Self { config, ratings })
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    pub fn ratings(&self) -> &RatingScale {
        &self.ratings
    }

    /// Computes the state after answering a card with `quality` at `now`.
    ///
    /// Fails without producing anything if `quality` is not on the rating
    /// scale or if `state` breaks an invariant.
    pub fn advance(
        &self,
        state: &SchedulingState,
        quality: u8,
        now: DateTime<Utc>,
    ) -> Result<(SchedulingState, ReviewRecord)> {
        let grade = self.ratings.grade(quality)?;
        state.validate(None, &self.config)?;

        let cfg = &self.config;
        let (ease, interval_days, repetitions) = if grade.is_pass() {
            let ease = self.adjusted_ease(state.ease, grade);
            let repetitions = state.repetitions.saturating_add(1);
            let interval = match repetitions {
                1 if grade == Grade::EasyPass => cfg.easy_first_interval_days,
                1 => cfg.first_interval_days,
                2 => cfg.second_interval_days,
                _ => {
                    let bonus = if grade == Grade::EasyPass {
                        cfg.easy_bonus
                    } else {
                        1.0
                    };
                    let scaled = (f64::from(state.interval_days) * ease * bonus).round();
                    // Saturating cast; the cap below brings it back in range.
                    (scaled as i32).max(1)
                }
            };
            (ease, interval.min(cfg.max_interval_days), repetitions)
        } else {
            let ease = (state.ease - cfg.lapse_ease_penalty).max(cfg.ease_floor);
            (ease, cfg.lapse_interval_days, 0)
        };

        let due_at = now
            .checked_add_signed(Duration::days(i64::from(interval_days)))
            .ok_or(SchedulerError::TimestampOutOfRange)?;

        let next = SchedulingState {
            ease,
            interval_days,
            repetitions,
            due_at,
            total_reviews: state.total_reviews.saturating_add(1),
            successful_reviews: if grade.is_pass() {
                state.successful_reviews.saturating_add(1)
            } else {
                state.successful_reviews
            },
        };
        let record = ReviewRecord {
            quality,
            reviewed_at: now,
            ease_before: state.ease,
            interval_before: state.interval_days,
        };
        Ok((next, record))
    }

    /// New ease after a pass, kept within [floor, ceiling].
    fn adjusted_ease(&self, ease: f64, grade: Grade) -> f64 {
        let cfg = &self.config;
        let delta = match grade {
            Grade::HardPass => cfg.hard_ease_delta,
            Grade::Pass => cfg.pass_ease_delta,
            Grade::EasyPass => cfg.easy_ease_delta,
            Grade::Lapse => 0.0,
        };
        let raised = (ease + delta).max(cfg.ease_floor);
        match cfg.ease_ceiling {
            Some(ceiling) => raised.min(ceiling).max(cfg.ease_floor),
            None => raised,
        }
    }
}
