//! Tunable parameters for scheduling and session assembly.
//!
//! Loaded from a JSON file; any field left out falls back to its default.

use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::error::{Result, SchedulerError};
use crate::models::RatingScale;
use crate::session::MixPolicy;

/// Longest interval a configuration may allow, about a hundred years.
/// Keeps every due date inside the stored timestamp range.
pub const MAX_INTERVAL_LIMIT_DAYS: i32 = 36_500;

/// Window of recent (fact, variant) pairs the variation guard avoids.
pub const DEFAULT_VARIATION_WINDOW: usize = 10;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub scheduler: SchedulerConfig,
    pub ratings: RatingScale,
    pub session: SessionConfig,
    pub variation_window: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            scheduler: SchedulerConfig::default(),
            ratings: RatingScale::default(),
            session: SessionConfig::default(),
            variation_window: DEFAULT_VARIATION_WINDOW,
        }
    }
}

impl Config {
    /// Reads and validates a configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let mut file = File::open(path.as_ref())?;
        let mut contents = String::new();
        file.read_to_string(&mut contents)?;

        let config: Config = serde_json::from_str(&contents)?;
        config.validate()?;
        log::debug!("loaded configuration from {}", path.as_ref().display());
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.scheduler.validate()?;
        self.ratings.validate()?;
        self.session.validate()
    }
}

/// Parameters of the interval algorithm.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    pub default_ease: f64,
    pub ease_floor: f64,
    pub ease_ceiling: Option<f64>,
    pub lapse_ease_penalty: f64,
    pub lapse_interval_days: i32,
    pub first_interval_days: i32,
    pub second_interval_days: i32,
    pub easy_first_interval_days: i32,
    pub max_interval_days: i32,
    pub hard_ease_delta: f64,
    pub pass_ease_delta: f64,
    pub easy_ease_delta: f64,
    pub easy_bonus: f64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            default_ease: 2.5,
            ease_floor: 1.3,
            ease_ceiling: Some(3.0),
            lapse_ease_penalty: 0.15,
            lapse_interval_days: 1,
            first_interval_days: 1,
            second_interval_days: 6,
            easy_first_interval_days: 4,
            max_interval_days: 365,
            hard_ease_delta: -0.075,
            pass_ease_delta: 0.0,
            easy_ease_delta: 0.15,
            easy_bonus: 1.3,
        }
    }
}

impl SchedulerConfig {
    pub fn validate(&self) -> Result<()> {
        let invalid = |reason: &str| Err(SchedulerError::InvalidConfig(reason.to_string()));

        if !(self.ease_floor.is_finite() && self.ease_floor > 0.0) {
            return invalid("ease_floor must be a positive number");
        }
        if !self.default_ease.is_finite() || self.default_ease < self.ease_floor {
            return invalid("default_ease must not be below ease_floor");
        }
        if let Some(ceiling) = self.ease_ceiling {
            if !ceiling.is_finite() || ceiling < self.default_ease {
                return invalid("ease_ceiling must not be below default_ease");
            }
        }
        if !self.lapse_ease_penalty.is_finite() || self.lapse_ease_penalty < 0.0 {
            return invalid("lapse_ease_penalty must be non-negative");
        }
        if !(self.hard_ease_delta <= self.pass_ease_delta
            && self.pass_ease_delta <= self.easy_ease_delta)
        {
            return invalid("ease deltas must not decrease from hard to easy");
        }
        if !(self.easy_bonus.is_finite() && self.easy_bonus >= 1.0) {
            return invalid("easy_bonus must be at least 1.0");
        }
        let intervals = [
            self.lapse_interval_days,
            self.first_interval_days,
            self.second_interval_days,
            self.easy_first_interval_days,
        ];
        if intervals.iter().any(|&days| days < 1) {
            return invalid("fixed intervals must be at least one day");
        }
        if intervals.iter().any(|&days| days > self.max_interval_days) {
            return invalid("fixed intervals must not exceed max_interval_days");
        }
        if self.max_interval_days > MAX_INTERVAL_LIMIT_DAYS {
            return invalid("max_interval_days must not exceed 36500");
        }
        Ok(())
    }
}

/// Bounds and mixing policy of one study session.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub max_total: usize,
    pub max_new: usize,
    pub reserved_new_slots: usize,
    pub mix: MixPolicy,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_total: 20,
            max_new: 20,
            reserved_new_slots: 5,
            mix: MixPolicy::default(),
        }
    }
}

impl SessionConfig {
    pub fn validate(&self) -> Result<()> {
        if let MixPolicy::Interleave { due_per_new: 0 } = self.mix {
            return Err(SchedulerError::InvalidConfig(
                "interleave policy needs at least one due card per new card".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_default_config_is_valid() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_load_partial_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(
            &path,
            r#"{
  "scheduler": { "max_interval_days": 180 },
  "session": { "max_total": 30, "mix": "due_first" }
}"#,
        )
        .unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.scheduler.max_interval_days, 180);
        assert_eq!(config.scheduler.ease_floor, 1.3);
        assert_eq!(config.session.max_total, 30);
        assert_eq!(config.session.max_new, 20);
        assert_eq!(config.session.mix, MixPolicy::DueFirst);
        assert_eq!(config.variation_window, DEFAULT_VARIATION_WINDOW);
        assert_eq!(config.ratings, RatingScale::four_level());
    }

    #[test]
    fn test_load_rejects_invalid_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{ "scheduler": { "ease_floor": 3.5 } }"#).unwrap();

        let result = Config::load(&path);
        assert!(matches!(result, Err(SchedulerError::InvalidConfig(_))));
    }

    #[test]
    fn test_load_nonexistent_file() {
        let result = Config::load("nonexistent_config_xyz123.json");
        assert!(matches!(result, Err(SchedulerError::Io(_))));
    }

    #[test]
    fn test_load_invalid_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{ this is not valid json }").unwrap();

        assert!(matches!(Config::load(&path), Err(SchedulerError::Json(_))));
    }

    #[test]
    fn test_non_monotonic_ease_deltas_are_invalid() {
        let config = SchedulerConfig {
            hard_ease_delta: 0.2,
            ..SchedulerConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_interval_is_invalid() {
        let config = SchedulerConfig {
            first_interval_days: 0,
            ..SchedulerConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_max_interval_is_bounded() {
        let at_limit = SchedulerConfig {
            max_interval_days: MAX_INTERVAL_LIMIT_DAYS,
            ..SchedulerConfig::default()
        };
        assert!(at_limit.validate().is_ok());

        let beyond = SchedulerConfig {
            max_interval_days: i32::MAX,
            ..SchedulerConfig::default()
        };
        assert!(matches!(beyond.validate(), Err(SchedulerError::InvalidConfig(_))));
    }

    #[test]
    fn test_interleave_needs_due_cards() {
        let config = SessionConfig {
            mix: MixPolicy::Interleave { due_per_new: 0 },
            ..SessionConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
