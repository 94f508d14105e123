//! Quality ratings a learner can give when answering a card.
//!
//! The raw values shown to learners are mapped onto a closed set of grades
//! by a [`RatingScale`]. The scheduler only ever reasons about grades, so the
//! number of buttons (three or four) is a configuration choice.

use serde::{Deserialize, Serialize};

use crate::error::{Result, SchedulerError};

/// Outcome class of one answer, ordered from worst to best.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Grade {
    Lapse,
    HardPass,
    Pass,
    EasyPass,
}

impl Grade {
    pub fn is_pass(self) -> bool {
        self != Grade::Lapse
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RatingLevel {
    pub value: u8,
    pub grade: Grade,
    pub label: String,
}

impl RatingLevel {
    fn new(value: u8, grade: Grade, label: &str) -> Self {
        Self {
            value,
            grade,
            label: label.to_string(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RatingScale {
    levels: Vec<RatingLevel>,
}

impl Default for RatingScale {
    fn default() -> Self {
        Self::four_level()
    }
}

impl RatingScale {
    /// Again (0), Hard (2), Good (3), Easy (5).
    pub fn four_level() -> Self {
        Self {
            levels: vec![
                RatingLevel::new(0, Grade::Lapse, "Again"),
                RatingLevel::new(2, Grade::HardPass, "Hard"),
                RatingLevel::new(3, Grade::Pass, "Good"),
                RatingLevel::new(5, Grade::EasyPass, "Easy"),
            ],
        }
    }

    /// Again (0), Good (3), Easy (5).
    pub fn three_level() -> Self {
        Self {
            levels: vec![
                RatingLevel::new(0, Grade::Lapse, "Again"),
                RatingLevel::new(3, Grade::Pass, "Good"),
                RatingLevel::new(5, Grade::EasyPass, "Easy"),
            ],
        }
    }

    /// Builds a custom scale, rejecting sets the scheduler cannot use.
    pub fn new(levels: Vec<RatingLevel>) -> Result<Self> {
        let scale = Self { levels };
        scale.validate()?;
        Ok(scale)
    }

    /// A usable scale has exactly one lapse value, at least one passing
    /// value, unique raw values, and grades that never decrease as the raw
    /// value grows.
    pub fn validate(&self) -> Result<()> {
        let lapses = self
            .levels
            .iter()
            .filter(|level| level.grade == Grade::Lapse)
            .count();
        if lapses != 1 {
            return Err(SchedulerError::InvalidConfig(format!(
                "rating scale needs exactly one lapse level, found {lapses}"
            )));
        }
        if !self.levels.iter().any(|level| level.grade.is_pass()) {
            return Err(SchedulerError::InvalidConfig(
                "rating scale has no passing level".to_string(),
            ));
        }

        let mut sorted: Vec<&RatingLevel> = self.levels.iter().collect();
        sorted.sort_by_key(|level| level.value);
        for pair in sorted.windows(2) {
            if pair[0].value == pair[1].value {
                return Err(SchedulerError::InvalidConfig(format!(
                    "rating value {} appears twice",
                    pair[0].value
                )));
            }
            if pair[0].grade > pair[1].grade {
                return Err(SchedulerError::InvalidConfig(format!(
                    "rating {} grades higher than rating {}",
                    pair[0].value, pair[1].value
                )));
            }
        }
        Ok(())
    }

    /// Maps a raw rating onto its grade.
    pub fn grade(&self, value: u8) -> Result<Grade> {
        self.levels
            .iter()
            .find(|level| level.value == value)
            .map(|level| level.grade)
            .ok_or(SchedulerError::InvalidRating(value))
    }

    pub fn label(&self, value: u8) -> Option<&str> {
        self.levels
            .iter()
            .find(|level| level.value == value)
            .map(|level| level.label.as_str())
    }

    pub fn levels(&self) -> &[RatingLevel] {
        &self.levels
    }

    pub fn lapse_value(&self) -> Option<u8> {
        self.levels
            .iter()
            .find(|level| level.grade == Grade::Lapse)
            .map(|level| level.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_four_level_grades() {
        let scale = RatingScale::four_level();
        assert_eq!(scale.grade(0).unwrap(), Grade::Lapse);
        assert_eq!(scale.grade(2).unwrap(), Grade::HardPass);
        assert_eq!(scale.grade(3).unwrap(), Grade::Pass);
        assert_eq!(scale.grade(5).unwrap(), Grade::EasyPass);
        assert_eq!(scale.label(3), Some("Good"));
        assert_eq!(scale.lapse_value(), Some(0));
    }

    #[test]
    fn test_unknown_rating_is_rejected() {
        let scale = RatingScale::four_level();
        assert!(matches!(scale.grade(1), Err(SchedulerError::InvalidRating(1))));
        assert!(matches!(scale.grade(4), Err(SchedulerError::InvalidRating(4))));

        let three = RatingScale::three_level();
        assert!(matches!(three.grade(2), Err(SchedulerError::InvalidRating(2))));
    }

    #[test]
    fn test_presets_are_valid() {
        assert!(RatingScale::four_level().validate().is_ok());
        assert!(RatingScale::three_level().validate().is_ok());
    }

    #[test]
    fn test_scale_without_lapse_is_invalid() {
        let result = RatingScale::new(vec![
            RatingLevel::new(1, Grade::Pass, "Good"),
            RatingLevel::new(2, Grade::EasyPass, "Easy"),
        ]);
        assert!(matches!(result, Err(SchedulerError::InvalidConfig(_))));
    }

    #[test]
    fn test_scale_with_inverted_grades_is_invalid() {
        let result = RatingScale::new(vec![
            RatingLevel::new(0, Grade::Lapse, "Again"),
            RatingLevel::new(1, Grade::EasyPass, "Easy"),
            RatingLevel::new(2, Grade::HardPass, "Hard"),
        ]);
        assert!(matches!(result, Err(SchedulerError::InvalidConfig(_))));
    }

    #[test]
    fn test_scale_with_duplicate_values_is_invalid() {
        let result = RatingScale::new(vec![
            RatingLevel::new(0, Grade::Lapse, "Again"),
            RatingLevel::new(3, Grade::Pass, "Good"),
            RatingLevel::new(3, Grade::EasyPass, "Easy"),
        ]);
        assert!(matches!(result, Err(SchedulerError::InvalidConfig(_))));
    }
}
