//! A flashcard is a pair <front, back> owned by exactly one deck, together
//! with its scheduling state.
use super::{CardId, DeckId, SchedulingState};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Card {
    pub id: CardId,
    pub deck_id: DeckId,
    pub front: String,
    pub back: String,
    pub created_at: DateTime<Utc>,
    pub state: SchedulingState,
}

impl Card {
    pub fn is_new(&self) -> bool {
        self.state.is_new()
    }

    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.state.is_due(now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SchedulerConfig;
    use chrono::TimeZone;

    #[test]
    fn test_card_creation() {
        let now = Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap();
        let card = Card {
            id: 1,
            deck_id: 1,
            front: "καλημέρα".to_string(),
            back: "good morning".to_string(),
            created_at: now,
            state: SchedulingState::new_card(now, &SchedulerConfig::default()),
        };

        assert_eq!(card.front, "καλημέρα");
        assert_eq!(card.back, "good morning");
        assert!(card.is_new());
        assert!(!card.is_due(now));
    }
}
