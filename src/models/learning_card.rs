//! Wrapper for cards that tracks progress within one learning session.
use super::Card;
use chrono::{DateTime, Utc};

#[derive(Clone, Debug)]
pub struct LearningCard {
    pub card: Card,
    pub is_learned: bool,
    pub attempts: u32,
    pub last_answered_at: Option<DateTime<Utc>>,
}

impl LearningCard {
    pub fn new(card: Card) -> Self {
        Self {
            card,
            is_learned: false,
            attempts: 0,
            last_answered_at: None,
        }
    }

    /// Stores the card as returned by the review commit.
    pub fn record_answer(&mut self, updated: Card, passed: bool, at: DateTime<Utc>) {
        self.card = updated;
        self.is_learned = passed;
        self.attempts += 1;
        self.last_answered_at = Some(at);
    }
}
