//! Deck is a named group of cards belonging to one learner
use super::DeckId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Deck {
    pub id: DeckId,
    pub name: String,
    /// Inactive decks are left out of pooled sessions but can still be
    /// studied on their own.
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}
