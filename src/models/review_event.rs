//! Review history: what was answered, when, and the state it was answered in.
use super::CardId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// What the interval algorithm emits for one answer.
///
/// Ease and interval are the values *before* the update.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReviewRecord {
    pub quality: u8,
    pub reviewed_at: DateTime<Utc>,
    pub ease_before: f64,
    pub interval_before: i32,
}

/// A persisted entry of the append-only review log.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReviewEvent {
    pub id: i64,
    pub card_id: CardId,
    pub quality: u8,
    pub reviewed_at: DateTime<Utc>,
    pub ease_before: f64,
    pub interval_before: i32,
    pub time_spent_secs: Option<u32>,
}
