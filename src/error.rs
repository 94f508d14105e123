//! Error type shared by the scheduling core and its SQLite store.

use thiserror::Error;

use crate::models::{CardId, DeckId};

#[derive(Error, Debug)]
pub enum SchedulerError {
    #[error("invalid quality rating: {0}")]
    InvalidRating(u8),

    #[error("scheduling state of card {card_id:?} violates an invariant: {reason}")]
    InvariantViolation {
        card_id: Option<CardId>,
        reason: String,
    },

    #[error("card {0} was updated concurrently, re-read it and review again")]
    Conflict(CardId),

    #[error("card not found: {0}")]
    CardNotFound(CardId),

    #[error("deck not found: {0}")]
    DeckNotFound(String),

    #[error("deck id not found: {0}")]
    DeckIdNotFound(DeckId),

    #[error("deck already exists: {0}")]
    DuplicateDeck(String),

    #[error("no candidates to pick from")]
    NoCandidates,

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("timestamp out of storable range")]
    TimestampOutOfRange,

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl SchedulerError {
    pub(crate) fn invariant(card_id: Option<CardId>, reason: impl Into<String>) -> Self {
        Self::InvariantViolation {
            card_id,
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, SchedulerError>;
