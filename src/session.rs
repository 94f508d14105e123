//! Session assembly: which cards a learner sees in one sitting, and in what
//! order.
//!
//! Due cards are always ranked by staleness (most overdue first) across all
//! requested decks; new cards by creation order. The session never holds
//! more than `max_total` cards, and never more than `max_new` new ones.

use chrono::{DateTime, Utc};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use crate::config::SessionConfig;
use crate::database::CardSelector;
use crate::error::Result;
use crate::models::{CardId, DeckId, DeckSet};

/// How the selected due and new cards are ordered within the session.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MixPolicy {
    /// All due cards, then all new cards.
    DueFirst,
    /// `due_per_new` due cards, then one new card, repeated. Leftovers of
    /// either pool go at the end in their own order.
    Interleave { due_per_new: usize },
}

impl Default for MixPolicy {
    fn default() -> Self {
        MixPolicy::Interleave { due_per_new: 3 }
    }
}

/// Builds the ordered list of cards for one session over `deck_ids`.
///
/// Due cards fill the session first, except for `reserved_new_slots` slots
/// kept for new cards (only as many as there are new cards to fill them).
/// Any room the due pool leaves is then given to new cards up to `max_new`.
/// An empty result means there is nothing to study right now.
///
/// Selection only reads, so calling this twice without a review in between
/// returns the same list.
pub fn build_session<S: CardSelector + ?Sized>(
    selector: &S,
    deck_ids: &[DeckId],
    now: DateTime<Utc>,
    limits: &SessionConfig,
) -> Result<Vec<CardId>> {
    if deck_ids.is_empty() || limits.max_total == 0 {
        return Ok(Vec::new());
    }

    // Fetching past max_total could never change which due cards are kept.
    let mut due = selector.due_cards(deck_ids, now, Some(limits.max_total))?;
    let new_limit = limits.max_new.min(limits.max_total);
    let mut new = selector.new_cards(deck_ids, Some(new_limit))?;

    let reserved = limits.reserved_new_slots.min(new.len());
    let due_taken = due.len().min(limits.max_total - reserved);
    let new_taken = new.len().min(limits.max_total - due_taken);
    due.truncate(due_taken);
    new.truncate(new_taken);

    log::debug!(
        "session over {} deck(s): {} due, {} new",
        deck_ids.len(),
        due.len(),
        new.len()
    );
    Ok(mix(due, new, limits.mix))
}

/// Builds a session pooled over active decks.
///
/// With `requested` set, only those of the requested decks that are active
/// take part; otherwise every active deck does. Unknown ids are ignored.
pub fn build_pooled_session(
    decks: &DeckSet,
    requested: Option<&[DeckId]>,
    now: DateTime<Utc>,
    limits: &SessionConfig,
    conn: &Connection,
) -> Result<Vec<CardId>> {
    let deck_ids = match requested {
        Some(ids) => decks.filter_active(ids),
        None => decks.active_ids(),
    };
    build_session(conn, &deck_ids, now, limits)
}

/// Orders already selected due and new cards according to `policy`.
pub fn mix(due: Vec<CardId>, new: Vec<CardId>, policy: MixPolicy) -> Vec<CardId> {
    match policy {
        MixPolicy::DueFirst => due.into_iter().chain(new).collect(),
        MixPolicy::Interleave { due_per_new } => {
            let mut result = Vec::with_capacity(due.len() + new.len());
            let mut due = due.into_iter().peekable();
            let mut new = new.into_iter().peekable();

            while due.peek().is_some() || new.peek().is_some() {
                result.extend(due.by_ref().take(due_per_new.max(1)));
                result.extend(new.next());
            }
            result
        }
    }
}
