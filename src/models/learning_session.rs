//! Learning session management for spaced repetition practice.
//! Presents a built session card by card, commits every answer through the
//! store, and repeats lapsed cards in follow-up rounds.

use super::{CardId, DeckId, LearningCard, Sm2Scheduler};
use crate::config::SessionConfig;
use crate::database::db;
use crate::error::Result;
use crate::session::build_session;
use chrono::{DateTime, Utc};
use rusqlite::Connection;

/// Manages a learning session with multiple review rounds.
/// Cards that lapse are repeated in subsequent rounds.
pub struct LearningSession {
    pub cards: Vec<LearningCard>,
    pub current_round_cards: Vec<usize>,
    pub current_index: usize,
    pub show_back: bool,
    pub round_number: usize,
}

impl LearningSession {
    /// Builds the session for `deck_ids` and loads its cards.
    pub fn start(
        deck_ids: &[DeckId],
        now: DateTime<Utc>,
        limits: &SessionConfig,
        conn: &Connection,
    ) -> Result<Self> {
        let ids = build_session(conn, deck_ids, now, limits)?;
        Self::from_card_ids(&ids, conn)
    }

    /// Loads the given cards, keeping their order.
    pub fn from_card_ids(card_ids: &[CardId], conn: &Connection) -> Result<Self> {
        let cards: Vec<LearningCard> = db::get_cards(card_ids, conn)?
            .into_iter()
            .map(LearningCard::new)
            .collect();
        let indices: Vec<usize> = (0..cards.len()).collect();

        Ok(Self {
            cards,
            current_round_cards: indices,
            current_index: 0,
            show_back: false,
            round_number: 1,
        })
    }

    pub fn current_card(&self) -> Option<&LearningCard> {
        self.current_round_cards
            .get(self.current_index)
            .and_then(|&idx| self.cards.get(idx))
    }

    pub fn toggle_back(&mut self) {
        self.show_back = !self.show_back;
    }

    pub fn next_card(&mut self) {
        if self.current_index + 1 < self.current_round_cards.len() {
            self.current_index += 1;
            self.show_back = false;
        } else {
            // End of round - check if there are cards to repeat
            self.start_next_round();
        }
    }

    /// Starts a new round with the cards that were not passed.
    /// If no cards remain, the session is complete.
    fn start_next_round(&mut self) {
        let failed_indices: Vec<usize> = self
            .current_round_cards
            .iter()
            .copied()
            .filter(|&idx| self.cards.get(idx).is_some_and(|card| !card.is_learned))
            .collect();

        if !failed_indices.is_empty() {
            self.current_round_cards = failed_indices;
            self.current_index = 0;
            self.show_back = false;
            self.round_number += 1;
            log::debug!(
                "round {} repeats {} card(s)",
                self.round_number,
                self.current_round_cards.len()
            );
        }
    }

    /// Grades the current card and commits the review.
    ///
    /// The stored state is re-read inside the commit, so an answer given to
    /// the same card elsewhere is never overwritten.
    pub fn grade_current_card(
        &mut self,
        quality: u8,
        now: DateTime<Utc>,
        time_spent_secs: Option<u32>,
        scheduler: &Sm2Scheduler,
        conn: &mut Connection,
    ) -> Result<()> {
        let Some(&idx) = self.current_round_cards.get(self.current_index) else {
            return Ok(());
        };
        let Some(learning_card) = self.cards.get_mut(idx) else {
            return Ok(());
        };

        let passed = scheduler.ratings().grade(quality)?.is_pass();
        let updated = db::record_review(
            learning_card.card.id,
            quality,
            now,
            time_spent_secs,
            scheduler,
            conn,
        )?;
        learning_card.record_answer(updated, passed, now);
        Ok(())
    }

    pub fn learned_count(&self) -> usize {
        self.current_round_cards
            .iter()
            .filter(|&&idx| self.cards.get(idx).is_some_and(|card| card.is_learned))
            .count()
    }

    pub fn total_count(&self) -> usize {
        self.current_round_cards.len()
    }

    pub fn remaining_count(&self) -> usize {
        self.total_count() - self.learned_count()
    }

    /// Returns true when the session is empty or every card of the current
    /// round has been passed.
    pub fn is_completed(&self) -> bool {
        self.learned_count() == self.total_count()
    }

    pub fn phase_message(&self) -> String {
        if self.round_number == 1 {
            format!("Round {}: {} cards", self.round_number, self.total_count())
        } else {
            format!(
                "Round {} (Review): {} cards to retry",
                self.round_number,
                self.total_count()
            )
        }
    }
}
