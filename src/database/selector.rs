//! Card selection queries: which cards are new and which are due.
//!
//! All queries take a set of deck ids so one deck and a pool of decks go
//! through the same code. An empty set selects nothing.

use chrono::{DateTime, Utc};
use rusqlite::{Connection, params_from_iter};

use super::db::{sql_limit, to_nanos};
use crate::error::Result;
use crate::models::{CardId, DeckId};

pub trait CardSelector {
    /// Reviewed cards with `due_at <= now`, most overdue first.
    fn due_cards(
        &self,
        deck_ids: &[DeckId],
        now: DateTime<Utc>,
        limit: Option<usize>,
    ) -> Result<Vec<CardId>>;

    /// Never reviewed cards, oldest first.
    fn new_cards(&self, deck_ids: &[DeckId], limit: Option<usize>) -> Result<Vec<CardId>>;

    fn count_due(&self, deck_ids: &[DeckId], now: DateTime<Utc>) -> Result<usize>;

    fn count_new(&self, deck_ids: &[DeckId]) -> Result<usize>;
}

pub(super) fn placeholders(count: usize) -> String {
    vec!["?"; count].join(", ")
}

impl CardSelector for Connection {
    fn due_cards(
        &self,
        deck_ids: &[DeckId],
        now: DateTime<Utc>,
        limit: Option<usize>,
    ) -> Result<Vec<CardId>> {
        if deck_ids.is_empty() {
            return Ok(Vec::new());
        }

        let sql = format!(
            "SELECT id FROM cards
             WHERE deck_id IN ({}) AND total_reviews > 0 AND due_at <= ?
             ORDER BY due_at ASC, id ASC
             LIMIT ?",
            placeholders(deck_ids.len())
        );
        let mut values = deck_ids.to_vec();
        values.push(to_nanos(now)?);
        values.push(sql_limit(limit));

        let mut stmt = self.prepare(&sql)?;
        let ids = stmt
            .query_map(params_from_iter(values), |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<CardId>>>()?;
        Ok(ids)
    }

    fn new_cards(&self, deck_ids: &[DeckId], limit: Option<usize>) -> Result<Vec<CardId>> {
        if deck_ids.is_empty() {
            return Ok(Vec::new());
        }

        let sql = format!(
            "SELECT id FROM cards
             WHERE deck_id IN ({}) AND total_reviews = 0
             ORDER BY created_at ASC, id ASC
             LIMIT ?",
            placeholders(deck_ids.len())
        );
        let mut values = deck_ids.to_vec();
        values.push(sql_limit(limit));

        let mut stmt = self.prepare(&sql)?;
        let ids = stmt
            .query_map(params_from_iter(values), |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<CardId>>>()?;
        Ok(ids)
    }

    fn count_due(&self, deck_ids: &[DeckId], now: DateTime<Utc>) -> Result<usize> {
        if deck_ids.is_empty() {
            return Ok(0);
        }

        let sql = format!(
            "SELECT COUNT(*) FROM cards
             WHERE deck_id IN ({}) AND total_reviews > 0 AND due_at <= ?",
            placeholders(deck_ids.len())
        );
        let mut values = deck_ids.to_vec();
        values.push(to_nanos(now)?);

        let count: i64 = self.query_row(&sql, params_from_iter(values), |row| row.get(0))?;
        Ok(count as usize)
    }

    fn count_new(&self, deck_ids: &[DeckId]) -> Result<usize> {
        if deck_ids.is_empty() {
            return Ok(0);
        }

        let sql = format!(
            "SELECT COUNT(*) FROM cards WHERE deck_id IN ({}) AND total_reviews = 0",
            placeholders(deck_ids.len())
        );
        let count: i64 = self.query_row(&sql, params_from_iter(deck_ids), |row| row.get(0))?;
        Ok(count as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::db;
    use crate::models::Sm2Scheduler;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap()
    }

    /// Adds a card created at `created` and reviews it once at `reviewed`
    /// (due one day later with a "Good" answer).
    fn reviewed_card(
        conn: &mut Connection,
        deck_id: DeckId,
        front: &str,
        created: DateTime<Utc>,
        reviewed: DateTime<Utc>,
    ) -> CardId {
        let scheduler = Sm2Scheduler::default();
        let id = db::add_card(deck_id, front, "-", created, scheduler.config(), conn).unwrap();
        db::record_review(id, 3, reviewed, None, &scheduler, conn).unwrap();
        id
    }

    fn new_card(conn: &Connection, deck_id: DeckId, front: &str, created: DateTime<Utc>) -> CardId {
        db::add_card(deck_id, front, "-", created, &Default::default(), conn).unwrap()
    }

    #[test]
    fn test_empty_deck_set_selects_nothing() {
        let mut conn = db::open_in_memory().unwrap();
        let deck = db::new_deck("A", now(), &conn).unwrap();
        new_card(&conn, deck, "n", now());
        reviewed_card(&mut conn, deck, "r", now(), now() - Duration::days(5));

        assert!(conn.due_cards(&[], now(), None).unwrap().is_empty());
        assert!(conn.new_cards(&[], None).unwrap().is_empty());
        assert_eq!(conn.count_due(&[], now()).unwrap(), 0);
        assert_eq!(conn.count_new(&[]).unwrap(), 0);
    }

    #[test]
    fn test_due_cards_most_overdue_first() {
        let mut conn = db::open_in_memory().unwrap();
        let deck = db::new_deck("A", now(), &conn).unwrap();
        let recent = reviewed_card(&mut conn, deck, "recent", now(), now() - Duration::days(2));
        let oldest = reviewed_card(&mut conn, deck, "oldest", now(), now() - Duration::days(9));
        let future = reviewed_card(&mut conn, deck, "future", now(), now());
        new_card(&conn, deck, "new", now() - Duration::days(30));

        let due = conn.due_cards(&[deck], now(), None).unwrap();
        assert_eq!(due, vec![oldest, recent]);
        assert!(!due.contains(&future));
        assert_eq!(conn.count_due(&[deck], now()).unwrap(), 2);
        assert_eq!(conn.due_cards(&[deck], now(), Some(1)).unwrap(), vec![oldest]);
    }

    #[test]
    fn test_new_card_is_never_due() {
        let conn = db::open_in_memory().unwrap();
        let deck = db::new_deck("A", now(), &conn).unwrap();
        new_card(&conn, deck, "new", now() - Duration::days(30));

        assert!(conn.due_cards(&[deck], now(), None).unwrap().is_empty());
        assert_eq!(conn.count_new(&[deck]).unwrap(), 1);
    }

    #[test]
    fn test_new_cards_in_creation_order() {
        let conn = db::open_in_memory().unwrap();
        let deck = db::new_deck("A", now(), &conn).unwrap();
        let second = new_card(&conn, deck, "second", now() - Duration::days(1));
        let first = new_card(&conn, deck, "first", now() - Duration::days(2));
        let third = new_card(&conn, deck, "third", now());

        assert_eq!(conn.new_cards(&[deck], None).unwrap(), vec![first, second, third]);
        assert_eq!(conn.new_cards(&[deck], Some(2)).unwrap(), vec![first, second]);
        assert!(conn.new_cards(&[deck], Some(0)).unwrap().is_empty());
    }

    #[test]
    fn test_due_ordering_is_global_across_decks() {
        let mut conn = db::open_in_memory().unwrap();
        let a = db::new_deck("A", now(), &conn).unwrap();
        let b = db::new_deck("B", now(), &conn).unwrap();
        let a1 = reviewed_card(&mut conn, a, "a1", now(), now() - Duration::days(3));
        let b1 = reviewed_card(&mut conn, b, "b1", now(), now() - Duration::days(8));
        let a2 = reviewed_card(&mut conn, a, "a2", now(), now() - Duration::days(6));
        let b2 = reviewed_card(&mut conn, b, "b2", now(), now() - Duration::days(2));

        assert_eq!(conn.due_cards(&[a, b], now(), None).unwrap(), vec![b1, a2, a1, b2]);
        assert_eq!(conn.due_cards(&[a], now(), None).unwrap(), vec![a2, a1]);
        assert_eq!(conn.count_due(&[a, b], now()).unwrap(), 4);
    }

    #[test]
    fn test_empty_and_unknown_decks_contribute_nothing() {
        let conn = db::open_in_memory().unwrap();
        let a = db::new_deck("A", now(), &conn).unwrap();
        let empty = db::new_deck("Empty", now(), &conn).unwrap();
        let card = new_card(&conn, a, "x", now());

        assert_eq!(conn.new_cards(&[a, empty, 404], None).unwrap(), vec![card]);
        assert_eq!(conn.count_new(&[empty]).unwrap(), 0);
    }
}
