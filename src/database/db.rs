//! Database operations for the review scheduler
//!
//! Handles SQLite schema setup, deck and card storage, the simulated clock,
//! atomic review commits and the append-only review log.

use crate::config::SchedulerConfig;
use crate::error::{Result, SchedulerError};
use crate::models::{
    Card, CardId, Deck, DeckId, DeckSet, ReviewEvent, ReviewRecord, SchedulingState,
    Sm2Scheduler,
};
use chrono::{DateTime, Duration, Utc};
use rusqlite::{Connection, OptionalExtension, Row, TransactionBehavior, params};
use std::path::Path;

const CARD_COLUMNS: &str = "id, deck_id, front, back, created_at, ease, interval_days, \
     repetitions, due_at, total_reviews, successful_reviews";

const REVIEW_COLUMNS: &str =
    "id, card_id, quality, reviewed_at, ease_before, interval_before, time_spent_secs";

/// Opens (or creates) a database file and makes sure the schema exists.
pub fn open_database(path: impl AsRef<Path>) -> Result<Connection> {
    let conn = Connection::open(path)?;
    init_schema(&conn)?;
    Ok(conn)
}

pub fn open_in_memory() -> Result<Connection> {
    let conn = Connection::open_in_memory()?;
    init_schema(&conn)?;
    Ok(conn)
}

/// Creates tables for decks, cards, review events and app state.
pub fn init_schema(conn: &Connection) -> Result<()> {
    // Needed for deck deletion to cascade to cards and their reviews
    conn.execute_batch("PRAGMA foreign_keys = ON")?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS decks (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE,
            is_active INTEGER NOT NULL DEFAULT 1,
            created_at INTEGER NOT NULL
        )",
        (),
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS cards (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            deck_id INTEGER NOT NULL,
            front TEXT NOT NULL,
            back TEXT NOT NULL,
            created_at INTEGER NOT NULL,
            ease REAL NOT NULL,
            interval_days INTEGER NOT NULL DEFAULT 0,
            repetitions INTEGER NOT NULL DEFAULT 0,
            due_at INTEGER NOT NULL,
            total_reviews INTEGER NOT NULL DEFAULT 0,
            successful_reviews INTEGER NOT NULL DEFAULT 0,
            FOREIGN KEY (deck_id) REFERENCES decks(id) ON DELETE CASCADE,
            UNIQUE(deck_id, front)
        )",
        (),
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS ix_cards_deck_due ON cards(deck_id, due_at)",
        (),
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS ix_cards_deck_reviews ON cards(deck_id, total_reviews)",
        (),
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS review_events (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            card_id INTEGER NOT NULL,
            quality INTEGER NOT NULL,
            reviewed_at INTEGER NOT NULL,
            ease_before REAL NOT NULL,
            interval_before INTEGER NOT NULL,
            time_spent_secs INTEGER,
            FOREIGN KEY (card_id) REFERENCES cards(id) ON DELETE CASCADE
        )",
        (),
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS ix_reviews_card ON review_events(card_id, reviewed_at)",
        (),
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS app_state (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        )",
        (),
    )?;

    Ok(())
}

pub(crate) fn to_nanos(at: DateTime<Utc>) -> Result<i64> {
    at.timestamp_nanos_opt()
        .ok_or(SchedulerError::TimestampOutOfRange)
}

pub(crate) fn from_nanos(nanos: i64) -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp_nanos(nanos)
}

/// Sets the simulated current time to `start` unless it is already set,
/// then returns the stored time
pub fn init_clock(start: DateTime<Utc>, conn: &Connection) -> Result<DateTime<Utc>> {
    conn.execute(
        "INSERT OR IGNORE INTO app_state (key, value) VALUES ('current_time', ?1)",
        params![to_nanos(start)?.to_string()],
    )?;
    current_time(conn)
}

/// Retrieves the simulated current time from the database
pub fn current_time(conn: &Connection) -> Result<DateTime<Utc>> {
    let value: String = conn
        .query_row(
            "SELECT value FROM app_state WHERE key = 'current_time'",
            [],
            |row| row.get(0),
        )
        .optional()?
        .ok_or_else(|| SchedulerError::invariant(None, "simulated clock was never initialised"))?;

    let nanos = value.parse::<i64>().map_err(|_| {
        SchedulerError::invariant(None, format!("stored current time {value:?} is not a number"))
    })?;
    Ok(from_nanos(nanos))
}

pub fn set_current_time(at: DateTime<Utc>, conn: &Connection) -> Result<()> {
    conn.execute(
        "INSERT INTO app_state (key, value) VALUES ('current_time', ?1)
         ON CONFLICT(key) DO UPDATE SET value = excluded.value",
        params![to_nanos(at)?.to_string()],
    )?;
    Ok(())
}

/// Advances the simulated current time by 24 hours (for trying out schedules)
pub fn advance_day(conn: &Connection) -> Result<DateTime<Utc>> {
    let next_day = current_time(conn)?
        .checked_add_signed(Duration::days(1))
        .ok_or(SchedulerError::TimestampOutOfRange)?;
    set_current_time(next_day, conn)?;
    Ok(next_day)
}

/// Creates a new, active deck
pub fn new_deck(name: &str, now: DateTime<Utc>, conn: &Connection) -> Result<DeckId> {
    let exists: Option<DeckId> = conn
        .query_row("SELECT id FROM decks WHERE name = ?1", params![name], |row| {
            row.get(0)
        })
        .optional()?;
    if exists.is_some() {
        return Err(SchedulerError::DuplicateDeck(name.to_string()));
    }

    conn.execute(
        "INSERT INTO decks (name, is_active, created_at) VALUES (?1, 1, ?2)",
        params![name, to_nanos(now)?],
    )?;
    let id = conn.last_insert_rowid();
    log::info!("deck '{name}' created with id {id}");
    Ok(id)
}

/// Includes or excludes a deck from pooled sessions
pub fn set_deck_active(name: &str, is_active: bool, conn: &Connection) -> Result<()> {
    let updated = conn.execute(
        "UPDATE decks SET is_active = ?1 WHERE name = ?2",
        params![is_active, name],
    )?;
    if updated == 0 {
        return Err(SchedulerError::DeckNotFound(name.to_string()));
    }
    log::info!("deck '{name}' active: {is_active}");
    Ok(())
}

/// Deletes a deck together with its cards and their review history
pub fn delete_deck(name: &str, conn: &Connection) -> Result<()> {
    let deleted = conn.execute("DELETE FROM decks WHERE name = ?1", params![name])?;
    if deleted == 0 {
        return Err(SchedulerError::DeckNotFound(name.to_string()));
    }
    log::info!("deck '{name}' deleted");
    Ok(())
}

fn deck_from_row(row: &Row) -> rusqlite::Result<Deck> {
    Ok(Deck {
        id: row.get(0)?,
        name: row.get(1)?,
        is_active: row.get(2)?,
        created_at: from_nanos(row.get(3)?),
    })
}

pub fn get_deck_by_name(name: &str, conn: &Connection) -> Result<Deck> {
    conn.query_row(
        "SELECT id, name, is_active, created_at FROM decks WHERE name = ?1",
        params![name],
        deck_from_row,
    )
    .optional()?
    .ok_or_else(|| SchedulerError::DeckNotFound(name.to_string()))
}

/// Loads all decks, active ones first, then by name
pub fn load_all_decks(conn: &Connection) -> Result<DeckSet> {
    let mut stmt = conn.prepare(
        "SELECT id, name, is_active, created_at FROM decks ORDER BY is_active DESC, name ASC",
    )?;
    let decks = stmt
        .query_map([], deck_from_row)?
        .collect::<rusqlite::Result<Vec<Deck>>>()?;
    Ok(DeckSet { decks })
}

/// Adds a card to a deck and initializes its scheduling state
///
/// Returns the card ID. If the card already exists (same deck + front),
/// the existing card is left untouched and its ID is returned.
pub fn add_card(
    deck_id: DeckId,
    front: &str,
    back: &str,
    now: DateTime<Utc>,
    config: &SchedulerConfig,
    conn: &Connection,
) -> Result<CardId> {
    let deck_exists: Option<DeckId> = conn
        .query_row("SELECT id FROM decks WHERE id = ?1", params![deck_id], |row| {
            row.get(0)
        })
        .optional()?;
    if deck_exists.is_none() {
        return Err(SchedulerError::DeckIdNotFound(deck_id));
    }

    let state = SchedulingState::new_card(now, config);
    let now_nanos = to_nanos(now)?;
    conn.execute(
        "INSERT OR IGNORE INTO cards
            (deck_id, front, back, created_at, ease, interval_days, repetitions, due_at,
             total_reviews, successful_reviews)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, 0, 0)",
        params![
            deck_id,
            front,
            back,
            now_nanos,
            state.ease,
            state.interval_days,
            state.repetitions,
            to_nanos(state.due_at)?,
        ],
    )?;

    let card_id: CardId = conn.query_row(
        "SELECT id FROM cards WHERE deck_id = ?1 AND front = ?2",
        params![deck_id, front],
        |row| row.get(0),
    )?;
    Ok(card_id)
}

/// Raw card row; integer columns are range-checked when converted.
struct CardRow {
    id: CardId,
    deck_id: DeckId,
    front: String,
    back: String,
    created_at: i64,
    ease: f64,
    interval_days: i64,
    repetitions: i64,
    due_at: i64,
    total_reviews: i64,
    successful_reviews: i64,
}

impl CardRow {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            deck_id: row.get(1)?,
            front: row.get(2)?,
            back: row.get(3)?,
            created_at: row.get(4)?,
            ease: row.get(5)?,
            interval_days: row.get(6)?,
            repetitions: row.get(7)?,
            due_at: row.get(8)?,
            total_reviews: row.get(9)?,
            successful_reviews: row.get(10)?,
        })
    }

    fn into_card(self) -> Result<Card> {
        let id = self.id;
        let out_of_range = |field: &str, value: i64| {
            SchedulerError::invariant(Some(id), format!("{field} {value} is out of range"))
        };

        let state = SchedulingState {
            ease: self.ease,
            interval_days: i32::try_from(self.interval_days)
                .map_err(|_| out_of_range("interval", self.interval_days))?,
            repetitions: i32::try_from(self.repetitions)
                .map_err(|_| out_of_range("repetitions", self.repetitions))?,
            due_at: from_nanos(self.due_at),
            total_reviews: u32::try_from(self.total_reviews)
                .map_err(|_| out_of_range("total_reviews", self.total_reviews))?,
            successful_reviews: u32::try_from(self.successful_reviews)
                .map_err(|_| out_of_range("successful_reviews", self.successful_reviews))?,
        };
        Ok(Card {
            id,
            deck_id: self.deck_id,
            front: self.front,
            back: self.back,
            created_at: from_nanos(self.created_at),
            state,
        })
    }
}

/// Fetches one card with its scheduling state, exactly as stored
pub fn get_card(card_id: CardId, conn: &Connection) -> Result<Card> {
    let sql = format!("SELECT {CARD_COLUMNS} FROM cards WHERE id = ?1");
    conn.query_row(&sql, params![card_id], CardRow::from_row)
        .optional()?
        .ok_or(SchedulerError::CardNotFound(card_id))?
        .into_card()
}

/// Fetches cards by id, in the order the ids were given
pub fn get_cards(card_ids: &[CardId], conn: &Connection) -> Result<Vec<Card>> {
    card_ids.iter().map(|&id| get_card(id, conn)).collect()
}

/// Retrieves all cards of a deck, oldest first
pub fn get_cards_for_deck(deck_id: DeckId, conn: &Connection) -> Result<Vec<Card>> {
    let sql = format!(
        "SELECT {CARD_COLUMNS} FROM cards WHERE deck_id = ?1 ORDER BY created_at ASC, id ASC"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(params![deck_id], CardRow::from_row)?
        .collect::<rusqlite::Result<Vec<CardRow>>>()?;
    rows.into_iter().map(CardRow::into_card).collect()
}

/// Answers a card: reads its current state, runs the interval algorithm and
/// stores the new state plus a review event, all in one transaction.
///
/// Nothing is written if the rating is invalid or the stored state breaks an
/// invariant. Returns the card with its updated state.
pub fn record_review(
    card_id: CardId,
    quality: u8,
    now: DateTime<Utc>,
    time_spent_secs: Option<u32>,
    scheduler: &Sm2Scheduler,
    conn: &mut Connection,
) -> Result<Card> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

    let card = get_card(card_id, &tx)?;
    card.state.validate(Some(card_id), scheduler.config())?;
    let (next, record) = scheduler.advance(&card.state, quality, now)?;
    write_review(card_id, &card.state, &next, &record, time_spent_secs, &tx)?;
    tx.commit()?;

    log::debug!(
        "card {card_id} rated {quality}: interval {} -> {} days, ease {:.2} -> {:.2}",
        card.state.interval_days,
        next.interval_days,
        card.state.ease,
        next.ease
    );
    Ok(Card { state: next, ..card })
}

/// Stores a state computed by the caller from a previously read `before`.
///
/// If the stored state no longer equals `before`, nothing is written and
/// [`SchedulerError::Conflict`] is returned; the caller must re-read the card
/// and run the interval algorithm again.
pub fn commit_review(
    card_id: CardId,
    before: &SchedulingState,
    after: &SchedulingState,
    record: &ReviewRecord,
    time_spent_secs: Option<u32>,
    conn: &mut Connection,
) -> Result<()> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    write_review(card_id, before, after, record, time_spent_secs, &tx)?;
    tx.commit()?;
    Ok(())
}

fn write_review(
    card_id: CardId,
    before: &SchedulingState,
    after: &SchedulingState,
    record: &ReviewRecord,
    time_spent_secs: Option<u32>,
    conn: &Connection,
) -> Result<()> {
    // The row is only written while every scheduling column still holds `before`
    let updated = conn.execute(
        "UPDATE cards
         SET ease = ?1, interval_days = ?2, repetitions = ?3, due_at = ?4,
             total_reviews = ?5, successful_reviews = ?6
         WHERE id = ?7 AND ease = ?8 AND interval_days = ?9 AND repetitions = ?10
           AND due_at = ?11 AND total_reviews = ?12 AND successful_reviews = ?13",
        params![
            after.ease,
            after.interval_days,
            after.repetitions,
            to_nanos(after.due_at)?,
            after.total_reviews,
            after.successful_reviews,
            card_id,
            before.ease,
            before.interval_days,
            before.repetitions,
            to_nanos(before.due_at)?,
            before.total_reviews,
            before.successful_reviews,
        ],
    )?;

    if updated == 0 {
        let exists: Option<CardId> = conn
            .query_row("SELECT id FROM cards WHERE id = ?1", params![card_id], |row| {
                row.get(0)
            })
            .optional()?;
        return Err(match exists {
            Some(_) => {
                log::warn!("review of card {card_id} lost a race with another review");
                SchedulerError::Conflict(card_id)
            }
            None => SchedulerError::CardNotFound(card_id),
        });
    }

    conn.execute(
        "INSERT INTO review_events
            (card_id, quality, reviewed_at, ease_before, interval_before, time_spent_secs)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            card_id,
            record.quality,
            to_nanos(record.reviewed_at)?,
            record.ease_before,
            record.interval_before,
            time_spent_secs,
        ],
    )?;
    Ok(())
}

fn review_from_row(row: &Row) -> rusqlite::Result<ReviewEvent> {
    Ok(ReviewEvent {
        id: row.get(0)?,
        card_id: row.get(1)?,
        quality: row.get(2)?,
        reviewed_at: from_nanos(row.get(3)?),
        ease_before: row.get(4)?,
        interval_before: row.get(5)?,
        time_spent_secs: row.get(6)?,
    })
}

/// Review history of one card, newest first
pub fn card_reviews(
    card_id: CardId,
    limit: Option<usize>,
    conn: &Connection,
) -> Result<Vec<ReviewEvent>> {
    let sql = format!(
        "SELECT {REVIEW_COLUMNS} FROM review_events WHERE card_id = ?1
         ORDER BY reviewed_at DESC, id DESC LIMIT ?2"
    );
    let mut stmt = conn.prepare(&sql)?;
    let events = stmt
        .query_map(params![card_id, sql_limit(limit)], review_from_row)?
        .collect::<rusqlite::Result<Vec<ReviewEvent>>>()?;
    Ok(events)
}

/// Reviews of any card within `[start, end)`, newest first
pub fn reviews_between(
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    conn: &Connection,
) -> Result<Vec<ReviewEvent>> {
    let sql = format!(
        "SELECT {REVIEW_COLUMNS} FROM review_events
         WHERE reviewed_at >= ?1 AND reviewed_at < ?2
         ORDER BY reviewed_at DESC, id DESC"
    );
    let mut stmt = conn.prepare(&sql)?;
    let events = stmt
        .query_map(params![to_nanos(start)?, to_nanos(end)?], review_from_row)?
        .collect::<rusqlite::Result<Vec<ReviewEvent>>>()?;
    Ok(events)
}

/// SQLite treats a negative LIMIT as "no limit".
pub(crate) fn sql_limit(limit: Option<usize>) -> i64 {
    limit.map_or(-1, |l| i64::try_from(l).unwrap_or(i64::MAX))
}
