//! Read-only reporting derived from card counters and the review log.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use rusqlite::{Connection, params, params_from_iter};
use serde::Serialize;
use std::collections::HashSet;

use super::CardSelector;
use super::db::{from_nanos, reviews_between, to_nanos};
use super::selector::placeholders;
use crate::error::{Result, SchedulerError};
use crate::models::{DeckId, RatingScale};

/// Passes in a row after which a card counts as mastered.
pub const MASTERED_REPETITIONS: i32 = 5;

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct DeckStats {
    pub total_cards: usize,
    pub new_cards: usize,
    pub due_cards: usize,
    /// Cards reviewed at least once.
    pub reviewed_cards: usize,
    /// Reviewed cards with fewer than two passes in a row.
    pub learning_cards: usize,
    pub mastered_cards: usize,
    /// Passing answers over all answers, as a percentage.
    pub success_rate: f64,
}

/// Counts for one deck or a pool of decks at `now`.
pub fn deck_stats(deck_ids: &[DeckId], now: DateTime<Utc>, conn: &Connection) -> Result<DeckStats> {
    if deck_ids.is_empty() {
        return Ok(DeckStats::default());
    }

    let sql = format!(
        "SELECT COUNT(*), COALESCE(SUM(total_reviews), 0), COALESCE(SUM(successful_reviews), 0),
                COALESCE(SUM(CASE WHEN total_reviews > 0 AND repetitions < 2 THEN 1 ELSE 0 END), 0),
                COALESCE(SUM(CASE WHEN repetitions >= ? THEN 1 ELSE 0 END), 0)
         FROM cards WHERE deck_id IN ({})",
        placeholders(deck_ids.len())
    );
    let mut values = vec![i64::from(MASTERED_REPETITIONS)];
    values.extend_from_slice(deck_ids);

    let (total_cards, total_reviews, successful_reviews, learning_cards, mastered_cards): (
        i64,
        i64,
        i64,
        i64,
        i64,
    ) = conn.query_row(&sql, params_from_iter(values), |row| {
        Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?))
    })?;

    let new_cards = conn.count_new(deck_ids)?;
    let due_cards = conn.count_due(deck_ids, now)?;
    let total_cards = total_cards as usize;

    Ok(DeckStats {
        total_cards,
        new_cards,
        due_cards,
        reviewed_cards: total_cards.saturating_sub(new_cards),
        learning_cards: learning_cards as usize,
        mastered_cards: mastered_cards as usize,
        success_rate: percentage(successful_reviews as usize, total_reviews as usize),
    })
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct ReviewSummary {
    pub total_reviews: usize,
    pub passed_reviews: usize,
    pub accuracy: f64,
    pub time_spent_secs: u64,
    /// Distinct UTC days with at least one review.
    pub days_active: usize,
}

/// Summarises the answers given within `[start, end)`.
///
/// Fails with `InvalidRating` if the log holds a rating the scale does not
/// know, e.g. after switching to a smaller scale.
pub fn review_summary(
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    ratings: &RatingScale,
    conn: &Connection,
) -> Result<ReviewSummary> {
    let events = reviews_between(start, end, conn)?;

    let mut passed_reviews = 0;
    for event in &events {
        if ratings.grade(event.quality)?.is_pass() {
            passed_reviews += 1;
        }
    }
    let time_spent_secs = events
        .iter()
        .map(|event| u64::from(event.time_spent_secs.unwrap_or(0)))
        .sum();
    let days_active = events
        .iter()
        .map(|event| event.reviewed_at.date_naive())
        .collect::<HashSet<NaiveDate>>()
        .len();

    Ok(ReviewSummary {
        total_reviews: events.len(),
        passed_reviews,
        accuracy: percentage(passed_reviews, events.len()),
        time_spent_secs,
        days_active,
    })
}

/// Summarises the `days` days up to and including `now`, i.e. the window
/// `(now - days, now]`, so answers stamped exactly `now` are counted.
pub fn recent_summary(
    now: DateTime<Utc>,
    days: i64,
    ratings: &RatingScale,
    conn: &Connection,
) -> Result<ReviewSummary> {
    let end = now
        .checked_add_signed(Duration::nanoseconds(1))
        .ok_or(SchedulerError::TimestampOutOfRange)?;
    let start = end
        .checked_sub_signed(Duration::days(days))
        .ok_or(SchedulerError::TimestampOutOfRange)?;
    review_summary(start, end, ratings, conn)
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct WeeklySummary {
    pub summary: ReviewSummary,
    pub average_daily_reviews: f64,
}

/// Review totals of the last seven days, including `now`.
pub fn weekly_summary(
    now: DateTime<Utc>,
    ratings: &RatingScale,
    conn: &Connection,
) -> Result<WeeklySummary> {
    let summary = recent_summary(now, 7, ratings, conn)?;
    Ok(WeeklySummary {
        average_daily_reviews: summary.total_reviews as f64 / 7.0,
        summary,
    })
}

/// Consecutive UTC days with reviews, ending today or yesterday.
///
/// A streak whose last review day is before yesterday is broken and counts
/// as zero. Reviews after `now` are ignored.
pub fn review_streak(now: DateTime<Utc>, conn: &Connection) -> Result<u32> {
    let mut stmt = conn.prepare(
        "SELECT reviewed_at FROM review_events WHERE reviewed_at <= ?1 ORDER BY reviewed_at DESC",
    )?;
    let mut days: Vec<NaiveDate> = stmt
        .query_map(params![to_nanos(now)?], |row| row.get::<_, i64>(0))?
        .map(|nanos| nanos.map(|n| from_nanos(n).date_naive()))
        .collect::<rusqlite::Result<_>>()?;
    days.dedup();

    let today = now.date_naive();
    let Some(&latest) = days.first() else {
        return Ok(0);
    };
    if latest != today && Some(latest) != today.pred_opt() {
        return Ok(0);
    }

    let mut streak = 0;
    let mut expected = Some(latest);
    for day in days {
        if Some(day) != expected {
            break;
        }
        streak += 1;
        expected = day.pred_opt();
    }
    Ok(streak)
}

fn percentage(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        return 0.0;
    }
    part as f64 / whole as f64 * 100.0
}
