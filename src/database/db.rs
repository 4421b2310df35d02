//! Database operations for the vocabulary store
//!
//! Handles SQLite schema creation, vocabulary entries with their scheduling state,
//! and the append-only review-event log.

use crate::models::review_state::MAX_MASTERY_LEVEL;
use crate::models::word::normalize_word;
use crate::models::{ReviewEvent, ReviewOutcome, VocabularyReviewState, VocabularyWord, WordKey};
use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, Result, Row, params};
use std::path::Path;
use tracing::{debug, info};

const WORD_COLUMNS: &str = "id, user_id, word, translation, context, saved, click_count,
    interval_days, repetitions, easiness, mastery_level, mastered, review_count,
    next_review, last_reviewed, last_seen, saved_at";

/// Opens (or creates) the database file and makes sure the schema exists
pub fn init_database(path: &Path) -> Result<Connection> {
    let conn = Connection::open(path)?;
    create_schema(&conn)?;
    info!(path = %path.display(), "database ready");
    Ok(conn)
}

/// In-memory database with the full schema, used by tests and dry runs
pub fn open_in_memory() -> Result<Connection> {
    let conn = Connection::open_in_memory()?;
    create_schema(&conn)?;
    Ok(conn)
}

fn create_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;

    // One row per (user, word); scheduling state lives on the row
    conn.execute(
        "CREATE TABLE IF NOT EXISTS words (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id TEXT NOT NULL,
            word TEXT NOT NULL,
            translation TEXT,
            context TEXT,
            saved INTEGER NOT NULL DEFAULT 0,
            click_count INTEGER NOT NULL DEFAULT 0,
            interval_days REAL NOT NULL DEFAULT 0,
            repetitions INTEGER NOT NULL DEFAULT 0,
            easiness REAL NOT NULL DEFAULT 2.5,
            mastery_level INTEGER NOT NULL DEFAULT 0,
            mastered INTEGER NOT NULL DEFAULT 0,
            review_count INTEGER NOT NULL DEFAULT 0,
            next_review INTEGER,
            last_reviewed INTEGER,
            last_seen INTEGER,
            saved_at INTEGER,
            UNIQUE(user_id, word)
        )",
        (),
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS review_events (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id TEXT NOT NULL,
            word_id INTEGER NOT NULL,
            quality INTEGER NOT NULL,
            time_spent_ms INTEGER,
            created_at INTEGER NOT NULL,
            FOREIGN KEY (word_id) REFERENCES words(id) ON DELETE CASCADE
        )",
        (),
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_review_events_user ON review_events(user_id, created_at)",
        (),
    )?;

    Ok(())
}

fn to_timestamp(at: DateTime<Utc>) -> i64 {
    at.timestamp()
}

fn from_timestamp(secs: Option<i64>) -> Option<DateTime<Utc>> {
    secs.and_then(|s| DateTime::from_timestamp(s, 0))
}

fn word_from_row(row: &Row<'_>) -> Result<VocabularyWord> {
    Ok(VocabularyWord {
        id: row.get(0)?,
        user_id: row.get(1)?,
        word: row.get(2)?,
        translation: row.get(3)?,
        context: row.get(4)?,
        state: VocabularyReviewState {
            saved: row.get(5)?,
            click_count: row.get(6)?,
            interval: row.get(7)?,
            repetitions: row.get(8)?,
            easiness: row.get(9)?,
            mastery_level: row.get(10)?,
            next_review: from_timestamp(row.get(13)?),
        },
        mastered: row.get(11)?,
        review_count: row.get(12)?,
        last_reviewed: from_timestamp(row.get(14)?),
        last_seen: from_timestamp(row.get(15)?),
        saved_at: from_timestamp(row.get(16)?),
    })
}

/// Records that the learner looked a word up
///
/// Creates an unsaved entry with default scheduling state on first click,
/// otherwise bumps `click_count`. Translation and context are only overwritten
/// when new values are given.
pub fn track_click(
    user_id: &str,
    word: &str,
    translation: Option<&str>,
    context: Option<&str>,
    now: DateTime<Utc>,
    conn: &Connection,
) -> Result<VocabularyWord> {
    let word = normalize_word(word);
    let ts = to_timestamp(now);

    conn.execute(
        "INSERT INTO words (user_id, word, translation, context, click_count, last_seen)
         VALUES (?1, ?2, ?3, ?4, 1, ?5)
         ON CONFLICT(user_id, word) DO UPDATE SET
            click_count = click_count + 1,
            last_seen = excluded.last_seen,
            translation = COALESCE(excluded.translation, translation),
            context = COALESCE(excluded.context, context)",
        params![user_id, word, translation, context, ts],
    )?;

    debug!(user_id, word = %word, "word click tracked");
    get_word_by_text(user_id, &word, conn)
}

/// Adds a word to the learner's review set
///
/// Creates the entry if needed. Scheduling state is left as is, so a brand-new
/// word has no `next_review` and is due right away.
pub fn save_word(
    user_id: &str,
    word: &str,
    translation: Option<&str>,
    now: DateTime<Utc>,
    conn: &Connection,
) -> Result<VocabularyWord> {
    let word = normalize_word(word);
    let ts = to_timestamp(now);

    conn.execute(
        "INSERT INTO words (user_id, word, translation, saved, saved_at, last_seen)
         VALUES (?1, ?2, ?3, 1, ?4, ?4)
         ON CONFLICT(user_id, word) DO UPDATE SET
            saved = 1,
            saved_at = excluded.saved_at,
            translation = COALESCE(excluded.translation, translation)",
        params![user_id, word, translation, ts],
    )?;

    info!(user_id, word = %word, "word saved");
    get_word_by_text(user_id, &word, conn)
}

/// Removes a word from the review set without deleting its row
///
/// Returns false when the word doesn't exist for this user.
pub fn unsave_word(user_id: &str, word_id: i64, conn: &Connection) -> Result<bool> {
    let changed = conn.execute(
        "UPDATE words SET saved = 0, next_review = NULL WHERE id = ?1 AND user_id = ?2",
        params![word_id, user_id],
    )?;
    Ok(changed > 0)
}

fn get_word_by_text(user_id: &str, word: &str, conn: &Connection) -> Result<VocabularyWord> {
    conn.query_row(
        &format!("SELECT {WORD_COLUMNS} FROM words WHERE user_id = ?1 AND word = ?2"),
        params![user_id, word],
        word_from_row,
    )
}

/// Looks up a word by id or text, scoped to the user
pub fn find_word(
    user_id: &str,
    key: &WordKey,
    conn: &Connection,
) -> Result<Option<VocabularyWord>> {
    match key {
        WordKey::Id(id) => conn
            .query_row(
                &format!("SELECT {WORD_COLUMNS} FROM words WHERE id = ?1 AND user_id = ?2"),
                params![id, user_id],
                word_from_row,
            )
            .optional(),
        WordKey::Text(text) => get_word_by_text(user_id, &normalize_word(text), conn).optional(),
    }
}

/// All words of a user, optionally only the saved ones
pub fn words_for_user(
    user_id: &str,
    saved_only: bool,
    conn: &Connection,
) -> Result<Vec<VocabularyWord>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {WORD_COLUMNS} FROM words
         WHERE user_id = ?1 AND (?2 = 0 OR saved = 1)
         ORDER BY id ASC"
    ))?;

    let words = stmt
        .query_map(params![user_id, saved_only], word_from_row)?
        .collect::<Result<Vec<_>>>()?;

    Ok(words)
}

/// Words flagged as mastered, most recently reviewed first
pub fn mastered_words(user_id: &str, conn: &Connection) -> Result<Vec<VocabularyWord>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {WORD_COLUMNS} FROM words
         WHERE user_id = ?1 AND mastered = 1
         ORDER BY last_reviewed DESC"
    ))?;

    let words = stmt
        .query_map(params![user_id], word_from_row)?
        .collect::<Result<Vec<_>>>()?;

    Ok(words)
}

/// Saved words still being learned (mastery below 3), newest saved first
pub fn learning_words(
    user_id: &str,
    limit: usize,
    conn: &Connection,
) -> Result<Vec<VocabularyWord>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {WORD_COLUMNS} FROM words
         WHERE user_id = ?1 AND saved = 1 AND mastered = 0 AND mastery_level < 3
         ORDER BY saved_at DESC, id DESC
         LIMIT ?2"
    ))?;

    let words = stmt
        .query_map(params![user_id, limit as i64], word_from_row)?
        .collect::<Result<Vec<_>>>()?;

    Ok(words)
}

/// Writes a computed review back to the word
///
/// Only applies if `review_count` still matches the value in `word`, so two
/// reviews racing on the same row can't both land. Returns whether it applied.
pub fn store_review(
    word: &VocabularyWord,
    outcome: &ReviewOutcome,
    now: DateTime<Utc>,
    conn: &Connection,
) -> Result<bool> {
    let changed = conn.execute(
        "UPDATE words
         SET mastery_level = ?1, easiness = ?2, interval_days = ?3, repetitions = ?4,
             next_review = ?5, last_reviewed = ?6, review_count = review_count + 1,
             mastered = ?7
         WHERE id = ?8 AND review_count = ?9",
        params![
            outcome.mastery_level,
            outcome.easiness,
            outcome.interval as f64,
            outcome.repetitions,
            to_timestamp(outcome.next_review),
            to_timestamp(now),
            outcome.mastery_level >= 5,
            word.id,
            word.review_count
        ],
    )?;

    Ok(changed == 1)
}

/// Appends a review to the history log
pub fn insert_review_event(
    user_id: &str,
    word_id: i64,
    quality: u8,
    time_spent_ms: Option<u64>,
    now: DateTime<Utc>,
    conn: &Connection,
) -> Result<i64> {
    conn.execute(
        "INSERT INTO review_events (user_id, word_id, quality, time_spent_ms, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            user_id,
            word_id,
            quality,
            time_spent_ms.map(|ms| i64::try_from(ms).unwrap_or(i64::MAX)),
            to_timestamp(now)
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

const EVENT_COLUMNS: &str = "id, user_id, word_id, quality, time_spent_ms, created_at";

fn event_from_row(row: &Row<'_>) -> Result<ReviewEvent> {
    Ok(ReviewEvent {
        id: row.get(0)?,
        user_id: row.get(1)?,
        word_id: row.get(2)?,
        quality: row.get(3)?,
        time_spent_ms: row
            .get::<_, Option<i64>>(4)?
            .map(|ms| u64::try_from(ms).unwrap_or(0)),
        created_at: from_timestamp(row.get(5)?).unwrap_or_default(),
    })
}

/// Most recent review events of a user, newest first
pub fn review_events_for_user(
    user_id: &str,
    limit: usize,
    conn: &Connection,
) -> Result<Vec<ReviewEvent>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {EVENT_COLUMNS} FROM review_events
         WHERE user_id = ?1
         ORDER BY created_at DESC, id DESC
         LIMIT ?2"
    ))?;

    let events = stmt
        .query_map(params![user_id, limit as i64], event_from_row)?
        .collect::<Result<Vec<_>>>()?;

    Ok(events)
}

/// Most recent review events of one word, newest first, scoped to the user
pub fn review_events_for_word(
    user_id: &str,
    word_id: i64,
    limit: usize,
    conn: &Connection,
) -> Result<Vec<ReviewEvent>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {EVENT_COLUMNS} FROM review_events
         WHERE user_id = ?1 AND word_id = ?2
         ORDER BY created_at DESC, id DESC
         LIMIT ?3"
    ))?;

    let events = stmt
        .query_map(params![user_id, word_id, limit as i64], event_from_row)?
        .collect::<Result<Vec<_>>>()?;

    Ok(events)
}

/// Review events of a user at or after `since`, newest first
pub fn review_events_since(
    user_id: &str,
    since: DateTime<Utc>,
    conn: &Connection,
) -> Result<Vec<ReviewEvent>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {EVENT_COLUMNS} FROM review_events
         WHERE user_id = ?1 AND created_at >= ?2
         ORDER BY created_at DESC, id DESC"
    ))?;

    let events = stmt
        .query_map(params![user_id, to_timestamp(since)], event_from_row)?
        .collect::<Result<Vec<_>>>()?;

    Ok(events)
}

/// Total and successful (quality >= 3) review counts over a user's whole history
pub fn review_totals(user_id: &str, conn: &Connection) -> Result<(usize, usize)> {
    conn.query_row(
        "SELECT COUNT(*), COALESCE(SUM(quality >= 3), 0)
         FROM review_events
         WHERE user_id = ?1",
        params![user_id],
        |row| {
            let total: i64 = row.get(0)?;
            let successful: i64 = row.get(1)?;
            Ok((total as usize, successful as usize))
        },
    )
}

/// Inserts or replaces a word for `user_id` from an imported record
///
/// The scheduling state is brought back into range and `mastered` is derived
/// from it; the review counter is reset.
pub fn upsert_word(user_id: &str, word: &VocabularyWord, conn: &Connection) -> Result<i64> {
    let text = normalize_word(&word.word);
    let state = word.state.normalized();
    let mastered = state.mastery_level >= MAX_MASTERY_LEVEL;

    conn.execute(
        "INSERT INTO words (user_id, word, translation, context, saved, click_count,
            interval_days, repetitions, easiness, mastery_level, mastered, next_review,
            last_reviewed, saved_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
         ON CONFLICT(user_id, word) DO UPDATE SET
            translation = excluded.translation,
            context = excluded.context,
            saved = excluded.saved,
            click_count = excluded.click_count,
            interval_days = excluded.interval_days,
            repetitions = excluded.repetitions,
            easiness = excluded.easiness,
            mastery_level = excluded.mastery_level,
            mastered = excluded.mastered,
            next_review = excluded.next_review,
            last_reviewed = excluded.last_reviewed,
            saved_at = excluded.saved_at",
        params![
            user_id,
            text,
            word.translation,
            word.context,
            state.saved,
            state.click_count,
            state.interval,
            state.repetitions,
            state.easiness,
            state.mastery_level,
            mastered,
            state.next_review.map(to_timestamp),
            word.last_reviewed.map(to_timestamp),
            word.saved_at.map(to_timestamp)
        ],
    )?;

    conn.query_row(
        "SELECT id FROM words WHERE user_id = ?1 AND word = ?2",
        params![user_id, text],
        |row| row.get(0),
    )
}
