//! Review submission: validates a learner's answer, runs the scheduler and
//! persists the new state together with a review-event entry.

use crate::database::db;
use crate::error::{Result, ReviewError};
use crate::models::priority::sort_by_priority;
use crate::models::sm2::compute_next_review;
use crate::models::{Grade, ReviewEvent, ReviewOutcome, VocabularyWord, WordKey};
use chrono::{DateTime, Utc};
use rusqlite::Connection;
use serde::Serialize;
use tracing::{info, warn};

/// One answer for one word.
#[derive(Clone, Debug)]
pub struct ReviewRequest {
    pub user_id: String,
    pub word: WordKey,
    /// Raw rating as received; checked against 0..=5 before anything else happens.
    pub quality: Option<i64>,
    pub time_spent_ms: Option<u64>,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewResult {
    pub word: VocabularyWord,
    pub outcome: ReviewOutcome,
    pub grade: Grade,
}

/// Entry of a bulk review. `word` and `quality` are as in [`ReviewRequest`].
#[derive(Clone, Debug)]
pub struct BulkItem {
    pub word: WordKey,
    pub quality: Option<i64>,
    pub time_spent_ms: Option<u64>,
}

#[derive(Debug)]
pub struct BulkEntry {
    pub word: WordKey,
    pub result: Result<ReviewResult>,
}

fn validate(request: &ReviewRequest) -> Result<u8> {
    if request.user_id.trim().is_empty() {
        return Err(ReviewError::MissingField("user_id"));
    }
    if let WordKey::Text(text) = &request.word {
        if text.trim().is_empty() {
            return Err(ReviewError::MissingField("word"));
        }
    }
    let quality = request.quality.ok_or(ReviewError::MissingField("quality"))?;
    if !(0..=5).contains(&quality) {
        return Err(ReviewError::InvalidQuality(quality));
    }
    Ok(quality as u8)
}

/// Applies one review.
///
/// Everything runs in one transaction: if the word changed since it was read, or
/// any write fails, nothing is persisted and the error is returned.
pub fn submit_review(
    request: &ReviewRequest,
    now: DateTime<Utc>,
    conn: &mut Connection,
) -> Result<ReviewResult> {
    let quality = validate(request)?;
    let user_id = request.user_id.trim();

    let tx = conn.transaction()?;

    let Some(word) = db::find_word(user_id, &request.word, &tx)? else {
        warn!(user_id, word = %request.word, "review for unknown word");
        return Err(ReviewError::WordNotFound {
            user_id: user_id.to_string(),
            word: request.word.to_string(),
        });
    };

    let outcome = compute_next_review(&word.state, quality, now);

    if !db::store_review(&word, &outcome, now, &tx)? {
        warn!(word_id = word.id, "review lost a concurrent update");
        return Err(ReviewError::Conflict(word.id));
    }
    db::insert_review_event(user_id, word.id, quality, request.time_spent_ms, now, &tx)?;

    tx.commit()?;

    info!(
        user_id,
        word = %word.word,
        quality = outcome.quality_used,
        interval = outcome.interval,
        mastery = outcome.mastery_level,
        "review recorded"
    );

    let grade = Grade::from_quality(outcome.quality_used).unwrap_or(Grade::Again);
    let updated = VocabularyWord {
        state: outcome.apply_to(&word.state),
        mastered: outcome.mastery_level >= 5,
        review_count: word.review_count + 1,
        last_reviewed: Some(now),
        ..word
    };

    Ok(ReviewResult {
        word: updated,
        outcome,
        grade,
    })
}

/// Reviews several words for one user. Each entry succeeds or fails on its own.
pub fn submit_bulk(
    user_id: &str,
    items: Vec<BulkItem>,
    now: DateTime<Utc>,
    conn: &mut Connection,
) -> Result<Vec<BulkEntry>> {
    if user_id.trim().is_empty() {
        return Err(ReviewError::MissingField("user_id"));
    }

    let entries = items
        .into_iter()
        .map(|item| {
            let request = ReviewRequest {
                user_id: user_id.to_string(),
                word: item.word.clone(),
                quality: item.quality,
                time_spent_ms: item.time_spent_ms,
            };
            BulkEntry {
                word: item.word,
                result: submit_review(&request, now, conn),
            }
        })
        .collect();

    Ok(entries)
}

/// Number of past reviews returned with a word's details.
pub const WORD_HISTORY_LIMIT: usize = 10;

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WordDetails {
    pub word: VocabularyWord,
    /// Newest first, at most [`WORD_HISTORY_LIMIT`] entries.
    pub history: Vec<ReviewEvent>,
}

/// One word of the user with its most recent reviews.
pub fn word_details(user_id: &str, key: &WordKey, conn: &Connection) -> Result<WordDetails> {
    let Some(word) = db::find_word(user_id, key, conn)? else {
        return Err(ReviewError::WordNotFound {
            user_id: user_id.to_string(),
            word: key.to_string(),
        });
    };
    let history = db::review_events_for_word(user_id, word.id, WORD_HISTORY_LIMIT, conn)?;
    Ok(WordDetails { word, history })
}

/// Saved words due at `now`, in review order, at most `limit` of them.
pub fn due_words(
    user_id: &str,
    now: DateTime<Utc>,
    limit: usize,
    conn: &Connection,
) -> Result<Vec<VocabularyWord>> {
    let due = db::words_for_user(user_id, true, conn)?
        .into_iter()
        .filter(|w| w.state.is_due(now));

    let mut ordered = sort_by_priority(due, now);
    ordered.truncate(limit);
    Ok(ordered)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 7, 3, 18, 0, 0).unwrap()
    }

    fn request(word: WordKey, quality: Option<i64>) -> ReviewRequest {
        ReviewRequest {
            user_id: "u1".to_string(),
            word,
            quality,
            time_spent_ms: Some(2500),
        }
    }

    #[test]
    fn test_submit_review_persists_state_and_event() {
        let mut conn = db::open_in_memory().unwrap();
        let word = db::save_word("u1", "hablar", Some("to speak"), now(), &conn).unwrap();

        let result =
            submit_review(&request(WordKey::Id(word.id), Some(3)), now(), &mut conn).unwrap();
        assert_eq!(result.grade, Grade::Good);
        assert_eq!(result.outcome.repetitions, 1);
        assert_eq!(result.word.review_count, 1);

        let stored = db::find_word("u1", &WordKey::Id(word.id), &conn).unwrap().unwrap();
        assert_eq!(stored, result.word);
        assert_eq!(stored.state.easiness, 2.36);
        assert_eq!(stored.state.next_review, Some(now() + Duration::days(1)));

        let events = db::review_events_for_user("u1", 10, &conn).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].quality, 3);
        assert_eq!(events[0].time_spent_ms, Some(2500));
    }

    #[test]
    fn test_again_persists_ceiled_interval_but_short_due_date() {
        let mut conn = db::open_in_memory().unwrap();
        db::save_word("u1", "comer", None, now(), &conn).unwrap();

        let again = request(WordKey::Text("comer".to_string()), Some(0));
        let result = submit_review(&again, now(), &mut conn).unwrap();
        assert_eq!(result.outcome.quality_used, 1);
        assert_eq!(result.word.state.interval, 1.0);
        assert_eq!(result.word.state.next_review, Some(now() + Duration::minutes(10)));

        // Logged with the raw rating
        let events = db::review_events_for_user("u1", 10, &conn).unwrap();
        assert_eq!(events[0].quality, 0);
    }

    #[test]
    fn test_validation_errors() {
        let mut conn = db::open_in_memory().unwrap();
        let word = db::save_word("u1", "vivir", None, now(), &conn).unwrap();

        let missing = submit_review(&request(WordKey::Id(word.id), None), now(), &mut conn);
        assert!(matches!(missing, Err(ReviewError::MissingField("quality"))));

        for bad in [-1, 6, 42] {
            let out = submit_review(&request(WordKey::Id(word.id), Some(bad)), now(), &mut conn);
            assert!(matches!(out, Err(ReviewError::InvalidQuality(q)) if q == bad));
        }

        let mut no_user = request(WordKey::Id(word.id), Some(3));
        no_user.user_id = "  ".to_string();
        assert!(matches!(
            submit_review(&no_user, now(), &mut conn),
            Err(ReviewError::MissingField("user_id"))
        ));

        assert!(db::review_events_for_user("u1", 10, &conn).unwrap().is_empty());
    }

    #[test]
    fn test_invalid_quality_reported_before_not_found() {
        let mut conn = db::open_in_memory().unwrap();
        let out = submit_review(&request(WordKey::Id(999), Some(9)), now(), &mut conn);
        assert!(matches!(out, Err(ReviewError::InvalidQuality(9))));
    }

    #[test]
    fn test_unknown_word_is_not_found() {
        let mut conn = db::open_in_memory().unwrap();
        let word = db::save_word("u2", "correr", None, now(), &conn).unwrap();

        let out = submit_review(&request(WordKey::Id(word.id), Some(4)), now(), &mut conn);
        assert!(matches!(out, Err(ReviewError::WordNotFound { .. })));
    }

    #[test]
    fn test_mastered_flag_follows_mastery() {
        let mut conn = db::open_in_memory().unwrap();
        let seed = VocabularyWord {
            word: "estrella".to_string(),
            state: crate::models::VocabularyReviewState {
                interval: 60.0,
                repetitions: 9,
                easiness: 2.5,
                mastery_level: 4,
                saved: true,
                ..Default::default()
            },
            ..Default::default()
        };
        let id = db::upsert_word("u1", &seed, &conn).unwrap();

        let up = submit_review(&request(WordKey::Id(id), Some(5)), now(), &mut conn).unwrap();
        assert_eq!(up.outcome.mastery_level, 5);
        assert!(up.word.mastered);
        assert_eq!(db::mastered_words("u1", &conn).unwrap().len(), 1);

        let down = submit_review(&request(WordKey::Id(id), Some(1)), now(), &mut conn).unwrap();
        assert_eq!(down.outcome.mastery_level, 0);
        assert!(!down.word.mastered);
        assert_eq!(down.word.review_count, 2);
    }

    #[test]
    fn test_submit_bulk_isolates_failures() {
        let mut conn = db::open_in_memory().unwrap();
        let a = db::save_word("u1", "rojo", None, now(), &conn).unwrap();
        let b = db::save_word("u1", "azul", None, now(), &conn).unwrap();

        let item = |word: WordKey, quality: i64| BulkItem {
            word,
            quality: Some(quality),
            time_spent_ms: None,
        };
        let items = vec![
            item(WordKey::Id(a.id), 4),
            item(WordKey::Text("verde".to_string()), 4),
            item(WordKey::Id(b.id), 7),
        ];
        let entries = submit_bulk("u1", items, now(), &mut conn).unwrap();
        assert_eq!(entries.len(), 3);
        assert!(entries[0].result.is_ok());
        assert!(matches!(entries[1].result, Err(ReviewError::WordNotFound { .. })));
        assert!(matches!(entries[2].result, Err(ReviewError::InvalidQuality(7))));

        assert!(matches!(
            submit_bulk("", Vec::new(), now(), &mut conn),
            Err(ReviewError::MissingField("user_id"))
        ));
    }

    #[test]
    fn test_word_details_with_history() {
        let mut conn = db::open_in_memory().unwrap();
        let word = db::save_word("u1", "bosque", Some("forest"), now(), &conn).unwrap();
        for (i, quality) in (0..12).zip([3, 4, 1].into_iter().cycle()) {
            let at = now() + Duration::minutes(i);
            submit_review(&request(WordKey::Id(word.id), Some(quality)), at, &mut conn).unwrap();
        }

        let details = word_details("u1", &WordKey::Text("Bosque".to_string()), &conn).unwrap();
        assert_eq!(details.word.id, word.id);
        assert_eq!(details.word.review_count, 12);
        assert_eq!(details.history.len(), WORD_HISTORY_LIMIT);
        assert!(details.history.windows(2).all(|w| w[0].created_at >= w[1].created_at));
        assert_eq!(details.history[0].created_at, now() + Duration::minutes(11));

        assert!(matches!(
            word_details("u2", &WordKey::Id(word.id), &conn),
            Err(ReviewError::WordNotFound { .. })
        ));
    }

    #[test]
    fn test_due_words_ordering_and_limit() {
        let mut conn = db::open_in_memory().unwrap();
        let reviewed = db::save_word("u1", "tarde", None, now(), &conn).unwrap();
        db::save_word("u1", "noche", None, now(), &conn).unwrap();
        db::save_word("u1", "dia", None, now(), &conn).unwrap();
        db::track_click("u1", "manana", None, None, now(), &conn).unwrap();

        // Pushes "tarde" a day out
        submit_review(&request(WordKey::Id(reviewed.id), Some(3)), now(), &mut conn).unwrap();

        let due = due_words("u1", now(), 10, &conn).unwrap();
        let names: Vec<_> = due.iter().map(|w| w.word.as_str()).collect();
        assert_eq!(names, vec!["noche", "dia"]);

        let later = now() + Duration::days(2);
        let due_later = due_words("u1", later, 10, &conn).unwrap();
        assert_eq!(due_later[0].word, "tarde");
        assert_eq!(due_words("u1", later, 1, &conn).unwrap().len(), 1);
    }
}
