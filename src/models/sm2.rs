//! SM-2 derived review scheduler.
//!
//! Computes the next scheduling state of a vocabulary item from a quality rating:
//! - Quality 0-2: the item failed, repetitions reset and it comes back in ~10 minutes
//!   (quality 0/1) or 1 day (quality 2)
//! - Quality 3-5: fixed graduation steps 1 day → 3 days → 7 days, then the previous
//!   interval times the easiness factor
//! - Easy (4) and Perfect (5) answers stretch that interval by 1.3× and 1.5×
//! - Easiness follows the SM-2 formula and stays within [1.3, 2.5]

use super::VocabularyReviewState;
use super::review_state::{MAX_EASINESS, MAX_INTERVAL_DAYS, MIN_EASINESS, mastery_for};
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tracing::debug;

/// Interval used after a total failure: about ten minutes, in days.
pub const RELEARN_INTERVAL_DAYS: f64 = 0.007;

/// Named quality levels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum Grade {
    Again,
    Hard,
    Good,
    Easy,
    Perfect,
}

impl Grade {
    /// Maps a raw rating to its level. 0 and 1 are both Again.
    pub fn from_quality(quality: u8) -> Option<Self> {
        match quality {
            0 | 1 => Some(Grade::Again),
            2 => Some(Grade::Hard),
            3 => Some(Grade::Good),
            4 => Some(Grade::Easy),
            5 => Some(Grade::Perfect),
            _ => None,
        }
    }

    pub fn is_success(self) -> bool {
        matches!(self, Grade::Good | Grade::Easy | Grade::Perfect)
    }

    pub fn label(self) -> &'static str {
        match self {
            Grade::Again => "Again",
            Grade::Hard => "Hard",
            Grade::Good => "Good",
            Grade::Easy => "Easy",
            Grade::Perfect => "Perfect",
        }
    }
}

/// Result of one review.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewOutcome {
    /// Reported interval in whole days, `ceil(scheduled_interval)`.
    pub interval: u32,
    /// Interval before ceiling; `next_review` is derived from this value.
    pub scheduled_interval: f64,
    pub repetitions: u32,
    /// Easiness rounded to two decimals.
    pub easiness: f64,
    pub next_review: DateTime<Utc>,
    pub mastery_level: u8,
    pub quality_used: u8,
}

impl ReviewOutcome {
    /// State to persist after this review. Caller-owned fields are carried over.
    pub fn apply_to(&self, state: &VocabularyReviewState) -> VocabularyReviewState {
        VocabularyReviewState {
            interval: self.interval as f64,
            repetitions: self.repetitions,
            easiness: self.easiness,
            next_review: Some(self.next_review),
            mastery_level: self.mastery_level,
            saved: state.saved,
            click_count: state.click_count,
        }
    }
}

/// Computes the next scheduling state for `state` given a quality rating.
///
/// Quality is not range-checked here; callers validate input at the boundary.
pub fn compute_next_review(
    state: &VocabularyReviewState,
    quality: u8,
    now: DateTime<Utc>,
) -> ReviewOutcome {
    let q = if quality == 0 { 1 } else { quality };

    let mut interval = state.interval;
    let mut repetitions = state.repetitions;

    if q <= 2 {
        repetitions = 0;
        interval = if q == 1 { RELEARN_INTERVAL_DAYS } else { 1.0 };
    } else {
        interval = match repetitions {
            0 => 1.0,
            1 => 3.0,
            2 => 7.0,
            _ => (interval * state.easiness).round(),
        };
        interval = match q {
            4 => (interval * 1.3).round(),
            5 => (interval * 1.5).round(),
            _ => interval,
        };
        repetitions += 1;
    }

    // Failures count as zero in the ease formula.
    let qe = if q <= 2 { 0.0 } else { q as f64 };
    let easiness = state.easiness + (0.1 - (5.0 - qe) * (0.08 + (5.0 - qe) * 0.02));
    let easiness = easiness.clamp(MIN_EASINESS, MAX_EASINESS);

    let interval = interval.min(MAX_INTERVAL_DAYS);

    let next_review = if interval < 1.0 {
        now + Duration::minutes((interval * 24.0 * 60.0).round() as i64)
    } else {
        now + Duration::days(interval.ceil() as i64)
    };

    let mastery_level = mastery_for(repetitions);

    debug!(
        quality = q,
        interval,
        repetitions,
        easiness,
        "computed next review"
    );

    ReviewOutcome {
        interval: interval.ceil() as u32,
        scheduled_interval: interval,
        repetitions,
        easiness: (easiness * 100.0).round() / 100.0,
        next_review,
        mastery_level,
        quality_used: q,
    }
}

/// Same as [`compute_next_review`] with the system clock.
pub fn compute_next_review_now(state: &VocabularyReviewState, quality: u8) -> ReviewOutcome {
    compute_next_review(state, quality, Utc::now())
}
