//! Per-learner scheduling state for one vocabulary item.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const DEFAULT_EASINESS: f64 = 2.5;
pub const MIN_EASINESS: f64 = 1.3;
pub const MAX_EASINESS: f64 = 2.5;
pub const MAX_INTERVAL_DAYS: f64 = 365.0;
pub const MAX_MASTERY_LEVEL: u8 = 5;

/// Scheduling fields read and written by the SM-2 scheduler.
///
/// `saved` and `click_count` belong to the caller; the scheduler only reads them
/// when ordering a review queue. Missing fields deserialize to their defaults.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct VocabularyReviewState {
    /// Days until the next review, fractional for sub-day steps.
    pub interval: f64,
    pub repetitions: u32,
    pub easiness: f64,
    pub next_review: Option<DateTime<Utc>>,
    pub mastery_level: u8,
    pub saved: bool,
    pub click_count: u32,
}

impl Default for VocabularyReviewState {
    fn default() -> Self {
        Self {
            interval: 0.0,
            repetitions: 0,
            easiness: DEFAULT_EASINESS,
            next_review: None,
            mastery_level: 0,
            saved: false,
            click_count: 0,
        }
    }
}

impl VocabularyReviewState {
    /// Due when saved and either never reviewed or scheduled at/before `now`.
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.saved && self.next_review.is_none_or(|at| at <= now)
    }

    /// Brings state from an outside source back within the scheduler's bounds:
    /// easiness and interval clamped, mastery re-derived from repetitions.
    pub fn normalized(&self) -> Self {
        let easiness = if self.easiness.is_finite() {
            self.easiness.clamp(MIN_EASINESS, MAX_EASINESS)
        } else {
            DEFAULT_EASINESS
        };
        let interval = if self.interval.is_finite() {
            self.interval.clamp(0.0, MAX_INTERVAL_DAYS)
        } else {
            0.0
        };

        Self {
            interval,
            easiness,
            mastery_level: mastery_for(self.repetitions),
            ..self.clone()
        }
    }
}

impl AsRef<VocabularyReviewState> for VocabularyReviewState {
    fn as_ref(&self) -> &VocabularyReviewState {
        self
    }
}

/// Mastery bucket derived from the repetition count.
pub fn mastery_for(repetitions: u32) -> u8 {
    (repetitions / 2).min(MAX_MASTERY_LEVEL as u32) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    #[test]
    fn test_default_state() {
        let state = VocabularyReviewState::default();
        assert_eq!(state.interval, 0.0);
        assert_eq!(state.repetitions, 0);
        assert_eq!(state.easiness, 2.5);
        assert!(!state.saved);
        assert!(state.next_review.is_none());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let state: VocabularyReviewState =
            serde_json::from_str(r#"{"repetitions": 4, "saved": true}"#).unwrap();
        assert_eq!(state.repetitions, 4);
        assert_eq!(state.easiness, 2.5);
        assert_eq!(state.interval, 0.0);
        assert!(state.saved);
    }

    #[test]
    fn test_is_due() {
        let now = Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap();
        let mut state = VocabularyReviewState {
            saved: true,
            ..Default::default()
        };
        assert!(state.is_due(now));

        state.next_review = Some(now);
        assert!(state.is_due(now));

        state.next_review = Some(now + Duration::minutes(1));
        assert!(!state.is_due(now));

        state.next_review = Some(now - Duration::days(2));
        state.saved = false;
        assert!(!state.is_due(now));
    }

    #[test]
    fn test_normalized_restores_bounds() {
        let raw = VocabularyReviewState {
            interval: 5000.0,
            repetitions: 10,
            easiness: 9.0,
            mastery_level: 0,
            saved: true,
            click_count: 3,
            ..Default::default()
        };
        let state = raw.normalized();
        assert_eq!(state.interval, 365.0);
        assert_eq!(state.easiness, 2.5);
        assert_eq!(state.mastery_level, 5);
        assert_eq!(state.click_count, 3);
        assert!(state.saved);

        let low = VocabularyReviewState {
            interval: -4.0,
            easiness: 0.2,
            ..Default::default()
        }
        .normalized();
        assert_eq!(low.interval, 0.0);
        assert_eq!(low.easiness, 1.3);

        let nan = VocabularyReviewState {
            interval: f64::NAN,
            easiness: f64::NAN,
            ..Default::default()
        }
        .normalized();
        assert_eq!(nan.interval, 0.0);
        assert_eq!(nan.easiness, 2.5);
    }

    #[test]
    fn test_mastery_for() {
        assert_eq!(mastery_for(0), 0);
        assert_eq!(mastery_for(1), 0);
        assert_eq!(mastery_for(2), 1);
        assert_eq!(mastery_for(9), 4);
        assert_eq!(mastery_for(10), 5);
        assert_eq!(mastery_for(40), 5);
    }
}
