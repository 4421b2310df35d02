//! Progress statistics over a learner's vocabulary and review history.

use super::priority::recommended_daily_reviews;
use super::review_state::{DEFAULT_EASINESS, MAX_MASTERY_LEVEL};
use super::{ReviewEvent, VocabularyReviewState};
use chrono::{DateTime, Days, NaiveDate, Utc};
use serde::Serialize;
use std::collections::HashSet;

/// Longest streak that is reported.
pub const MAX_STREAK_DAYS: u32 = 365;
/// Longest workload forecast, in days.
pub const MAX_WORKLOAD_DAYS: u32 = 365;

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewStats {
    pub total: usize,
    /// Index is the mastery level.
    pub by_mastery: [usize; MAX_MASTERY_LEVEL as usize + 1],
    pub due_now: usize,
    pub due_tomorrow: usize,
    pub average_easiness: f64,
    pub longest_run: u32,
    pub recommended_daily: usize,
}

pub fn review_stats<T: AsRef<VocabularyReviewState>>(
    items: &[T],
    now: DateTime<Utc>,
) -> ReviewStats {
    let end_of_tomorrow = now
        .date_naive()
        .checked_add_days(Days::new(2))
        .and_then(|day| day.and_hms_opt(0, 0, 0))
        .map(|at| at.and_utc());

    let mut stats = ReviewStats {
        total: items.len(),
        by_mastery: [0; MAX_MASTERY_LEVEL as usize + 1],
        due_now: 0,
        due_tomorrow: 0,
        average_easiness: DEFAULT_EASINESS,
        longest_run: 0,
        recommended_daily: recommended_daily_reviews(items.len()),
    };

    let mut easiness_sum = 0.0;
    for item in items {
        let state = item.as_ref();
        let level = state.mastery_level.min(MAX_MASTERY_LEVEL) as usize;
        stats.by_mastery[level] += 1;

        match state.next_review {
            None => stats.due_now += 1,
            Some(at) if at <= now => stats.due_now += 1,
            Some(at) if end_of_tomorrow.is_some_and(|end| at < end) => stats.due_tomorrow += 1,
            Some(_) => {}
        }

        easiness_sum += state.easiness;
        stats.longest_run = stats.longest_run.max(state.repetitions);
    }

    if !items.is_empty() {
        stats.average_easiness = (easiness_sum / items.len() as f64 * 100.0).round() / 100.0;
    }

    stats
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Retention {
    /// Percent of successful reviews, one decimal.
    pub rate: f64,
    pub total_reviews: usize,
    pub successful_reviews: usize,
    pub failed_reviews: usize,
}

pub fn retention(events: &[ReviewEvent]) -> Retention {
    let successful_reviews = events.iter().filter(|e| e.quality >= 3).count();
    Retention::from_counts(events.len(), successful_reviews)
}

impl Retention {
    /// Builds the figures from pre-aggregated counts.
    pub fn from_counts(total_reviews: usize, successful_reviews: usize) -> Self {
        let successful_reviews = successful_reviews.min(total_reviews);
        let rate = if total_reviews == 0 {
            0.0
        } else {
            (successful_reviews as f64 / total_reviews as f64 * 1000.0).round() / 10.0
        };

        Retention {
            rate,
            total_reviews,
            successful_reviews,
            failed_reviews: total_reviews - successful_reviews,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkloadDay {
    pub date: NaiveDate,
    pub due: usize,
}

/// Reviews coming due on each of the next `days` calendar days, starting at `today`.
/// Overdue and never-reviewed items land on `today`. Unsaved items are skipped.
/// `days` is capped at [`MAX_WORKLOAD_DAYS`].
pub fn predict_workload<T: AsRef<VocabularyReviewState>>(
    items: &[T],
    today: NaiveDate,
    days: u32,
) -> Vec<WorkloadDay> {
    let mut buckets = vec![0usize; days.min(MAX_WORKLOAD_DAYS) as usize];

    for item in items {
        let state = item.as_ref();
        if !state.saved {
            continue;
        }
        let offset = match state.next_review {
            None => 0,
            Some(at) => (at.date_naive() - today).num_days().max(0),
        };
        if let Some(bucket) = buckets.get_mut(offset as usize) {
            *bucket += 1;
        }
    }

    buckets
        .into_iter()
        .enumerate()
        .filter_map(|(i, due)| {
            today
                .checked_add_days(Days::new(i as u64))
                .map(|date| WorkloadDay { date, due })
        })
        .collect()
}

/// Consecutive review days ending today, or yesterday when nothing was reviewed today.
pub fn review_streak(events: &[ReviewEvent], today: NaiveDate) -> u32 {
    let days: HashSet<NaiveDate> = events.iter().map(|e| e.created_at.date_naive()).collect();

    let mut day = today;
    if !days.contains(&day) {
        match day.pred_opt() {
            Some(yesterday) => day = yesterday,
            None => return 0,
        }
    }

    let mut streak = 0;
    while streak < MAX_STREAK_DAYS && days.contains(&day) {
        streak += 1;
        match day.pred_opt() {
            Some(prev) => day = prev,
            None => break,
        }
    }
    streak
}
