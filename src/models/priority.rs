//! Review-queue utilities: due counting, priority ordering and daily quotas.

use super::VocabularyReviewState;
use chrono::{DateTime, Duration, Utc};
use std::cmp::Ordering;

/// Number of saved items that are due at `now` (never reviewed counts as due).
pub fn due_count<T: AsRef<VocabularyReviewState>>(items: &[T], now: DateTime<Utc>) -> usize {
    items.iter().filter(|item| item.as_ref().is_due(now)).count()
}

/// Orders items for a review session and returns them as a new vector.
///
/// Most overdue first (never-reviewed items count as exactly due), then lower
/// mastery, then higher click count. The sort is stable.
pub fn sort_by_priority<T, I>(items: I, now: DateTime<Utc>) -> Vec<T>
where
    T: AsRef<VocabularyReviewState>,
    I: IntoIterator<Item = T>,
{
    let mut ordered: Vec<T> = items.into_iter().collect();
    ordered.sort_by(|a, b| compare_priority(a.as_ref(), b.as_ref(), now));
    ordered
}

fn compare_priority(
    a: &VocabularyReviewState,
    b: &VocabularyReviewState,
    now: DateTime<Utc>,
) -> Ordering {
    overdue_amount(a, now)
        .cmp(&overdue_amount(b, now))
        .then(a.mastery_level.cmp(&b.mastery_level))
        .then(b.click_count.cmp(&a.click_count))
}

/// `next_review - now`; negative when overdue.
fn overdue_amount(state: &VocabularyReviewState, now: DateTime<Utc>) -> Duration {
    state
        .next_review
        .map(|at| at - now)
        .unwrap_or_else(Duration::zero)
}

/// Daily review quota for a vocabulary of `total_words`.
pub fn recommended_daily_reviews(total_words: usize) -> usize {
    match total_words {
        n if n < 10 => n,
        n if n < 50 => 10,
        n if n < 100 => 15,
        _ => 20,
    }
}
