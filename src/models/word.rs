//! A learner's vocabulary entry and its review history.
use super::VocabularyReviewState;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct VocabularyWord {
    pub id: i64,
    pub user_id: String,
    pub word: String,
    pub translation: Option<String>,
    pub context: Option<String>,
    #[serde(flatten)]
    pub state: VocabularyReviewState,
    pub mastered: bool,
    pub review_count: u32,
    pub last_reviewed: Option<DateTime<Utc>>,
    pub last_seen: Option<DateTime<Utc>>,
    pub saved_at: Option<DateTime<Utc>>,
}

impl Default for VocabularyWord {
    fn default() -> Self {
        Self {
            id: 0,
            user_id: String::new(),
            word: String::new(),
            translation: None,
            context: None,
            state: VocabularyReviewState::default(),
            mastered: false,
            review_count: 0,
            last_reviewed: None,
            last_seen: None,
            saved_at: None,
        }
    }
}

impl AsRef<VocabularyReviewState> for VocabularyWord {
    fn as_ref(&self) -> &VocabularyReviewState {
        &self.state
    }
}

/// Lowercases and trims a word the way it is stored.
pub fn normalize_word(word: &str) -> String {
    word.trim().to_lowercase()
}

/// Identifies a vocabulary entry by row id or by its text.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WordKey {
    Id(i64),
    Text(String),
}

impl WordKey {
    /// Numeric input is taken as an id, anything else as word text.
    pub fn parse(input: &str) -> Self {
        match input.trim().parse::<i64>() {
            Ok(id) => WordKey::Id(id),
            Err(_) => WordKey::Text(normalize_word(input)),
        }
    }
}

impl std::fmt::Display for WordKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WordKey::Id(id) => write!(f, "#{id}"),
            WordKey::Text(text) => f.write_str(text),
        }
    }
}

/// One completed review. Append-only.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewEvent {
    pub id: i64,
    pub user_id: String,
    pub word_id: i64,
    pub quality: u8,
    pub time_spent_ms: Option<u64>,
    pub created_at: DateTime<Utc>,
}
