//! Errors raised at the review boundary. The scheduler itself never fails.

/// Review error
#[derive(Debug, thiserror::Error)]
pub enum ReviewError {
    /// A required request field is absent or empty
    #[error("Missing required field: {0}")]
    MissingField(&'static str),
    /// Quality outside 0..=5
    #[error("Quality must be between 0 and 5, got {0}")]
    InvalidQuality(i64),
    /// No vocabulary entry for this user
    #[error("Word not found for user {user_id}: {word}")]
    WordNotFound { user_id: String, word: String },
    /// The entry changed between read and write
    #[error("Word {0} was updated concurrently")]
    Conflict(i64),
    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ReviewError {
    /// Bad input from the caller; retrying the same request won't help.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            ReviewError::MissingField(_) | ReviewError::InvalidQuality(_)
        )
    }

    /// Nothing was persisted and the same request may be sent again.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ReviewError::Conflict(_) | ReviewError::Database(_))
    }
}

/// Review result type
pub type Result<T> = std::result::Result<T, ReviewError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_categories() {
        assert!(ReviewError::InvalidQuality(9).is_client_error());
        assert!(ReviewError::MissingField("quality").is_client_error());

        let not_found = ReviewError::WordNotFound {
            user_id: "u1".to_string(),
            word: "perro".to_string(),
        };
        assert!(!not_found.is_client_error());
        assert!(!not_found.is_retryable());

        assert!(ReviewError::Conflict(3).is_retryable());
        assert!(ReviewError::Database(rusqlite::Error::InvalidQuery).is_retryable());
    }

    #[test]
    fn test_error_messages() {
        assert_eq!(
            ReviewError::InvalidQuality(-1).to_string(),
            "Quality must be between 0 and 5, got -1"
        );
        assert_eq!(
            ReviewError::MissingField("user_id").to_string(),
            "Missing required field: user_id"
        );
    }
}
