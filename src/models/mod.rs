pub mod priority;
pub mod review_state;
pub mod sm2;
pub mod stats;
pub mod word;

pub use review_state::VocabularyReviewState;
pub use sm2::{Grade, ReviewOutcome};
pub use word::{ReviewEvent, VocabularyWord, WordKey};
