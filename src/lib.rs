pub mod config;
pub mod database;
pub mod error;
pub mod export;
pub mod models;
pub mod service;

pub use error::{Result, ReviewError};
pub use models::{Grade, ReviewEvent, ReviewOutcome, VocabularyReviewState, VocabularyWord};
