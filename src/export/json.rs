//! JSON import/export of a learner's vocabulary.
//! Writes the words with their scheduling state, and reads them back into the store.

use crate::database::db;
use crate::error::Result;
use crate::models::VocabularyWord;
use chrono::{DateTime, Utc};
use rusqlite::Connection;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;
use tracing::info;

/// Exports words to a pretty-printed JSON array at `path`.
pub fn export_json_to_path(words: &[VocabularyWord], path: &Path) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(&mut writer, words)?;
    writer.flush()?;
    info!(count = words.len(), path = %path.display(), "vocabulary exported");
    Ok(())
}

/// Reads words from a JSON file. Missing scheduling fields take their defaults.
pub fn import_json(path: &Path) -> Result<Vec<VocabularyWord>> {
    let reader = BufReader::new(File::open(path)?);
    let words: Vec<VocabularyWord> = serde_json::from_reader(reader)?;
    Ok(words)
}

/// Stores imported words for `user_id`, replacing entries with the same text.
/// Entries with an empty word are skipped. Out-of-range scheduling state is
/// normalized on the way in. Returns how many were stored.
pub fn import_into(
    user_id: &str,
    words: &[VocabularyWord],
    now: DateTime<Utc>,
    conn: &mut Connection,
) -> Result<usize> {
    let tx = conn.transaction()?;
    let mut stored = 0;

    for word in words.iter().filter(|w| !w.word.trim().is_empty()) {
        let mut word = word.clone();
        if word.state.saved && word.saved_at.is_none() {
            word.saved_at = Some(now);
        }
        db::upsert_word(user_id, &word, &tx)?;
        stored += 1;
    }

    tx.commit()?;
    info!(user_id, count = stored, "vocabulary imported");
    Ok(stored)
}
