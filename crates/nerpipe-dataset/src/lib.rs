//! nerpipe Dataset - Sentence dataset loading
//!
//! Reads the fixed four-column, header-less CSV dataset
//! (identifier, sentence, part-of-speech tag, gold tag), keeps the
//! first two columns, and deduplicates (identifier, sentence) pairs
//! while preserving first-seen order.
//!
//! No row-level recovery is attempted: a malformed row aborts the
//! load with a typed error.

use std::collections::HashSet;
use std::io::Read;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use nerpipe_core::{NerError, SentenceRecord};

// ============================================================================
// Error Types
// ============================================================================

/// Errors that can occur while loading the dataset
#[derive(Error, Debug)]
pub enum DatasetError {
    /// IO error while opening the file
    #[error("Failed to open dataset {path}: {source}")]
    IoError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// CSV parsing or row-shape error
    #[error("Malformed dataset row: {0}")]
    MalformedRow(#[from] csv::Error),
}

impl From<DatasetError> for NerError {
    fn from(e: DatasetError) -> Self {
        Self::Dataset(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, DatasetError>;

// ============================================================================
// Loader
// ============================================================================

/// Raw row shape of the input file. The part-of-speech and gold-tag
/// columns are required to be present but are never used.
#[derive(Debug, Deserialize)]
struct RawRow {
    sentence_id: i64,
    sentence: String,
    #[allow(dead_code)]
    pos: String,
    #[allow(dead_code)]
    gold_tag: String,
}

/// Load and deduplicate sentences from a CSV file on disk
pub fn load_sentences(path: impl AsRef<Path>) -> Result<Vec<SentenceRecord>> {
    let path = path.as_ref();
    let file = std::fs::File::open(path).map_err(|e| DatasetError::IoError {
        path: path.to_path_buf(),
        source: e,
    })?;
    read_sentences(file)
}

/// Load and deduplicate sentences from any reader
pub fn read_sentences(reader: impl Read) -> Result<Vec<SentenceRecord>> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .from_reader(reader);

    let mut seen: HashSet<(i64, String)> = HashSet::new();
    let mut sentences = Vec::new();

    for row in csv_reader.deserialize::<RawRow>() {
        let row = row?;
        if seen.insert((row.sentence_id, row.sentence.clone())) {
            sentences.push(SentenceRecord::new(row.sentence_id, row.sentence));
        }
    }

    Ok(sentences)
}

// ============================================================================
// Tests
// ============================================================================
