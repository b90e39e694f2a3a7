//! nerpipe Core - Domain models, errors, and configuration
//!
//! This crate defines the shared abstractions used by all three
//! extraction pipelines:
//! - Sentence and entity record types
//! - Pipeline identifiers
//! - Common error types
//! - Configuration management

pub mod config;

pub use config::{
    AppConfig, ConfigError, DatasetConfig, LlmConfig, LlmProvider, LoggingConfig, StoreConfig,
    TransformerConfig,
};

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

/// Core error types for nerpipe operations
#[derive(Error, Debug)]
pub enum NerError {
    #[error("Dataset error: {0}")]
    Dataset(String),

    #[error("LLM error: {0}")]
    Llm(String),

    #[error("Backend error: {0}")]
    Backend(String),

    #[error("Store error: {0}")]
    Store(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, NerError>;

// ============================================================================
// Pipeline Identifiers
// ============================================================================

/// The three extraction pipelines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Pipeline {
    /// Chat-completion model prompted for JSON output
    Llm,
    /// Hosted token-classification model with span aggregation
    Transformer,
    /// In-process pattern and gazetteer recognizer
    Statistical,
}

impl Pipeline {
    /// Default database file for this pipeline; each pipeline writes to
    /// its own file
    pub fn default_db_path(&self) -> &'static str {
        match self {
            Self::Llm => "ner_entities_llm.db",
            Self::Transformer => "ner_entities.db",
            Self::Statistical => "ner_entities_statistical.db",
        }
    }

    /// Whether records from this pipeline carry a confidence score.
    /// The LLM pipeline's table omits the confidence column entirely.
    pub fn has_confidence_column(&self) -> bool {
        !matches!(self, Self::Llm)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Llm => "llm",
            Self::Transformer => "transformer",
            Self::Statistical => "statistical",
        }
    }
}

impl std::fmt::Display for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// Records
// ============================================================================

/// A deduplicated input sentence
///
/// Source of truth is the input dataset; read-only for the lifetime
/// of a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SentenceRecord {
    pub sentence_id: i64,
    pub sentence: String,
}

impl SentenceRecord {
    pub fn new(sentence_id: i64, sentence: impl Into<String>) -> Self {
        Self {
            sentence_id,
            sentence: sentence.into(),
        }
    }
}

/// A normalized extracted entity, ready for persistence
///
/// Created once per extracted entity per run; never updated or deleted.
/// `entity_type` vocabularies are backend-specific: free-form for the LLM
/// pipeline, fixed tag sets for the other two. No cross-backend
/// normalization is performed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityRecord {
    /// Identifier of the originating sentence
    pub sentence_id: i64,

    /// Denormalized copy of the sentence text
    pub sentence: String,

    /// The entity span as reported by the backend
    pub entity_text: String,

    /// Backend-specific label
    pub entity_type: String,

    /// Model-reported score in [0, 1]; `None` for the statistical
    /// backend, which does not expose one
    pub confidence: Option<f64>,
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pipeline_db_paths() {
        assert_eq!(Pipeline::Llm.default_db_path(), "ner_entities_llm.db");
        assert_eq!(Pipeline::Transformer.default_db_path(), "ner_entities.db");
        assert_eq!(
            Pipeline::Statistical.default_db_path(),
            "ner_entities_statistical.db"
        );
    }

    #[test]
    fn test_confidence_column_per_pipeline() {
        assert!(!Pipeline::Llm.has_confidence_column());
        assert!(Pipeline::Transformer.has_confidence_column());
        assert!(Pipeline::Statistical.has_confidence_column());
    }

    #[test]
    fn test_pipeline_display() {
        assert_eq!(Pipeline::Transformer.to_string(), "transformer");
    }
}
