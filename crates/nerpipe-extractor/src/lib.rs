//! nerpipe Extractor - Named-entity extraction backends
//!
//! Implements the three extraction strategies:
//! - LLM-based: prompt a chat model for a JSON array of entities
//! - Transformer: hosted token-classification with span aggregation
//! - Statistical: in-process pattern and gazetteer recognizer
//!
//! All backends produce the same `ExtractedEntity` shape, which the
//! normalizer flattens into persistable `EntityRecord`s.

use async_trait::async_trait;

use nerpipe_core::{EntityRecord, Result, SentenceRecord};

pub mod llm;
pub mod statistical;
pub mod transformer;

pub use llm::{LlmExtractor, LlmExtractorConfig};
pub use statistical::StatisticalExtractor;
pub use transformer::TransformerExtractor;

// ============================================================================
// Extraction Types
// ============================================================================

/// An entity span reported by a backend
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedEntity {
    /// The entity text
    pub text: String,
    /// Backend-specific label
    pub label: String,
    /// Model-reported score in [0, 1], where the backend exposes one
    pub confidence: Option<f64>,
}

/// Outcome of extracting entities from one sentence
///
/// Distinguishes a genuinely empty result from unusable model output.
/// Only the LLM backend ever produces `Malformed`; a failed backend
/// call is an `Err` instead.
#[derive(Debug, Clone, PartialEq)]
pub enum Extraction {
    /// One or more entities were found
    Entities(Vec<ExtractedEntity>),
    /// The backend found no entities in the sentence
    Empty,
    /// The model reply contained no parseable entity array
    Malformed {
        /// The raw reply, kept for diagnostics
        raw: String,
    },
}

impl Extraction {
    /// Entities found, or an empty slice for the other outcomes
    pub fn entities(&self) -> &[ExtractedEntity] {
        match self {
            Self::Entities(entities) => entities,
            _ => &[],
        }
    }
}

// ============================================================================
// Backend Trait
// ============================================================================

/// Trait for entity extraction backends
#[async_trait]
pub trait EntityBackend: Send + Sync {
    /// Extract entities from one sentence
    async fn extract(&self, text: &str) -> Result<Extraction>;

    /// Backend name for logging
    fn name(&self) -> &str;
}

// ============================================================================
// Record Normalizer
// ============================================================================

/// Flatten a sentence and its extracted entities into persistable records
pub fn normalize(sentence: &SentenceRecord, entities: &[ExtractedEntity]) -> Vec<EntityRecord> {
    entities
        .iter()
        .map(|entity| EntityRecord {
            sentence_id: sentence.sentence_id,
            sentence: sentence.sentence.clone(),
            entity_text: entity.text.clone(),
            entity_type: entity.label.clone(),
            confidence: entity.confidence,
        })
        .collect()
}

// ============================================================================
// Tests
// ============================================================================
