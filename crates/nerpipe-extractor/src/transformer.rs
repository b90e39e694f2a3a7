//! Transformer token-classification backend
//!
//! Sends each sentence to a hosted token-classification endpoint
//! configured to merge sub-word spans into whole-entity spans, and
//! decodes `{word, entity_group, score}` per detected span. The score
//! is carried through as confidence, rounded to four decimal places.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::warn;

use nerpipe_core::{NerError, Result, TransformerConfig};

use crate::{EntityBackend, ExtractedEntity, Extraction};

// ============================================================================
// Wire Types
// ============================================================================

#[derive(Debug, Serialize)]
struct InferenceRequest {
    inputs: String,
    parameters: InferenceParameters,
}

#[derive(Debug, Serialize)]
struct InferenceParameters {
    aggregation_strategy: String,
}

/// An aggregated entity span as returned by the inference server
#[derive(Debug, Deserialize)]
#[allow(dead_code)]
struct EntitySpan {
    entity_group: String,
    word: String,
    score: f64,
    start: Option<usize>,
    end: Option<usize>,
}

// ============================================================================
// Extractor
// ============================================================================

/// Token-classification extraction backend
pub struct TransformerExtractor {
    client: Client,
    url: String,
    aggregation_strategy: String,
}

impl TransformerExtractor {
    /// Create a new extractor for a model hosted at an inference endpoint
    pub fn new(
        endpoint: impl Into<String>,
        model: impl Into<String>,
        aggregation_strategy: impl Into<String>,
        timeout_secs: u64,
    ) -> Self {
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(timeout_secs))
                .build()
                .unwrap_or_default(),
            url: format!("{}/models/{}", endpoint.into(), model.into()),
            aggregation_strategy: aggregation_strategy.into(),
        }
    }

    /// Create from config
    pub fn from_config(config: &TransformerConfig) -> Self {
        Self::new(
            config.endpoint.clone(),
            config.model.clone(),
            config.aggregation_strategy.clone(),
            config.timeout_secs,
        )
    }

    /// Convert decoded spans into the common entity shape
    fn spans_to_entities(spans: Vec<EntitySpan>) -> Vec<ExtractedEntity> {
        spans
            .into_iter()
            .map(|span| ExtractedEntity {
                text: span.word,
                label: span.entity_group,
                confidence: Some(round4(span.score)),
            })
            .collect()
    }
}

/// Round a score to four decimal places
fn round4(score: f64) -> f64 {
    (score * 10_000.0).round() / 10_000.0
}

#[async_trait]
impl EntityBackend for TransformerExtractor {
    async fn extract(&self, text: &str) -> Result<Extraction> {
        let request = InferenceRequest {
            inputs: text.to_string(),
            parameters: InferenceParameters {
                aggregation_strategy: self.aggregation_strategy.clone(),
            },
        };

        let response = self
            .client
            .post(&self.url)
            .json(&request)
            .send()
            .await
            .map_err(|e| NerError::Backend(format!("Inference request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            warn!(%status, url = %self.url, "token-classification request failed");
            return Err(NerError::Backend(format!(
                "Inference server error: {error_text}"
            )));
        }

        let spans: Vec<EntitySpan> = response
            .json()
            .await
            .map_err(|e| NerError::Backend(format!("Failed to decode spans: {e}")))?;

        let entities = Self::spans_to_entities(spans);
        if entities.is_empty() {
            Ok(Extraction::Empty)
        } else {
            Ok(Extraction::Entities(entities))
        }
    }

    fn name(&self) -> &str {
        "transformer"
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_composition() {
        let ex = TransformerExtractor::new("http://localhost:8080", "dslim/bert-base-NER", "simple", 60);
        assert_eq!(ex.url, "http://localhost:8080/models/dslim/bert-base-NER");
    }

    #[test]
    fn test_score_rounded_to_four_decimals() {
        assert_eq!(round4(0.99876543), 0.9988);
        assert_eq!(round4(0.123449), 0.1234);
        assert_eq!(round4(1.0), 1.0);
    }

    #[test]
    fn test_spans_decode_and_convert() {
        let body = r#"[
            {"entity_group": "PER", "word": "Barack Obama", "score": 0.99876543, "start": 0, "end": 12},
            {"entity_group": "LOC", "word": "Hawaii", "score": 0.9991, "start": 25, "end": 31}
        ]"#;
        let spans: Vec<EntitySpan> = serde_json::from_str(body).unwrap();
        let entities = TransformerExtractor::spans_to_entities(spans);

        assert_eq!(entities.len(), 2);
        assert_eq!(entities[0].text, "Barack Obama");
        assert_eq!(entities[0].label, "PER");
        assert_eq!(entities[0].confidence, Some(0.9988));
        assert_eq!(entities[1].confidence, Some(0.9991));
    }
}
