//! LLM-based extraction backend
//!
//! Wraps each sentence in a fixed instruction template, sends it to a
//! chat-completion client at zero temperature, and recovers a JSON
//! array of `{text, label}` objects from the free-form reply.
//!
//! Recovery scans for the first *balanced* bracketed span that parses
//! as an entity array, so bracketed prose before or after the intended
//! array does not break extraction. A reply without any parseable
//! array is reported as `Extraction::Malformed` rather than silently
//! dropped.

use async_trait::async_trait;
use serde::Deserialize;

use nerpipe_core::Result;
use nerpipe_llm::ChatClient;

use crate::{EntityBackend, ExtractedEntity, Extraction};

// ============================================================================
// Configuration
// ============================================================================

/// Configuration for the LLM extraction backend
#[derive(Debug, Clone)]
pub struct LlmExtractorConfig {
    /// Instruction template prepended to every sentence
    pub prompt: String,
}

impl Default for LlmExtractorConfig {
    fn default() -> Self {
        Self {
            prompt: include_str!("prompts/ner_system.txt").to_string(),
        }
    }
}

// ============================================================================
// Extractor
// ============================================================================

/// LLM extraction backend
pub struct LlmExtractor {
    client: Box<dyn ChatClient>,
    config: LlmExtractorConfig,
}

/// Entity structure expected in the model's JSON output
#[derive(Debug, Deserialize)]
struct LlmEntity {
    text: String,
    label: String,
    #[serde(default)]
    confidence: Option<f64>,
}

impl LlmExtractor {
    /// Create a new extractor over a chat client with the default prompt
    pub fn new(client: Box<dyn ChatClient>) -> Self {
        Self {
            client,
            config: LlmExtractorConfig::default(),
        }
    }

    /// Create with custom config
    pub fn with_config(client: Box<dyn ChatClient>, config: LlmExtractorConfig) -> Self {
        Self { client, config }
    }

    /// Build the extraction prompt for one sentence
    pub fn build_prompt(&self, text: &str) -> String {
        format!("{}\nText:\n\"{}\"\n", self.config.prompt, text)
    }

    /// Parse a model reply into an extraction outcome
    pub fn parse_reply(&self, raw: &str) -> Extraction {
        match find_entity_array(raw) {
            Some(entities) if entities.is_empty() => Extraction::Empty,
            Some(entities) => Extraction::Entities(
                entities
                    .into_iter()
                    .map(|e| ExtractedEntity {
                        text: e.text,
                        label: e.label,
                        confidence: e.confidence,
                    })
                    .collect(),
            ),
            None => Extraction::Malformed {
                raw: raw.to_string(),
            },
        }
    }
}

#[async_trait]
impl EntityBackend for LlmExtractor {
    async fn extract(&self, text: &str) -> Result<Extraction> {
        let prompt = self.build_prompt(text);
        let reply = self.client.complete(&prompt).await?;
        Ok(self.parse_reply(reply.trim()))
    }

    fn name(&self) -> &str {
        "llm"
    }
}

// ============================================================================
// JSON Array Recovery
// ============================================================================

/// Find the first balanced bracketed span that parses as an entity array
fn find_entity_array(raw: &str) -> Option<Vec<LlmEntity>> {
    for (start, c) in raw.char_indices() {
        if c != '[' {
            continue;
        }
        if let Some(end) = balanced_array_end(raw, start) {
            if let Ok(entities) = serde_json::from_str::<Vec<LlmEntity>>(&raw[start..=end]) {
                return Some(entities);
            }
        }
    }
    None
}

/// Byte index of the `]` closing the array opened at `start`, tracking
/// string literals so brackets inside entity text do not count
fn balanced_array_end(s: &str, start: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, c) in s[start..].char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }

        match c {
            '"' => in_string = true,
            '[' => depth += 1,
            ']' => {
                depth -= 1;
                if depth == 0 {
                    return Some(start + offset);
                }
            }
            _ => {}
        }
    }

    None
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use nerpipe_core::NerError;

    struct FixedReply(String);

    #[async_trait]
    impl ChatClient for FixedReply {
        async fn complete(&self, _prompt: &str) -> Result<String> {
            Ok(self.0.clone())
        }

        fn name(&self) -> &str {
            "fixed"
        }
    }

    struct FailingClient;

    #[async_trait]
    impl ChatClient for FailingClient {
        async fn complete(&self, _prompt: &str) -> Result<String> {
            Err(NerError::Llm("connection refused".to_string()))
        }

        fn name(&self) -> &str {
            "failing"
        }
    }

    fn extractor(reply: &str) -> LlmExtractor {
        LlmExtractor::new(Box::new(FixedReply(reply.to_string())))
    }

    #[test]
    fn test_prompt_contains_sentence_and_instructions() {
        let ex = extractor("[]");
        let prompt = ex.build_prompt("Barack Obama was born in Hawaii.");
        assert!(prompt.contains("Return ONLY valid JSON"));
        assert!(prompt.contains("Barack Obama was born in Hawaii."));
    }

    #[tokio::test]
    async fn test_valid_array_yields_entities() {
        let ex = extractor(
            r#"Here are the entities:
[
  {"text": "Barack Obama", "label": "PERSON"},
  {"text": "Hawaii", "label": "LOCATION"}
]"#,
        );

        let result = ex.extract("Barack Obama was born in Hawaii.").await.unwrap();
        let entities = result.entities();
        assert_eq!(entities.len(), 2);
        assert_eq!(entities[0].text, "Barack Obama");
        assert_eq!(entities[0].label, "PERSON");
        assert_eq!(entities[0].confidence, None);
        assert_eq!(entities[1].text, "Hawaii");
    }

    #[tokio::test]
    async fn test_model_supplied_confidence_is_kept() {
        let ex = extractor(r#"[{"text": "Hawaii", "label": "LOCATION", "confidence": 0.92}]"#);
        let result = ex.extract("x").await.unwrap();
        assert_eq!(result.entities()[0].confidence, Some(0.92));
    }

    #[tokio::test]
    async fn test_empty_array_is_empty_not_malformed() {
        let ex = extractor("[]");
        let result = ex.extract("nothing here").await.unwrap();
        assert_eq!(result, Extraction::Empty);
    }

    #[tokio::test]
    async fn test_no_array_is_malformed() {
        let ex = extractor("I could not find any entities in that sentence.");
        let result = ex.extract("x").await.unwrap();
        assert!(matches!(result, Extraction::Malformed { .. }));
    }

    #[tokio::test]
    async fn test_invalid_json_inside_brackets_is_malformed() {
        let ex = extractor("[not json at all]");
        let result = ex.extract("x").await.unwrap();
        assert!(matches!(result, Extraction::Malformed { .. }));
    }

    #[tokio::test]
    async fn test_bracketed_prose_before_array_is_skipped() {
        let ex = extractor(
            r#"Sure [see note 1], the result is:
[{"text": "Geneva", "label": "LOCATION"}]
[end of answer]"#,
        );
        let result = ex.extract("x").await.unwrap();
        let entities = result.entities();
        assert_eq!(entities.len(), 1);
        assert_eq!(entities[0].text, "Geneva");
    }

    #[test]
    fn test_bracket_inside_entity_text_string() {
        let ex = extractor("");
        let reply = r#"[{"text": "Act [2020]", "label": "MISC"}]"#;
        let result = ex.parse_reply(reply);
        assert_eq!(result.entities()[0].text, "Act [2020]");
    }

    #[test]
    fn test_unclosed_bracket_is_malformed() {
        let ex = extractor("");
        let result = ex.parse_reply(r#"[{"text": "Hawaii", "label": "LOC"}"#);
        assert!(matches!(result, Extraction::Malformed { .. }));
    }

    #[tokio::test]
    async fn test_backend_failure_is_an_error() {
        let ex = LlmExtractor::new(Box::new(FailingClient));
        let result = ex.extract("x").await;
        assert!(matches!(result, Err(NerError::Llm(_))));
    }
}
