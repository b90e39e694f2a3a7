//! Sequential batch runner shared by the three pipelines
//!
//! Processes sentences strictly one at a time; a backend call blocks
//! the run until it returns. Malformed LLM replies are logged and
//! counted instead of silently dropped, but still contribute zero
//! records.

use tracing::{info, warn};

use nerpipe_core::{EntityRecord, Result, SentenceRecord};
use nerpipe_extractor::{normalize, EntityBackend, Extraction};
use nerpipe_store::EntityStore;

/// Counters accumulated over one run
#[derive(Debug, Clone, Copy, Default)]
pub struct RunSummary {
    /// Sentences processed
    pub processed: usize,
    /// Sentences with at least one entity
    pub matched: usize,
    /// Sentences where the backend found nothing
    pub empty: usize,
    /// Sentences skipped because the model reply was unusable
    pub malformed: usize,
}

/// Run a backend over every sentence and collect normalized records
pub async fn run_extraction(
    backend: &dyn EntityBackend,
    sentences: &[SentenceRecord],
) -> Result<(Vec<EntityRecord>, RunSummary)> {
    let mut records = Vec::new();
    let mut summary = RunSummary::default();

    for sentence in sentences {
        let extraction = backend.extract(&sentence.sentence).await?;
        summary.processed += 1;

        match extraction {
            Extraction::Entities(entities) => {
                summary.matched += 1;
                records.extend(normalize(sentence, &entities));
            }
            Extraction::Empty => {
                summary.empty += 1;
            }
            Extraction::Malformed { raw } => {
                summary.malformed += 1;
                warn!(
                    sentence_id = sentence.sentence_id,
                    reply_len = raw.len(),
                    "skipping sentence: no parseable entity array in model reply"
                );
            }
        }
    }

    info!(
        backend = backend.name(),
        processed = summary.processed,
        extracted = records.len(),
        "extraction run finished"
    );

    Ok((records, summary))
}

/// Print the first few extracted records
pub fn print_sample(records: &[EntityRecord], n: usize) {
    if records.is_empty() {
        return;
    }

    println!("\nSample extracted entities:");
    for record in records.iter().take(n) {
        match record.confidence {
            Some(confidence) => println!(
                "  [{}] {} ({}, {:.4})",
                record.sentence_id, record.entity_text, record.entity_type, confidence
            ),
            None => println!(
                "  [{}] {} ({})",
                record.sentence_id, record.entity_text, record.entity_type
            ),
        }
    }
}

/// Print the two frequency-analytics tables
pub async fn print_report(store: &EntityStore) -> Result<()> {
    println!("\nEntity counts by type:");
    for (entity_type, count) in store.counts_by_type().await? {
        println!("  {entity_type}: {count}");
    }

    println!("\nMost frequent entities:");
    for (entity_text, count) in store.top_entities(10).await? {
        println!("  {entity_text}: {count}");
    }

    Ok(())
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use nerpipe_extractor::ExtractedEntity;

    /// Backend that alternates between outcomes per sentence id parity
    struct ScriptedBackend;

    #[async_trait]
    impl EntityBackend for ScriptedBackend {
        async fn extract(&self, text: &str) -> Result<Extraction> {
            Ok(match text {
                t if t.contains("Hawaii") => Extraction::Entities(vec![
                    ExtractedEntity {
                        text: "Barack Obama".to_string(),
                        label: "PER".to_string(),
                        confidence: Some(0.99),
                    },
                    ExtractedEntity {
                        text: "Hawaii".to_string(),
                        label: "LOC".to_string(),
                        confidence: Some(0.98),
                    },
                ]),
                t if t.contains("garbled") => Extraction::Malformed {
                    raw: "```no json```".to_string(),
                },
                _ => Extraction::Empty,
            })
        }

        fn name(&self) -> &str {
            "scripted"
        }
    }

    #[tokio::test]
    async fn test_run_collects_and_counts() {
        let sentences = vec![
            SentenceRecord::new(1, "Barack Obama was born in Hawaii."),
            SentenceRecord::new(2, "nothing here"),
            SentenceRecord::new(3, "garbled reply"),
        ];

        let (records, summary) = run_extraction(&ScriptedBackend, &sentences).await.unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].sentence_id, 1);
        assert_eq!(records[1].entity_text, "Hawaii");
        assert_eq!(summary.processed, 3);
        assert_eq!(summary.matched, 1);
        assert_eq!(summary.empty, 1);
        assert_eq!(summary.malformed, 1);
    }
}
