//! nerpipe Store - SQLite persistence and analytics
//!
//! Each pipeline writes to its own single-file SQLite database with one
//! `entities` table. Rows are only ever appended: re-running a pipeline
//! against the same file duplicates previously inserted entities.
//!
//! The LLM pipeline's table omits the confidence column; the other two
//! carry a nullable REAL.

use std::path::Path;
use std::str::FromStr;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use tracing::debug;

use nerpipe_core::{EntityRecord, NerError, Result};

// ============================================================================
// Store
// ============================================================================

/// SQLite-backed entity store
pub struct EntityStore {
    pool: SqlitePool,
    with_confidence: bool,
}

impl EntityStore {
    /// Open (or create) a database file and ensure the `entities` table
    /// exists. `with_confidence` selects the wider schema used by the
    /// transformer and statistical pipelines.
    pub async fn open(path: impl AsRef<Path>, with_confidence: bool) -> Result<Self> {
        let options = SqliteConnectOptions::new()
            .filename(path.as_ref())
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .map_err(|e| NerError::Store(format!("Failed to open database: {e}")))?;

        let store = Self {
            pool,
            with_confidence,
        };
        store.ensure_schema().await?;
        Ok(store)
    }

    /// Open an existing database file for read-only analytics.
    /// Fails if the file does not exist; the schema is not touched.
    pub async fn open_existing(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(NerError::Store(format!(
                "Database file not found: {}",
                path.display()
            )));
        }

        let options = SqliteConnectOptions::new().filename(path);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .map_err(|e| NerError::Store(format!("Failed to open database: {e}")))?;

        Ok(Self {
            pool,
            with_confidence: false,
        })
    }

    /// Open an in-memory database (for tests)
    pub async fn open_in_memory(with_confidence: bool) -> Result<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")
            .map_err(|e| NerError::Store(e.to_string()))?;

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .map_err(|e| NerError::Store(format!("Failed to open database: {e}")))?;

        let store = Self {
            pool,
            with_confidence,
        };
        store.ensure_schema().await?;
        Ok(store)
    }

    async fn ensure_schema(&self) -> Result<()> {
        let ddl = if self.with_confidence {
            "CREATE TABLE IF NOT EXISTS entities (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                sentence_id INTEGER,
                sentence TEXT,
                entity_text TEXT,
                entity_type TEXT,
                confidence REAL
            )"
        } else {
            "CREATE TABLE IF NOT EXISTS entities (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                sentence_id INTEGER,
                sentence TEXT,
                entity_text TEXT,
                entity_type TEXT
            )"
        };

        sqlx::query(ddl)
            .execute(&self.pool)
            .await
            .map_err(|e| NerError::Store(format!("Failed to create table: {e}")))?;

        Ok(())
    }

    /// Append records as new rows. Existing rows are never touched.
    pub async fn append(&self, records: &[EntityRecord]) -> Result<u64> {
        let mut inserted = 0u64;

        for record in records {
            let result = if self.with_confidence {
                sqlx::query(
                    "INSERT INTO entities (sentence_id, sentence, entity_text, entity_type, confidence)
                     VALUES (?, ?, ?, ?, ?)",
                )
                .bind(record.sentence_id)
                .bind(&record.sentence)
                .bind(&record.entity_text)
                .bind(&record.entity_type)
                .bind(record.confidence)
                .execute(&self.pool)
                .await
            } else {
                sqlx::query(
                    "INSERT INTO entities (sentence_id, sentence, entity_text, entity_type)
                     VALUES (?, ?, ?, ?)",
                )
                .bind(record.sentence_id)
                .bind(&record.sentence)
                .bind(&record.entity_text)
                .bind(&record.entity_type)
                .execute(&self.pool)
                .await
            };

            result.map_err(|e| NerError::Store(format!("Insert failed: {e}")))?;
            inserted += 1;
        }

        debug!(inserted, "appended entity records");
        Ok(inserted)
    }

    /// Total number of rows in the `entities` table
    pub async fn count(&self) -> Result<i64> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM entities")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| NerError::Store(format!("Count failed: {e}")))?;
        Ok(count)
    }

    /// Entity counts grouped by type, most frequent first
    pub async fn counts_by_type(&self) -> Result<Vec<(String, i64)>> {
        sqlx::query_as(
            "SELECT entity_type, COUNT(*)
             FROM entities
             GROUP BY entity_type
             ORDER BY COUNT(*) DESC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| NerError::Store(format!("Aggregate query failed: {e}")))
    }

    /// The most frequent entity texts, descending by occurrence count
    pub async fn top_entities(&self, limit: i64) -> Result<Vec<(String, i64)>> {
        sqlx::query_as(
            "SELECT entity_text, COUNT(*) AS cnt
             FROM entities
             GROUP BY entity_text
             ORDER BY cnt DESC
             LIMIT ?",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| NerError::Store(format!("Aggregate query failed: {e}")))
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn record(sentence_id: i64, text: &str, entity_type: &str) -> EntityRecord {
        EntityRecord {
            sentence_id,
            sentence: "some sentence".to_string(),
            entity_text: text.to_string(),
            entity_type: entity_type.to_string(),
            confidence: Some(0.9),
        }
    }

    #[tokio::test]
    async fn test_append_and_count() {
        let store = EntityStore::open_in_memory(true).await.unwrap();
        let records = vec![record(1, "Hawaii", "LOC"), record(1, "Obama", "PER")];

        let inserted = store.append(&records).await.unwrap();
        assert_eq!(inserted, 2);
        assert_eq!(store.count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_rerun_appends_not_replaces() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("entities.db");
        let records = vec![record(1, "Hawaii", "LOC"), record(2, "Geneva", "LOC")];

        {
            let store = EntityStore::open(&path, true).await.unwrap();
            store.append(&records).await.unwrap();
        }
        {
            let store = EntityStore::open(&path, true).await.unwrap();
            store.append(&records).await.unwrap();
            // Two runs over the same N records leave 2N rows
            assert_eq!(store.count().await.unwrap(), 4);
        }
    }

    #[tokio::test]
    async fn test_counts_by_type_descending() {
        let store = EntityStore::open_in_memory(true).await.unwrap();
        store
            .append(&[
                record(1, "Hawaii", "LOC"),
                record(2, "Geneva", "LOC"),
                record(3, "Obama", "PER"),
            ])
            .await
            .unwrap();

        let counts = store.counts_by_type().await.unwrap();
        assert_eq!(counts[0], ("LOC".to_string(), 2));
        assert_eq!(counts[1], ("PER".to_string(), 1));
    }

    #[tokio::test]
    async fn test_top_entities_limit() {
        let store = EntityStore::open_in_memory(true).await.unwrap();
        store
            .append(&[
                record(1, "Hawaii", "LOC"),
                record(2, "Hawaii", "LOC"),
                record(3, "Geneva", "LOC"),
                record(4, "Obama", "PER"),
            ])
            .await
            .unwrap();

        let top = store.top_entities(2).await.unwrap();
        assert_eq!(top.len(), 2);
        assert_eq!(top[0], ("Hawaii".to_string(), 2));
    }

    #[tokio::test]
    async fn test_open_existing_requires_file() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("absent.db");
        assert!(EntityStore::open_existing(&missing).await.is_err());
    }

    #[tokio::test]
    async fn test_open_existing_reads_prior_run() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("entities.db");

        {
            let store = EntityStore::open(&path, true).await.unwrap();
            store.append(&[record(1, "Hawaii", "LOC")]).await.unwrap();
        }

        let store = EntityStore::open_existing(&path).await.unwrap();
        assert_eq!(store.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_llm_schema_omits_confidence() {
        let store = EntityStore::open_in_memory(false).await.unwrap();
        let mut rec = record(1, "Hawaii", "LOCATION");
        rec.confidence = None;
        store.append(&[rec]).await.unwrap();

        // The narrow schema has no confidence column at all
        let result = sqlx::query("SELECT confidence FROM entities")
            .fetch_all(&store.pool)
            .await;
        assert!(result.is_err());
        assert_eq!(store.count().await.unwrap(), 1);
    }
}
