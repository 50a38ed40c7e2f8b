//! SQLite-backed vector store.
//!
//! In-process index: records live in SQLite with their embeddings
//! serialized as little-endian `f32` blobs, and queries rank a chat's
//! records by brute-force cosine similarity.

use std::collections::HashSet;
use std::path::PathBuf;

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{QueryBuilder, Row, Sqlite, SqlitePool};

use super::store::{EmbeddingRecord, ScoredRecord, VectorStore};
use crate::core::config::AppPaths;
use crate::core::errors::StoreError;
use crate::history::ChatId;

pub struct SqliteVectorStore {
    pool: SqlitePool,
}

impl SqliteVectorStore {
    pub async fn new(paths: &AppPaths) -> Result<Self, StoreError> {
        Self::with_path(paths.rag_db_path.clone()).await
    }

    pub async fn with_path(db_path: PathBuf) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::new()
            .filename(&db_path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal);

        let pool = SqlitePoolOptions::new()
            .min_connections(1)
            .max_connections(4)
            .connect_with(options)
            .await?;

        let store = Self { pool };
        store.init_schema().await?;
        Ok(store)
    }

    async fn init_schema(&self) -> Result<(), StoreError> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS rag_records (
                record_id TEXT PRIMARY KEY,
                chat_id TEXT NOT NULL,
                document TEXT NOT NULL,
                embedding BLOB NOT NULL,
                created_at TEXT NOT NULL DEFAULT (STRFTIME('%Y-%m-%dT%H:%M:%fZ', 'now'))
            )",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_rag_records_chat ON rag_records(chat_id)")
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    fn serialize_embedding(embedding: &[f32]) -> Vec<u8> {
        embedding.iter().flat_map(|f| f.to_le_bytes()).collect()
    }

    fn deserialize_embedding(bytes: &[u8]) -> Vec<f32> {
        bytes
            .chunks_exact(4)
            .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
            .collect()
    }

    fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
        if a.len() != b.len() || a.is_empty() {
            return 0.0;
        }

        let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
        let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
        let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
        let denom = norm_a * norm_b;

        if denom <= f32::EPSILON {
            0.0
        } else {
            dot / denom
        }
    }
}

#[async_trait]
impl VectorStore for SqliteVectorStore {
    async fn existing_ids(
        &self,
        chat_id: &ChatId,
        ids: &[String],
    ) -> Result<HashSet<String>, StoreError> {
        if ids.is_empty() {
            return Ok(HashSet::new());
        }

        let mut builder: QueryBuilder<Sqlite> =
            QueryBuilder::new("SELECT record_id FROM rag_records WHERE chat_id = ");
        builder.push_bind(chat_id.as_str());
        builder.push(" AND record_id IN (");
        let mut separated = builder.separated(", ");
        for id in ids {
            separated.push_bind(id.as_str());
        }
        separated.push_unseparated(")");

        let rows = builder.build().fetch_all(&self.pool).await?;
        rows.iter()
            .map(|row| row.try_get::<String, _>("record_id").map_err(StoreError::from))
            .collect()
    }

    async fn upsert(&self, records: Vec<EmbeddingRecord>) -> Result<(), StoreError> {
        if records.is_empty() {
            return Ok(());
        }

        let mut tx = self.pool.begin().await?;

        for record in &records {
            let blob = Self::serialize_embedding(&record.vector);
            sqlx::query(
                "INSERT OR IGNORE INTO rag_records (record_id, chat_id, document, embedding)
                 VALUES (?1, ?2, ?3, ?4)",
            )
            .bind(&record.id)
            .bind(record.chat_id.as_str())
            .bind(&record.document)
            .bind(&blob)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn query(
        &self,
        chat_id: &ChatId,
        embedding: &[f32],
        limit: usize,
        min_score: Option<f32>,
    ) -> Result<Vec<ScoredRecord>, StoreError> {
        let rows = sqlx::query(
            "SELECT record_id, document, embedding
             FROM rag_records
             WHERE chat_id = ?1",
        )
        .bind(chat_id.as_str())
        .fetch_all(&self.pool)
        .await?;

        let mut scored = Vec::with_capacity(rows.len());
        for row in &rows {
            let embedding_bytes: Vec<u8> = row.try_get("embedding")?;
            if embedding_bytes.is_empty() {
                continue;
            }
            let stored = Self::deserialize_embedding(&embedding_bytes);
            let score = Self::cosine_similarity(embedding, &stored);
            if min_score.is_some_and(|min| score < min) {
                continue;
            }

            scored.push(ScoredRecord {
                id: row.try_get("record_id")?,
                chat_id: chat_id.clone(),
                document: row.try_get("document")?,
                score,
            });
        }

        scored.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        scored.truncate(limit.max(1));

        Ok(scored)
    }

    async fn count(&self, chat_id: Option<&ChatId>) -> Result<usize, StoreError> {
        let count: i64 = if let Some(chat_id) = chat_id {
            sqlx::query_scalar("SELECT COUNT(*) FROM rag_records WHERE chat_id = ?1")
                .bind(chat_id.as_str())
                .fetch_one(&self.pool)
                .await?
        } else {
            sqlx::query_scalar("SELECT COUNT(*) FROM rag_records")
                .fetch_one(&self.pool)
                .await?
        };

        Ok(count as usize)
    }
}
