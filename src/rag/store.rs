//! VectorStore trait: abstract interface for embedding storage backends.
//!
//! Records are always scoped to one chat: queries take a chat id and must
//! never return records of another chat.

use std::collections::HashSet;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::core::errors::StoreError;
use crate::history::ChatId;

/// An embedded message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingRecord {
    /// Content-derived id, shared with the message it was built from.
    pub id: String,
    pub chat_id: ChatId,
    /// The embedded text.
    pub document: String,
    pub vector: Vec<f32>,
}

/// Result of a similarity query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredRecord {
    pub id: String,
    pub chat_id: ChatId,
    pub document: String,
    /// Cosine similarity (higher = better).
    pub score: f32,
}

#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Which of `ids` already have a record in `chat_id`.
    async fn existing_ids(
        &self,
        chat_id: &ChatId,
        ids: &[String],
    ) -> Result<HashSet<String>, StoreError>;

    /// Stores records. An id that is already stored keeps a single row.
    async fn upsert(&self, records: Vec<EmbeddingRecord>) -> Result<(), StoreError>;

    /// Top `limit` records of `chat_id` by similarity to `embedding`,
    /// best first. Records scoring below `min_score` are dropped.
    async fn query(
        &self,
        chat_id: &ChatId,
        embedding: &[f32],
        limit: usize,
        min_score: Option<f32>,
    ) -> Result<Vec<ScoredRecord>, StoreError>;

    /// Number of records, optionally restricted to one chat.
    async fn count(&self, chat_id: Option<&ChatId>) -> Result<usize, StoreError>;
}
