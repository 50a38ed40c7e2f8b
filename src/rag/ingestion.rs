use std::sync::Arc;

use super::store::{EmbeddingRecord, VectorStore};
use crate::core::errors::FlowError;
use crate::embedding::EmbeddingProvider;
use crate::history::{ChatId, Message, MessageLog};

/// Writes chat messages into the log and the vector store.
#[derive(Clone)]
pub struct IngestionFlow {
    messages: Arc<dyn MessageLog>,
    vectors: Arc<dyn VectorStore>,
    embedder: Arc<dyn EmbeddingProvider>,
}

impl IngestionFlow {
    pub fn new(
        messages: Arc<dyn MessageLog>,
        vectors: Arc<dyn VectorStore>,
        embedder: Arc<dyn EmbeddingProvider>,
    ) -> Self {
        Self {
            messages,
            vectors,
            embedder,
        }
    }

    /// Stores and embeds a message. Ingesting the same text twice is a no-op.
    pub async fn ingest(&self, chat_id: &ChatId, text: &str) -> Result<Message, FlowError> {
        let message = self.record(chat_id, text).await?;

        let known = self
            .vectors
            .existing_ids(chat_id, std::slice::from_ref(&message.id))
            .await?;
        if known.contains(&message.id) {
            tracing::debug!(chat_id = %chat_id, record_id = %message.id, "message already embedded");
            return Ok(message);
        }

        let vector = self.embedder.embed(&message.text).await?;
        self.vectors
            .upsert(vec![EmbeddingRecord {
                id: message.id.clone(),
                chat_id: chat_id.clone(),
                document: message.text.clone(),
                vector,
            }])
            .await?;

        tracing::debug!(chat_id = %chat_id, record_id = %message.id, "message ingested");
        Ok(message)
    }

    /// Appends a message to the log without embedding it. Questions about
    /// the chat embed it later.
    pub async fn record(&self, chat_id: &ChatId, text: &str) -> Result<Message, FlowError> {
        if text.trim().is_empty() {
            return Err(FlowError::Validation("text cannot be empty".to_string()));
        }
        Ok(self.messages.append(chat_id, text).await?)
    }
}
