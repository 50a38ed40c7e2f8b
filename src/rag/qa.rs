//! Question answering over a chat's own history.

use std::sync::Arc;

use super::context_builder::{build_context, build_request};
use super::store::{EmbeddingRecord, VectorStore};
use crate::core::config::{GenerationSettings, RetrievalSettings};
use crate::core::errors::FlowError;
use crate::embedding::EmbeddingProvider;
use crate::history::{ChatId, Message, MessageLog};
use crate::llm::{strip_reasoning, GenerationProvider};

/// Returned when a chat has no messages or nothing relevant was retrieved.
pub const NO_HISTORY_ANSWER: &str = "No chat history found for this chat.";
/// Returned to clients when answering failed.
pub const DEGRADED_ANSWER: &str = "Error retrieving relevant history.";

#[derive(Debug, Clone, PartialEq)]
pub struct QaOptions {
    pub top_k: usize,
    pub min_score: Option<f32>,
    pub embed_batch_size: usize,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl QaOptions {
    pub fn new(
        retrieval: &RetrievalSettings,
        generation: &GenerationSettings,
        min_score: Option<f32>,
    ) -> Self {
        Self {
            top_k: retrieval.top_k,
            min_score,
            embed_batch_size: retrieval.embed_batch_size,
            max_tokens: generation.max_tokens,
            temperature: generation.temperature,
        }
    }
}

impl Default for QaOptions {
    fn default() -> Self {
        Self::new(&RetrievalSettings::default(), &GenerationSettings::default(), None)
    }
}

/// Outcome of [`QuestionAnswering::answer`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Answer {
    Generated(String),
    NoHistory,
}

impl Answer {
    pub fn text(&self) -> &str {
        match self {
            Answer::Generated(text) => text,
            Answer::NoHistory => NO_HISTORY_ANSWER,
        }
    }

    pub fn into_text(self) -> String {
        match self {
            Answer::Generated(text) => text,
            Answer::NoHistory => NO_HISTORY_ANSWER.to_string(),
        }
    }
}

#[derive(Clone)]
pub struct QuestionAnswering {
    messages: Arc<dyn MessageLog>,
    vectors: Arc<dyn VectorStore>,
    embedder: Arc<dyn EmbeddingProvider>,
    generator: Arc<dyn GenerationProvider>,
    options: QaOptions,
}

impl QuestionAnswering {
    pub fn new(
        messages: Arc<dyn MessageLog>,
        vectors: Arc<dyn VectorStore>,
        embedder: Arc<dyn EmbeddingProvider>,
        generator: Arc<dyn GenerationProvider>,
        options: QaOptions,
    ) -> Self {
        Self {
            messages,
            vectors,
            embedder,
            generator,
            options,
        }
    }

    pub fn options(&self) -> &QaOptions {
        &self.options
    }

    pub async fn answer(&self, chat_id: &ChatId, question: &str) -> Result<Answer, FlowError> {
        let history = self.messages.list(chat_id).await?;
        if history.is_empty() {
            tracing::debug!(chat_id = %chat_id, "no messages for chat");
            return Ok(Answer::NoHistory);
        }

        self.backfill(chat_id, &history).await?;

        let query = self.embedder.embed(question).await?;
        let hits: Vec<_> = self
            .vectors
            .query(chat_id, &query, self.options.top_k, self.options.min_score)
            .await?
            .into_iter()
            .filter(|hit| &hit.chat_id == chat_id)
            .collect();
        if hits.is_empty() {
            tracing::debug!(chat_id = %chat_id, "no relevant history retrieved");
            return Ok(Answer::NoHistory);
        }

        let context = build_context(&hits);
        let request = build_request(
            &context,
            question,
            self.options.max_tokens,
            self.options.temperature,
        );
        let raw = self.generator.complete(request).await?;

        tracing::debug!(
            chat_id = %chat_id,
            hits = hits.len(),
            provider = self.generator.name(),
            "answer generated"
        );
        Ok(Answer::Generated(strip_reasoning(&raw)))
    }

    /// Embeds every message of the chat that has no vector record yet.
    async fn backfill(&self, chat_id: &ChatId, history: &[Message]) -> Result<usize, FlowError> {
        let ids: Vec<String> = history.iter().map(|m| m.id.clone()).collect();
        let existing = self.vectors.existing_ids(chat_id, &ids).await?;
        let missing: Vec<&Message> = history
            .iter()
            .filter(|m| !existing.contains(&m.id))
            .collect();
        if missing.is_empty() {
            return Ok(0);
        }

        for batch in missing.chunks(self.options.embed_batch_size.max(1)) {
            let texts: Vec<String> = batch.iter().map(|m| m.text.clone()).collect();
            let vectors = self.embedder.embed_batch(&texts).await?;
            let records = batch
                .iter()
                .zip(vectors)
                .map(|(message, vector)| EmbeddingRecord {
                    id: message.id.clone(),
                    chat_id: chat_id.clone(),
                    document: message.text.clone(),
                    vector,
                })
                .collect();
            self.vectors.upsert(records).await?;
        }

        tracing::info!(chat_id = %chat_id, embedded = missing.len(), "backfilled embeddings");
        Ok(missing.len())
    }
}
