//! Prompt assembly for retrieved chat history.

use crate::llm::{ChatMessage, ChatRequest};

use super::store::ScoredRecord;

pub const SYSTEM_PROMPT: &str = "You are a helpful assistant. Use the context to answer. \
Provide ONLY the final answer. Do not reveal your reasoning.";

/// Joins retrieved documents with newlines, best match first.
pub fn build_context(records: &[ScoredRecord]) -> String {
    records
        .iter()
        .map(|record| record.document.as_str())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Builds the generation request for a question over `context`.
pub fn build_request(
    context: &str,
    question: &str,
    max_tokens: u32,
    temperature: f32,
) -> ChatRequest {
    ChatRequest::new(vec![
        ChatMessage::system(SYSTEM_PROMPT),
        ChatMessage::user(format!("Context:\n{}\n\nQuestion:\n{}", context, question)),
    ])
    .with_max_tokens(max_tokens)
    .with_temperature(temperature)
}
