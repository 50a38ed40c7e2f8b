use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use serde_json::json;

use super::utils::{json_body, require_chat_id};
use crate::core::errors::{ApiError, FlowError};
use crate::history::ChatId;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct MessagePayload {
    #[serde(default)]
    pub chat_id: Option<ChatId>,
    #[serde(default)]
    pub text: Option<String>,
}

impl MessagePayload {
    fn into_parts(self) -> Result<(ChatId, String), ApiError> {
        let chat_id = require_chat_id(self.chat_id)?;
        let text = self
            .text
            .ok_or_else(|| ApiError::BadRequest("No text provided".to_string()))?;
        Ok((chat_id, text))
    }
}

/// Stores and embeds one chat message.
pub async fn ingest(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<MessagePayload>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let (chat_id, text) = json_body(payload)?.into_parts()?;

    match state.ingestion.ingest(&chat_id, &text).await {
        Ok(message) => {
            state.metrics.record_ingested();
            tracing::info!(chat_id = %chat_id, record_id = %message.id, "message ingested");
            Ok(Json(json!({"status": "success"})))
        }
        Err(err) => {
            if !matches!(err, FlowError::Validation(_)) {
                state.metrics.record_ingest_failure();
                tracing::error!(chat_id = %chat_id, kind = err.kind(), error = %err, "ingestion failed");
            }
            Err(err.into())
        }
    }
}

/// Logs a chat message without embedding it.
pub async fn record_message(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<MessagePayload>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let (chat_id, text) = json_body(payload)?.into_parts()?;

    state.ingestion.record(&chat_id, &text).await.map_err(|err| {
        if !matches!(err, FlowError::Validation(_)) {
            tracing::error!(chat_id = %chat_id, kind = err.kind(), error = %err, "failed to record message");
        }
        ApiError::from(err)
    })?;
    state.metrics.record_recorded();

    Ok(Json(json!({"status": "success"})))
}
