use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use super::utils::{json_body, require_chat_id, require_text};
use crate::core::errors::ApiError;
use crate::history::ChatId;
use crate::rag::{Answer, DEGRADED_ANSWER};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct AskPayload {
    #[serde(default)]
    pub chat_id: Option<ChatId>,
    #[serde(default)]
    pub question: Option<String>,
}

/// Answers a question from the chat's own history.
///
/// Failures past input validation still answer 200 with a fixed message;
/// the cause is only logged.
pub async fn ask(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<AskPayload>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let payload = json_body(payload)?;
    let chat_id = require_chat_id(payload.chat_id)?;
    let question = require_text(payload.question, "question")?;

    let request_id = Uuid::new_v4();
    let answer = match state.qa.answer(&chat_id, &question).await {
        Ok(answer) => {
            match answer {
                Answer::Generated(_) => state.metrics.record_answered(),
                Answer::NoHistory => state.metrics.record_no_history(),
            }
            answer.into_text()
        }
        Err(err) => {
            state.metrics.record_degraded();
            tracing::error!(
                request_id = %request_id,
                chat_id = %chat_id,
                kind = err.kind(),
                error = %err,
                "failed to answer question"
            );
            DEGRADED_ANSWER.to_string()
        }
    };

    Ok(Json(json!({ "answer": answer })))
}
