use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use serde_json::json;

use super::utils::json_body;
use crate::core::errors::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SentimentPayload {
    #[serde(default)]
    pub text: Option<String>,
}

/// Empty text is accepted and classifies as neutral.
pub async fn sentiment(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<SentimentPayload>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let text = json_body(payload)?
        .text
        .ok_or_else(|| ApiError::BadRequest("No text provided".to_string()))?;

    let label = state.sentiment.classify(&text);
    state.metrics.record_sentiment();

    Ok(Json(json!({ "sentiment": label })))
}
