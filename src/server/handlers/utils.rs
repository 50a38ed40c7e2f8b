use axum::extract::rejection::JsonRejection;
use axum::Json;

use crate::core::errors::ApiError;
use crate::history::ChatId;

/// Unwraps a JSON body, reporting malformed input as 400.
pub fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    payload
        .map(|Json(body)| body)
        .map_err(|rejection| ApiError::BadRequest(rejection.body_text()))
}

pub fn require_chat_id(chat_id: Option<ChatId>) -> Result<ChatId, ApiError> {
    chat_id.ok_or_else(|| ApiError::BadRequest("Missing chat_id".to_string()))
}

/// A present, non-blank string field.
pub fn require_text(value: Option<String>, field: &str) -> Result<String, ApiError> {
    match value {
        Some(value) if !value.trim().is_empty() => Ok(value),
        Some(_) => Err(ApiError::BadRequest(format!("{} cannot be empty", field))),
        None => Err(ApiError::BadRequest(format!("Missing {}", field))),
    }
}
