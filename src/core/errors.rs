use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn internal<E: std::fmt::Display>(err: E) -> Self {
        ApiError::Internal(err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        let body = Json(json!({ "error": message }));
        (status, body).into_response()
    }
}

/// Failures of the message log or the vector store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("store request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("store returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("malformed store response: {0}")]
    Decode(String),
    #[error("vector has {actual} dimensions, store expects {expected}")]
    Dimension { expected: usize, actual: usize },
}

#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("embedding request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("embedding service returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("expected {expected} embeddings, got {actual}")]
    CountMismatch { expected: usize, actual: usize },
    #[error("embedding dimensions disagree: {expected} != {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
    #[error("embedding service returned no vectors")]
    Empty,
}

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("generation request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("generation service returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("generation response had no choices")]
    NoChoices,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {message}")]
    Read { path: String, message: String },
    #[error("failed to parse {path}: {message}")]
    Parse { path: String, message: String },
    #[error("invalid environment variable {name}: {message}")]
    Env { name: &'static str, message: String },
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Error surfaced by the ingestion and question-answering flows.
#[derive(Debug, Error)]
pub enum FlowError {
    #[error("{0}")]
    Validation(String),
    #[error(transparent)]
    Storage(#[from] StoreError),
    #[error(transparent)]
    Embedding(#[from] EmbeddingError),
    #[error(transparent)]
    Generation(#[from] GenerationError),
}

impl FlowError {
    /// Short label used as a structured log field.
    pub fn kind(&self) -> &'static str {
        match self {
            FlowError::Validation(_) => "validation",
            FlowError::Storage(_) => "storage",
            FlowError::Embedding(_) => "embedding",
            FlowError::Generation(_) => "generation",
        }
    }
}

impl From<FlowError> for ApiError {
    fn from(err: FlowError) -> Self {
        match err {
            FlowError::Validation(msg) => ApiError::BadRequest(msg),
            other => ApiError::internal(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_maps_to_bad_request() {
        let api: ApiError = FlowError::Validation("No text provided".to_string()).into();
        assert!(matches!(api, ApiError::BadRequest(ref msg) if msg == "No text provided"));
        assert_eq!(api.into_response().status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn dependency_failures_map_to_internal() {
        let err = FlowError::from(StoreError::Status {
            status: 503,
            body: "down".to_string(),
        });
        assert_eq!(err.kind(), "storage");

        let api: ApiError = err.into();
        assert_eq!(api.into_response().status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
