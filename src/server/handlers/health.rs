use std::sync::Arc;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

use crate::state::AppState;

pub async fn health() -> &'static str {
    "OK"
}

pub async fn get_status(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "backend": state.settings.backend.as_str(),
        "uptime_secs": state.uptime().as_secs(),
        "metrics": state.metrics.snapshot(),
    }))
}
