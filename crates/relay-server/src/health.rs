//! `GET /health` — liveness probe

use axum::Json;
use axum::response::IntoResponse;
use serde_json::json;

/// Liveness check; no auth, no provider state
pub(crate) async fn health_handler() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}
