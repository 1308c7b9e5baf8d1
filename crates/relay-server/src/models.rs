//! `GET /v1/models` — flattened model list across providers

use axum::Json;
use axum::extract::State;
use axum::response::{IntoResponse as _, Response};
use http::HeaderMap;
use serde_json::json;

use crate::state::RelayState;

/// List every model advertised by the enabled providers
pub(crate) async fn models_handler(
    State(state): State<RelayState>,
    headers: HeaderMap,
) -> Response {
    if let Err(e) = state.inner().auth.check(&headers) {
        return e.into_response();
    }

    let data: Vec<serde_json::Value> = state
        .inner()
        .providers
        .iter()
        .flat_map(|provider| {
            provider.models.iter().map(|model| {
                json!({
                    "id": model,
                    "object": "model",
                    "owned_by": provider.name,
                })
            })
        })
        .collect();

    Json(json!({
        "object": "list",
        "data": data,
    }))
    .into_response()
}
