//! `GET /v1/providers` — active providers with state hints

use axum::Json;
use axum::extract::State;
use axum::response::{IntoResponse as _, Response};
use http::HeaderMap;
use serde_json::json;

use crate::state::RelayState;

/// Enumerate active providers: kind, breaker state, and key count,
/// never credentials
pub(crate) async fn providers_handler(
    State(state): State<RelayState>,
    headers: HeaderMap,
) -> Response {
    if let Err(e) = state.inner().auth.check(&headers) {
        return e.into_response();
    }

    let providers: Vec<serde_json::Value> = state
        .inner()
        .providers
        .iter()
        .map(|provider| {
            json!({
                "name": provider.name,
                "type": provider.kind.as_str(),
                "enabled": true,
                "health": state.inner().breakers.state(&provider.name).as_str(),
                "keys": provider.pool.len(),
                "models": provider.models,
            })
        })
        .collect();

    Json(json!({ "providers": providers })).into_response()
}
