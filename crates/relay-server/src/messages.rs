//! `POST /v1/messages` — the data plane
//!
//! Every request walks the same pipeline: auth gate, model extraction,
//! candidate narrowing, provider selection, key selection, thinking
//! rewrite, dialect transform, upstream call, then response relay with
//! breaker and pool accounting.

use std::sync::Arc;

use axum::body::Body;
use axum::extract::State;
use axum::response::{IntoResponse as _, Response};
use bytes::Bytes;
use http::HeaderMap;
use relay_core::{
    RequestContext, estimate_input_tokens, extract_model, extract_stream, has_thinking_blocks,
};
use relay_health::is_failure_status;
use relay_pool::TokenUsage;
use relay_sigcache::{ThinkingTap, absorb_response, rewrite_request};
use relay_upstream::{TransformInput, UpstreamError};

use crate::debug::{self, RouteReport};
use crate::error::ServerError;
use crate::state::{ProviderHandle, RelayState};
use crate::stream::{StreamTelemetry, eventstream_relay, sse_headers, sse_passthrough};

/// Handle one Messages API request
pub(crate) async fn messages_handler(
    State(state): State<RelayState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let debug_wanted = debug::wants_debug(&state, &headers);

    match handle(&state, headers, body).await {
        Ok((mut response, report)) => {
            if debug_wanted {
                debug::attach(
                    response.headers_mut(),
                    state.inner().routing.strategy,
                    &report,
                );
            }
            response
        }
        Err(e) => e.into_response(),
    }
}

async fn handle(
    state: &RelayState,
    headers: HeaderMap,
    body: Bytes,
) -> Result<(Response, RouteReport), ServerError> {
    let inner = state.inner();

    let auth = inner.auth.check(&headers)?;

    let mut ctx = RequestContext::new(headers);
    ctx.client_supplied_auth = auth.client_supplied_auth;
    ctx.model = extract_model(&body).map_err(|_| ServerError::BodyNotJson)?;
    ctx.stream = extract_stream(&body);
    let model = ctx.model.clone().ok_or(ServerError::ModelMissing)?;

    if inner.debug_options.log_request_body {
        tracing::trace!(body = %String::from_utf8_lossy(&body), "inbound request body");
    }

    // Narrow candidates by model when model-based routing is on
    let narrowed: Vec<&Arc<ProviderHandle>> = match inner.filter {
        Some(ref filter) => {
            let target = filter.resolve(&model, |name| {
                inner.providers.iter().any(|p| p.name == name)
            })?;
            inner.providers.iter().filter(|p| p.name == target).collect()
        }
        None => inner.providers.iter().collect(),
    };

    let candidates = state.candidates(&narrowed);
    let chosen = inner.strategy.select(&candidates)?;
    let provider = Arc::clone(narrowed[chosen]);
    ctx.provider = Some(provider.name.clone());
    let health_at_selection = inner.breakers.state(&provider.name);

    let selected = provider.pool.select_key()?;
    ctx.key_label = Some(selected.label.clone());

    let report = RouteReport {
        provider: provider.name.clone(),
        health: health_at_selection,
        key_label: ctx.key_label.clone(),
    };

    tracing::debug!(
        provider = %provider.name,
        model = %model,
        stream = ctx.stream,
        key = %selected.label,
        "routing request"
    );

    // Make multi-turn thinking survive provider switches
    let body = if has_thinking_blocks(&body) {
        match rewrite_request(&body, &model, &inner.sigcache) {
            Some(rewritten) => Bytes::from(rewritten),
            None => body,
        }
    } else {
        body
    };

    let outbound = provider
        .adapter
        .transform_request(TransformInput {
            body: &body,
            headers: &ctx.headers,
            model: ctx.model(),
            stream: ctx.stream,
            credential: Some(&selected.secret),
            client_supplied_auth: ctx.client_supplied_auth,
        })
        .await?;

    let input_estimate = estimate_input_tokens(&outbound.body);

    let request = provider
        .client
        .post(outbound.url.clone())
        .headers(outbound.headers)
        .body(outbound.body);

    let response = match tokio::time::timeout(inner.request_timeout, request.send()).await {
        Ok(Ok(response)) => response,
        Ok(Err(e)) => {
            inner.breakers.report_failure(&provider.name);
            return Err(UpstreamError::Transport(e.to_string()).into());
        }
        Err(_) => {
            inner.breakers.report_failure(&provider.name);
            return Err(UpstreamError::Transport(format!(
                "no response within {} ms",
                inner.request_timeout.as_millis()
            ))
            .into());
        }
    };

    let status = response.status();

    if inner.debug_options.log_response_headers {
        tracing::trace!(status = %status, headers = ?response.headers(), "upstream response");
    }

    if ctx.stream && status.is_success() {
        inner.breakers.report_success(&provider.name);
        provider
            .pool
            .record_response(selected.id, status.as_u16(), response.headers(), None);

        let telemetry = StreamTelemetry::new(
            ThinkingTap::new(&model, inner.sigcache.clone()),
            Arc::clone(&provider),
            selected.id,
            input_estimate,
        );

        let event_stream = provider.adapter.upstream_content_type()
            == "application/vnd.amazon.eventstream";
        let body = if event_stream {
            Body::from_stream(eventstream_relay(response, telemetry))
        } else {
            Body::from_stream(sse_passthrough(response, telemetry))
        };

        let mut relayed = Response::new(body);
        sse_headers(relayed.headers_mut());
        Ok((relayed, report))
    } else {
        let upstream_headers = response.headers().clone();

        let body_bytes = match response.bytes().await {
            Ok(bytes) => bytes,
            Err(e) => {
                inner.breakers.report_failure(&provider.name);
                provider
                    .pool
                    .record_response(selected.id, status.as_u16(), &upstream_headers, None);
                return Err(UpstreamError::Transport(e.to_string()).into());
            }
        };

        if is_failure_status(status.as_u16()) {
            inner.breakers.report_failure(&provider.name);
        } else {
            inner.breakers.report_success(&provider.name);
        }

        let usage = parse_usage(&body_bytes, input_estimate);
        provider
            .pool
            .record_response(selected.id, status.as_u16(), &upstream_headers, Some(usage));

        // Learn thinking signatures from non-streaming responses too
        let body_out = if status.is_success() {
            absorb_response(&body_bytes, &model, &inner.sigcache)
                .map_or(body_bytes, Bytes::from)
        } else {
            body_bytes
        };

        let mut relayed = Response::new(Body::from(body_out));
        *relayed.status_mut() = status;
        forward_headers(&upstream_headers, relayed.headers_mut());
        Ok((relayed, report))
    }
}

/// Response headers worth forwarding to the client
fn forward_headers(upstream: &HeaderMap, outbound: &mut HeaderMap) {
    for (name, value) in upstream {
        let keep = *name == http::header::CONTENT_TYPE
            || *name == http::header::RETRY_AFTER
            || name.as_str() == "request-id"
            || name.as_str().starts_with("anthropic-");
        if keep {
            outbound.insert(name.clone(), value.clone());
        }
    }
}

/// Token usage from a non-streaming response body
///
/// The response's own counts win; the byte-length estimate covers
/// backends that report nothing.
fn parse_usage(body: &[u8], input_estimate: u64) -> TokenUsage {
    let parsed = serde_json::from_slice::<serde_json::Value>(body).ok();
    let usage = parsed.as_ref().and_then(|v| v.get("usage"));

    TokenUsage {
        input_tokens: usage
            .and_then(|u| u.get("input_tokens"))
            .and_then(serde_json::Value::as_u64)
            .unwrap_or(input_estimate),
        output_tokens: usage
            .and_then(|u| u.get("output_tokens"))
            .and_then(serde_json::Value::as_u64)
            .unwrap_or(0),
    }
}
