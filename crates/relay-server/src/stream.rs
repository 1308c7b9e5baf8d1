//! Streaming response relay
//!
//! Upstream SSE is re-emitted event-for-event with identical names and
//! data; Bedrock's Event Stream frames are converted first. A tap
//! learns thinking signatures as events pass, and a drop guard settles
//! token accounting even when the client disconnects mid-stream.

use std::convert::Infallible;
use std::sync::Arc;

use bytes::Bytes;
use eventsource_stream::Eventsource as _;
use futures_util::{Stream, StreamExt as _, future, stream};
use http::{HeaderMap, HeaderValue};
use relay_core::error_sse_event;
use relay_pool::{KeyId, TokenUsage};
use relay_sigcache::ThinkingTap;
use relay_upstream::{EventStreamToSse, SseEvent};

use crate::state::ProviderHandle;

/// Per-stream companion state: signature tap plus usage accounting
pub(crate) struct StreamTelemetry {
    tap: ThinkingTap,
    guard: UsageGuard,
}

impl StreamTelemetry {
    pub(crate) fn new(
        tap: ThinkingTap,
        provider: Arc<ProviderHandle>,
        key: KeyId,
        input_estimate: u64,
    ) -> Self {
        Self {
            tap,
            guard: UsageGuard {
                provider,
                key,
                input_tokens: input_estimate,
                output_tokens: 0,
            },
        }
    }

    /// Observe one event; returns replacement data when rewritten
    fn observe(&mut self, event: &str, data: &str) -> Option<String> {
        self.note_usage(event, data);
        self.tap.observe(event, data)
    }

    /// Pull token counts out of `message_start` / `message_delta`
    fn note_usage(&mut self, event: &str, data: &str) {
        if event != "message_start" && event != "message_delta" {
            return;
        }
        let Ok(parsed) = serde_json::from_str::<serde_json::Value>(data) else {
            return;
        };

        let usage = match event {
            "message_start" => parsed.get("message").and_then(|m| m.get("usage")),
            _ => parsed.get("usage"),
        };
        let Some(usage) = usage else { return };

        if let Some(input) = usage.get("input_tokens").and_then(serde_json::Value::as_u64) {
            // Authoritative count replaces the byte-length estimate
            self.guard.input_tokens = input;
        }
        if let Some(output) = usage.get("output_tokens").and_then(serde_json::Value::as_u64) {
            self.guard.output_tokens = output;
        }
    }
}

/// Records accumulated usage when the stream ends, including early
/// client disconnects
struct UsageGuard {
    provider: Arc<ProviderHandle>,
    key: KeyId,
    input_tokens: u64,
    output_tokens: u64,
}

impl Drop for UsageGuard {
    fn drop(&mut self) {
        self.provider.pool.record_usage(
            self.key,
            TokenUsage {
                input_tokens: self.input_tokens,
                output_tokens: self.output_tokens,
            },
        );
    }
}

/// Response headers for an unbuffered SSE relay
pub(crate) fn sse_headers(headers: &mut HeaderMap) {
    headers.insert(
        http::header::CONTENT_TYPE,
        HeaderValue::from_static("text/event-stream"),
    );
    headers.insert(
        http::header::CACHE_CONTROL,
        HeaderValue::from_static("no-cache, no-transform"),
    );
    headers.insert("x-accel-buffering", HeaderValue::from_static("no"));
    headers.insert(http::header::CONNECTION, HeaderValue::from_static("keep-alive"));
}

/// Relay an upstream SSE body, event for event
///
/// Events are forwarded in arrival order with the same `event:` name
/// and `data:` bytes; one chunk per event keeps flushing per event. A
/// mid-stream transport error emits one SSE `error` event and ends the
/// stream.
pub(crate) fn sse_passthrough(
    response: reqwest::Response,
    telemetry: StreamTelemetry,
) -> impl Stream<Item = Result<Bytes, Infallible>> + Send {
    response
        .bytes_stream()
        .eventsource()
        .scan((telemetry, false), |(telemetry, done), item| {
            let out = if *done {
                None
            } else {
                match item {
                    Ok(event) => {
                        let name = if event.event.is_empty() {
                            "message".to_owned()
                        } else {
                            event.event
                        };
                        let data = telemetry
                            .observe(&name, &event.data)
                            .unwrap_or(event.data);
                        Some(Ok(SseEvent::new(name, data).to_wire()))
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "upstream stream failed mid-flight");
                        *done = true;
                        Some(Ok(Bytes::from(error_sse_event(
                            "api_error",
                            "upstream stream failed",
                        ))))
                    }
                }
            };
            future::ready(out)
        })
}

/// Relay a Bedrock Event Stream body as Anthropic SSE
///
/// Frames are decoded incrementally; a malformed frame terminates the
/// SSE cleanly after one `error` event.
pub(crate) fn eventstream_relay(
    response: reqwest::Response,
    telemetry: StreamTelemetry,
) -> impl Stream<Item = Result<Bytes, Infallible>> + Send {
    response
        .bytes_stream()
        .scan(
            (EventStreamToSse::new(), telemetry, false),
            |(converter, telemetry, done), item| {
                let out: Option<Vec<Result<Bytes, Infallible>>> = if *done {
                    None
                } else {
                    match item {
                        Ok(chunk) => match converter.feed(&chunk) {
                            Ok(events) => Some(
                                events
                                    .into_iter()
                                    .map(|mut event| {
                                        if let Some(data) =
                                            telemetry.observe(&event.event, &event.data)
                                        {
                                            event.data = data;
                                        }
                                        Ok(event.to_wire())
                                    })
                                    .collect(),
                            ),
                            Err(e) => {
                                tracing::warn!(error = %e, "event stream decode failed");
                                *done = true;
                                Some(vec![Ok(Bytes::from(error_sse_event(
                                    "api_error",
                                    "upstream event stream was malformed",
                                )))])
                            }
                        },
                        Err(e) => {
                            tracing::warn!(error = %e, "upstream stream failed mid-flight");
                            *done = true;
                            Some(vec![Ok(Bytes::from(error_sse_event(
                                "api_error",
                                "upstream stream failed",
                            )))])
                        }
                    }
                };
                future::ready(out)
            },
        )
        .flat_map(stream::iter)
}
