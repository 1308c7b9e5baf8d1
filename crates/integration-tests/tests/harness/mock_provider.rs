//! Mock Anthropic-dialect backend for integration tests
//!
//! Serves canned Messages API responses (JSON or SSE) and captures
//! the last request for assertions.

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU32, Ordering};

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode, Uri};
use axum::response::IntoResponse;
use axum::{Router, routing};
use bytes::Bytes;
use tokio_util::sync::CancellationToken;

/// One captured upstream request
#[derive(Debug, Clone)]
pub struct CapturedRequest {
    pub path: String,
    pub headers: Vec<(String, String)>,
    pub body: serde_json::Value,
}

impl CapturedRequest {
    /// Look up a captured header by name (case-insensitive)
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

struct MockState {
    requests: AtomicU32,
    /// Remaining responses to fail, and the status to fail with
    fail_remaining: AtomicU32,
    fail_status: u16,
    /// Attach a `retry-after` header to failure responses
    retry_after: Option<u64>,
    /// Emit a thinking block (with signature) in streamed responses
    thinking_signature: Option<String>,
    last: Mutex<Option<CapturedRequest>>,
}

/// A mock provider speaking the Anthropic Messages dialect
pub struct MockProvider {
    addr: SocketAddr,
    shutdown: CancellationToken,
    state: Arc<MockState>,
}

impl MockProvider {
    /// Start a mock that always succeeds
    pub async fn start() -> anyhow::Result<Self> {
        Self::start_inner(0, 500, None, None).await
    }

    /// Start a mock that fails the first `n` requests with `status`
    pub async fn start_failing(n: u32, status: u16) -> anyhow::Result<Self> {
        Self::start_inner(n, status, None, None).await
    }

    /// Start a mock that rate limits the first `n` requests
    pub async fn start_rate_limited(n: u32, retry_after: u64) -> anyhow::Result<Self> {
        Self::start_inner(n, 429, Some(retry_after), None).await
    }

    /// Start a mock whose streamed responses carry a thinking block
    /// signed with `signature`
    pub async fn start_with_thinking(signature: &str) -> anyhow::Result<Self> {
        Self::start_inner(0, 500, None, Some(signature.to_owned())).await
    }

    async fn start_inner(
        fail_remaining: u32,
        fail_status: u16,
        retry_after: Option<u64>,
        thinking_signature: Option<String>,
    ) -> anyhow::Result<Self> {
        let state = Arc::new(MockState {
            requests: AtomicU32::new(0),
            fail_remaining: AtomicU32::new(fail_remaining),
            fail_status,
            retry_after,
            thinking_signature,
            last: Mutex::new(None),
        });

        let app = Router::new()
            .route("/v1/messages", routing::post(handle_messages))
            .route("/anthropic/v1/messages", routing::post(handle_messages))
            .with_state(Arc::clone(&state));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let shutdown = CancellationToken::new();
        let shutdown_clone = shutdown.clone();

        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    shutdown_clone.cancelled().await;
                })
                .await
                .ok();
        });

        Ok(Self {
            addr,
            shutdown,
            state,
        })
    }

    /// Base URL for configuring the mock as a provider
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Total requests received
    pub fn request_count(&self) -> u32 {
        self.state.requests.load(Ordering::Relaxed)
    }

    /// The most recent captured request
    pub fn last_request(&self) -> Option<CapturedRequest> {
        self.state.last.lock().unwrap().clone()
    }
}

impl Drop for MockProvider {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

async fn handle_messages(
    State(state): State<Arc<MockState>>,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> axum::response::Response {
    state.requests.fetch_add(1, Ordering::Relaxed);

    let parsed: serde_json::Value = serde_json::from_slice(&body).unwrap_or_default();
    *state.last.lock().unwrap() = Some(CapturedRequest {
        path: uri.path().to_owned(),
        headers: headers
            .iter()
            .map(|(n, v)| (n.to_string(), v.to_str().unwrap_or_default().to_owned()))
            .collect(),
        body: parsed.clone(),
    });

    // Scripted failures first
    let remaining = state.fail_remaining.load(Ordering::Relaxed);
    if remaining > 0 {
        state.fail_remaining.fetch_sub(1, Ordering::Relaxed);
        let error_type = if state.fail_status == 429 {
            "rate_limit_error"
        } else {
            "api_error"
        };
        let body = serde_json::json!({
            "type": "error",
            "error": {"type": error_type, "message": "mock scripted failure"},
        });

        let mut response = (
            StatusCode::from_u16(state.fail_status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            axum::Json(body),
        )
            .into_response();
        if let Some(secs) = state.retry_after {
            response
                .headers_mut()
                .insert("retry-after", secs.to_string().parse().unwrap());
        }
        return response;
    }

    let model = parsed
        .get("model")
        .and_then(serde_json::Value::as_str)
        .unwrap_or("unknown")
        .to_owned();
    let streaming = parsed
        .get("stream")
        .and_then(serde_json::Value::as_bool)
        .unwrap_or(false);

    if streaming {
        return sse_response(&model, state.thinking_signature.as_deref());
    }

    axum::Json(serde_json::json!({
        "id": "msg_mock_01",
        "type": "message",
        "role": "assistant",
        "model": model,
        "content": [{"type": "text", "text": "Hello from the mock provider"}],
        "stop_reason": "end_turn",
        "usage": {"input_tokens": 10, "output_tokens": 5},
    }))
    .into_response()
}

/// Canned Anthropic SSE body
fn sse_response(model: &str, thinking_signature: Option<&str>) -> axum::response::Response {
    let mut body = String::new();
    let mut push = |event: &str, data: serde_json::Value| {
        body.push_str(&format!("event: {event}\ndata: {data}\n\n"));
    };

    push(
        "message_start",
        serde_json::json!({
            "type": "message_start",
            "message": {
                "id": "msg_mock_stream", "type": "message", "role": "assistant",
                "model": model, "content": [],
                "usage": {"input_tokens": 10, "output_tokens": 0},
            },
        }),
    );

    let mut index = 0;
    if let Some(signature) = thinking_signature {
        push(
            "content_block_start",
            serde_json::json!({
                "type": "content_block_start", "index": index,
                "content_block": {"type": "thinking", "thinking": ""},
            }),
        );
        push(
            "content_block_delta",
            serde_json::json!({
                "type": "content_block_delta", "index": index,
                "delta": {"type": "thinking_delta", "thinking": "pondering deeply"},
            }),
        );
        push(
            "content_block_delta",
            serde_json::json!({
                "type": "content_block_delta", "index": index,
                "delta": {"type": "signature_delta", "signature": signature},
            }),
        );
        push(
            "content_block_stop",
            serde_json::json!({"type": "content_block_stop", "index": index}),
        );
        index += 1;
    }

    push(
        "content_block_start",
        serde_json::json!({
            "type": "content_block_start", "index": index,
            "content_block": {"type": "text", "text": ""},
        }),
    );
    push(
        "content_block_delta",
        serde_json::json!({
            "type": "content_block_delta", "index": index,
            "delta": {"type": "text_delta", "text": "Hello"},
        }),
    );
    push(
        "content_block_stop",
        serde_json::json!({"type": "content_block_stop", "index": index}),
    );
    push(
        "message_delta",
        serde_json::json!({
            "type": "message_delta",
            "delta": {"stop_reason": "end_turn"},
            "usage": {"output_tokens": 7},
        }),
    );
    push("message_stop", serde_json::json!({"type": "message_stop"}));

    (
        StatusCode::OK,
        [(axum::http::header::CONTENT_TYPE, "text/event-stream")],
        body,
    )
        .into_response()
}
