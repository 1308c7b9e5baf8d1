use http::StatusCode;

/// Trait for domain errors that can be converted to HTTP responses
///
/// Implemented by each feature crate's error type. The server layer
/// converts these into Anthropic-shaped error bodies, keeping domain
/// errors decoupled from axum.
pub trait HttpError: std::error::Error {
    /// HTTP status code for this error
    fn status_code(&self) -> StatusCode;

    /// Machine-readable error type (e.g. `invalid_request_error`)
    fn error_type(&self) -> &str;

    /// Message safe to expose to API consumers
    fn client_message(&self) -> String;
}

/// Build the Anthropic error envelope for a non-streaming response
pub fn error_body(error_type: &str, message: &str) -> serde_json::Value {
    serde_json::json!({
        "type": "error",
        "error": {
            "type": error_type,
            "message": message,
        }
    })
}

/// Render an error as a wire-ready SSE `error` event
///
/// Used once streaming has started and a status code can no longer
/// be sent.
pub fn error_sse_event(error_type: &str, message: &str) -> String {
    let data = error_body(error_type, message);
    format!("event: error\ndata: {data}\n\n")
}
