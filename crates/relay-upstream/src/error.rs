use http::StatusCode;
use relay_core::HttpError;
use thiserror::Error;

/// Errors raised while adapting requests or responses to a provider
/// dialect
#[derive(Debug, Error)]
pub enum UpstreamError {
    /// Provider endpoint URL could not be built
    #[error("invalid provider URL: {0}")]
    Url(String),

    /// AWS SigV4 signing failed
    #[error("request signing failed: {0}")]
    Signing(String),

    /// OAuth token source failed to produce a credential
    #[error("token source failed: {0}")]
    TokenSource(String),

    /// Transport-level failure talking to the provider
    #[error("upstream transport error: {0}")]
    Transport(String),

    /// AWS Event Stream framing was malformed
    #[error("malformed event stream: {0}")]
    EventStream(String),
}

impl HttpError for UpstreamError {
    fn status_code(&self) -> StatusCode {
        StatusCode::BAD_GATEWAY
    }

    fn error_type(&self) -> &str {
        "api_error"
    }

    fn client_message(&self) -> String {
        self.to_string()
    }
}
