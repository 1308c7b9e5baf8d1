use http::StatusCode;
use relay_core::HttpError;
use thiserror::Error;

/// Routing errors
#[derive(Debug, Error)]
pub enum RouteError {
    /// Every candidate is unavailable
    #[error("no provider available")]
    NoProviderAvailable,

    /// The requested model maps to no configured provider
    #[error("unsupported model: {0}")]
    UnsupportedModel(String),
}

impl HttpError for RouteError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::NoProviderAvailable => StatusCode::SERVICE_UNAVAILABLE,
            Self::UnsupportedModel(_) => StatusCode::BAD_REQUEST,
        }
    }

    fn error_type(&self) -> &str {
        match self {
            Self::NoProviderAvailable => "overloaded_error",
            Self::UnsupportedModel(_) => "invalid_request_error",
        }
    }

    fn client_message(&self) -> String {
        self.to_string()
    }
}
