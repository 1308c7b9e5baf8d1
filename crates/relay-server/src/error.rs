use axum::Json;
use axum::response::{IntoResponse, Response};
use http::StatusCode;
use relay_core::{HttpError, error_body};
use relay_pool::PoolError;
use relay_route::RouteError;
use relay_upstream::UpstreamError;
use thiserror::Error;

/// Errors surfaced at the client-facing boundary
#[derive(Debug, Error)]
pub enum ServerError {
    /// Inbound credentials missing or wrong
    #[error("missing or invalid credentials")]
    Unauthenticated,

    /// Request body is not a JSON object
    #[error("request body is not a JSON object")]
    BodyNotJson,

    /// Request body carries no `model` field
    #[error("request is missing the model field")]
    ModelMissing,

    /// Routing failed
    #[error(transparent)]
    Route(#[from] RouteError),

    /// Key pool exhausted
    #[error(transparent)]
    Pool(#[from] PoolError),

    /// Dialect transform or transport failed
    #[error(transparent)]
    Upstream(#[from] UpstreamError),
}

impl HttpError for ServerError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::Unauthenticated => StatusCode::UNAUTHORIZED,
            Self::BodyNotJson | Self::ModelMissing => StatusCode::BAD_REQUEST,
            Self::Route(e) => e.status_code(),
            Self::Pool(e) => e.status_code(),
            Self::Upstream(e) => e.status_code(),
        }
    }

    fn error_type(&self) -> &str {
        match self {
            Self::Unauthenticated => "authentication_error",
            Self::BodyNotJson | Self::ModelMissing => "invalid_request_error",
            Self::Route(e) => e.error_type(),
            Self::Pool(e) => e.error_type(),
            Self::Upstream(e) => e.error_type(),
        }
    }

    fn client_message(&self) -> String {
        self.to_string()
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(error_body(self.error_type(), &self.client_message()));

        // Exhausted pools tell the client when to come back
        let retry_after = match &self {
            Self::Pool(PoolError::AllKeysExhausted { retry_after }) => Some(retry_after.as_secs()),
            _ => None,
        };

        let mut response = (status, body).into_response();
        if let Some(secs) = retry_after
            && let Ok(value) = secs.to_string().parse()
        {
            response.headers_mut().insert(http::header::RETRY_AFTER, value);
        }
        response
    }
}
