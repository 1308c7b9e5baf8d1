//! Google Vertex AI dialect

use std::sync::Arc;

use bytes::Bytes;
use url::Url;

use crate::adapter::common_headers;
use crate::error::UpstreamError;
use crate::types::{OutboundRequest, TransformInput};

/// Anthropic version constant the Vertex dialect expects in the body
const VERTEX_ANTHROPIC_VERSION: &str = "vertex-2023-10-16";

/// OAuth scope for Vertex AI calls
const SCOPES: &[&str] = &["https://www.googleapis.com/auth/cloud-platform"];

/// Vertex AI adapter state
pub(crate) struct VertexDialect {
    project: String,
    region: String,
    token_provider: Arc<dyn gcp_auth::TokenProvider>,
}

impl VertexDialect {
    /// Resolve the GCP default token source
    ///
    /// The provider caches tokens and refreshes them before expiry, so
    /// asking for a token per request stays cheap.
    ///
    /// # Errors
    ///
    /// Returns an error when no GCP credential source is available.
    pub(crate) async fn new(project: String, region: String) -> Result<Self, UpstreamError> {
        let token_provider = gcp_auth::provider()
            .await
            .map_err(|e| UpstreamError::TokenSource(e.to_string()))?;
        Ok(Self {
            project,
            region,
            token_provider,
        })
    }

    /// Build the outbound request, fetching a fresh bearer token
    pub(crate) async fn transform(
        &self,
        body: &[u8],
        mapped_model: Option<&str>,
        input: &TransformInput<'_>,
    ) -> Result<OutboundRequest, UpstreamError> {
        let model = mapped_model.ok_or_else(|| {
            UpstreamError::Url("vertex requires a model name in the request".to_owned())
        })?;

        let url = predict_url(&self.region, &self.project, model, input.stream)?;
        let body = prepare_body(body);

        let token = self
            .token_provider
            .token(SCOPES)
            .await
            .map_err(|e| UpstreamError::TokenSource(e.to_string()))?;

        let mut headers = common_headers(input);
        let bearer = format!("Bearer {}", token.as_str())
            .parse()
            .map_err(|_| UpstreamError::TokenSource("token is not header-safe".to_owned()))?;
        headers.insert(http::header::AUTHORIZATION, bearer);

        Ok(OutboundRequest {
            url,
            body: Bytes::from(body),
            headers,
        })
    }
}

/// Vertex publisher endpoint for a model
fn predict_url(region: &str, project: &str, model: &str, stream: bool) -> Result<Url, UpstreamError> {
    let verb = if stream { "streamRawPredict" } else { "rawPredict" };
    let url = format!(
        "https://{region}-aiplatform.googleapis.com/v1/projects/{project}/locations/{region}/publishers/anthropic/models/{model}:{verb}"
    );
    Url::parse(&url).map_err(|e| UpstreamError::Url(e.to_string()))
}

/// Strip `model` (addressed via the URL) and stamp the Vertex version
fn prepare_body(body: &[u8]) -> Vec<u8> {
    let Ok(mut root) = serde_json::from_slice::<serde_json::Value>(body) else {
        tracing::warn!("vertex request body is not valid JSON, passing through");
        return body.to_vec();
    };

    if let Some(object) = root.as_object_mut() {
        object.remove("model");
        object.insert(
            "anthropic_version".to_owned(),
            serde_json::Value::String(VERTEX_ANTHROPIC_VERSION.to_owned()),
        );
    }

    serde_json::to_vec(&root).unwrap_or_else(|_| body.to_vec())
}
