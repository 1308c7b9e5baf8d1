//! AWS Bedrock dialect
//!
//! Speaks the raw `invoke-with-response-stream` runtime API with
//! SigV4-signed requests; the response is AWS Event Stream framing,
//! converted back to SSE by [`crate::EventStreamToSse`].

use aws_credential_types::provider::ProvideCredentials as _;
use aws_credential_types::provider::SharedCredentialsProvider;
use aws_sigv4::http_request::{SignableBody, SignableRequest, SigningSettings, sign};
use aws_sigv4::sign::v4;
use bytes::Bytes;
use http::header::CONTENT_TYPE;
use url::Url;

use crate::error::UpstreamError;
use crate::types::{OutboundRequest, TransformInput};

/// Anthropic version constant the Bedrock dialect expects in the body
const BEDROCK_ANTHROPIC_VERSION: &str = "bedrock-2023-05-31";

/// SigV4 service name for the Bedrock runtime
const SERVICE_NAME: &str = "bedrock";

/// Bedrock runtime adapter state
pub(crate) struct BedrockDialect {
    region: String,
    credentials: SharedCredentialsProvider,
}

impl BedrockDialect {
    /// Resolve the AWS default credential chain for the region
    ///
    /// # Errors
    ///
    /// Returns an error if the environment provides no credential
    /// source at all.
    pub(crate) async fn new(region: String) -> Result<Self, UpstreamError> {
        let config = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(aws_config::Region::new(region.clone()))
            .load()
            .await;

        let credentials = config.credentials_provider().ok_or_else(|| {
            UpstreamError::TokenSource("no AWS credential source available".to_owned())
        })?;

        Ok(Self {
            region,
            credentials,
        })
    }

    /// Construct with an explicit credentials provider
    pub(crate) fn with_credentials(region: String, credentials: SharedCredentialsProvider) -> Self {
        Self {
            region,
            credentials,
        }
    }

    /// Build and sign the outbound request
    pub(crate) async fn transform(
        &self,
        body: &[u8],
        mapped_model: Option<&str>,
        input: &TransformInput<'_>,
    ) -> Result<OutboundRequest, UpstreamError> {
        let model = mapped_model.ok_or_else(|| {
            UpstreamError::Url("bedrock requires a model name in the request".to_owned())
        })?;

        let body = prepare_body(body);
        let url = self.invoke_url(model, input.stream)?;
        let headers = self.sign(&url, &body).await?;

        Ok(OutboundRequest {
            url,
            body: Bytes::from(body),
            headers,
        })
    }

    /// Runtime endpoint for a model id
    ///
    /// Model ids carry `:` and `.` (`anthropic.claude-sonnet-4-5-…-v1:0`);
    /// both are legal in a path segment, so the URL is signed exactly
    /// as sent.
    fn invoke_url(&self, model: &str, stream: bool) -> Result<Url, UpstreamError> {
        let verb = if stream {
            "invoke-with-response-stream"
        } else {
            "invoke"
        };
        let url = format!(
            "https://bedrock-runtime.{}.amazonaws.com/model/{model}/{verb}",
            self.region
        );
        Url::parse(&url).map_err(|e| UpstreamError::Url(e.to_string()))
    }

    /// SigV4-sign the request, returning the full outbound header set
    ///
    /// The payload hash covers the exact bytes sent; signing happens
    /// per request because signatures are time-based.
    async fn sign(&self, url: &Url, body: &[u8]) -> Result<http::HeaderMap, UpstreamError> {
        let credentials = self
            .credentials
            .provide_credentials()
            .await
            .map_err(|e| UpstreamError::TokenSource(e.to_string()))?;
        let identity = credentials.into();

        let params = v4::SigningParams::builder()
            .identity(&identity)
            .region(&self.region)
            .name(SERVICE_NAME)
            .time(std::time::SystemTime::now())
            .settings(SigningSettings::default())
            .build()
            .map_err(|e| UpstreamError::Signing(e.to_string()))?
            .into();

        let signable = SignableRequest::new(
            "POST",
            url.as_str(),
            std::iter::once(("content-type", "application/json")),
            SignableBody::Bytes(body),
        )
        .map_err(|e| UpstreamError::Signing(e.to_string()))?;

        let (instructions, _signature) = sign(signable, &params)
            .map_err(|e| UpstreamError::Signing(e.to_string()))?
            .into_parts();

        let mut request = http::Request::builder()
            .method(http::Method::POST)
            .uri(url.as_str())
            .body(())
            .map_err(|e| UpstreamError::Signing(e.to_string()))?;
        request
            .headers_mut()
            .insert(CONTENT_TYPE, http::HeaderValue::from_static("application/json"));
        instructions.apply_to_request_http1x(&mut request);

        Ok(request.headers().clone())
    }
}

/// Strip `model` and stamp the Bedrock anthropic version
///
/// Bedrock addresses the model through the URL; a `model` field in the
/// body is rejected. Malformed JSON passes through unchanged.
fn prepare_body(body: &[u8]) -> Vec<u8> {
    let Ok(mut root) = serde_json::from_slice::<serde_json::Value>(body) else {
        tracing::warn!("bedrock request body is not valid JSON, passing through");
        return body.to_vec();
    };

    if let Some(object) = root.as_object_mut() {
        object.remove("model");
        object.insert(
            "anthropic_version".to_owned(),
            serde_json::Value::String(BEDROCK_ANTHROPIC_VERSION.to_owned()),
        );
    }

    serde_json::to_vec(&root).unwrap_or_else(|_| body.to_vec())
}
