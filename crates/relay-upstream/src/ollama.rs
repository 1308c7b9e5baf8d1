//! Ollama's Anthropic-compatible dialect

use bytes::Bytes;
use secrecy::ExposeSecret as _;
use url::Url;

use crate::adapter::common_headers;
use crate::error::UpstreamError;
use crate::types::{OutboundRequest, TransformInput};

/// Default local Ollama base URL
pub(crate) const DEFAULT_BASE_URL: &str = "http://localhost:11434";

/// Build the outbound request for the Ollama dialect
///
/// Ollama accepts but ignores authentication; a configured credential
/// is still sent for deployments that front Ollama with a gateway.
pub(crate) fn transform(
    base_url: &Url,
    body: &[u8],
    input: &TransformInput<'_>,
) -> Result<OutboundRequest, UpstreamError> {
    let base = base_url.as_str().trim_end_matches('/');
    let url = Url::parse(&format!("{base}/v1/messages"))
        .map_err(|e| UpstreamError::Url(e.to_string()))?;

    let mut headers = common_headers(input);
    if let Some(credential) = input.credential {
        let secret = credential.expose_secret();
        if !secret.is_empty()
            && let Ok(value) = secret.parse()
        {
            headers.insert("x-api-key", value);
        }
    }

    Ok(OutboundRequest {
        url,
        body: Bytes::copy_from_slice(body),
        headers,
    })
}
