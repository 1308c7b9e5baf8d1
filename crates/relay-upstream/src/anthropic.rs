//! Anthropic Messages API dialect (direct)

use bytes::Bytes;
use http::HeaderMap;
use secrecy::ExposeSecret as _;
use url::Url;

use crate::adapter::{DEFAULT_ANTHROPIC_VERSION, common_headers};
use crate::error::UpstreamError;
use crate::types::{OutboundRequest, TransformInput};

/// Default Anthropic API base URL
pub(crate) const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";

/// Build the outbound request for the direct Anthropic dialect
///
/// The body passes through untouched (beyond model mapping); client
/// `anthropic-*` headers are forwarded, and a client that brought its
/// own credential keeps it (transparent auth).
pub(crate) fn transform(
    base_url: &Url,
    body: &[u8],
    input: &TransformInput<'_>,
) -> Result<OutboundRequest, UpstreamError> {
    let base = base_url.as_str().trim_end_matches('/');
    let url = Url::parse(&format!("{base}/v1/messages"))
        .map_err(|e| UpstreamError::Url(e.to_string()))?;

    let mut headers = common_headers(input);
    forward_anthropic_headers(input.headers, &mut headers);

    if input.client_supplied_auth {
        for name in [http::header::AUTHORIZATION.as_str(), "x-api-key"] {
            if let Some(value) = input.headers.get(name) {
                headers.insert(
                    http::HeaderName::from_bytes(name.as_bytes()).expect("static header name"),
                    value.clone(),
                );
            }
        }
    } else if let Some(credential) = input.credential
        && let Ok(value) = credential.expose_secret().parse()
    {
        headers.insert("x-api-key", value);
    }

    Ok(OutboundRequest {
        url,
        body: Bytes::copy_from_slice(body),
        headers,
    })
}

/// Copy client `anthropic-*` headers (version, beta flags) upstream
fn forward_anthropic_headers(inbound: &HeaderMap, outbound: &mut HeaderMap) {
    for (name, value) in inbound {
        if name.as_str().starts_with("anthropic-") {
            outbound.insert(name.clone(), value.clone());
        }
    }
}
