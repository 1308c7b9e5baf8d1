//! Z.AI Anthropic-compatible dialect

use bytes::Bytes;
use secrecy::ExposeSecret as _;
use url::Url;

use crate::adapter::common_headers;
use crate::error::UpstreamError;
use crate::types::{OutboundRequest, TransformInput};

/// Default Z.AI base URL
pub(crate) const DEFAULT_BASE_URL: &str = "https://api.z.ai";

/// Build the outbound request for the Z.AI dialect
///
/// Same body shape as Anthropic, served under `/anthropic/v1/messages`
/// with bearer authentication.
pub(crate) fn transform(
    base_url: &Url,
    body: &[u8],
    input: &TransformInput<'_>,
) -> Result<OutboundRequest, UpstreamError> {
    let base = base_url.as_str().trim_end_matches('/');
    let url = Url::parse(&format!("{base}/anthropic/v1/messages"))
        .map_err(|e| UpstreamError::Url(e.to_string()))?;

    let mut headers = common_headers(input);
    if let Some(credential) = input.credential
        && let Ok(value) = format!("Bearer {}", credential.expose_secret()).parse()
    {
        headers.insert(http::header::AUTHORIZATION, value);
    }

    Ok(OutboundRequest {
        url,
        body: Bytes::copy_from_slice(body),
        headers,
    })
}

#[cfg(test)]
mod tests {
    use http::HeaderMap;
    use secrecy::SecretString;

    use super::*;

    #[test]
    fn targets_anthropic_prefix_with_bearer() {
        let base = Url::parse("https://api.z.ai").unwrap();
        let headers = HeaderMap::new();
        let credential = SecretString::from("zai-key");
        let body = br#"{"model":"GLM-4.7","max_tokens":8}"#;

        let input = TransformInput {
            body,
            headers: &headers,
            model: Some("GLM-4.7"),
            stream: false,
            credential: Some(&credential),
            client_supplied_auth: false,
        };

        let out = transform(&base, body, &input).unwrap();
        assert_eq!(out.url.as_str(), "https://api.z.ai/anthropic/v1/messages");
        assert_eq!(out.headers.get("authorization").unwrap(), "Bearer zai-key");
        assert_eq!(&out.body[..], body);
    }
}
