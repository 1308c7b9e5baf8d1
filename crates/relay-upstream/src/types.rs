use bytes::Bytes;
use http::HeaderMap;
use indexmap::IndexMap;
use secrecy::SecretString;
use url::Url;

/// Everything the adapter needs to build one outbound request
pub struct TransformInput<'a> {
    /// Raw (possibly signature-rewritten) inbound body
    pub body: &'a [u8],
    /// Inbound client headers
    pub headers: &'a HeaderMap,
    /// Model name extracted from the body, before mapping
    pub model: Option<&'a str>,
    /// Whether the client requested a streaming response
    pub stream: bool,
    /// Credential selected from the provider's pool
    pub credential: Option<&'a SecretString>,
    /// The client authenticated with its own upstream credential
    pub client_supplied_auth: bool,
}

/// A fully prepared upstream request
#[derive(Debug)]
pub struct OutboundRequest {
    pub url: Url,
    pub body: Bytes,
    pub headers: HeaderMap,
}

/// Rewrite the body's `model` field through the provider's mapping
///
/// Returns the mapped model name and, when the body had to change, the
/// rewritten bytes. Names absent from the mapping pass through, which
/// makes the rewrite idempotent. Malformed JSON passes through with a
/// warning.
pub fn map_model_in_body(
    body: &[u8],
    model: Option<&str>,
    mapping: &IndexMap<String, String>,
) -> (Option<String>, Option<Vec<u8>>) {
    let Some(model) = model else {
        return (None, None);
    };
    let Some(mapped) = mapping.get(model) else {
        return (Some(model.to_owned()), None);
    };

    let Ok(mut root) = serde_json::from_slice::<serde_json::Value>(body) else {
        tracing::warn!(model, "body is not valid JSON, forwarding unmapped");
        return (Some(model.to_owned()), None);
    };

    root["model"] = serde_json::Value::String(mapped.clone());
    let rewritten = serde_json::to_vec(&root).ok();
    (Some(mapped.clone()), rewritten)
}
