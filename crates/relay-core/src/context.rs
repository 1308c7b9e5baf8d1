use http::HeaderMap;

/// Per-request state threaded through the proxy pipeline
///
/// Created by the `/v1/messages` handler and held on its stack frame;
/// later stages (model filter, signature rewriter, dialect transform)
/// read the cached model instead of re-parsing the body.
#[derive(Debug)]
pub struct RequestContext {
    /// Inbound request headers
    pub headers: HeaderMap,
    /// `model` field extracted once from the JSON body
    pub model: Option<String>,
    /// Whether the client authenticated with its own upstream credential
    /// rather than one of the proxy's configured secrets
    pub client_supplied_auth: bool,
    /// Whether the client asked for a streaming response
    pub stream: bool,
    /// Provider chosen by the router, once selected
    pub provider: Option<String>,
    /// Masked identifier of the selected credential, for debug surfaces
    pub key_label: Option<String>,
}

impl RequestContext {
    /// Create a context from the inbound request parts
    pub fn new(headers: HeaderMap) -> Self {
        Self {
            headers,
            model: None,
            client_supplied_auth: false,
            stream: false,
            provider: None,
            key_label: None,
        }
    }

    /// The extracted model name, if the body carried one
    pub fn model(&self) -> Option<&str> {
        self.model.as_deref()
    }
}
