//! Azure AI Foundry dialect

use bytes::Bytes;
use relay_config::AzureAuthMethod;
use secrecy::ExposeSecret as _;
use url::Url;

use crate::adapter::common_headers;
use crate::error::UpstreamError;
use crate::types::{OutboundRequest, TransformInput};

/// Default `api-version` query value
const DEFAULT_API_VERSION: &str = "2024-06-01";

/// Azure AI Foundry adapter state
pub(crate) struct AzureDialect {
    resource: String,
    api_version: String,
    auth_method: AzureAuthMethod,
}

impl AzureDialect {
    pub(crate) fn new(
        resource: String,
        api_version: Option<String>,
        auth_method: AzureAuthMethod,
    ) -> Self {
        Self {
            resource,
            api_version: api_version.unwrap_or_else(|| DEFAULT_API_VERSION.to_owned()),
            auth_method,
        }
    }

    /// Build the outbound request
    ///
    /// The body shape matches Anthropic's; only the endpoint and
    /// credential header differ. In Entra mode the pooled credential is
    /// an externally refreshed bearer token.
    pub(crate) fn transform(
        &self,
        body: &[u8],
        input: &TransformInput<'_>,
    ) -> Result<OutboundRequest, UpstreamError> {
        let mut url = Url::parse(&format!(
            "https://{}.services.ai.azure.com/anthropic/v1/messages",
            self.resource
        ))
        .map_err(|e| UpstreamError::Url(e.to_string()))?;
        url.query_pairs_mut()
            .append_pair("api-version", &self.api_version);

        let mut headers = common_headers(input);
        if let Some(credential) = input.credential {
            match self.auth_method {
                AzureAuthMethod::ApiKey => {
                    if let Ok(value) = credential.expose_secret().parse() {
                        headers.insert("x-api-key", value);
                    }
                }
                AzureAuthMethod::Entra => {
                    if let Ok(value) = format!("Bearer {}", credential.expose_secret()).parse() {
                        headers.insert(http::header::AUTHORIZATION, value);
                    }
                }
            }
        }

        Ok(OutboundRequest {
            url,
            body: Bytes::copy_from_slice(body),
            headers,
        })
    }
}
