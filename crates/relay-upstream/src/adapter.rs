use http::header::CONTENT_TYPE;
use http::{HeaderMap, HeaderValue};
use indexmap::IndexMap;
use relay_config::{ProviderConfig, ProviderKind};
use url::Url;

use crate::azure::AzureDialect;
use crate::bedrock::BedrockDialect;
use crate::error::UpstreamError;
use crate::probe::ProbeKind;
use crate::types::{OutboundRequest, TransformInput, map_model_in_body};
use crate::vertex::VertexDialect;
use crate::{anthropic, ollama, zai};

/// Anthropic API version sent when the client supplied none
pub(crate) const DEFAULT_ANTHROPIC_VERSION: &str = "2023-06-01";

/// Headers every dialect starts from
pub(crate) fn common_headers(input: &TransformInput<'_>) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

    let version = input
        .headers
        .get("anthropic-version")
        .cloned()
        .unwrap_or_else(|| HeaderValue::from_static(DEFAULT_ANTHROPIC_VERSION));
    headers.insert("anthropic-version", version);

    headers
}

/// Per-provider dialect adapter
///
/// Applies the provider's model-name mapping, then hands the request
/// to the kind-specific transform. One adapter exists per configured
/// provider for the process lifetime.
pub struct Adapter {
    mapping: IndexMap<String, String>,
    dialect: Dialect,
}

enum Dialect {
    Anthropic { base_url: Url },
    Zai { base_url: Url },
    Ollama { base_url: Url },
    Bedrock(BedrockDialect),
    Azure(AzureDialect),
    Vertex(VertexDialect),
}

impl Adapter {
    /// Build the adapter for a provider declaration
    ///
    /// Cloud dialects resolve their credential sources here, once, at
    /// startup.
    ///
    /// # Errors
    ///
    /// Returns an error when a required cloud field is missing or the
    /// platform credential chain is unavailable.
    pub async fn from_config(config: &ProviderConfig) -> Result<Self, UpstreamError> {
        let dialect = match config.kind {
            ProviderKind::Anthropic => Dialect::Anthropic {
                base_url: base_url_or(config, anthropic::DEFAULT_BASE_URL)?,
            },
            ProviderKind::Zai => Dialect::Zai {
                base_url: base_url_or(config, zai::DEFAULT_BASE_URL)?,
            },
            ProviderKind::Ollama => Dialect::Ollama {
                base_url: base_url_or(config, ollama::DEFAULT_BASE_URL)?,
            },
            ProviderKind::Bedrock => {
                let region = config
                    .aws_region
                    .clone()
                    .ok_or_else(|| missing_field(config, "aws_region"))?;
                Dialect::Bedrock(BedrockDialect::new(region).await?)
            }
            ProviderKind::Azure => {
                let resource = config
                    .azure_resource_name
                    .clone()
                    .ok_or_else(|| missing_field(config, "azure_resource_name"))?;
                Dialect::Azure(AzureDialect::new(
                    resource,
                    config.azure_api_version.clone(),
                    config.azure_auth_method,
                ))
            }
            ProviderKind::Vertex => {
                let project = config
                    .gcp_project_id
                    .clone()
                    .ok_or_else(|| missing_field(config, "gcp_project_id"))?;
                let region = config
                    .gcp_region
                    .clone()
                    .ok_or_else(|| missing_field(config, "gcp_region"))?;
                Dialect::Vertex(VertexDialect::new(project, region).await?)
            }
        };

        Ok(Self {
            mapping: config.model_mapping.clone(),
            dialect,
        })
    }

    /// The provider kind this adapter speaks
    pub const fn kind(&self) -> ProviderKind {
        match self.dialect {
            Dialect::Anthropic { .. } => ProviderKind::Anthropic,
            Dialect::Zai { .. } => ProviderKind::Zai,
            Dialect::Ollama { .. } => ProviderKind::Ollama,
            Dialect::Bedrock(_) => ProviderKind::Bedrock,
            Dialect::Azure(_) => ProviderKind::Azure,
            Dialect::Vertex(_) => ProviderKind::Vertex,
        }
    }

    /// Whether client-held upstream credentials can be forwarded as-is
    pub const fn supports_transparent_auth(&self) -> bool {
        matches!(self.dialect, Dialect::Anthropic { .. })
    }

    /// Whether the dialect always rewrites the request body
    pub const fn requires_body_transform(&self) -> bool {
        matches!(self.dialect, Dialect::Bedrock(_) | Dialect::Vertex(_))
    }

    /// Content type of the upstream streaming response
    pub const fn upstream_content_type(&self) -> &'static str {
        match self.dialect {
            Dialect::Bedrock(_) => "application/vnd.amazon.eventstream",
            _ => "text/event-stream",
        }
    }

    /// How the health checker should probe this provider
    pub const fn probe(&self) -> ProbeKind {
        match self.dialect {
            Dialect::Anthropic { .. } | Dialect::Zai { .. } | Dialect::Ollama { .. } | Dialect::Azure(_) => {
                ProbeKind::Messages
            }
            // No cheap probe exists; synthetic checks report success
            Dialect::Bedrock(_) | Dialect::Vertex(_) => ProbeKind::NoOp,
        }
    }

    /// Apply the provider's model-name mapping to a model name
    pub fn map_model<'a>(&'a self, model: &'a str) -> &'a str {
        self.mapping.get(model).map_or(model, String::as_str)
    }

    /// Produce the outbound request for this provider's dialect
    ///
    /// # Errors
    ///
    /// Returns an error when URL construction, signing, or the token
    /// source fails; the handler maps this to a 502 `api_error`.
    pub async fn transform_request(
        &self,
        input: TransformInput<'_>,
    ) -> Result<OutboundRequest, UpstreamError> {
        let (mapped_model, mapped_body) = map_model_in_body(input.body, input.model, &self.mapping);
        let body: &[u8] = mapped_body.as_deref().unwrap_or(input.body);

        match &self.dialect {
            Dialect::Anthropic { base_url } => anthropic::transform(base_url, body, &input),
            Dialect::Zai { base_url } => zai::transform(base_url, body, &input),
            Dialect::Ollama { base_url } => ollama::transform(base_url, body, &input),
            Dialect::Bedrock(dialect) => dialect.transform(body, mapped_model.as_deref(), &input).await,
            Dialect::Azure(dialect) => dialect.transform(body, &input),
            Dialect::Vertex(dialect) => dialect.transform(body, mapped_model.as_deref(), &input).await,
        }
    }
}

fn base_url_or(config: &ProviderConfig, default: &str) -> Result<Url, UpstreamError> {
    match &config.base_url {
        Some(url) => Ok(url.clone()),
        None => Url::parse(default).map_err(|e| UpstreamError::Url(e.to_string())),
    }
}

fn missing_field(config: &ProviderConfig, field: &str) -> UpstreamError {
    UpstreamError::Url(format!("provider '{}' is missing {field}", config.name))
}
