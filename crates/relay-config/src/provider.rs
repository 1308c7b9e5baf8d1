use indexmap::IndexMap;
use secrecy::SecretString;
use serde::Deserialize;
use url::Url;

/// Declaration of a single backend provider
///
/// Declaration order in the `providers` array is the insertion order
/// used for routing tie-breaks.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProviderConfig {
    /// Unique provider name
    pub name: String,
    /// Backend dialect
    #[serde(rename = "type")]
    pub kind: ProviderKind,
    /// Whether this provider participates in routing
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Base URL override (anthropic, zai, ollama; cloud providers derive
    /// their endpoints from the fields below)
    #[serde(default)]
    pub base_url: Option<Url>,
    /// Models advertised by `GET /v1/models`
    #[serde(default)]
    pub models: Vec<String>,
    /// Client model name to upstream model name rewrites
    #[serde(default)]
    pub model_mapping: IndexMap<String, String>,
    /// Credential set for the key pool
    #[serde(default)]
    pub keys: Vec<KeyConfig>,
    /// Single-credential fallback when `keys` is empty
    #[serde(default)]
    pub api_key: Option<SecretString>,
    /// Key pool selection policy
    #[serde(default)]
    pub pooling: PoolingConfig,
    /// Relative weight for weighted routing
    #[serde(default = "default_weight")]
    pub weight: u32,
    /// Priority for failover ordering (lower is tried first)
    #[serde(default)]
    pub priority: i32,

    // -- Cloud-only fields --
    /// AWS region (bedrock)
    #[serde(default)]
    pub aws_region: Option<String>,
    /// GCP project id (vertex)
    #[serde(default)]
    pub gcp_project_id: Option<String>,
    /// GCP region (vertex)
    #[serde(default)]
    pub gcp_region: Option<String>,
    /// Azure AI Foundry resource name (azure)
    #[serde(default)]
    pub azure_resource_name: Option<String>,
    /// Azure `api-version` query value (azure)
    #[serde(default)]
    pub azure_api_version: Option<String>,
    /// Azure credential mode (azure)
    #[serde(default)]
    pub azure_auth_method: AzureAuthMethod,
}

const fn default_enabled() -> bool {
    true
}

const fn default_weight() -> u32 {
    1
}

/// Supported backend dialects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    /// Anthropic Messages API, direct
    Anthropic,
    /// Z.AI Anthropic-compatible endpoint
    Zai,
    /// Ollama's Anthropic-compatible endpoint
    Ollama,
    /// AWS Bedrock `invoke-with-response-stream`
    Bedrock,
    /// Azure AI Foundry Anthropic endpoint
    Azure,
    /// Google Vertex AI `rawPredict` / `streamRawPredict`
    Vertex,
}

impl ProviderKind {
    /// Lowercase wire name, used in logs and `/v1/providers`
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Anthropic => "anthropic",
            Self::Zai => "zai",
            Self::Ollama => "ollama",
            Self::Bedrock => "bedrock",
            Self::Azure => "azure",
            Self::Vertex => "vertex",
        }
    }
}

/// Azure credential mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AzureAuthMethod {
    /// Send the credential as `x-api-key`
    #[default]
    ApiKey,
    /// Send the credential as `Authorization: Bearer` (Entra ID token)
    Entra,
}

/// One credential in a provider's key pool
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct KeyConfig {
    /// The credential itself
    pub key: SecretString,
    /// Requests-per-minute budget
    #[serde(default)]
    pub rpm_limit: Option<u32>,
    /// Input-tokens-per-minute budget
    #[serde(default)]
    pub itpm_limit: Option<u32>,
    /// Output-tokens-per-minute budget
    #[serde(default)]
    pub otpm_limit: Option<u32>,
    /// Selection priority (higher wins ties)
    #[serde(default)]
    pub priority: i32,
    /// Relative weight for the weighted pool strategy
    #[serde(default = "default_weight")]
    pub weight: u32,
}

/// Key pool selection policy
#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PoolingConfig {
    /// Selection strategy over the provider's credentials
    #[serde(default)]
    pub strategy: PoolStrategy,
}

/// Key pool selection strategies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PoolStrategy {
    /// Credential with the most remaining capacity
    #[default]
    LeastLoaded,
    /// Rotate over non-exhausted credentials
    RoundRobin,
    /// Uniform random over non-exhausted credentials
    Random,
    /// Smooth weighted rotation by credential weight
    Weighted,
}
