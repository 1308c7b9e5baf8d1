use secrecy::SecretString;
use serde::Deserialize;

/// Inbound client authentication
///
/// Either secret may be set; a client matching one of them is treated
/// as a proxy user. A client presenting credentials that match neither
/// is carrying its own upstream key, which providers supporting
/// transparent auth forward unchanged.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AuthConfig {
    /// Accepted `x-api-key` value
    #[serde(default)]
    pub api_key: Option<SecretString>,
    /// Accepted `Authorization: Bearer` value
    #[serde(default)]
    pub bearer_secret: Option<SecretString>,
    /// Reject requests that match neither secret
    #[serde(default)]
    pub required: bool,
}
