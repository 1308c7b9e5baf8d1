use std::net::SocketAddr;

use serde::Deserialize;

/// Server listen and limits configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Address to bind; defaults to 0.0.0.0:8787
    #[serde(default)]
    pub listen_address: Option<SocketAddr>,
    /// Maximum in-flight requests
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,
    /// Upstream request setup deadline in milliseconds (connect through
    /// first response byte; streams themselves are long-lived)
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_address: None,
            max_concurrent: default_max_concurrent(),
            request_timeout_ms: default_request_timeout_ms(),
        }
    }
}

const fn default_max_concurrent() -> usize {
    256
}

const fn default_request_timeout_ms() -> u64 {
    30_000
}
