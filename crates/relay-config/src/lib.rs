//! Configuration surface for the relay
//!
//! Deserialized from TOML with `{{ env.VAR }}` expansion; validated at
//! startup so misconfiguration fails the process, not the first request.

pub mod auth;
mod env;
pub mod health;
mod loader;
pub mod logging;
pub mod provider;
pub mod routing;
pub mod server;

use serde::Deserialize;

pub use auth::AuthConfig;
pub use health::{CircuitBreakerConfig, HealthCheckConfig, HealthConfig};
pub use logging::{DebugOptions, LogFormat, LoggingConfig};
pub use provider::{
    AzureAuthMethod, KeyConfig, PoolStrategy, PoolingConfig, ProviderConfig, ProviderKind,
};
pub use routing::{RoutingConfig, RoutingStrategy};
pub use server::ServerConfig;

/// Top-level relay configuration
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Server listen and limits configuration
    #[serde(default)]
    pub server: ServerConfig,
    /// Inbound client authentication
    #[serde(default)]
    pub auth: AuthConfig,
    /// Provider routing configuration
    #[serde(default)]
    pub routing: RoutingConfig,
    /// Circuit breaker and health probing
    #[serde(default)]
    pub health: HealthConfig,
    /// Backend provider declarations, in priority order
    #[serde(default)]
    pub providers: Vec<ProviderConfig>,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}
