use indexmap::IndexMap;
use serde::Deserialize;

/// Provider routing configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RoutingConfig {
    /// Routing strategy to use
    #[serde(default)]
    pub strategy: RoutingStrategy,
    /// How long a failed provider is skipped before the failover
    /// strategy gives it another chance (milliseconds)
    #[serde(default = "default_failover_timeout_ms")]
    pub failover_timeout_ms: u64,
    /// Model-prefix to provider-name mapping, in match order
    /// (only meaningful with `strategy = "model_based"`)
    #[serde(default)]
    pub model_mapping: IndexMap<String, String>,
    /// Provider for models no mapping prefix matches
    /// (only meaningful with `strategy = "model_based"`)
    #[serde(default)]
    pub default_provider: Option<String>,
    /// Attach `X-CC-Relay-*` diagnostic headers to every response
    #[serde(default)]
    pub debug: bool,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            strategy: RoutingStrategy::default(),
            failover_timeout_ms: default_failover_timeout_ms(),
            model_mapping: IndexMap::new(),
            default_provider: None,
            debug: false,
        }
    }
}

const fn default_failover_timeout_ms() -> u64 {
    30_000
}

/// Available routing strategies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoutingStrategy {
    /// Healthy providers in priority order, with a timed second chance
    /// for failed ones
    #[default]
    Failover,
    /// Rotate across healthy providers
    RoundRobin,
    /// Uniform random over healthy providers
    Shuffle,
    /// Smooth weighted rotation proportional to provider weight
    WeightedRoundRobin,
    /// Narrow candidates by model-name prefix, then fail over
    ModelBased,
}
