use serde::Deserialize;

/// Circuit breaker and health probing configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HealthConfig {
    /// Per-provider circuit breaker tuning
    #[serde(default)]
    pub circuit_breaker: CircuitBreakerConfig,
    /// Background synthetic probing of tripped providers
    #[serde(default)]
    pub health_check: HealthCheckConfig,
}

/// Per-provider circuit breaker tuning
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CircuitBreakerConfig {
    /// Consecutive failures that trip the breaker
    #[serde(default = "default_failure_threshold")]
    pub failure_threshold: u32,
    /// How long the breaker stays open before probing (milliseconds)
    #[serde(default = "default_open_duration_ms")]
    pub open_duration_ms: u64,
    /// Consecutive half-open successes required to close
    #[serde(default = "default_half_open_probes")]
    pub half_open_probes: u32,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: default_failure_threshold(),
            open_duration_ms: default_open_duration_ms(),
            half_open_probes: default_half_open_probes(),
        }
    }
}

const fn default_failure_threshold() -> u32 {
    5
}

const fn default_open_duration_ms() -> u64 {
    30_000
}

const fn default_half_open_probes() -> u32 {
    3
}

/// Background synthetic probing of tripped providers
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HealthCheckConfig {
    /// Whether the background prober runs
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Probe interval in milliseconds
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
}

impl Default for HealthCheckConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            interval_ms: default_interval_ms(),
        }
    }
}

const fn default_enabled() -> bool {
    true
}

const fn default_interval_ms() -> u64 {
    10_000
}
