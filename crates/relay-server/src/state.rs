use std::sync::Arc;
use std::time::Duration;

use relay_config::{
    Config, DebugOptions, HealthCheckConfig, ProviderKind, RoutingConfig, RoutingStrategy,
};
use relay_health::CircuitBreakerTable;
use relay_pool::KeyPool;
use relay_route::{Candidate, ModelFilter, Strategy};
use relay_sigcache::SignatureCache;
use relay_upstream::Adapter;

use crate::auth::AuthGate;

/// Fallback model for synthetic probes when a provider declares none
const DEFAULT_PROBE_MODEL: &str = "claude-3-5-haiku-latest";

/// One configured, enabled provider and its runtime companions
pub struct ProviderHandle {
    pub name: String,
    pub kind: ProviderKind,
    pub weight: u32,
    pub priority: i32,
    pub models: Vec<String>,
    /// Model used for synthetic health probes
    pub probe_model: String,
    pub adapter: Adapter,
    pub pool: KeyPool,
    pub client: reqwest::Client,
}

/// Shared state for all route handlers
#[derive(Clone)]
pub struct RelayState {
    inner: Arc<StateInner>,
}

pub(crate) struct StateInner {
    pub providers: Vec<Arc<ProviderHandle>>,
    pub strategy: Strategy,
    pub routing: RoutingConfig,
    pub filter: Option<ModelFilter>,
    pub breakers: CircuitBreakerTable,
    pub sigcache: SignatureCache,
    pub auth: AuthGate,
    pub request_timeout: Duration,
    pub health_check: HealthCheckConfig,
    pub debug_options: DebugOptions,
}

impl RelayState {
    /// Build runtime state from configuration
    ///
    /// Constructs one adapter, key pool, and HTTP client per enabled
    /// provider; cloud credential sources resolve here, at startup.
    ///
    /// # Errors
    ///
    /// Returns an error when no provider is enabled or a provider's
    /// adapter cannot be built.
    pub async fn from_config(config: Config) -> anyhow::Result<Self> {
        let mut providers = Vec::new();

        for provider_config in &config.providers {
            if !provider_config.enabled {
                tracing::info!(provider = %provider_config.name, "provider disabled, skipping");
                continue;
            }

            let adapter = Adapter::from_config(provider_config).await.map_err(|e| {
                anyhow::anyhow!("provider '{}' failed to initialize: {e}", provider_config.name)
            })?;
            let pool = KeyPool::from_config(provider_config);
            let client = reqwest::Client::builder()
                .connect_timeout(Duration::from_secs(10))
                .build()?;

            let probe_model = provider_config
                .models
                .first()
                .cloned()
                .or_else(|| provider_config.model_mapping.keys().next().cloned())
                .unwrap_or_else(|| DEFAULT_PROBE_MODEL.to_owned());

            providers.push(Arc::new(ProviderHandle {
                name: provider_config.name.clone(),
                kind: provider_config.kind,
                weight: provider_config.weight.max(1),
                priority: provider_config.priority,
                models: provider_config.models.clone(),
                probe_model,
                adapter,
                pool,
                client,
            }));
        }

        anyhow::ensure!(!providers.is_empty(), "no enabled providers configured");

        let filter = (config.routing.strategy == RoutingStrategy::ModelBased).then(|| {
            ModelFilter::new(
                config.routing.model_mapping.clone(),
                config.routing.default_provider.clone(),
            )
        });

        Ok(Self {
            inner: Arc::new(StateInner {
                strategy: Strategy::from_config(&config.routing),
                routing: config.routing,
                filter,
                breakers: CircuitBreakerTable::new(&config.health.circuit_breaker),
                sigcache: SignatureCache::new(),
                auth: AuthGate::from_config(&config.auth),
                request_timeout: Duration::from_millis(config.server.request_timeout_ms),
                health_check: config.health.health_check.clone(),
                debug_options: config.logging.debug_options,
                providers,
            }),
        })
    }

    pub(crate) fn inner(&self) -> &StateInner {
        &self.inner
    }

    /// Find a provider handle by name
    pub(crate) fn provider(&self, name: &str) -> Option<&Arc<ProviderHandle>> {
        self.inner.providers.iter().find(|p| p.name == name)
    }

    /// Build the router's candidate view over a set of providers
    ///
    /// Samples breaker health exactly once per candidate.
    pub(crate) fn candidates<'a>(
        &'a self,
        providers: &[&'a Arc<ProviderHandle>],
    ) -> Vec<Candidate<'a>> {
        providers
            .iter()
            .map(|p| Candidate {
                name: &p.name,
                weight: p.weight,
                priority: p.priority,
                healthy: self.inner.breakers.healthy(&p.name),
                last_failure: self.inner.breakers.last_failure(&p.name),
            })
            .collect()
    }
}
