//! HTTP server assembly for the relay
//!
//! Routes, middleware, the background health checker, and graceful
//! shutdown. The client-facing contract is the Anthropic Messages API
//! plus small read-only listing endpoints.

mod auth;
mod checker;
mod debug;
mod error;
mod health;
mod logging;
mod messages;
mod models;
mod providers;
mod state;
mod stream;

use std::net::SocketAddr;

use axum::{Router, routing};
use relay_config::Config;
use tokio_util::sync::CancellationToken;
use tower::limit::ConcurrencyLimitLayer;
use tower_http::trace::TraceLayer;

pub use logging::init_logging;
pub use state::RelayState;

/// Spawn the background health checker outside of `Server::serve`
///
/// Lets embedding harnesses run probes against a router they serve
/// themselves.
pub fn spawn_health_checker(
    state: RelayState,
    shutdown: CancellationToken,
) -> tokio::task::JoinHandle<()> {
    checker::spawn(state, shutdown)
}

/// Build the relay's route table over shared state
pub fn relay_router(state: RelayState) -> Router {
    Router::new()
        .route("/v1/messages", routing::post(messages::messages_handler))
        .route("/v1/models", routing::get(models::models_handler))
        .route("/v1/providers", routing::get(providers::providers_handler))
        .route("/health", routing::get(health::health_handler))
        .with_state(state)
}

/// Assembled server with routes and middleware
pub struct Server {
    router: Router,
    state: RelayState,
    listen_address: SocketAddr,
    health_check_enabled: bool,
}

impl Server {
    /// Build the server from configuration
    ///
    /// # Errors
    ///
    /// Returns an error if provider initialization fails.
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        let listen_address = config
            .server
            .listen_address
            .unwrap_or_else(|| SocketAddr::from(([0, 0, 0, 0], 8787)));
        let max_concurrent = config.server.max_concurrent.max(1);
        let health_check_enabled = config.health.health_check.enabled;

        let state = RelayState::from_config(config).await?;

        let router = relay_router(state.clone())
            .layer(TraceLayer::new_for_http())
            .layer(ConcurrencyLimitLayer::new(max_concurrent));

        Ok(Self {
            router,
            state,
            listen_address,
            health_check_enabled,
        })
    }

    /// Get the configured listen address
    #[must_use]
    pub const fn listen_address(&self) -> SocketAddr {
        self.listen_address
    }

    /// Consume the server and return the inner router
    ///
    /// Useful for testing when the caller manages the listener.
    pub fn into_router(self) -> Router {
        self.router
    }

    /// Start serving requests
    ///
    /// Blocks until the cancellation token is triggered. The health
    /// checker runs alongside and stops with the same token.
    ///
    /// # Errors
    ///
    /// Returns an error if binding the TCP listener or serving fails
    pub async fn serve(self, shutdown: CancellationToken) -> anyhow::Result<()> {
        let listener = tokio::net::TcpListener::bind(self.listen_address).await?;
        let local_addr = listener.local_addr()?;
        tracing::info!(%local_addr, "relay listening");

        let checker = self
            .health_check_enabled
            .then(|| checker::spawn(self.state.clone(), shutdown.clone()));

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                shutdown.cancelled().await;
                tracing::info!("graceful shutdown initiated");
            })
            .await?;

        if let Some(checker) = checker {
            checker.await.ok();
        }

        Ok(())
    }
}
