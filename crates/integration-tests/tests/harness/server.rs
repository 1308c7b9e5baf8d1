//! Relay instance on a random port for tests

use std::net::SocketAddr;

use relay_config::Config;
use relay_server::{RelayState, relay_router, spawn_health_checker};
use tokio_util::sync::CancellationToken;

/// A running relay under test
pub struct TestServer {
    addr: SocketAddr,
    shutdown: CancellationToken,
    client: reqwest::Client,
}

impl TestServer {
    /// Start the relay with the given configuration
    pub async fn start(config: Config) -> anyhow::Result<Self> {
        Self::start_inner(config, false).await
    }

    /// Start the relay with the background health checker running
    pub async fn start_with_checker(config: Config) -> anyhow::Result<Self> {
        Self::start_inner(config, true).await
    }

    async fn start_inner(config: Config, checker: bool) -> anyhow::Result<Self> {
        let state = RelayState::from_config(config).await?;
        let router = relay_router(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let shutdown = CancellationToken::new();

        if checker {
            spawn_health_checker(state, shutdown.clone());
        }

        let shutdown_clone = shutdown.clone();
        tokio::spawn(async move {
            axum::serve(listener, router)
                .with_graceful_shutdown(async move {
                    shutdown_clone.cancelled().await;
                })
                .await
                .ok();
        });

        Ok(Self {
            addr,
            shutdown,
            client: reqwest::Client::new(),
        })
    }

    /// Full URL for a relay path
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{path}", self.addr)
    }

    /// Shared HTTP client
    pub fn client(&self) -> &reqwest::Client {
        &self.client
    }

    /// POST a Messages API body
    pub async fn post_messages(&self, body: &serde_json::Value) -> anyhow::Result<reqwest::Response> {
        Ok(self
            .client
            .post(self.url("/v1/messages"))
            .json(body)
            .send()
            .await?)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}
