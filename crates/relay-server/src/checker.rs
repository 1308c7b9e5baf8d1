//! Background health checker
//!
//! Providers with a tripped breaker get synthetic probes on a fixed
//! interval. While the breaker is OPEN a successful probe only logs
//! that recovery looks likely; the timed transition to HALF-OPEN is
//! what reopens the traffic path, which keeps a recovering provider
//! from being stampeded. Probes during HALF-OPEN count toward closing.

use std::sync::Arc;
use std::time::Duration;

use relay_health::BreakerState;
use relay_upstream::{ProbeKind, TransformInput, probe_body};
use tokio_util::sync::CancellationToken;

use crate::state::{ProviderHandle, RelayState};

/// Deadline for one synthetic probe
const PROBE_TIMEOUT: Duration = Duration::from_secs(10);

/// Spawn the checker loop; it exits when `shutdown` fires
pub(crate) fn spawn(state: RelayState, shutdown: CancellationToken) -> tokio::task::JoinHandle<()> {
    let interval = Duration::from_millis(state.inner().health_check.interval_ms.max(100));

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                () = shutdown.cancelled() => break,
                _ = ticker.tick() => run_probes(&state).await,
            }
        }
        tracing::debug!("health checker stopped");
    })
}

/// Probe every provider whose breaker is not closed
async fn run_probes(state: &RelayState) {
    for provider in &state.inner().providers {
        match state.inner().breakers.state(&provider.name) {
            BreakerState::Closed => {}
            BreakerState::Open => {
                // Verification only: success here never shortens the
                // open window.
                let healthy = probe(provider).await;
                if healthy {
                    tracing::info!(provider = %provider.name, "probe succeeded, recovery verified");
                } else {
                    tracing::debug!(provider = %provider.name, "probe failed, provider still down");
                }
            }
            BreakerState::HalfOpen => {
                if probe(provider).await {
                    state.inner().breakers.report_success(&provider.name);
                } else {
                    state.inner().breakers.report_failure(&provider.name);
                }
            }
        }
    }
}

/// One synthetic call against a provider
async fn probe(provider: &Arc<ProviderHandle>) -> bool {
    match provider.adapter.probe() {
        ProbeKind::NoOp => true,
        ProbeKind::Messages => {
            let body = probe_body(&provider.probe_model);
            let credential = provider.pool.any_key();
            let headers = http::HeaderMap::new();

            let outbound = match provider
                .adapter
                .transform_request(TransformInput {
                    body: &body,
                    headers: &headers,
                    model: Some(&provider.probe_model),
                    stream: false,
                    credential: credential.as_ref().map(|k| &k.secret),
                    client_supplied_auth: false,
                })
                .await
            {
                Ok(outbound) => outbound,
                Err(e) => {
                    tracing::debug!(provider = %provider.name, error = %e, "probe transform failed");
                    return false;
                }
            };

            let request = provider
                .client
                .post(outbound.url)
                .headers(outbound.headers)
                .body(outbound.body)
                .timeout(PROBE_TIMEOUT);

            match request.send().await {
                Ok(response) => !relay_health::is_failure_status(response.status().as_u16()),
                Err(_) => false,
            }
        }
    }
}
