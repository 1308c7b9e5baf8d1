//! Diagnostic response headers
//!
//! When enabled (config flag or `x-cc-relay-debug` request header),
//! responses expose which provider, strategy, breaker state, and
//! masked credential served the request.

use http::{HeaderMap, HeaderValue};
use relay_config::RoutingStrategy;
use relay_health::BreakerState;

use crate::state::RelayState;

/// What routing decided for one request, for the debug surface
pub(crate) struct RouteReport {
    pub provider: String,
    /// Breaker state of the chosen provider at selection time
    pub health: BreakerState,
    /// Masked credential id, never the full secret
    pub key_label: Option<String>,
}

/// Whether this request asked for debug headers
pub(crate) fn wants_debug(state: &RelayState, headers: &HeaderMap) -> bool {
    if state.inner().routing.debug {
        return true;
    }
    headers
        .get("x-cc-relay-debug")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == "1" || v.eq_ignore_ascii_case("true"))
}

/// Configured strategy name as exposed in `X-CC-Relay-Strategy`
pub(crate) const fn strategy_name(strategy: RoutingStrategy) -> &'static str {
    match strategy {
        RoutingStrategy::Failover => "failover",
        RoutingStrategy::RoundRobin => "round_robin",
        RoutingStrategy::Shuffle => "shuffle",
        RoutingStrategy::WeightedRoundRobin => "weighted_round_robin",
        RoutingStrategy::ModelBased => "model_based",
    }
}

/// Attach the `X-CC-Relay-*` headers to a response
pub(crate) fn attach(headers: &mut HeaderMap, strategy: RoutingStrategy, report: &RouteReport) {
    insert(headers, "x-cc-relay-provider", &report.provider);
    insert(headers, "x-cc-relay-strategy", strategy_name(strategy));
    insert(headers, "x-cc-relay-health", report.health.as_str());
    if let Some(ref label) = report.key_label {
        insert(headers, "x-cc-relay-key", label);
    }
}

fn insert(headers: &mut HeaderMap, name: &'static str, value: &str) {
    if let Ok(value) = HeaderValue::try_from(value) {
        headers.insert(name, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strategy_names_are_snake_case() {
        assert_eq!(strategy_name(RoutingStrategy::Failover), "failover");
        assert_eq!(
            strategy_name(RoutingStrategy::WeightedRoundRobin),
            "weighted_round_robin"
        );
        assert_eq!(strategy_name(RoutingStrategy::ModelBased), "model_based");
    }

    #[test]
    fn attach_sets_all_headers() {
        let mut headers = HeaderMap::new();
        let report = RouteReport {
            provider: "zai".to_owned(),
            health: BreakerState::Closed,
            key_label: Some("****1234".to_owned()),
        };
        attach(&mut headers, RoutingStrategy::Failover, &report);

        assert_eq!(headers.get("x-cc-relay-provider").unwrap(), "zai");
        assert_eq!(headers.get("x-cc-relay-strategy").unwrap(), "failover");
        assert_eq!(headers.get("x-cc-relay-health").unwrap(), "closed");
        assert_eq!(headers.get("x-cc-relay-key").unwrap(), "****1234");
    }
}
