//! Synthetic health probes

/// How a provider is probed while its breaker is open
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeKind {
    /// A one-token `/v1/messages` call through the dialect transform
    Messages,
    /// No cheap probe exists; the check reports success unconditionally
    NoOp,
}

/// Minimal Messages API body used for synthetic probes
pub fn probe_body(model: &str) -> Vec<u8> {
    serde_json::to_vec(&serde_json::json!({
        "model": model,
        "messages": [{"role": "user", "content": "ping"}],
        "max_tokens": 1,
    }))
    .unwrap_or_default()
}
