//! Parsing of Anthropic rate-limit response headers
//!
//! Header names follow the pattern
//! `anthropic-ratelimit-{requests,input-tokens,output-tokens}-{limit,remaining,reset}`.
//! The reset value is an RFC 3339 timestamp; it is converted to a
//! relative wait so the pool can work in monotonic time.

use std::str::FromStr;
use std::time::Duration;

use http::HeaderMap;

/// Authoritative rate-limit state for one dimension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AxisSnapshot {
    pub limit: u64,
    pub remaining: u64,
    /// Time until the window resets; `None` when the header was absent
    /// or already in the past
    pub reset_in: Option<Duration>,
}

/// Everything the backend told us about the selected credential
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitSnapshot {
    pub requests: Option<AxisSnapshot>,
    pub input_tokens: Option<AxisSnapshot>,
    pub output_tokens: Option<AxisSnapshot>,
    /// `Retry-After` in seconds, when present
    pub retry_after: Option<Duration>,
}

impl RateLimitSnapshot {
    /// Extract the snapshot from response headers
    pub fn from_headers(headers: &HeaderMap) -> Self {
        Self {
            requests: parse_axis(headers, "requests"),
            input_tokens: parse_axis(headers, "input-tokens"),
            output_tokens: parse_axis(headers, "output-tokens"),
            retry_after: parse_u64(headers, "retry-after").map(Duration::from_secs),
        }
    }

    /// Whether any authoritative axis was present
    pub const fn has_limits(&self) -> bool {
        self.requests.is_some() || self.input_tokens.is_some() || self.output_tokens.is_some()
    }
}

fn parse_axis(headers: &HeaderMap, axis: &str) -> Option<AxisSnapshot> {
    let limit = parse_u64(headers, &format!("anthropic-ratelimit-{axis}-limit"))?;
    let remaining = parse_u64(headers, &format!("anthropic-ratelimit-{axis}-remaining"))?;
    let reset_in = headers
        .get(format!("anthropic-ratelimit-{axis}-reset"))
        .and_then(|v| v.to_str().ok())
        .and_then(|v| jiff::Timestamp::from_str(v).ok())
        .and_then(|reset| {
            let until = reset.duration_since(jiff::Timestamp::now());
            Duration::try_from(until).ok()
        });

    Some(AxisSnapshot {
        limit,
        remaining,
        reset_in,
    })
}

fn parse_u64(headers: &HeaderMap, name: &str) -> Option<u64> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse().ok())
}
