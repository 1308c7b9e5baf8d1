use std::sync::Mutex;
use std::time::{Duration, Instant};

use http::{HeaderMap, StatusCode};
use rand::Rng as _;
use relay_config::{PoolStrategy, ProviderConfig};
use relay_core::HttpError;
use secrecy::SecretString;
use thiserror::Error;

use crate::entry::{Axis, KeyEntry, KeyId};
use crate::headers::RateLimitSnapshot;

/// Minimum exhaustion backoff after an upstream 429
const MIN_BACKOFF: Duration = Duration::from_secs(60);

/// Pool errors
#[derive(Debug, Error)]
pub enum PoolError {
    /// Every credential is exhausted for the current window
    #[error("all credentials exhausted")]
    AllKeysExhausted {
        /// Wait until the earliest credential resets
        retry_after: Duration,
    },
}

impl HttpError for PoolError {
    fn status_code(&self) -> StatusCode {
        StatusCode::TOO_MANY_REQUESTS
    }

    fn error_type(&self) -> &str {
        "rate_limit_error"
    }

    fn client_message(&self) -> String {
        self.to_string()
    }
}

/// Token counts attributed to one request
#[derive(Debug, Default, Clone, Copy)]
pub struct TokenUsage {
    pub input_tokens: u64,
    pub output_tokens: u64,
}

/// A credential handed out by `select_key`
#[derive(Debug, Clone)]
pub struct SelectedKey {
    pub id: KeyId,
    pub secret: SecretString,
    /// Masked identifier for logs and debug headers
    pub label: String,
}

/// Rate-limit-aware credential pool for one provider
///
/// All state sits behind one mutex; selection and update are O(keys)
/// and never touch the network.
pub struct KeyPool {
    provider: String,
    strategy: PoolStrategy,
    inner: Mutex<Inner>,
}

struct Inner {
    keys: Vec<KeyEntry>,
    cursor: usize,
    credits: Vec<i64>,
}

impl KeyPool {
    /// Build the pool from a provider declaration
    ///
    /// With no `keys` configured, falls back to the provider's single
    /// `api_key`; with neither, a single anonymous unlimited credential
    /// keeps credential-free backends (ollama, SigV4, OAuth) working.
    pub fn from_config(config: &ProviderConfig) -> Self {
        let now = Instant::now();
        let keys: Vec<KeyEntry> = if config.keys.is_empty() {
            let secret = config
                .api_key
                .clone()
                .unwrap_or_else(|| SecretString::from(""));
            vec![KeyEntry::unlimited(secret, now)]
        } else {
            config
                .keys
                .iter()
                .map(|k| KeyEntry::from_config(k, now))
                .collect()
        };

        let credits = vec![0; keys.len()];
        Self {
            provider: config.name.clone(),
            strategy: config.pooling.strategy,
            inner: Mutex::new(Inner {
                keys,
                cursor: 0,
                credits,
            }),
        }
    }

    /// Number of credentials in the pool
    pub fn len(&self) -> usize {
        self.inner.lock().map(|inner| inner.keys.len()).unwrap_or(0)
    }

    /// Whether the pool holds no credentials (never true in practice)
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Pick a credential for the next request
    ///
    /// Pre-decrements the credential's RPM budget; the pool expects a
    /// matching `record_response` once the upstream answers.
    ///
    /// # Errors
    ///
    /// Returns `AllKeysExhausted` with the earliest reset wait when no
    /// credential has capacity.
    pub fn select_key(&self) -> Result<SelectedKey, PoolError> {
        let Ok(mut inner) = self.inner.lock() else {
            return Err(PoolError::AllKeysExhausted {
                retry_after: MIN_BACKOFF,
            });
        };
        let now = Instant::now();

        for key in &mut inner.keys {
            key.roll_window(now);
        }

        let eligible: Vec<usize> = (0..inner.keys.len())
            .filter(|&i| !inner.keys[i].is_exhausted(now))
            .collect();

        if eligible.is_empty() {
            let retry_after = self.earliest_reset_locked(&inner, now);
            tracing::debug!(
                provider = %self.provider,
                retry_after_secs = retry_after.as_secs(),
                "all credentials exhausted"
            );
            return Err(PoolError::AllKeysExhausted { retry_after });
        }

        let chosen = match self.strategy {
            PoolStrategy::LeastLoaded => pick_least_loaded(&inner.keys, &eligible, now),
            PoolStrategy::RoundRobin => {
                let cursor = inner.cursor;
                let picked = eligible[cursor % eligible.len()];
                inner.cursor = cursor.wrapping_add(1);
                picked
            }
            PoolStrategy::Random => {
                let mut rng = rand::rng();
                eligible[rng.random_range(0..eligible.len())]
            }
            PoolStrategy::Weighted => pick_weighted(&mut inner, &eligible),
        };

        let entry = &mut inner.keys[chosen];
        entry.window.requests += 1;
        entry.consume_learned(Axis::Requests, 1);

        Ok(SelectedKey {
            id: KeyId(chosen),
            secret: entry.secret(),
            label: entry.label().to_owned(),
        })
    }

    /// Borrow a credential without consuming budget
    ///
    /// Used for synthetic health probes, which should not eat into the
    /// pool's rate windows. Prefers a non-exhausted credential but will
    /// fall back to the first one.
    pub fn any_key(&self) -> Option<SelectedKey> {
        let Ok(mut inner) = self.inner.lock() else {
            return None;
        };
        let now = Instant::now();
        for key in &mut inner.keys {
            key.roll_window(now);
        }

        let index = (0..inner.keys.len())
            .find(|&i| !inner.keys[i].is_exhausted(now))
            .unwrap_or(0);
        let entry = inner.keys.get(index)?;

        Some(SelectedKey {
            id: KeyId(index),
            secret: entry.secret(),
            label: entry.label().to_owned(),
        })
    }

    /// Record the upstream response for a previously selected credential
    ///
    /// Authoritative `anthropic-ratelimit-*` headers overwrite learned
    /// limits; otherwise heuristic token accounting applies. An upstream
    /// 429 marks the credential exhausted without crediting back the
    /// selection pre-decrement. Unknown ids are ignored.
    pub fn record_response(
        &self,
        id: KeyId,
        status: u16,
        headers: &HeaderMap,
        usage: Option<TokenUsage>,
    ) {
        let Ok(mut inner) = self.inner.lock() else {
            return;
        };
        let now = Instant::now();
        let Some(entry) = inner.keys.get_mut(id.0) else {
            return;
        };

        let snapshot = RateLimitSnapshot::from_headers(headers);
        if snapshot.has_limits() {
            if let Some(axis) = snapshot.requests {
                entry.learn(Axis::Requests, axis, now);
            }
            if let Some(axis) = snapshot.input_tokens {
                entry.learn(Axis::InputTokens, axis, now);
            }
            if let Some(axis) = snapshot.output_tokens {
                entry.learn(Axis::OutputTokens, axis, now);
            }
        } else if let Some(usage) = usage {
            apply_usage(entry, usage);
        }

        if status == StatusCode::TOO_MANY_REQUESTS.as_u16() {
            let backoff = snapshot.retry_after.map_or(MIN_BACKOFF, |ra| ra.max(MIN_BACKOFF));
            entry.exhausted_until = Some(now + backoff);
            tracing::warn!(
                provider = %self.provider,
                key = entry.label(),
                backoff_secs = backoff.as_secs(),
                "credential rate limited by upstream"
            );
        }
    }

    /// Record token usage learned after the response headers, e.g. the
    /// output-token count from a stream's final `message_delta`
    pub fn record_usage(&self, id: KeyId, usage: TokenUsage) {
        let Ok(mut inner) = self.inner.lock() else {
            return;
        };
        if let Some(entry) = inner.keys.get_mut(id.0) {
            apply_usage(entry, usage);
        }
    }

    /// Wait until the earliest credential reset across the pool
    pub fn earliest_reset_time(&self) -> Duration {
        let Ok(inner) = self.inner.lock() else {
            return MIN_BACKOFF;
        };
        self.earliest_reset_locked(&inner, Instant::now())
    }

    fn earliest_reset_locked(&self, inner: &Inner, now: Instant) -> Duration {
        inner
            .keys
            .iter()
            .map(|key| key.earliest_reset(now))
            .min()
            .map_or(MIN_BACKOFF, |at| {
                at.saturating_duration_since(now).max(Duration::from_secs(1))
            })
    }
}

fn apply_usage(entry: &mut KeyEntry, usage: TokenUsage) {
    entry.window.input_tokens += usage.input_tokens;
    entry.window.output_tokens += usage.output_tokens;
    entry.consume_learned(Axis::InputTokens, usage.input_tokens);
    entry.consume_learned(Axis::OutputTokens, usage.output_tokens);
}

/// Largest remaining capacity; ties go to higher priority, then
/// insertion order
fn pick_least_loaded(keys: &[KeyEntry], eligible: &[usize], now: Instant) -> usize {
    let mut best = eligible[0];
    let mut best_remaining = keys[best].remaining(now);

    for &i in &eligible[1..] {
        let remaining = keys[i].remaining(now);
        let better = remaining > best_remaining
            || (remaining == best_remaining && keys[i].priority > keys[best].priority);
        if better {
            best = i;
            best_remaining = remaining;
        }
    }
    best
}

/// Smooth weighted round-robin over the eligible credentials
fn pick_weighted(inner: &mut Inner, eligible: &[usize]) -> usize {
    let total: i64 = eligible.iter().map(|&i| i64::from(inner.keys[i].weight)).sum();

    let mut best = eligible[0];
    for &i in eligible {
        inner.credits[i] += i64::from(inner.keys[i].weight);
        let better = inner.credits[i] > inner.credits[best]
            || (inner.credits[i] == inner.credits[best]
                && inner.keys[i].priority > inner.keys[best].priority);
        if i != best && better {
            best = i;
        }
    }

    inner.credits[best] -= total;
    best
}
