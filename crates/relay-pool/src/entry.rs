use std::time::{Duration, Instant};

use relay_config::KeyConfig;
use relay_core::mask_secret;
use secrecy::{ExposeSecret, SecretString};

use crate::headers::AxisSnapshot;

/// Length of the sliding accounting window
pub(crate) const WINDOW: Duration = Duration::from_secs(60);

/// Pool-local credential identifier
///
/// An index into the owning pool; meaningless across pools.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyId(pub(crate) usize);

/// Usage counters for the current minute window
#[derive(Debug)]
pub(crate) struct MinuteWindow {
    pub anchor: Instant,
    pub requests: u64,
    pub input_tokens: u64,
    pub output_tokens: u64,
}

impl MinuteWindow {
    fn new(now: Instant) -> Self {
        Self {
            anchor: now,
            requests: 0,
            input_tokens: 0,
            output_tokens: 0,
        }
    }
}

/// Limits learned from `anthropic-ratelimit-*` response headers
///
/// Once observed, a learned axis overrides the configured budget for
/// that dimension until its reset instant passes.
#[derive(Debug, Default)]
pub(crate) struct LearnedLimits {
    pub requests: Option<LearnedAxis>,
    pub input_tokens: Option<LearnedAxis>,
    pub output_tokens: Option<LearnedAxis>,
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct LearnedAxis {
    pub limit: u64,
    pub remaining: u64,
    pub reset_at: Instant,
}

impl LearnedAxis {
    /// Remaining budget, treating a passed reset as a full refill
    fn remaining_at(&self, now: Instant) -> u64 {
        if now >= self.reset_at { self.limit } else { self.remaining }
    }
}

/// One credential and its accounting state
///
/// Owned by the pool; mutated only under the pool's lock.
pub(crate) struct KeyEntry {
    secret: SecretString,
    label: String,
    rpm_limit: Option<u32>,
    itpm_limit: Option<u32>,
    otpm_limit: Option<u32>,
    pub priority: i32,
    pub weight: u32,
    pub window: MinuteWindow,
    pub learned: LearnedLimits,
    pub exhausted_until: Option<Instant>,
}

impl KeyEntry {
    pub fn from_config(config: &KeyConfig, now: Instant) -> Self {
        let secret = config.key.clone();
        let label = mask_secret(secret.expose_secret());
        Self {
            secret,
            label,
            rpm_limit: config.rpm_limit,
            itpm_limit: config.itpm_limit,
            otpm_limit: config.otpm_limit,
            priority: config.priority,
            weight: config.weight.max(1),
            window: MinuteWindow::new(now),
            learned: LearnedLimits::default(),
            exhausted_until: None,
        }
    }

    /// An unlimited credential, used for the single-`api_key` fallback
    /// and for providers that authenticate out of band
    pub fn unlimited(secret: SecretString, now: Instant) -> Self {
        let label = mask_secret(secret.expose_secret());
        Self {
            secret,
            label,
            rpm_limit: None,
            itpm_limit: None,
            otpm_limit: None,
            priority: 0,
            weight: 1,
            window: MinuteWindow::new(now),
            learned: LearnedLimits::default(),
            exhausted_until: None,
        }
    }

    pub fn secret(&self) -> SecretString {
        self.secret.clone()
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Roll the minute window if it has elapsed
    pub fn roll_window(&mut self, now: Instant) {
        if now.duration_since(self.window.anchor) >= WINDOW {
            self.window = MinuteWindow::new(now);
        }
    }

    /// Remaining capacity: the minimum across RPM, ITPM, and OTPM
    ///
    /// Learned limits override configured budgets per axis. A credential
    /// with no limits at all reports `u64::MAX`.
    pub fn remaining(&self, now: Instant) -> u64 {
        let requests = axis_remaining(
            self.learned.requests.as_ref(),
            self.rpm_limit,
            self.window.requests,
            now,
        );
        let input = axis_remaining(
            self.learned.input_tokens.as_ref(),
            self.itpm_limit,
            self.window.input_tokens,
            now,
        );
        let output = axis_remaining(
            self.learned.output_tokens.as_ref(),
            self.otpm_limit,
            self.window.output_tokens,
            now,
        );
        requests.min(input).min(output)
    }

    /// Whether this credential is currently unusable
    pub fn is_exhausted(&self, now: Instant) -> bool {
        if self.exhausted_until.is_some_and(|until| until > now) {
            return true;
        }
        self.remaining(now) == 0
    }

    /// Earliest instant at which this credential could be usable again
    pub fn earliest_reset(&self, now: Instant) -> Instant {
        let mut candidates: Vec<Instant> = Vec::new();

        if let Some(until) = self.exhausted_until
            && until > now
        {
            candidates.push(until);
        }

        for axis in [
            self.learned.requests.as_ref(),
            self.learned.input_tokens.as_ref(),
            self.learned.output_tokens.as_ref(),
        ]
        .into_iter()
        .flatten()
        {
            if axis.remaining_at(now) == 0 {
                candidates.push(axis.reset_at);
            }
        }

        if self.remaining(now) == 0 {
            candidates.push(self.window.anchor + WINDOW);
        }

        candidates.into_iter().min().unwrap_or(now + WINDOW)
    }

    /// Apply an authoritative header snapshot for one axis
    pub fn learn(&mut self, axis: Axis, snapshot: AxisSnapshot, now: Instant) {
        let learned = LearnedAxis {
            limit: snapshot.limit,
            remaining: snapshot.remaining,
            reset_at: snapshot
                .reset_in
                .map_or(now + WINDOW, |reset_in| now + reset_in),
        };
        match axis {
            Axis::Requests => self.learned.requests = Some(learned),
            Axis::InputTokens => self.learned.input_tokens = Some(learned),
            Axis::OutputTokens => self.learned.output_tokens = Some(learned),
        }
    }

    /// Decrement a learned axis after local usage, keeping it roughly
    /// in sync between authoritative updates
    pub fn consume_learned(&mut self, axis: Axis, amount: u64) {
        let slot = match axis {
            Axis::Requests => &mut self.learned.requests,
            Axis::InputTokens => &mut self.learned.input_tokens,
            Axis::OutputTokens => &mut self.learned.output_tokens,
        };
        if let Some(learned) = slot {
            learned.remaining = learned.remaining.saturating_sub(amount);
        }
    }
}

/// Rate limit dimensions tracked per credential
#[derive(Debug, Clone, Copy)]
pub(crate) enum Axis {
    Requests,
    InputTokens,
    OutputTokens,
}

fn axis_remaining(
    learned: Option<&LearnedAxis>,
    configured: Option<u32>,
    used: u64,
    now: Instant,
) -> u64 {
    if let Some(learned) = learned {
        return learned.remaining_at(now);
    }
    match configured {
        Some(limit) => u64::from(limit).saturating_sub(used),
        None => u64::MAX,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(rpm: Option<u32>) -> KeyEntry {
        let config = KeyConfig {
            key: SecretString::from("sk-test-1234"),
            rpm_limit: rpm,
            itpm_limit: None,
            otpm_limit: None,
            priority: 0,
            weight: 1,
        };
        KeyEntry::from_config(&config, Instant::now())
    }

    #[test]
    fn unlimited_entry_never_exhausts() {
        let mut e = entry(None);
        let now = Instant::now();
        e.window.requests = 1_000_000;
        assert_eq!(e.remaining(now), u64::MAX);
        assert!(!e.is_exhausted(now));
    }

    #[test]
    fn configured_rpm_counts_down() {
        let mut e = entry(Some(2));
        let now = Instant::now();
        assert_eq!(e.remaining(now), 2);
        e.window.requests = 2;
        assert_eq!(e.remaining(now), 0);
        assert!(e.is_exhausted(now));
    }

    #[test]
    fn window_rolls_after_a_minute() {
        let mut e = entry(Some(1));
        e.window.requests = 1;
        let later = e.window.anchor + WINDOW + Duration::from_millis(1);
        e.roll_window(later);
        assert_eq!(e.window.requests, 0);
        assert!(!e.is_exhausted(later));
    }

    #[test]
    fn learned_limit_overrides_configured() {
        let mut e = entry(Some(100));
        let now = Instant::now();
        e.learn(
            Axis::Requests,
            AxisSnapshot {
                limit: 50,
                remaining: 3,
                reset_in: Some(Duration::from_secs(30)),
            },
            now,
        );
        assert_eq!(e.remaining(now), 3);
    }

    #[test]
    fn learned_axis_refills_after_reset() {
        let mut e = entry(None);
        let now = Instant::now();
        e.learn(
            Axis::Requests,
            AxisSnapshot {
                limit: 50,
                remaining: 0,
                reset_in: Some(Duration::from_millis(10)),
            },
            now,
        );
        assert!(e.is_exhausted(now));
        let after_reset = now + Duration::from_millis(20);
        assert_eq!(e.remaining(after_reset), 50);
    }

    #[test]
    fn exhausted_until_dominates_capacity() {
        let mut e = entry(None);
        let now = Instant::now();
        e.exhausted_until = Some(now + Duration::from_secs(30));
        assert!(e.is_exhausted(now));
        assert_eq!(e.earliest_reset(now), now + Duration::from_secs(30));
    }
}
