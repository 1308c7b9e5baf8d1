use std::sync::Mutex;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use relay_config::CircuitBreakerConfig;

/// Circuit breaker state for a provider
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakerState {
    /// Normal operation, requests flow through
    Closed,
    /// Provider is failing, requests are blocked
    Open,
    /// Probing, limited requests test recovery
    HalfOpen,
}

impl BreakerState {
    /// Wire name used in debug headers and `/v1/providers`
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Closed => "closed",
            Self::Open => "open",
            Self::HalfOpen => "half-open",
        }
    }
}

/// Per-provider breaker record
#[derive(Debug)]
struct Record {
    state: BreakerState,
    consecutive_failures: u32,
    half_open_successes: u32,
    entered_at: Instant,
    last_failure: Option<Instant>,
}

impl Record {
    fn new() -> Self {
        Self {
            state: BreakerState::Closed,
            consecutive_failures: 0,
            half_open_successes: 0,
            entered_at: Instant::now(),
            last_failure: None,
        }
    }
}

/// Circuit breakers for all providers, created lazily per name
///
/// The OPEN to HALF-OPEN transition happens on state inspection once
/// the open duration has elapsed; successful synthetic probes during
/// OPEN verify recovery but never shorten the wait.
pub struct CircuitBreakerTable {
    records: DashMap<String, Mutex<Record>>,
    failure_threshold: u32,
    open_duration: Duration,
    half_open_probes: u32,
}

impl CircuitBreakerTable {
    /// Create the table from breaker configuration
    pub fn new(config: &CircuitBreakerConfig) -> Self {
        Self {
            records: DashMap::new(),
            failure_threshold: config.failure_threshold.max(1),
            open_duration: Duration::from_millis(config.open_duration_ms),
            half_open_probes: config.half_open_probes.max(1),
        }
    }

    fn with_record<T>(&self, provider: &str, f: impl FnOnce(&mut Record) -> T) -> T {
        let cell = self
            .records
            .entry(provider.to_owned())
            .or_insert_with(|| Mutex::new(Record::new()));
        let mut record = cell.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        self.tick(&mut record);
        f(&mut record)
    }

    /// Apply the timed OPEN to HALF-OPEN transition
    fn tick(&self, record: &mut Record) {
        if record.state == BreakerState::Open && record.entered_at.elapsed() >= self.open_duration {
            record.state = BreakerState::HalfOpen;
            record.half_open_successes = 0;
            record.entered_at = Instant::now();
        }
    }

    /// Current state for a provider
    pub fn state(&self, provider: &str) -> BreakerState {
        self.with_record(provider, |record| record.state)
    }

    /// Whether the provider should receive traffic
    pub fn healthy(&self, provider: &str) -> bool {
        self.state(provider) != BreakerState::Open
    }

    /// When the provider last failed, if ever
    pub fn last_failure(&self, provider: &str) -> Option<Instant> {
        self.with_record(provider, |record| record.last_failure)
    }

    /// Record a successful call
    ///
    /// Returns whether the success was recorded: `false` while the
    /// breaker is OPEN, where successes only verify recovery.
    pub fn report_success(&self, provider: &str) -> bool {
        let (recorded, closed) = self.with_record(provider, |record| match record.state {
            BreakerState::Open => (false, false),
            BreakerState::HalfOpen => {
                record.half_open_successes += 1;
                if record.half_open_successes >= self.half_open_probes {
                    record.state = BreakerState::Closed;
                    record.consecutive_failures = 0;
                    record.half_open_successes = 0;
                    record.entered_at = Instant::now();
                    (true, true)
                } else {
                    (true, false)
                }
            }
            BreakerState::Closed => {
                record.consecutive_failures = 0;
                (true, false)
            }
        });

        if !recorded {
            tracing::debug!(provider, "success while breaker open, not recorded");
        }
        if closed {
            tracing::info!(provider, "circuit breaker closed");
        }
        recorded
    }

    /// Record a failed call
    pub fn report_failure(&self, provider: &str) {
        let opened = self.with_record(provider, |record| {
            record.last_failure = Some(Instant::now());
            match record.state {
                BreakerState::Closed => {
                    record.consecutive_failures += 1;
                    if record.consecutive_failures >= self.failure_threshold {
                        record.state = BreakerState::Open;
                        record.entered_at = Instant::now();
                        true
                    } else {
                        false
                    }
                }
                BreakerState::HalfOpen => {
                    record.state = BreakerState::Open;
                    record.half_open_successes = 0;
                    record.entered_at = Instant::now();
                    true
                }
                BreakerState::Open => false,
            }
        });

        if opened {
            tracing::warn!(provider, "circuit breaker opened");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(threshold: u32, open_ms: u64, probes: u32) -> CircuitBreakerTable {
        CircuitBreakerTable::new(&CircuitBreakerConfig {
            failure_threshold: threshold,
            open_duration_ms: open_ms,
            half_open_probes: probes,
        })
    }

    #[test]
    fn unknown_provider_starts_closed() {
        let table = table(3, 100, 1);
        assert_eq!(table.state("fresh"), BreakerState::Closed);
        assert!(table.healthy("fresh"));
    }

    #[test]
    fn opens_after_threshold_consecutive_failures() {
        let table = table(3, 10_000, 1);
        table.report_failure("p");
        table.report_failure("p");
        assert_eq!(table.state("p"), BreakerState::Closed);
        table.report_failure("p");
        assert_eq!(table.state("p"), BreakerState::Open);
        assert!(!table.healthy("p"));
    }

    #[test]
    fn success_resets_the_failure_streak() {
        let table = table(3, 10_000, 1);
        table.report_failure("p");
        table.report_failure("p");
        assert!(table.report_success("p"));
        table.report_failure("p");
        table.report_failure("p");
        assert_eq!(table.state("p"), BreakerState::Closed);
    }

    #[test]
    fn success_during_open_is_not_recorded() {
        let table = table(1, 10_000, 1);
        table.report_failure("p");
        assert_eq!(table.state("p"), BreakerState::Open);
        assert!(!table.report_success("p"));
        assert_eq!(table.state("p"), BreakerState::Open);
    }

    #[test]
    fn open_becomes_half_open_after_duration() {
        let table = table(1, 20, 1);
        table.report_failure("p");
        assert_eq!(table.state("p"), BreakerState::Open);

        std::thread::sleep(Duration::from_millis(30));
        assert_eq!(table.state("p"), BreakerState::HalfOpen);
    }

    #[test]
    fn half_open_closes_after_enough_successes() {
        let table = table(1, 10, 2);
        table.report_failure("p");
        std::thread::sleep(Duration::from_millis(20));
        assert_eq!(table.state("p"), BreakerState::HalfOpen);

        assert!(table.report_success("p"));
        assert_eq!(table.state("p"), BreakerState::HalfOpen);
        assert!(table.report_success("p"));
        assert_eq!(table.state("p"), BreakerState::Closed);
    }

    #[test]
    fn half_open_failure_reopens() {
        let table = table(1, 10, 2);
        table.report_failure("p");
        std::thread::sleep(Duration::from_millis(20));
        assert_eq!(table.state("p"), BreakerState::HalfOpen);

        table.report_failure("p");
        assert_eq!(table.state("p"), BreakerState::Open);
    }

    #[test]
    fn providers_are_tracked_independently() {
        let table = table(1, 10_000, 1);
        table.report_failure("bad");
        assert!(!table.healthy("bad"));
        assert!(table.healthy("good"));
    }

    #[test]
    fn client_error_statuses_never_open() {
        let table = table(2, 10_000, 1);
        for status in [400, 401, 403, 404, 422, 400, 401, 403] {
            if crate::is_failure_status(status) {
                table.report_failure("p");
            }
        }
        assert_eq!(table.state("p"), BreakerState::Closed);
    }
}
