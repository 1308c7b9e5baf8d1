use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use rand::Rng as _;
use relay_config::{RoutingConfig, RoutingStrategy};

use crate::error::RouteError;

/// One provider as seen by the router
///
/// Health and last-failure are sampled once by the caller before
/// selection; the router itself never touches shared health state.
#[derive(Debug, Clone)]
pub struct Candidate<'a> {
    pub name: &'a str,
    pub weight: u32,
    pub priority: i32,
    pub healthy: bool,
    pub last_failure: Option<Instant>,
}

/// Routing strategy, dispatched per selection
///
/// One instance lives for the process lifetime; round-robin and
/// weighted state is internal.
pub enum Strategy {
    /// Healthy candidates in priority order; failed candidates get a
    /// timed second chance when nothing healthy remains
    Failover { timeout: Duration },
    /// Rotate across healthy candidates
    RoundRobin { counter: AtomicUsize },
    /// Uniform random over healthy candidates
    Shuffle,
    /// Smooth weighted rotation proportional to candidate weight
    WeightedRoundRobin { credits: Mutex<HashMap<String, i64>> },
}

impl Strategy {
    /// Build the strategy from routing configuration
    ///
    /// `model_based` routes through the model filter and then fails
    /// over across the narrowed candidates.
    pub fn from_config(config: &RoutingConfig) -> Self {
        let timeout = Duration::from_millis(config.failover_timeout_ms);
        match config.strategy {
            RoutingStrategy::Failover | RoutingStrategy::ModelBased => Self::Failover { timeout },
            RoutingStrategy::RoundRobin => Self::RoundRobin {
                counter: AtomicUsize::new(0),
            },
            RoutingStrategy::Shuffle => Self::Shuffle,
            RoutingStrategy::WeightedRoundRobin => Self::WeightedRoundRobin {
                credits: Mutex::new(HashMap::new()),
            },
        }
    }

    /// Pick one candidate, returning its index into `candidates`
    ///
    /// # Errors
    ///
    /// Returns `NoProviderAvailable` when no candidate qualifies. An
    /// empty slice is a caller bug.
    pub fn select(&self, candidates: &[Candidate<'_>]) -> Result<usize, RouteError> {
        debug_assert!(!candidates.is_empty(), "router called with no candidates");

        let healthy: Vec<usize> = (0..candidates.len())
            .filter(|&i| candidates[i].healthy)
            .collect();

        match self {
            Self::Failover { timeout } => select_failover(candidates, &healthy, *timeout),
            Self::RoundRobin { counter } => {
                if healthy.is_empty() {
                    return Err(RouteError::NoProviderAvailable);
                }
                let n = counter.fetch_add(1, Ordering::Relaxed);
                Ok(healthy[n % healthy.len()])
            }
            Self::Shuffle => {
                if healthy.is_empty() {
                    return Err(RouteError::NoProviderAvailable);
                }
                let mut rng = rand::rng();
                Ok(healthy[rng.random_range(0..healthy.len())])
            }
            Self::WeightedRoundRobin { credits } => select_weighted(candidates, &healthy, credits),
        }
    }
}

/// Priority order (lower first), stable on declaration order
fn priority_order(candidates: &[Candidate<'_>], indexes: &[usize]) -> Vec<usize> {
    let mut ordered = indexes.to_vec();
    ordered.sort_by_key(|&i| candidates[i].priority);
    ordered
}

fn select_failover(
    candidates: &[Candidate<'_>],
    healthy: &[usize],
    timeout: Duration,
) -> Result<usize, RouteError> {
    if let Some(&first) = priority_order(candidates, healthy).first() {
        return Ok(first);
    }

    // Nothing healthy: give the least-recently-failed-enough candidate
    // one more chance.
    let all: Vec<usize> = (0..candidates.len()).collect();
    for i in priority_order(candidates, &all) {
        let due = candidates[i]
            .last_failure
            .is_none_or(|at| at.elapsed() >= timeout);
        if due {
            tracing::debug!(
                provider = candidates[i].name,
                "no healthy provider, retrying past failure"
            );
            return Ok(i);
        }
    }

    Err(RouteError::NoProviderAvailable)
}

fn select_weighted(
    candidates: &[Candidate<'_>],
    healthy: &[usize],
    credits: &Mutex<HashMap<String, i64>>,
) -> Result<usize, RouteError> {
    if healthy.is_empty() {
        return Err(RouteError::NoProviderAvailable);
    }

    let mut credits = credits.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
    let total: i64 = healthy.iter().map(|&i| i64::from(candidates[i].weight)).sum();

    let mut best: Option<usize> = None;
    for &i in healthy {
        let credit = credits.entry(candidates[i].name.to_owned()).or_insert(0);
        *credit += i64::from(candidates[i].weight);
        let credit = *credit;

        let better = best.is_none_or(|b| {
            let best_credit = credits[candidates[b].name];
            credit > best_credit
                || (credit == best_credit && candidates[i].priority > candidates[b].priority)
        });
        if better {
            best = Some(i);
        }
    }

    let chosen = best.unwrap_or(healthy[0]);
    if let Some(credit) = credits.get_mut(candidates[chosen].name) {
        *credit -= total;
    }
    Ok(chosen)
}
