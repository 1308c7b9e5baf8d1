//! Per-provider circuit breakers
//!
//! Tracks provider health from request outcomes and blocks traffic to
//! providers that are consistently failing, allowing them time to
//! recover before traffic resumes.

mod breaker;
mod classify;

pub use breaker::{BreakerState, CircuitBreakerTable};
pub use classify::is_failure_status;
