//! Per-provider credential pools with rate-limit-aware selection
//!
//! Each provider owns one pool. Selection picks a credential under the
//! configured policy, skipping credentials that are exhausted for the
//! current minute window; responses feed observed and learned limits
//! back into the pool.

mod entry;
mod headers;
mod pool;

pub use entry::KeyId;
pub use headers::RateLimitSnapshot;
pub use pool::{KeyPool, PoolError, SelectedKey, TokenUsage};
