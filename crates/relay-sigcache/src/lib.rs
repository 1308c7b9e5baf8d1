//! Extended-thinking signature cache
//!
//! Thinking-block signatures are provider-scoped: a signature minted by
//! provider A is rejected by provider B with HTTP 400. Caching
//! signatures under (model family, thinking-text hash) lets multi-turn
//! thinking conversations survive cross-provider routing.

mod cache;
mod family;
mod rewrite;
mod stream;

pub use cache::SignatureCache;
pub use family::{GEMINI_SKIP_SENTINEL, model_family};
pub use rewrite::{absorb_response, rewrite_request};
pub use stream::ThinkingTap;
