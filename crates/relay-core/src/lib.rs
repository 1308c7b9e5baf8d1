//! Shared types for the relay: the HTTP error seam, the per-request
//! context, and the lightweight JSON probes used on the hot path

mod context;
mod error;
mod json;

pub use context::RequestContext;
pub use error::{HttpError, error_body, error_sse_event};
pub use json::{
    estimate_input_tokens, extract_model, extract_stream, has_thinking_blocks, mask_secret,
};
