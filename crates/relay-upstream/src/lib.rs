//! Provider dialect adapters
//!
//! One adapter per backend kind rewrites the inbound Anthropic request
//! (body, URL, headers, credentials) into the provider's dialect, and
//! describes how the provider streams responses back.

mod adapter;
mod anthropic;
mod azure;
mod bedrock;
mod eventstream;
mod error;
mod ollama;
mod probe;
mod sse;
mod types;
mod vertex;
mod zai;

pub use adapter::Adapter;
pub use error::UpstreamError;
pub use eventstream::{EventStreamToSse, map_event_name};
pub use probe::{ProbeKind, probe_body};
pub use sse::SseEvent;
pub use types::{OutboundRequest, TransformInput, map_model_in_body};
