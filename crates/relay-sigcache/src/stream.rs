//! Signature learning from streamed responses
//!
//! A tap rides along each SSE stream, accumulating `thinking_delta`
//! fragments until the matching `signature_delta` arrives, then writes
//! the pair into the cache and family-qualifies the signature the
//! client sees.

use serde_json::Value;

use crate::cache::SignatureCache;
use crate::family::model_family;

/// Per-stream accumulator for thinking signatures
pub struct ThinkingTap {
    family: String,
    buffer: String,
    cache: SignatureCache,
}

impl ThinkingTap {
    /// Create a tap for one response stream
    pub fn new(model: &str, cache: SignatureCache) -> Self {
        Self {
            family: model_family(model).to_owned(),
            buffer: String::new(),
            cache,
        }
    }

    /// Observe one SSE event before it is forwarded
    ///
    /// Returns replacement `data` bytes when the event was rewritten
    /// (currently only `signature_delta`, which gains the family
    /// qualifier); `None` forwards the original bytes untouched.
    pub fn observe(&mut self, event: &str, data: &str) -> Option<String> {
        if event != "content_block_delta" {
            return None;
        }
        // Cheap gate before the JSON parse: most deltas are text.
        if !data.contains("thinking_delta") && !data.contains("signature_delta") {
            return None;
        }

        let mut parsed: Value = serde_json::from_str(data).ok()?;
        let delta = parsed.get("delta")?;
        let delta_type = delta.get("type").and_then(Value::as_str)?.to_owned();

        if delta_type == "thinking_delta" {
            if let Some(fragment) = delta.get("thinking").and_then(Value::as_str) {
                self.buffer.push_str(fragment);
            }
            return None;
        }

        if delta_type == "signature_delta" {
            let signature = delta.get("signature").and_then(Value::as_str)?.to_owned();
            if !self.buffer.is_empty() {
                self.cache.set(&self.family, &self.buffer, &signature);
            }
            self.buffer.clear();

            parsed["delta"]["signature"] = Value::String(format!("{}#{signature}", self.family));
            return serde_json::to_string(&parsed).ok();
        }

        None
    }
}
