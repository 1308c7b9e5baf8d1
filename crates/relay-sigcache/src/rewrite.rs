//! Outbound rewriting of extended-thinking content
//!
//! Before a request leaves for a provider, every thinking block either
//! carries a signature the target family will accept or is dropped.
//! Callers gate entry with `relay_core::has_thinking_blocks` so the
//! JSON parse below only runs on thinking traffic.

use serde_json::Value;

use crate::cache::SignatureCache;
use crate::family::{GEMINI_SKIP_SENTINEL, model_family};

/// Minimum length of a client-supplied signature worth keeping
const MIN_SIGNATURE_LEN: usize = 50;

/// Rewrite thinking blocks in an outbound request body
///
/// Cached signatures overwrite client-supplied ones; blocks with
/// neither a cached nor a plausible signature are dropped; a
/// `tool_use` block directly following a thinking block inherits its
/// signature; thinking blocks are reordered ahead of other content.
///
/// Returns the rewritten body, or `None` when nothing changed (or the
/// body failed to parse, in which case it is forwarded untouched).
pub fn rewrite_request(body: &[u8], model: &str, cache: &SignatureCache) -> Option<Vec<u8>> {
    let Ok(mut root) = serde_json::from_slice::<Value>(body) else {
        tracing::warn!("request body with thinking markers is not valid JSON, passing through");
        return None;
    };

    let family = model_family(model).to_owned();
    let mut changed = false;

    if let Some(messages) = root.get_mut("messages").and_then(Value::as_array_mut) {
        for message in messages {
            let Some(content) = message.get_mut("content").and_then(Value::as_array_mut) else {
                continue;
            };
            changed |= rewrite_content(content, &family, cache);
        }
    }

    if changed {
        serde_json::to_vec(&root).ok()
    } else {
        None
    }
}

/// Rewrite one message's content array; returns whether it changed
fn rewrite_content(content: &mut Vec<Value>, family: &str, cache: &SignatureCache) -> bool {
    let mut changed = false;
    let mut drop_indexes: Vec<usize> = Vec::new();
    let mut previous_thinking_sig: Option<String> = None;

    for index in 0..content.len() {
        let block_type = content[index]
            .get("type")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_owned();

        match block_type.as_str() {
            "thinking" => {
                previous_thinking_sig = None;

                let text = content[index]
                    .get("thinking")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_owned();

                let original = content[index]
                    .get("signature")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_owned();
                // Clients echo back the family-qualified form the relay
                // emitted on a previous turn; compare on the raw part.
                let supplied = strip_family_prefix(&original).to_owned();

                if let Some(cached) = cache.get(family, &text) {
                    if original != *cached {
                        content[index]["signature"] = Value::String(cached.to_string());
                        changed = true;
                    }
                    previous_thinking_sig = Some(cached.to_string());
                } else if keep_signature(&supplied, family) {
                    if original != supplied {
                        content[index]["signature"] = Value::String(supplied.clone());
                        changed = true;
                    }
                    previous_thinking_sig = Some(supplied);
                } else {
                    tracing::debug!(family, "dropping thinking block without usable signature");
                    drop_indexes.push(index);
                    changed = true;
                }
            }
            "tool_use" => {
                if let Some(ref sig) = previous_thinking_sig {
                    content[index]["signature"] = Value::String(sig.clone());
                    changed = true;
                }
                previous_thinking_sig = None;
            }
            _ => {
                previous_thinking_sig = None;
            }
        }
    }

    for &index in drop_indexes.iter().rev() {
        content.remove(index);
    }

    // Some upstream dialects require thinking blocks ahead of the rest
    // of the turn's content.
    if !is_thinking_first(content) {
        let (thinking, rest): (Vec<Value>, Vec<Value>) = content
            .drain(..)
            .partition(|block| block.get("type").and_then(Value::as_str) == Some("thinking"));
        content.extend(thinking);
        content.extend(rest);
        changed = true;
    }

    changed
}

fn is_thinking_first(content: &[Value]) -> bool {
    let mut seen_non_thinking = false;
    for block in content {
        let is_thinking = block.get("type").and_then(Value::as_str) == Some("thinking");
        if is_thinking && seen_non_thinking {
            return false;
        }
        if !is_thinking {
            seen_non_thinking = true;
        }
    }
    true
}

fn keep_signature(signature: &str, family: &str) -> bool {
    if signature.is_empty() {
        return false;
    }
    signature.len() >= MIN_SIGNATURE_LEN
        || (family == "gemini" && signature == GEMINI_SKIP_SENTINEL)
}

fn strip_family_prefix(signature: &str) -> &str {
    signature
        .split_once('#')
        .map_or(signature, |(_, raw)| raw)
}

/// Learn signatures from a non-streaming response body
///
/// Caches every (thinking text, signature) pair in the response and
/// rewrites signatures to the family-qualified `{family}#{sig}` form
/// the client sees, mirroring the streaming path. Returns the
/// rewritten body when anything changed.
pub fn absorb_response(body: &[u8], model: &str, cache: &SignatureCache) -> Option<Vec<u8>> {
    let Ok(mut root) = serde_json::from_slice::<Value>(body) else {
        return None;
    };

    let family = model_family(model).to_owned();
    let mut changed = false;

    if let Some(content) = root.get_mut("content").and_then(Value::as_array_mut) {
        for block in content {
            if block.get("type").and_then(Value::as_str) != Some("thinking") {
                continue;
            }
            let (Some(text), Some(sig)) = (
                block.get("thinking").and_then(Value::as_str).map(str::to_owned),
                block.get("signature").and_then(Value::as_str).map(str::to_owned),
            ) else {
                continue;
            };
            if sig.is_empty() {
                continue;
            }

            cache.set(&family, &text, &sig);
            block["signature"] = Value::String(format!("{family}#{sig}"));
            changed = true;
        }
    }

    if changed {
        serde_json::to_vec(&root).ok()
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LONG_SIG: &str = "EqQBCkYIChgCIkDN5mqJc3vlkKLxYzX0example0signature0long0enough0to0keep";

    fn request_with_blocks(blocks: serde_json::Value) -> Vec<u8> {
        serde_json::to_vec(&serde_json::json!({
            "model": "claude-sonnet-4-5",
            "messages": [{"role": "assistant", "content": blocks}],
            "max_tokens": 16,
        }))
        .unwrap()
    }

    fn content_of(body: &[u8]) -> Vec<Value> {
        let root: Value = serde_json::from_slice(body).unwrap();
        root["messages"][0]["content"].as_array().unwrap().clone()
    }

    #[test]
    fn cached_signature_overwrites_client_supplied() {
        let cache = SignatureCache::new();
        cache.set("claude", "deep thought", "sig-from-provider-a");

        let body = request_with_blocks(serde_json::json!([
            {"type": "thinking", "thinking": "deep thought", "signature": "stale"},
            {"type": "text", "text": "answer"},
        ]));

        let rewritten = rewrite_request(&body, "claude-sonnet-4-5", &cache).unwrap();
        let content = content_of(&rewritten);
        assert_eq!(content[0]["signature"], "sig-from-provider-a");
    }

    #[test]
    fn family_prefix_is_stripped_before_lookup() {
        let cache = SignatureCache::new();
        cache.set("claude", "deep thought", "sig-raw");

        let body = request_with_blocks(serde_json::json!([
            {"type": "thinking", "thinking": "deep thought", "signature": "claude#sig-raw"},
        ]));

        let rewritten = rewrite_request(&body, "claude-opus-4-1", &cache).unwrap();
        let content = content_of(&rewritten);
        assert_eq!(content[0]["signature"], "sig-raw");
    }

    #[test]
    fn plausible_client_signature_is_kept_on_cache_miss() {
        let cache = SignatureCache::new();
        let body = request_with_blocks(serde_json::json!([
            {"type": "thinking", "thinking": "novel thought", "signature": LONG_SIG},
        ]));

        // No change needed, the body passes through untouched
        assert!(rewrite_request(&body, "claude-sonnet-4-5", &cache).is_none());
    }

    #[test]
    fn short_unverifiable_signature_drops_the_block() {
        let cache = SignatureCache::new();
        let body = request_with_blocks(serde_json::json!([
            {"type": "thinking", "thinking": "novel thought", "signature": "short"},
            {"type": "text", "text": "answer"},
        ]));

        let rewritten = rewrite_request(&body, "claude-sonnet-4-5", &cache).unwrap();
        let content = content_of(&rewritten);
        assert_eq!(content.len(), 1);
        assert_eq!(content[0]["type"], "text");
    }

    #[test]
    fn gemini_sentinel_is_kept() {
        let cache = SignatureCache::new();
        let body = request_with_blocks(serde_json::json!([
            {"type": "thinking", "thinking": "t", "signature": GEMINI_SKIP_SENTINEL},
        ]));

        assert!(rewrite_request(&body, "gemini-2.5-pro", &cache).is_none());
    }

    #[test]
    fn tool_use_inherits_preceding_thinking_signature() {
        let cache = SignatureCache::new();
        cache.set("claude", "should I call the tool", "sig-cached");

        let body = request_with_blocks(serde_json::json!([
            {"type": "thinking", "thinking": "should I call the tool", "signature": ""},
            {"type": "tool_use", "id": "toolu_01", "name": "get_weather", "input": {}},
        ]));

        let rewritten = rewrite_request(&body, "claude-sonnet-4-5", &cache).unwrap();
        let content = content_of(&rewritten);
        assert_eq!(content[1]["signature"], "sig-cached");
        assert_eq!(content[1]["id"], "toolu_01");
    }

    #[test]
    fn thinking_blocks_are_reordered_first() {
        let cache = SignatureCache::new();
        let body = request_with_blocks(serde_json::json!([
            {"type": "text", "text": "answer"},
            {"type": "thinking", "thinking": "t", "signature": LONG_SIG},
        ]));

        let rewritten = rewrite_request(&body, "claude-sonnet-4-5", &cache).unwrap();
        let content = content_of(&rewritten);
        assert_eq!(content[0]["type"], "thinking");
        assert_eq!(content[1]["type"], "text");
    }

    #[test]
    fn malformed_body_passes_through() {
        let cache = SignatureCache::new();
        assert!(rewrite_request(b"{not json", "claude-sonnet-4-5", &cache).is_none());
    }

    #[test]
    fn absorb_caches_and_prefixes_response_signatures() {
        let cache = SignatureCache::new();
        let body = serde_json::to_vec(&serde_json::json!({
            "type": "message",
            "content": [
                {"type": "thinking", "thinking": "observed thought", "signature": "sig-b"},
                {"type": "text", "text": "answer"},
            ],
        }))
        .unwrap();

        let rewritten = absorb_response(&body, "claude-sonnet-4-5", &cache).unwrap();
        let root: Value = serde_json::from_slice(&rewritten).unwrap();
        assert_eq!(root["content"][0]["signature"], "claude#sig-b");
        assert_eq!(&*cache.get("claude", "observed thought").unwrap(), "sig-b");
    }
}
