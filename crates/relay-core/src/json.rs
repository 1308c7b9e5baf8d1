//! Lightweight probes over raw request bodies
//!
//! `/v1/messages` bodies can be large; these helpers avoid building a
//! full JSON value on the hot path.

use std::fmt;

use serde::de::{Deserializer, IgnoredAny, MapAccess, Visitor};

/// Byte fragments whose joint presence indicates extended-thinking blocks
const THINKING_FRAGMENTS: [&str; 3] = [r#""type":"thinking""#, r#""thinking":"#, r#""signature":"#];

/// Extract the top-level `model` field from a JSON object body
///
/// Streams over the document with `serde`, ignoring every other value,
/// so no tree is materialized.
///
/// # Errors
///
/// Returns the underlying `serde_json` error when the body is not a
/// JSON object. A valid object without a `model` field yields
/// `Ok(None)`.
pub fn extract_model(body: &[u8]) -> Result<Option<String>, serde_json::Error> {
    struct ModelField;

    impl<'de> Visitor<'de> for ModelField {
        type Value = Option<String>;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a JSON object")
        }

        fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
            let mut model = None;
            while let Some(key) = map.next_key::<String>()? {
                if key == "model" {
                    model = Some(map.next_value::<String>()?);
                } else {
                    map.next_value::<IgnoredAny>()?;
                }
            }
            Ok(model)
        }
    }

    let mut de = serde_json::Deserializer::from_slice(body);
    de.deserialize_map(ModelField)
}

/// Extract the top-level `stream` flag from a JSON object body
///
/// Absent, non-boolean, or unparseable bodies report `false`.
pub fn extract_stream(body: &[u8]) -> bool {
    struct StreamField;

    impl<'de> Visitor<'de> for StreamField {
        type Value = bool;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a JSON object")
        }

        fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
            let mut stream = false;
            while let Some(key) = map.next_key::<String>()? {
                if key == "stream" {
                    stream = map
                        .next_value::<serde_json::Value>()?
                        .as_bool()
                        .unwrap_or(false);
                } else {
                    map.next_value::<IgnoredAny>()?;
                }
            }
            Ok(stream)
        }
    }

    let mut de = serde_json::Deserializer::from_slice(body);
    de.deserialize_map(StreamField).unwrap_or(false)
}

/// Fast check for extended-thinking content in a raw body
///
/// Byte-substring probe only; a positive result means a full parse
/// would also find thinking blocks, so callers can skip parsing on
/// the common no-thinking path.
pub fn has_thinking_blocks(body: &[u8]) -> bool {
    let Ok(text) = std::str::from_utf8(body) else {
        return false;
    };
    THINKING_FRAGMENTS.iter().all(|f| text.contains(f))
}

/// Rough input-token estimate for a request body (≈ 4 bytes per token)
pub fn estimate_input_tokens(body: &[u8]) -> u64 {
    (body.len() / 4) as u64
}

/// Mask a credential down to its last four characters
///
/// Safe for debug headers and logs; never reveals the full secret.
pub fn mask_secret(secret: &str) -> String {
    let tail: String = {
        let chars: Vec<char> = secret.chars().collect();
        chars[chars.len().saturating_sub(4)..].iter().collect()
    };
    format!("****{tail}")
}
