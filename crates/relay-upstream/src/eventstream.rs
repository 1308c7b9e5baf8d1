//! AWS Event Stream to SSE conversion
//!
//! Bedrock streams `application/vnd.amazon.eventstream` frames: a
//! prelude (total length, headers length, prelude CRC), self-describing
//! headers, a payload, and a trailing message CRC. Frame decoding and
//! CRC validation use the smithy decoder; each decoded frame maps to
//! one Anthropic SSE event.

use aws_smithy_eventstream::frame::{DecodedFrame, MessageFrameDecoder};
use aws_smithy_types::event_stream::{HeaderValue, Message};
use base64::Engine as _;
use bytes::BytesMut;
use relay_core::error_body;

use crate::error::UpstreamError;
use crate::sse::SseEvent;

/// Map an upstream frame event type to the Anthropic SSE event name
///
/// Unknown frame types keep their original name so new upstream events
/// flow through instead of being dropped.
pub fn map_event_name(name: &str) -> &str {
    match name {
        "messageStart" => "message_start",
        "contentBlockStart" => "content_block_start",
        "contentBlockDelta" => "content_block_delta",
        "contentBlockStop" => "content_block_stop",
        "messageDelta" => "message_delta",
        "messageStop" => "message_stop",
        other => other,
    }
}

/// Incremental Event Stream decoder producing SSE events
///
/// Feed raw body chunks as they arrive; complete frames are returned
/// as Anthropic SSE events in arrival order.
pub struct EventStreamToSse {
    decoder: MessageFrameDecoder,
    buffer: BytesMut,
}

impl EventStreamToSse {
    /// Create a converter for one response stream
    pub fn new() -> Self {
        Self {
            decoder: MessageFrameDecoder::new(),
            buffer: BytesMut::new(),
        }
    }

    /// Consume one body chunk, returning every completed event
    ///
    /// # Errors
    ///
    /// Returns `EventStream` on a malformed frame (bad CRC, truncated
    /// prelude); the caller terminates the SSE cleanly.
    pub fn feed(&mut self, chunk: &[u8]) -> Result<Vec<SseEvent>, UpstreamError> {
        self.buffer.extend_from_slice(chunk);

        let mut events = Vec::new();
        loop {
            match self.decoder.decode_frame(&mut self.buffer) {
                Ok(DecodedFrame::Complete(message)) => {
                    if let Some(event) = convert_message(&message)? {
                        events.push(event);
                    }
                }
                Ok(DecodedFrame::Incomplete) => break,
                Err(e) => return Err(UpstreamError::EventStream(e.to_string())),
            }
        }
        Ok(events)
    }
}

impl Default for EventStreamToSse {
    fn default() -> Self {
        Self::new()
    }
}

/// Convert one decoded frame to an SSE event
fn convert_message(message: &Message) -> Result<Option<SseEvent>, UpstreamError> {
    let message_type = string_header(message, ":message-type").unwrap_or("event");

    if message_type != "event" {
        let exception = string_header(message, ":exception-type").unwrap_or("unknown");
        let detail = std::str::from_utf8(message.payload()).unwrap_or_default();
        tracing::warn!(exception, "upstream event stream exception");
        return Ok(Some(SseEvent::new(
            "error",
            error_body("api_error", &format!("upstream exception {exception}: {detail}")).to_string(),
        )));
    }

    let event_type = string_header(message, ":event-type").unwrap_or("chunk");

    if event_type == "chunk" {
        // Chunk payloads wrap the Anthropic event as base64 JSON:
        // {"bytes":"<base64(event json)>"}
        let envelope: serde_json::Value = serde_json::from_slice(message.payload())
            .map_err(|e| UpstreamError::EventStream(format!("chunk payload: {e}")))?;
        let Some(encoded) = envelope.get("bytes").and_then(serde_json::Value::as_str) else {
            return Ok(None);
        };
        let decoded = base64::engine::general_purpose::STANDARD
            .decode(encoded)
            .map_err(|e| UpstreamError::EventStream(format!("chunk base64: {e}")))?;
        let data = String::from_utf8(decoded)
            .map_err(|e| UpstreamError::EventStream(format!("chunk utf8: {e}")))?;

        let name = serde_json::from_str::<serde_json::Value>(&data)
            .ok()
            .and_then(|v| v.get("type").and_then(serde_json::Value::as_str).map(str::to_owned))
            .unwrap_or_else(|| "message".to_owned());

        return Ok(Some(SseEvent::new(name, data)));
    }

    let data = if message.payload().is_empty() {
        "{}".to_owned()
    } else {
        String::from_utf8(message.payload().to_vec())
            .map_err(|e| UpstreamError::EventStream(format!("frame utf8: {e}")))?
    };

    Ok(Some(SseEvent::new(map_event_name(event_type), data)))
}

fn string_header<'a>(message: &'a Message, name: &str) -> Option<&'a str> {
    message.headers().iter().find_map(|header| {
        if header.name().as_str() != name {
            return None;
        }
        match header.value() {
            HeaderValue::String(value) => Some(value.as_str()),
            _ => None,
        }
    })
}
