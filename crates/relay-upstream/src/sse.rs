use bytes::Bytes;

/// One Server-Sent Event ready to forward to the client
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseEvent {
    /// Value for the `event:` field
    pub event: String,
    /// Value for the `data:` field, forwarded byte-identical
    pub data: String,
}

impl SseEvent {
    /// Create an event
    pub fn new(event: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            event: event.into(),
            data: data.into(),
        }
    }

    /// Encode as wire bytes: `event: <name>\ndata: <data>\n\n`
    pub fn to_wire(&self) -> Bytes {
        Bytes::from(format!("event: {}\ndata: {}\n\n", self.event, self.data))
    }
}
