//! The message envelope moved through a buffer queue.
//!
//! A [`Message`] is a header (offset, event time, partition routing
//! metadata) plus an opaque body. The queue never inspects the body; it
//! only moves and persists the envelope as a unit. Cloning is cheap:
//! body and key share their allocations.

use bytes::Bytes;

use crate::types::{Offset, Timestamp};

/// Metadata carried alongside a message body.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MessageHeader {
    /// Unique identifier of the message on the inbound buffer, used for
    /// deduplication by downstream stages.
    pub id: String,
    /// Optional routing key.
    pub key: Option<Bytes>,
    /// Offset of the message on the inbound buffer.
    pub offset: Offset,
    /// Event time of the message.
    pub event_time: Timestamp,
}

/// A single message: header plus opaque payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// Header with routing and ordering metadata.
    pub header: MessageHeader,
    /// The payload. Opaque to the buffer queue.
    pub body: Bytes,
}

impl Message {
    /// Creates a message with just a body.
    #[must_use]
    pub fn new(body: impl Into<Bytes>) -> Self {
        Self {
            header: MessageHeader::default(),
            body: body.into(),
        }
    }

    /// Creates a message with a routing key and body.
    #[must_use]
    pub fn with_key(key: impl Into<Bytes>, body: impl Into<Bytes>) -> Self {
        Self {
            header: MessageHeader {
                key: Some(key.into()),
                ..MessageHeader::default()
            },
            body: body.into(),
        }
    }

    /// Sets the message identifier.
    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.header.id = id.into();
        self
    }

    /// Sets the inbound-buffer offset.
    #[must_use]
    pub fn with_offset(mut self, offset: Offset) -> Self {
        self.header.offset = offset;
        self
    }

    /// Sets the event time.
    #[must_use]
    pub const fn with_event_time(mut self, event_time: Timestamp) -> Self {
        self.header.event_time = event_time;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_new() {
        let msg = Message::new("payload");
        assert!(msg.header.key.is_none());
        assert_eq!(msg.body, Bytes::from("payload"));
        assert!(msg.header.event_time.is_none());
    }

    #[test]
    fn test_message_builder() {
        let msg = Message::with_key("k", "v")
            .with_id("msg-7")
            .with_offset(Offset::new(7))
            .with_event_time(Timestamp::from_millis(1000));

        assert_eq!(msg.header.key, Some(Bytes::from("k")));
        assert_eq!(msg.header.id, "msg-7");
        assert_eq!(msg.header.offset, Offset::new(7));
        assert_eq!(msg.header.event_time.as_millis(), 1000);
    }

    #[test]
    fn test_message_clone_shares_body() {
        let msg = Message::new(Bytes::from(vec![0u8; 64]));
        let cloned = msg.clone();
        assert_eq!(msg, cloned);
    }
}
