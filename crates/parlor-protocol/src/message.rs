use serde::{Deserialize, Serialize};

use crate::types::{now_ms, PeerId};

/// What a chat message carries — plain text or app-encoded media.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MessageKind {
    Text,
    Image,
    Audio,
    File,
}

/// Local delivery pipeline for a message.
///
/// Follows the progression: Pending -> Sent -> Delivered -> Read.
/// The enum is ordered; status only ever moves forward.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum DeliveryStatus {
    #[default]
    Pending = 0,
    Sent = 1,
    Delivered = 2,
    Read = 3,
}

/// A decrypted chat message as the application sees it.
///
/// Travels inside an encrypted envelope on the wire; the delivery status
/// is local bookkeeping and never leaves this process.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatMessage {
    /// Unique message identifier (UUID v4).
    pub id: String,
    /// Author peer identity.
    pub sender_id: PeerId,
    /// Author display name at send time.
    pub sender_name: String,
    /// Content kind.
    pub kind: MessageKind,
    /// Content. Text is carried verbatim; media kinds carry whatever
    /// encoding the application chose.
    pub content: String,
    /// Creation timestamp (Unix milliseconds).
    pub timestamp: u64,
    /// Local delivery pipeline state.
    #[serde(skip)]
    pub delivery_status: DeliveryStatus,
}

impl ChatMessage {
    /// Create a new pending message with a fresh id and timestamp.
    pub fn new(
        sender_id: PeerId,
        sender_name: impl Into<String>,
        kind: MessageKind,
        content: impl Into<String>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            sender_id,
            sender_name: sender_name.into(),
            kind,
            content: content.into(),
            timestamp: now_ms(),
            delivery_status: DeliveryStatus::Pending,
        }
    }

    /// Advance the delivery status. Returns `false` (leaving the status
    /// untouched) if `to` would move it backwards.
    pub fn advance_status(&mut self, to: DeliveryStatus) -> bool {
        if to < self.delivery_status {
            return false;
        }
        self.delivery_status = to;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_message() -> ChatMessage {
        ChatMessage::new(PeerId::new("peer-1"), "alice", MessageKind::Text, "hello")
    }

    #[test]
    fn test_delivery_status_ordering() {
        assert!(DeliveryStatus::Pending < DeliveryStatus::Sent);
        assert!(DeliveryStatus::Sent < DeliveryStatus::Delivered);
        assert!(DeliveryStatus::Delivered < DeliveryStatus::Read);
    }

    #[test]
    fn test_new_message_is_pending() {
        assert_eq!(make_message().delivery_status, DeliveryStatus::Pending);
    }

    #[test]
    fn test_advance_status_forward() {
        let mut msg = make_message();
        assert!(msg.advance_status(DeliveryStatus::Sent));
        assert!(msg.advance_status(DeliveryStatus::Read));
        assert_eq!(msg.delivery_status, DeliveryStatus::Read);
    }

    #[test]
    fn test_advance_status_refuses_regression() {
        let mut msg = make_message();
        msg.advance_status(DeliveryStatus::Delivered);
        assert!(!msg.advance_status(DeliveryStatus::Sent));
        assert_eq!(msg.delivery_status, DeliveryStatus::Delivered);
    }

    #[test]
    fn test_advance_status_same_is_ok() {
        let mut msg = make_message();
        msg.advance_status(DeliveryStatus::Sent);
        assert!(msg.advance_status(DeliveryStatus::Sent));
    }

    #[test]
    fn test_wire_drops_delivery_status() {
        let mut msg = make_message();
        msg.advance_status(DeliveryStatus::Read);

        let bytes = rmp_serde::to_vec(&msg).expect("serialize");
        let decoded: ChatMessage = rmp_serde::from_slice(&bytes).expect("deserialize");

        assert_eq!(decoded.delivery_status, DeliveryStatus::Pending);
        assert_eq!(decoded.id, msg.id);
        assert_eq!(decoded.content, msg.content);
    }

    #[test]
    fn test_message_kind_roundtrip_msgpack() {
        let kinds = [
            MessageKind::Text,
            MessageKind::Image,
            MessageKind::Audio,
            MessageKind::File,
        ];

        for kind in &kinds {
            let bytes = rmp_serde::to_vec(kind).expect("serialize");
            let decoded: MessageKind = rmp_serde::from_slice(&bytes).expect("deserialize");
            assert_eq!(*kind, decoded, "roundtrip failed for {:?}", kind);
        }
    }

    #[test]
    fn test_new_generates_unique_ids() {
        let m1 = make_message();
        let m2 = make_message();
        assert_ne!(m1.id, m2.id);
    }
}
