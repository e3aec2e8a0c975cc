use serde::{Deserialize, Serialize};

use crate::codec::Fragment;
use crate::crypto::EncryptedEnvelope;
use crate::error::ParlorProtocolError;
use crate::types::{now_ms, PeerId};

/// Protocol-level packet — the unit of communication in a Parlor room.
///
/// Serialized as MessagePack for compact binary wire format. The body is
/// a closed union: every packet kind the protocol will ever route is a
/// variant here, and receivers match exhaustively so an unhandled kind
/// cannot slip through silently.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Packet {
    /// Unique packet identifier (UUID v4).
    pub id: String,
    /// Sender peer identity.
    pub sender_id: PeerId,
    /// Sender display name, if the sender shares one.
    pub sender_name: Option<String>,
    /// Typed body — determines protocol handling.
    pub body: PacketBody,
    /// Creation timestamp (Unix milliseconds).
    pub timestamp: u64,
}

/// The packet vocabulary of the protocol.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum PacketBody {
    /// Introduces the sender and opens (or refreshes) a session.
    Handshake,
    /// Joiner signal that the short authentication string is on screen.
    SasReady { fingerprint: String },
    /// Host verdict on a pending peer.
    SasVerify { accepted: bool },
    /// An encrypted chat message.
    Message(EncryptedEnvelope),
    /// Request for room history and roster.
    SyncRequest,
    /// Encrypted history tail plus roster.
    SyncResponse(EncryptedEnvelope),
    /// Liveness probe.
    Heartbeat,
    /// One chunk of a fragmented packet.
    Fragment(Fragment),
    /// Host order removing the recipient from the room.
    Kick { reason: String },
}

impl Packet {
    /// Create a new packet with a fresh id and the current timestamp.
    pub fn new(sender_id: PeerId, sender_name: Option<String>, body: PacketBody) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            sender_id,
            sender_name,
            body,
            timestamp: now_ms(),
        }
    }

    /// Serialize to MessagePack bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>, ParlorProtocolError> {
        rmp_serde::to_vec(self).map_err(Into::into)
    }

    /// Deserialize from MessagePack bytes.
    pub fn from_bytes(data: &[u8]) -> Result<Self, ParlorProtocolError> {
        rmp_serde::from_slice(data).map_err(Into::into)
    }

    /// Short label for the body kind, for logging.
    pub fn kind(&self) -> &'static str {
        match &self.body {
            PacketBody::Handshake => "handshake",
            PacketBody::SasReady { .. } => "sas_ready",
            PacketBody::SasVerify { .. } => "sas_verify",
            PacketBody::Message(_) => "message",
            PacketBody::SyncRequest => "sync_request",
            PacketBody::SyncResponse(_) => "sync_response",
            PacketBody::Heartbeat => "heartbeat",
            PacketBody::Fragment(_) => "fragment",
            PacketBody::Kick { .. } => "kick",
        }
    }
}
