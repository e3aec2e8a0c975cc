//! Room protocol core.
//!
//! Pure decision engine in [`RoomManager`]: feed it connection events,
//! packets, timer ticks, and local commands; it returns [`RoomAction`]s
//! for the caller to execute via the transport. No I/O happens here.

mod manager;

pub use manager::RoomManager;

use serde::{Deserialize, Serialize};

use crate::codec::FRAGMENT_SIZE;
use crate::history::{HISTORY_CAP, SYNC_TAIL};
use crate::liveness::PEER_TIMEOUT_MS;
use crate::message::ChatMessage;
use crate::packet::Packet;
use crate::registry::{Participant, Role, TrustStatus};
use crate::types::PeerId;

/// Hard ceiling on a single encrypted payload (bytes, post-encryption).
pub const MAX_PAYLOAD_BYTES: usize = 500 * 1024;

/// Caller-owned room parameters.
#[derive(Debug, Clone)]
pub struct RoomConfig {
    /// Name shown to other participants.
    pub display_name: String,
    /// Shared room secret. May be empty.
    pub secret: String,
    /// Serialized packets above this size go out fragmented.
    pub fragment_size: usize,
    /// Hard ceiling on a single encrypted payload.
    pub max_payload_bytes: usize,
    /// Messages retained in history.
    pub history_cap: usize,
    /// Messages carried in a sync response.
    pub sync_tail: usize,
    /// Liveness window before a peer is declared offline.
    pub peer_timeout_ms: u64,
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self {
            display_name: "anonymous".to_string(),
            secret: String::new(),
            fragment_size: FRAGMENT_SIZE,
            max_payload_bytes: MAX_PAYLOAD_BYTES,
            history_cap: HISTORY_CAP,
            sync_tail: SYNC_TAIL,
            peer_timeout_ms: PEER_TIMEOUT_MS,
        }
    }
}

// ── RoomAction ───────────────────────────────────────────────────────────

/// Actions returned by [`RoomManager`] — the caller executes them via
/// the transport.
#[derive(Debug)]
pub enum RoomAction {
    /// Serialize and send a packet to one peer.
    Send { to: PeerId, packet: Packet },

    /// Send one packet to multiple peers.
    Broadcast { to: Vec<PeerId>, packet: Packet },

    /// Dial a peer.
    Connect { to: PeerId },

    /// Close the connection to a peer.
    Close { peer: PeerId },

    /// Hand a decrypted message to the application.
    Deliver(ChatMessage),

    /// A room event occurred (for application-layer callbacks).
    Event(RoomEvent),
}

// ── RoomEvent ────────────────────────────────────────────────────────────

/// Application-visible room events.
#[derive(Debug, Clone)]
pub enum RoomEvent {
    /// A joiner awaits verification; show the authentication string.
    SasPending { peer: PeerId, fingerprint: String },

    /// The joiner reports the authentication string on screen; the host
    /// application should compare and call verify or reject.
    PeerSasReady { peer: PeerId, fingerprint: String },

    /// The host accepted us into the room.
    Verified { by: PeerId },

    /// A peer we verified is now online.
    PeerVerified { peer: PeerId },

    /// The roster changed.
    ParticipantsChanged { participants: Vec<Participant> },

    /// A peer's connection dropped; it may come back.
    PeerReconnecting { peer: PeerId },

    /// A peer ran out its liveness window.
    PeerOffline { peer: PeerId },

    /// History sync finished.
    SyncCompleted { count: usize },

    /// The host removed us from the room.
    Kicked { reason: String },

    /// A failure the application should surface.
    Error { description: String },
}

// ── Sync payload ─────────────────────────────────────────────────────────

/// Plaintext carried inside a `SyncResponse` envelope: the history tail
/// plus the roster. A roster-only update is a payload with empty
/// `messages`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncPayload {
    pub messages: Vec<ChatMessage>,
    pub users: Vec<PeerSummary>,
}

impl SyncPayload {
    /// Serialize to MessagePack bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>, crate::ParlorProtocolError> {
        rmp_serde::to_vec(self).map_err(Into::into)
    }

    /// Deserialize from MessagePack bytes.
    pub fn from_bytes(data: &[u8]) -> Result<Self, crate::ParlorProtocolError> {
        rmp_serde::from_slice(data).map_err(Into::into)
    }
}

/// Wire projection of a [`Participant`] — fingerprints and timestamps
/// stay local.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeerSummary {
    pub id: PeerId,
    pub display_name: String,
    pub role: Role,
    pub trust: TrustStatus,
}

impl From<&Participant> for PeerSummary {
    fn from(p: &Participant) -> Self {
        Self {
            id: p.id.clone(),
            display_name: p.display_name.clone(),
            role: p.role,
            trust: p.trust,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sync_payload_roundtrip_msgpack() {
        let payload = SyncPayload {
            messages: vec![ChatMessage::new(
                PeerId::new("a"),
                "alice",
                crate::message::MessageKind::Text,
                "hi",
            )],
            users: vec![PeerSummary {
                id: PeerId::new("a"),
                display_name: "alice".into(),
                role: Role::Host,
                trust: TrustStatus::Online,
            }],
        };

        let bytes = payload.to_bytes().expect("serialize");
        let decoded = SyncPayload::from_bytes(&bytes).expect("deserialize");
        assert_eq!(payload, decoded);
    }

    #[test]
    fn peer_summary_from_participant_drops_local_fields() {
        let participant = Participant {
            id: PeerId::new("c1"),
            display_name: "carol".into(),
            role: Role::Client,
            trust: TrustStatus::Verifying,
            fingerprint: "AAAA BBBB".into(),
            last_seen_ms: 42,
        };

        let summary = PeerSummary::from(&participant);
        assert_eq!(summary.id, participant.id);
        assert_eq!(summary.display_name, "carol");
        assert_eq!(summary.trust, TrustStatus::Verifying);
    }

    #[test]
    fn default_config_constants() {
        let config = RoomConfig::default();
        assert_eq!(config.display_name, "anonymous");
        assert_eq!(config.fragment_size, FRAGMENT_SIZE);
        assert_eq!(config.max_payload_bytes, MAX_PAYLOAD_BYTES);
        assert_eq!(config.sync_tail, SYNC_TAIL);
    }
}
