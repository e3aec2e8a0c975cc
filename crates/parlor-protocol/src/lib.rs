//! Parlor protocol layer.
//!
//! Encrypted chat rooms over any transport the application brings. A
//! room is keyed by a shared password, the host relays ciphertext
//! between members in a star topology, humans compare short
//! authentication strings before trusting a new peer, and recent
//! history is replayed to late joiners.
//!
//! Wire format: MessagePack (compact binary).
//! Crypto: PBKDF2-HMAC-SHA256 key derivation + XChaCha20-Poly1305 encryption.

pub mod codec;
pub mod crypto;
pub mod error;
pub mod history;
pub mod liveness;
pub mod message;
pub mod packet;
pub mod registry;
pub mod room;
pub mod runtime;
pub mod types;

pub use codec::{Fragment, Reassembler};
pub use crypto::EncryptedEnvelope;
pub use error::ParlorProtocolError;
pub use history::RoomHistory;
pub use liveness::LivenessTracker;
pub use message::{ChatMessage, DeliveryStatus, MessageKind};
pub use packet::{Packet, PacketBody};
pub use registry::{Participant, Registry, Role, TrustStatus};
pub use room::{PeerSummary, RoomAction, RoomConfig, RoomEvent, RoomManager, SyncPayload};
pub use runtime::{
    RoomChannels, RoomCommand, RoomHandle, RoomRuntime, RuntimeConfig, Transport, TransportError,
    TransportEvent,
};
pub use types::{now_ms, PeerId};
