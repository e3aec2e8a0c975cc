use crate::types::PeerId;

/// Connection-level errors reported by a transport.
#[derive(Debug, Clone, thiserror::Error)]
pub enum TransportError {
    #[error("no open connection to {0}")]
    NotOpen(PeerId),
    #[error("connect failed: {0}")]
    ConnectFailed(String),
    #[error("send failed: {0}")]
    SendFailed(String),
}

/// Events a transport implementation feeds into the room loop.
#[derive(Debug, Clone)]
pub enum TransportEvent {
    /// A connection to `peer` is established (inbound or outbound).
    Opened { peer: PeerId },
    /// Raw bytes arrived from `peer`.
    Data { peer: PeerId, data: Vec<u8> },
    /// The connection to `peer` closed.
    Closed { peer: PeerId },
    /// The connection to `peer` reported an error.
    Error { peer: PeerId, reason: String },
}

/// Network abstraction for the room runtime.
///
/// The protocol never opens sockets itself; the application brings a
/// transport (QUIC, WebRTC data channels, TCP) and pushes its
/// connection events into the loop as [`TransportEvent`]s.
///
/// Implementations should be cheap-to-clone handles so the application
/// can keep driving the transport after handing one to the runtime.
#[async_trait::async_trait]
pub trait Transport: Send + Sync {
    /// Open an outbound connection to a peer.
    async fn connect(&self, peer: &PeerId) -> Result<(), TransportError>;

    /// Send raw bytes over the open connection to `to`.
    async fn send(&self, to: &PeerId, data: &[u8]) -> Result<(), TransportError>;

    /// Whether a connection to `peer` is currently open.
    async fn is_open(&self, peer: &PeerId) -> bool;

    /// Close the connection to a peer. Best effort.
    async fn close(&self, peer: &PeerId);
}

// ── MockTransport (tests) ───────────────────────────────────────────
