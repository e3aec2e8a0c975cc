//! Async runtime around the room state machine.
//!
//! [`RoomRuntime::spawn`] moves a [`RoomManager`] into a dedicated
//! tokio task and returns [`RoomChannels`]: a cloneable [`RoomHandle`]
//! for commands plus receivers for decrypted messages and room events.
//! The application drives its transport and forwards connection
//! activity as [`TransportEvent`]s; everything else happens inside the
//! loop.

mod executor;
mod r#loop;
pub mod transport;

pub use transport::{Transport, TransportError, TransportEvent};

use std::time::Duration;

use tokio::sync::{mpsc, oneshot};

use crate::error::ParlorProtocolError;
use crate::message::{ChatMessage, MessageKind};
use crate::registry::Participant;
use crate::room::{RoomEvent, RoomManager};
use crate::types::PeerId;

/// Tuning knobs for the room loop.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// How often the loop emits heartbeats and sweeps silent peers.
    pub heartbeat_interval: Duration,
    /// How often stale fragment groups are evicted.
    pub reassembly_evict_interval: Duration,
    /// Capacity of the command, message and event channels.
    pub channel_capacity: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            heartbeat_interval: Duration::from_millis(crate::liveness::HEARTBEAT_INTERVAL_MS),
            reassembly_evict_interval: Duration::from_secs(10),
            channel_capacity: 64,
        }
    }
}

/// Commands the application sends into the loop.
#[derive(Debug)]
pub enum RoomCommand {
    /// Encrypt and send a message to the room.
    SendMessage {
        kind: MessageKind,
        content: String,
        reply: oneshot::Sender<Result<(), ParlorProtocolError>>,
    },
    /// Dial the room host (client role).
    Join { host: PeerId },
    /// Accept a peer after comparing authentication strings (host role).
    VerifyPeer { peer: PeerId },
    /// Refuse a peer whose authentication string did not match (host role).
    RejectPeer { peer: PeerId },
    /// Remove a peer from the room (host role).
    KickPeer { peer: PeerId, reason: String },
    /// Ask the host to resend recent history (client role).
    RequestSync,
    /// Snapshot of the current roster.
    GetParticipants {
        reply: oneshot::Sender<Vec<Participant>>,
    },
    /// Snapshot of the message history.
    GetHistory {
        reply: oneshot::Sender<Vec<ChatMessage>>,
    },
    /// Close every connection and stop the loop.
    Leave,
    /// Stop the loop without notifying peers.
    Shutdown,
}

/// Cloneable handle to a running room loop.
#[derive(Clone)]
pub struct RoomHandle {
    cmd_tx: mpsc::Sender<RoomCommand>,
    local_id: PeerId,
}

impl RoomHandle {
    pub fn local_id(&self) -> &PeerId {
        &self.local_id
    }

    /// Encrypt and send `content` to the room.
    ///
    /// Resolves once the loop has accepted (or refused) the message,
    /// not once peers received it.
    pub async fn send_message(
        &self,
        kind: MessageKind,
        content: impl Into<String>,
    ) -> Result<(), ParlorProtocolError> {
        let (tx, rx) = oneshot::channel();
        self.cmd_tx
            .send(RoomCommand::SendMessage {
                kind,
                content: content.into(),
                reply: tx,
            })
            .await
            .map_err(|_| ParlorProtocolError::RoomClosed)?;
        rx.await.map_err(|_| ParlorProtocolError::RoomClosed)?
    }

    /// Dial `host` and start the join handshake.
    pub async fn join(&self, host: PeerId) -> Result<(), ParlorProtocolError> {
        self.cmd_tx
            .send(RoomCommand::Join { host })
            .await
            .map_err(|_| ParlorProtocolError::RoomClosed)
    }

    /// Accept a pending peer after the humans compared codes.
    pub async fn verify_peer(&self, peer: PeerId) -> Result<(), ParlorProtocolError> {
        self.cmd_tx
            .send(RoomCommand::VerifyPeer { peer })
            .await
            .map_err(|_| ParlorProtocolError::RoomClosed)
    }

    /// Refuse a pending peer.
    pub async fn reject_peer(&self, peer: PeerId) -> Result<(), ParlorProtocolError> {
        self.cmd_tx
            .send(RoomCommand::RejectPeer { peer })
            .await
            .map_err(|_| ParlorProtocolError::RoomClosed)
    }

    /// Remove a peer from the room.
    pub async fn kick_peer(
        &self,
        peer: PeerId,
        reason: impl Into<String>,
    ) -> Result<(), ParlorProtocolError> {
        self.cmd_tx
            .send(RoomCommand::KickPeer {
                peer,
                reason: reason.into(),
            })
            .await
            .map_err(|_| ParlorProtocolError::RoomClosed)
    }

    /// Ask the host for recent history again.
    pub async fn request_sync(&self) {
        let _ = self.cmd_tx.send(RoomCommand::RequestSync).await;
    }

    /// Current roster, self first.
    pub async fn participants(&self) -> Vec<Participant> {
        let (tx, rx) = oneshot::channel();
        let _ = self
            .cmd_tx
            .send(RoomCommand::GetParticipants { reply: tx })
            .await;
        rx.await.unwrap_or_default()
    }

    /// Message history, oldest first.
    pub async fn history(&self) -> Vec<ChatMessage> {
        let (tx, rx) = oneshot::channel();
        let _ = self.cmd_tx.send(RoomCommand::GetHistory { reply: tx }).await;
        rx.await.unwrap_or_default()
    }

    /// Close every connection and stop the loop.
    pub async fn leave(&self) {
        let _ = self.cmd_tx.send(RoomCommand::Leave).await;
    }

    /// Stop the loop without notifying peers.
    pub async fn shutdown(&self) {
        let _ = self.cmd_tx.send(RoomCommand::Shutdown).await;
    }
}

/// Everything [`RoomRuntime::spawn`] hands back to the application.
pub struct RoomChannels {
    pub handle: RoomHandle,
    /// Decrypted messages, in delivery order.
    pub messages: mpsc::Receiver<ChatMessage>,
    /// Room lifecycle events.
    pub events: mpsc::Receiver<RoomEvent>,
}

pub struct RoomRuntime;

impl RoomRuntime {
    /// Spawn the room loop on the current tokio runtime.
    ///
    /// `transport_rx` is the application's side of the bargain: it
    /// forwards every connection open/close and every received datagram
    /// for this room.
    pub fn spawn<T: Transport + 'static>(
        manager: RoomManager,
        transport: T,
        transport_rx: mpsc::Receiver<TransportEvent>,
        config: RuntimeConfig,
    ) -> RoomChannels {
        let local_id = manager.local_id().clone();
        let (cmd_tx, cmd_rx) = mpsc::channel(config.channel_capacity);
        let (msg_tx, msg_rx) = mpsc::channel(config.channel_capacity);
        let (event_tx, event_rx) = mpsc::channel(config.channel_capacity);

        tokio::spawn(r#loop::room_loop(
            manager,
            transport,
            transport_rx,
            config,
            cmd_rx,
            msg_tx,
            event_tx,
        ));

        RoomChannels {
            handle: RoomHandle { cmd_tx, local_id },
            messages: msg_rx,
            events: event_rx,
        }
    }
}
