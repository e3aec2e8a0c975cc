//! Action executor — the only place that touches I/O.

use tokio::sync::mpsc;

use super::transport::Transport;
use crate::message::ChatMessage;
use crate::room::{RoomAction, RoomEvent};
use crate::types::PeerId;

/// Runs every action produced by a manager step.
///
/// Returns the peers whose sends failed so the loop can feed them back
/// into the state machine.
pub(super) async fn execute_actions<T: Transport>(
    actions: Vec<RoomAction>,
    transport: &T,
    msg_tx: &mpsc::Sender<ChatMessage>,
    event_tx: &mpsc::Sender<RoomEvent>,
) -> Vec<PeerId> {
    let mut failed = Vec::new();

    for action in actions {
        match action {
            RoomAction::Send { to, packet } => match packet.to_bytes() {
                Ok(bytes) => send_bytes(transport, &to, &bytes, packet.kind(), &mut failed).await,
                Err(e) => tracing::warn!("serialize {} failed: {e}", packet.kind()),
            },
            RoomAction::Broadcast { to, packet } => match packet.to_bytes() {
                Ok(bytes) => {
                    for target in &to {
                        send_bytes(transport, target, &bytes, packet.kind(), &mut failed).await;
                    }
                }
                Err(e) => tracing::warn!("serialize {} failed: {e}", packet.kind()),
            },
            RoomAction::Connect { to } => {
                // Connecting twice to the same peer is a transport-level error
                // on some backends; skip when a connection is already up.
                if !transport.is_open(&to).await {
                    if let Err(e) = transport.connect(&to).await {
                        let _ = event_tx.try_send(RoomEvent::Error {
                            description: format!("connect to {to} failed: {e}"),
                        });
                    }
                }
            }
            RoomAction::Close { peer } => transport.close(&peer).await,
            RoomAction::Deliver(message) => {
                // try_send: never block the loop; the consumer drains.
                let _ = msg_tx.try_send(message);
            }
            RoomAction::Event(event) => {
                let _ = event_tx.try_send(event);
            }
        }
    }

    failed
}

async fn send_bytes<T: Transport>(
    transport: &T,
    target: &PeerId,
    bytes: &[u8],
    kind: &str,
    failed: &mut Vec<PeerId>,
) {
    if let Err(e) = transport.send(target, bytes).await {
        tracing::debug!("send {kind} to {target} failed: {e}");
        if !failed.contains(target) {
            failed.push(target.clone());
        }
    }
}
