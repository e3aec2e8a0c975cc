//! The room event loop: a single task owning the state machine.
//!
//! Everything funnels through one `tokio::select!`: transport events,
//! application commands and the protocol timers. Each arm asks the
//! manager for actions; the executor then performs them.

use tokio::sync::mpsc;

use super::executor::execute_actions;
use super::transport::{Transport, TransportEvent};
use super::{RoomCommand, RuntimeConfig};
use crate::message::ChatMessage;
use crate::room::{RoomEvent, RoomManager};
use crate::types::now_ms;

#[allow(clippy::too_many_arguments)]
pub(super) async fn room_loop<T: Transport>(
    mut manager: RoomManager,
    transport: T,
    mut transport_rx: mpsc::Receiver<TransportEvent>,
    config: RuntimeConfig,
    mut cmd_rx: mpsc::Receiver<RoomCommand>,
    msg_tx: mpsc::Sender<ChatMessage>,
    event_tx: mpsc::Sender<RoomEvent>,
) {
    let mut heartbeat = tokio::time::interval(config.heartbeat_interval);
    let mut reassembly = tokio::time::interval(config.reassembly_evict_interval);

    // Skip the immediate first tick on all intervals.
    heartbeat.tick().await;
    reassembly.tick().await;

    loop {
        let actions = tokio::select! {
            // ── 1. Transport events ─────────────────────────────────
            event = transport_rx.recv() => match event {
                Some(TransportEvent::Opened { peer }) => {
                    manager.handle_connection_opened(&peer, now_ms())
                }
                Some(TransportEvent::Data { peer, data }) => {
                    manager.handle_packet(&peer, &data, now_ms())
                }
                Some(TransportEvent::Closed { peer }) => {
                    manager.handle_peer_closed(&peer)
                }
                Some(TransportEvent::Error { peer, reason }) => {
                    tracing::debug!("transport error for {peer}: {reason}");
                    manager.handle_send_failure(&peer)
                }
                None => break,
            },

            // ── 2. Application commands ─────────────────────────────
            cmd = cmd_rx.recv() => match cmd {
                Some(RoomCommand::SendMessage { kind, content, reply }) => {
                    match manager.send_message(kind, content) {
                        Ok(actions) => {
                            let _ = reply.send(Ok(()));
                            actions
                        }
                        Err(e) => {
                            let _ = reply.send(Err(e));
                            vec![]
                        }
                    }
                }
                Some(RoomCommand::Join { host }) => manager.join_room(host),
                Some(RoomCommand::VerifyPeer { peer }) => manager.verify_peer(&peer),
                Some(RoomCommand::RejectPeer { peer }) => manager.reject_peer(&peer),
                Some(RoomCommand::KickPeer { peer, reason }) => {
                    manager.kick_peer(&peer, reason)
                }
                Some(RoomCommand::RequestSync) => manager.request_sync(),
                Some(RoomCommand::GetParticipants { reply }) => {
                    let _ = reply.send(manager.participants());
                    vec![]
                }
                Some(RoomCommand::GetHistory { reply }) => {
                    let _ = reply.send(manager.messages());
                    vec![]
                }
                Some(RoomCommand::Leave) => {
                    let actions = manager.leave_room();
                    execute_actions(actions, &transport, &msg_tx, &event_tx).await;
                    break;
                }
                Some(RoomCommand::Shutdown) | None => break,
            },

            // ── 3. Heartbeat + liveness sweep ───────────────────────
            _ = heartbeat.tick() => manager.tick_heartbeat(now_ms()),

            // ── 4. Reassembly eviction ──────────────────────────────
            _ = reassembly.tick() => manager.tick_reassembly(now_ms()),
        };

        let mut failed = execute_actions(actions, &transport, &msg_tx, &event_tx).await;
        // Demoting a failed peer may itself put packets on the wire, so keep
        // feeding failures back until a round produces none. Each peer
        // demotes at most once, which bounds the rounds.
        while !failed.is_empty() {
            let mut followups = Vec::new();
            for peer in failed {
                followups.extend(manager.handle_send_failure(&peer));
            }
            failed = execute_actions(followups, &transport, &msg_tx, &event_tx).await;
        }
    }

    tracing::debug!("room loop stopped");
}
