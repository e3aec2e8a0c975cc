//! RoomManager — the room state machine.
//!
//! Pure decision engine: no I/O. Feed it connection events, raw packet
//! bytes, timer ticks, and local commands; it returns `Vec<RoomAction>`
//! that the caller executes via the transport layer.
//!
//! A room is a star: the host holds one connection per client and
//! relays between them; clients hold exactly one connection, to the
//! host. Undecryptable or out-of-order packets are dropped silently so
//! a probing sender learns nothing.

use crate::codec::{self, Fragment, Reassembler};
use crate::crypto::{self, EncryptedEnvelope};
use crate::error::ParlorProtocolError;
use crate::history::RoomHistory;
use crate::liveness::LivenessTracker;
use crate::message::{ChatMessage, DeliveryStatus, MessageKind};
use crate::packet::{Packet, PacketBody};
use crate::registry::{Participant, Registry, Role, TrustStatus};
use crate::room::{PeerSummary, RoomAction, RoomConfig, RoomEvent, SyncPayload};
use crate::types::PeerId;

/// Room state for one participant, host or client.
pub struct RoomManager {
    local_id: PeerId,
    role: Role,
    config: RoomConfig,
    registry: Registry,
    history: RoomHistory,
    reassembler: Reassembler,
    liveness: LivenessTracker,
    /// The host we dialed (client role only).
    host_id: Option<PeerId>,
    /// Whether the host has accepted our authentication string.
    verified_by_host: bool,
}

impl RoomManager {
    pub fn new(local_id: PeerId, role: Role, config: RoomConfig) -> Self {
        Self {
            registry: Registry::new(local_id.clone(), config.display_name.clone(), role),
            history: RoomHistory::new(config.history_cap),
            reassembler: Reassembler::new(),
            liveness: LivenessTracker::with_timeout(config.peer_timeout_ms),
            local_id,
            role,
            config,
            host_id: None,
            verified_by_host: false,
        }
    }

    /// Create a manager that owns the room and relays for its clients.
    pub fn host(local_id: PeerId, config: RoomConfig) -> Self {
        Self::new(local_id, Role::Host, config)
    }

    /// Create a manager that joins someone else's room.
    pub fn client(local_id: PeerId, config: RoomConfig) -> Self {
        Self::new(local_id, Role::Client, config)
    }

    // ── Queries ──────────────────────────────────────────────────────────

    pub fn local_id(&self) -> &PeerId {
        &self.local_id
    }

    pub fn role(&self) -> Role {
        self.role
    }

    /// Full roster, local participant first.
    pub fn participants(&self) -> Vec<Participant> {
        self.registry.snapshot()
    }

    /// Retained message history, oldest first.
    pub fn messages(&self) -> Vec<ChatMessage> {
        self.history.iter().cloned().collect()
    }

    // ── Joining ──────────────────────────────────────────────────────────

    /// (Client) dial into a room.
    pub fn join_room(&mut self, host: PeerId) -> Vec<RoomAction> {
        if self.role == Role::Host {
            tracing::warn!("join_room called on host");
            return vec![];
        }
        self.host_id = Some(host.clone());
        self.verified_by_host = false;
        vec![RoomAction::Connect { to: host }]
    }

    /// A transport connection to `peer` opened.
    pub fn handle_connection_opened(&mut self, peer: &PeerId, now_ms: u64) -> Vec<RoomAction> {
        match self.role {
            Role::Host => self.accept_inbound(peer, now_ms),
            Role::Client => self.greet_host(peer, now_ms),
        }
    }

    fn accept_inbound(&mut self, peer: &PeerId, now_ms: u64) -> Vec<RoomAction> {
        if self.registry.contains(peer) {
            // Known peer reopened; trust resolves on its fresh handshake.
            self.liveness.record(peer, now_ms);
            self.registry.touch(peer, now_ms);
            tracing::debug!("connection reopened by {peer}");
            return vec![];
        }

        let fingerprint = crypto::compute_sas(&self.local_id, peer, &self.config.secret);
        self.registry.upsert(Participant {
            id: peer.clone(),
            display_name: String::new(),
            role: Role::Client,
            trust: TrustStatus::Verifying,
            fingerprint: fingerprint.clone(),
            last_seen_ms: now_ms,
        });
        self.liveness.record(peer, now_ms);

        vec![RoomAction::Event(RoomEvent::SasPending {
            peer: peer.clone(),
            fingerprint,
        })]
    }

    fn greet_host(&mut self, peer: &PeerId, now_ms: u64) -> Vec<RoomAction> {
        if self.host_id.as_ref() != Some(peer) {
            tracing::debug!("ignoring connection from {peer}: not our host");
            return vec![];
        }

        let fingerprint = crypto::compute_sas(&self.local_id, peer, &self.config.secret);
        self.registry.upsert(Participant {
            id: peer.clone(),
            display_name: String::new(),
            role: Role::Host,
            trust: TrustStatus::Online,
            fingerprint: fingerprint.clone(),
            last_seen_ms: now_ms,
        });
        self.liveness.record(peer, now_ms);

        let mut actions = vec![RoomAction::Send {
            to: peer.clone(),
            packet: self.packet(PacketBody::Handshake),
        }];
        if self.verified_by_host {
            // Same secret, same host: reconnects skip re-verification.
            actions.push(RoomAction::Send {
                to: peer.clone(),
                packet: self.packet(PacketBody::SyncRequest),
            });
        } else {
            actions.push(RoomAction::Send {
                to: peer.clone(),
                packet: self.packet(PacketBody::SasReady {
                    fingerprint: fingerprint.clone(),
                }),
            });
            actions.push(RoomAction::Event(RoomEvent::SasPending {
                peer: peer.clone(),
                fingerprint,
            }));
        }
        actions
    }

    // ── Packet intake ────────────────────────────────────────────────────

    /// Raw bytes arrived from `from`.
    pub fn handle_packet(&mut self, from: &PeerId, bytes: &[u8], now_ms: u64) -> Vec<RoomAction> {
        let packet = match Packet::from_bytes(bytes) {
            Ok(packet) => packet,
            Err(e) => {
                tracing::debug!("bad packet from {from}: {e}");
                return vec![];
            }
        };
        self.dispatch(from, packet, now_ms)
    }

    fn dispatch(&mut self, from: &PeerId, packet: Packet, now_ms: u64) -> Vec<RoomAction> {
        // Gate by wire peer before touching any state. Everything from a
        // peer we do not know, or from anyone but our host, is dropped
        // without a reply.
        match self.role {
            Role::Host => {
                let Some(trust) = self.registry.get(from).map(|p| p.trust) else {
                    tracing::debug!("dropping {} from unknown peer {from}", packet.kind());
                    return vec![];
                };
                self.liveness.record(from, now_ms);
                self.registry.touch(from, now_ms);
                if trust == TrustStatus::Verifying
                    && !matches!(
                        packet.body,
                        PacketBody::Handshake | PacketBody::SasReady { .. }
                    )
                {
                    tracing::debug!("dropping {} from unverified peer {from}", packet.kind());
                    return vec![];
                }
            }
            Role::Client => {
                if self.host_id.as_ref() != Some(from) {
                    tracing::debug!("dropping {} from non-host peer {from}", packet.kind());
                    return vec![];
                }
                self.liveness.record(from, now_ms);
                self.registry.touch(from, now_ms);
            }
        }

        match packet.body {
            PacketBody::Handshake => {
                let name = packet.sender_name.clone();
                self.on_handshake(from, name.as_deref())
            }
            PacketBody::SasReady { fingerprint } => self.on_sas_ready(from, fingerprint),
            PacketBody::SasVerify { accepted } => self.on_sas_verify(from, accepted),
            PacketBody::Message(_) => self.on_message(from, packet),
            PacketBody::SyncRequest => self.on_sync_request(from),
            PacketBody::SyncResponse(envelope) => self.on_sync_response(from, envelope, now_ms),
            PacketBody::Heartbeat => vec![],
            PacketBody::Fragment(fragment) => self.on_fragment(from, fragment, now_ms),
            PacketBody::Kick { reason } => self.on_kick(from, reason),
        }
    }

    fn on_handshake(&mut self, from: &PeerId, name: Option<&str>) -> Vec<RoomAction> {
        if let Some(name) = name {
            self.registry.set_name(from, name);
        }
        match self.role {
            Role::Host => match self.registry.get(from).map(|p| p.trust) {
                Some(TrustStatus::Verifying) => vec![],
                Some(TrustStatus::Online) => self.broadcast_participants(),
                Some(TrustStatus::Reconnecting) | Some(TrustStatus::Offline) => {
                    self.registry.set_trust(from, TrustStatus::Online);
                    tracing::info!("peer {from} re-handshaked, back online");
                    let mut actions = vec![RoomAction::Send {
                        to: from.clone(),
                        packet: self.packet(PacketBody::Handshake),
                    }];
                    actions.extend(self.broadcast_participants());
                    actions
                }
                None => vec![],
            },
            Role::Client => vec![RoomAction::Event(RoomEvent::ParticipantsChanged {
                participants: self.registry.snapshot(),
            })],
        }
    }

    fn on_sas_ready(&mut self, from: &PeerId, fingerprint: String) -> Vec<RoomAction> {
        if self.role != Role::Host {
            tracing::debug!("ignoring sas_ready from {from}: not hosting");
            return vec![];
        }
        match self.registry.get(from).map(|p| p.trust) {
            Some(TrustStatus::Verifying) => vec![RoomAction::Event(RoomEvent::PeerSasReady {
                peer: from.clone(),
                fingerprint,
            })],
            Some(_) => {
                // A trusted peer re-running the ceremony has lost its own
                // state (restart under the same id). The secret is unchanged,
                // so re-issue the verdict rather than prompting the human
                // again; the client blocks until it hears one.
                tracing::info!("re-acknowledging returning peer {from}");
                vec![RoomAction::Send {
                    to: from.clone(),
                    packet: self.packet(PacketBody::SasVerify { accepted: true }),
                }]
            }
            None => {
                tracing::debug!("ignoring sas_ready from {from}: unknown peer");
                vec![]
            }
        }
    }

    fn on_sas_verify(&mut self, from: &PeerId, accepted: bool) -> Vec<RoomAction> {
        if self.role != Role::Client {
            tracing::debug!("ignoring sas_verify from {from}: not a client");
            return vec![];
        }
        if accepted {
            self.verified_by_host = true;
            vec![
                RoomAction::Event(RoomEvent::Verified { by: from.clone() }),
                RoomAction::Send {
                    to: from.clone(),
                    packet: self.packet(PacketBody::SyncRequest),
                },
            ]
        } else {
            tracing::info!("host rejected our authentication string");
            vec![RoomAction::Event(RoomEvent::Error {
                description: "verification rejected by host".to_string(),
            })]
        }
    }

    fn on_sync_request(&mut self, from: &PeerId) -> Vec<RoomAction> {
        if self.role != Role::Host {
            tracing::debug!("ignoring sync_request from {from}: not hosting");
            return vec![];
        }
        let payload = SyncPayload {
            messages: self.history.sync_tail(self.config.sync_tail),
            users: self.peer_summaries(),
        };
        match self
            .seal_sync(&payload)
            .and_then(|packet| self.wire_packets(packet))
        {
            Ok(wire) => wire
                .into_iter()
                .map(|packet| RoomAction::Send {
                    to: from.clone(),
                    packet,
                })
                .collect(),
            Err(e) => {
                tracing::warn!("sync response to {from} failed: {e}");
                vec![RoomAction::Event(RoomEvent::Error {
                    description: format!("sync response failed: {e}"),
                })]
            }
        }
    }

    fn on_sync_response(
        &mut self,
        from: &PeerId,
        envelope: EncryptedEnvelope,
        now_ms: u64,
    ) -> Vec<RoomAction> {
        if self.role != Role::Client {
            tracing::debug!("ignoring sync_response from {from}: not a client");
            return vec![];
        }
        let plaintext = match crypto::decrypt(&envelope, &self.config.secret) {
            Ok(plaintext) => plaintext,
            Err(_) => {
                tracing::debug!("dropping undecryptable sync_response from {from}");
                return vec![];
            }
        };
        let payload = match SyncPayload::from_bytes(&plaintext) {
            Ok(payload) => payload,
            Err(e) => {
                tracing::debug!("bad sync payload from {from}: {e}");
                return vec![];
            }
        };

        let mut actions = Vec::new();
        let mut count = 0;
        for message in payload.messages {
            if self.history.push(message.clone()) {
                count += 1;
                actions.push(RoomAction::Deliver(message));
            }
        }

        // The host's roster is authoritative for a client: replace, don't merge.
        let mut listed = Vec::with_capacity(payload.users.len());
        for user in &payload.users {
            if user.id == self.local_id {
                continue;
            }
            listed.push(user.id.clone());
            if self.registry.contains(&user.id) {
                self.registry.set_trust(&user.id, user.trust);
                self.registry.set_name(&user.id, &user.display_name);
            } else {
                self.registry.upsert(Participant {
                    id: user.id.clone(),
                    display_name: user.display_name.clone(),
                    role: user.role,
                    trust: user.trust,
                    fingerprint: String::new(),
                    last_seen_ms: now_ms,
                });
            }
        }
        let absent: Vec<PeerId> = self
            .registry
            .iter()
            .map(|p| p.id.clone())
            .filter(|id| !listed.contains(id))
            .collect();
        for id in absent {
            self.registry.remove(&id);
        }

        actions.push(RoomAction::Event(RoomEvent::ParticipantsChanged {
            participants: self.registry.snapshot(),
        }));
        actions.push(RoomAction::Event(RoomEvent::SyncCompleted { count }));
        actions
    }

    fn on_message(&mut self, from: &PeerId, packet: Packet) -> Vec<RoomAction> {
        let PacketBody::Message(envelope) = &packet.body else {
            return vec![];
        };
        let plaintext = match crypto::decrypt(envelope, &self.config.secret) {
            Ok(plaintext) => plaintext,
            Err(_) => {
                tracing::debug!("dropping undecryptable message from {from}");
                return vec![];
            }
        };
        let message: ChatMessage = match rmp_serde::from_slice(&plaintext) {
            Ok(message) => message,
            Err(e) => {
                tracing::debug!("bad message payload from {from}: {e}");
                return vec![];
            }
        };
        if !self.history.push(message.clone()) {
            tracing::debug!("duplicate message {} from {from}", message.id);
            return vec![];
        }

        let mut actions = vec![RoomAction::Deliver(message)];
        if self.role == Role::Host {
            // Relay the original ciphertext to everyone else; all peers
            // share the room secret, so no re-encryption is needed.
            let targets: Vec<PeerId> = self
                .registry
                .online()
                .into_iter()
                .filter(|id| id != from)
                .collect();
            if !targets.is_empty() {
                match self.wire_packets(packet) {
                    Ok(wire) => {
                        for packet in wire {
                            actions.push(RoomAction::Broadcast {
                                to: targets.clone(),
                                packet,
                            });
                        }
                    }
                    Err(e) => {
                        tracing::warn!("relay from {from} failed: {e}");
                        actions.push(RoomAction::Event(RoomEvent::Error {
                            description: format!("relay failed: {e}"),
                        }));
                    }
                }
            }
        }
        actions
    }

    fn on_fragment(&mut self, from: &PeerId, fragment: Fragment, now_ms: u64) -> Vec<RoomAction> {
        let Some(payload) = self.reassembler.accept(from, fragment, now_ms) else {
            return vec![];
        };
        let packet = match Packet::from_bytes(&payload) {
            Ok(packet) => packet,
            Err(e) => {
                tracing::debug!("bad reassembled packet from {from}: {e}");
                return vec![];
            }
        };
        // One level only: a reassembled packet may not contain fragments.
        if matches!(packet.body, PacketBody::Fragment(_)) {
            tracing::debug!("dropping nested fragment from {from}");
            return vec![];
        }
        self.dispatch(from, packet, now_ms)
    }

    fn on_kick(&mut self, from: &PeerId, reason: String) -> Vec<RoomAction> {
        if self.role != Role::Client {
            tracing::debug!("ignoring kick from {from}: clients cannot kick");
            return vec![];
        }
        tracing::info!("kicked from room: {reason}");
        let actions = vec![
            RoomAction::Event(RoomEvent::Kicked { reason }),
            RoomAction::Close { peer: from.clone() },
        ];
        self.reset();
        actions
    }

    // ── Host verdicts ────────────────────────────────────────────────────

    /// (Host) accept a peer whose authentication string matched.
    pub fn verify_peer(&mut self, peer: &PeerId) -> Vec<RoomAction> {
        if self.role != Role::Host {
            tracing::warn!("verify_peer called on non-host");
            return vec![];
        }
        match self.registry.get(peer).map(|p| p.trust) {
            Some(TrustStatus::Verifying) => {
                self.registry.set_trust(peer, TrustStatus::Online);
                tracing::info!("verified peer {peer}");
                let mut actions = vec![
                    RoomAction::Send {
                        to: peer.clone(),
                        packet: self.packet(PacketBody::SasVerify { accepted: true }),
                    },
                    RoomAction::Send {
                        to: peer.clone(),
                        packet: self.packet(PacketBody::Handshake),
                    },
                    RoomAction::Event(RoomEvent::PeerVerified { peer: peer.clone() }),
                ];
                actions.extend(self.broadcast_participants());
                actions
            }
            Some(_) => {
                tracing::debug!("verify_peer: {peer} is not awaiting verification");
                vec![]
            }
            None => {
                tracing::warn!("verify_peer: unknown peer {peer}");
                vec![]
            }
        }
    }

    /// (Host) turn away a peer whose authentication string did not match.
    pub fn reject_peer(&mut self, peer: &PeerId) -> Vec<RoomAction> {
        if self.role != Role::Host {
            tracing::warn!("reject_peer called on non-host");
            return vec![];
        }
        if self.registry.remove(peer).is_none() {
            tracing::warn!("reject_peer: unknown peer {peer}");
            return vec![];
        }
        self.liveness.untrack(peer);
        self.reassembler.evict_sender(peer);
        tracing::info!("rejected peer {peer}");

        let mut actions = vec![
            RoomAction::Send {
                to: peer.clone(),
                packet: self.packet(PacketBody::SasVerify { accepted: false }),
            },
            RoomAction::Close { peer: peer.clone() },
        ];
        actions.extend(self.broadcast_participants());
        actions
    }

    /// (Host) remove an established peer from the room.
    pub fn kick_peer(&mut self, peer: &PeerId, reason: impl Into<String>) -> Vec<RoomAction> {
        if self.role != Role::Host {
            tracing::warn!("kick_peer called on non-host");
            return vec![];
        }
        if self.registry.remove(peer).is_none() {
            tracing::warn!("kick_peer: unknown peer {peer}");
            return vec![];
        }
        self.liveness.untrack(peer);
        self.reassembler.evict_sender(peer);
        tracing::info!("kicking peer {peer}");

        let mut actions = vec![
            RoomAction::Send {
                to: peer.clone(),
                packet: self.packet(PacketBody::Kick {
                    reason: reason.into(),
                }),
            },
            RoomAction::Close { peer: peer.clone() },
        ];
        actions.extend(self.broadcast_participants());
        actions
    }

    // ── Sending ──────────────────────────────────────────────────────────

    /// Encrypt and send a chat message to the room.
    ///
    /// The message lands in local history with status `Sent`; it is not
    /// re-delivered to the sender. A client may send before the host's
    /// verdict arrives; the host drops such traffic until it verifies us.
    pub fn send_message(
        &mut self,
        kind: MessageKind,
        content: impl Into<String>,
    ) -> Result<Vec<RoomAction>, ParlorProtocolError> {
        if self.role == Role::Client && self.host_id.is_none() {
            return Err(ParlorProtocolError::RoomClosed);
        }

        let mut message = ChatMessage::new(
            self.local_id.clone(),
            self.config.display_name.clone(),
            kind,
            content,
        );
        let packet = self.seal_message(&message)?;
        message.advance_status(DeliveryStatus::Sent);
        self.history.push(message);

        let wire = self.wire_packets(packet)?;
        let actions = match self.role {
            Role::Host => {
                let targets = self.registry.online();
                if targets.is_empty() {
                    Vec::new()
                } else {
                    wire.into_iter()
                        .map(|packet| RoomAction::Broadcast {
                            to: targets.clone(),
                            packet,
                        })
                        .collect()
                }
            }
            Role::Client => {
                let Some(host) = self.host_id.clone() else {
                    return Err(ParlorProtocolError::RoomClosed);
                };
                wire.into_iter()
                    .map(|packet| RoomAction::Send {
                        to: host.clone(),
                        packet,
                    })
                    .collect()
            }
        };
        Ok(actions)
    }

    /// (Client) ask the host for history and roster again.
    pub fn request_sync(&self) -> Vec<RoomAction> {
        let Some(host) = self.host_id.clone() else {
            tracing::debug!("request_sync with no host");
            return vec![];
        };
        vec![RoomAction::Send {
            to: host,
            packet: self.packet(PacketBody::SyncRequest),
        }]
    }

    /// Close every connection and forget all room state.
    pub fn leave_room(&mut self) -> Vec<RoomAction> {
        let actions: Vec<RoomAction> = self
            .registry
            .iter()
            .map(|p| RoomAction::Close { peer: p.id.clone() })
            .collect();
        self.reset();
        tracing::info!("left room");
        actions
    }

    // ── Connection health ────────────────────────────────────────────────

    /// A transport connection to `peer` closed.
    pub fn handle_peer_closed(&mut self, peer: &PeerId) -> Vec<RoomAction> {
        self.reassembler.evict_sender(peer);
        match self.registry.get(peer).map(|p| p.trust) {
            Some(TrustStatus::Online) => {
                self.registry.set_trust(peer, TrustStatus::Reconnecting);
                tracing::info!("connection to {peer} closed, awaiting reconnect");
                let mut actions = vec![RoomAction::Event(RoomEvent::PeerReconnecting {
                    peer: peer.clone(),
                })];
                if self.role == Role::Host {
                    actions.extend(self.broadcast_participants());
                }
                actions
            }
            Some(TrustStatus::Verifying) => {
                self.registry.remove(peer);
                self.liveness.untrack(peer);
                tracing::debug!("unverified peer {peer} disconnected");
                if self.role == Role::Host {
                    self.broadcast_participants()
                } else {
                    vec![]
                }
            }
            Some(_) => vec![],
            None => {
                tracing::debug!("close event for unknown peer {peer}");
                vec![]
            }
        }
    }

    /// The executor failed to deliver to `peer`.
    pub fn handle_send_failure(&mut self, peer: &PeerId) -> Vec<RoomAction> {
        match self.registry.get(peer).map(|p| p.trust) {
            Some(TrustStatus::Online) => {
                self.registry.set_trust(peer, TrustStatus::Reconnecting);
                tracing::warn!("send to {peer} failed, marking reconnecting");
                vec![RoomAction::Event(RoomEvent::PeerReconnecting {
                    peer: peer.clone(),
                })]
            }
            _ => vec![],
        }
    }

    // ── Timers ───────────────────────────────────────────────────────────

    /// Heartbeat tick: demote silent peers, ping the live ones.
    pub fn tick_heartbeat(&mut self, now_ms: u64) -> Vec<RoomAction> {
        let mut actions = Vec::new();
        let mut roster_changed = false;

        for peer in self.liveness.expired(now_ms) {
            match self.registry.get(&peer).map(|p| p.trust) {
                Some(TrustStatus::Online) | Some(TrustStatus::Reconnecting) => {
                    self.registry.set_trust(&peer, TrustStatus::Offline);
                    self.liveness.untrack(&peer);
                    self.reassembler.evict_sender(&peer);
                    tracing::info!("peer {peer} timed out, now offline");
                    actions.push(RoomAction::Event(RoomEvent::PeerOffline { peer }));
                    roster_changed = true;
                }
                Some(TrustStatus::Verifying) => {
                    self.registry.remove(&peer);
                    self.liveness.untrack(&peer);
                    self.reassembler.evict_sender(&peer);
                    tracing::debug!("unverified peer {peer} timed out, removed");
                    roster_changed = true;
                }
                Some(TrustStatus::Offline) | None => {
                    self.liveness.untrack(&peer);
                }
            }
        }

        if roster_changed && self.role == Role::Host {
            actions.extend(self.broadcast_participants());
        }

        // Clients ping the host only; the host pings every online peer.
        let targets = match self.role {
            Role::Host => self.registry.online(),
            Role::Client => match &self.host_id {
                Some(host)
                    if self.registry.get(host).map(|p| p.trust)
                        == Some(TrustStatus::Online) =>
                {
                    vec![host.clone()]
                }
                _ => Vec::new(),
            },
        };
        if !targets.is_empty() {
            actions.push(RoomAction::Broadcast {
                to: targets,
                packet: self.packet(PacketBody::Heartbeat),
            });
        }
        actions
    }

    /// Reassembly tick: evict stale fragment groups.
    pub fn tick_reassembly(&mut self, now_ms: u64) -> Vec<RoomAction> {
        let evicted = self.reassembler.evict_expired(now_ms);
        if evicted > 0 {
            tracing::debug!("evicted {evicted} stale reassembly groups");
        }
        vec![]
    }

    // ── Helpers ──────────────────────────────────────────────────────────

    fn packet(&self, body: PacketBody) -> Packet {
        Packet::new(
            self.local_id.clone(),
            Some(self.config.display_name.clone()),
            body,
        )
    }

    fn seal(&self, plaintext: &[u8]) -> Result<EncryptedEnvelope, ParlorProtocolError> {
        let envelope = crypto::encrypt(plaintext, &self.config.secret)?;
        if envelope.ciphertext.len() > self.config.max_payload_bytes {
            return Err(ParlorProtocolError::PayloadTooLarge {
                size: envelope.ciphertext.len(),
                max: self.config.max_payload_bytes,
            });
        }
        Ok(envelope)
    }

    fn seal_message(&self, message: &ChatMessage) -> Result<Packet, ParlorProtocolError> {
        let plaintext = rmp_serde::to_vec(message)?;
        let envelope = self.seal(&plaintext)?;
        Ok(self.packet(PacketBody::Message(envelope)))
    }

    fn seal_sync(&self, payload: &SyncPayload) -> Result<Packet, ParlorProtocolError> {
        let envelope = self.seal(&payload.to_bytes()?)?;
        Ok(self.packet(PacketBody::SyncResponse(envelope)))
    }

    /// Split a packet into wire form: itself if it fits, fragments if not.
    fn wire_packets(&self, packet: Packet) -> Result<Vec<Packet>, ParlorProtocolError> {
        let bytes = packet.to_bytes()?;
        if bytes.len() <= self.config.fragment_size {
            return Ok(vec![packet]);
        }
        Ok(codec::fragment(&bytes, self.config.fragment_size)
            .into_iter()
            .map(|fragment| self.packet(PacketBody::Fragment(fragment)))
            .collect())
    }

    /// (Host) push the roster to every online peer and to the local app.
    fn broadcast_participants(&mut self) -> Vec<RoomAction> {
        let participants = self.registry.snapshot();
        let mut actions = Vec::new();

        let targets = self.registry.online();
        if !targets.is_empty() {
            let payload = SyncPayload {
                messages: Vec::new(),
                users: self.peer_summaries(),
            };
            match self
                .seal_sync(&payload)
                .and_then(|packet| self.wire_packets(packet))
            {
                Ok(wire) => {
                    for packet in wire {
                        actions.push(RoomAction::Broadcast {
                            to: targets.clone(),
                            packet,
                        });
                    }
                }
                Err(e) => {
                    tracing::warn!("participant broadcast failed: {e}");
                    actions.push(RoomAction::Event(RoomEvent::Error {
                        description: format!("participant broadcast failed: {e}"),
                    }));
                }
            }
        }

        actions.push(RoomAction::Event(RoomEvent::ParticipantsChanged {
            participants,
        }));
        actions
    }

    fn peer_summaries(&self) -> Vec<PeerSummary> {
        self.registry.snapshot().iter().map(PeerSummary::from).collect()
    }

    fn reset(&mut self) {
        self.registry.clear();
        self.liveness.clear();
        self.reassembler.clear();
        self.history.clear();
        self.host_id = None;
        self.verified_by_host = false;
    }
}
