use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::types::{now_ms, PeerId};

/// Which side of the star topology a participant sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    Host,
    Client,
}

/// Trust lifecycle of a peer as the local side sees it.
///
/// `Verifying` until the host approves the short authentication string,
/// `Online` while traffic flows, `Reconnecting` after a dropped
/// connection or failed send, `Offline` once the liveness timeout
/// fires. A fresh handshake takes a `Reconnecting` or `Offline` peer
/// straight back to `Online` without re-verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TrustStatus {
    Verifying,
    Online,
    Reconnecting,
    Offline,
}

/// Everything the local side knows about one participant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Participant {
    pub id: PeerId,
    pub display_name: String,
    pub role: Role,
    pub trust: TrustStatus,
    /// SAS fingerprint computed when the peer first appeared. Empty for
    /// the synthesized local entry.
    pub fingerprint: String,
    /// Last traffic from this peer (Unix ms).
    pub last_seen_ms: u64,
}

/// Peer table for one room.
///
/// Pure storage: trust transitions are decided by the room manager,
/// this type only records them. The local participant is synthesized
/// into snapshots, never stored as a peer.
pub struct Registry {
    local_id: PeerId,
    local_name: String,
    local_role: Role,
    peers: HashMap<PeerId, Participant>,
}

impl Registry {
    pub fn new(local_id: PeerId, local_name: impl Into<String>, local_role: Role) -> Self {
        Self {
            local_id,
            local_name: local_name.into(),
            local_role,
            peers: HashMap::new(),
        }
    }

    pub fn local_id(&self) -> &PeerId {
        &self.local_id
    }

    pub fn local_role(&self) -> Role {
        self.local_role
    }

    /// Insert or replace a participant, keyed by its id.
    pub fn upsert(&mut self, participant: Participant) {
        self.peers.insert(participant.id.clone(), participant);
    }

    pub fn get(&self, id: &PeerId) -> Option<&Participant> {
        self.peers.get(id)
    }

    pub fn remove(&mut self, id: &PeerId) -> Option<Participant> {
        self.peers.remove(id)
    }

    /// Refresh a peer's last-seen timestamp.
    pub fn touch(&mut self, id: &PeerId, now_ms: u64) {
        if let Some(peer) = self.peers.get_mut(id) {
            peer.last_seen_ms = now_ms;
        }
    }

    /// Record a trust transition. Returns the previous status, or `None`
    /// for an unknown peer.
    pub fn set_trust(&mut self, id: &PeerId, trust: TrustStatus) -> Option<TrustStatus> {
        let peer = self.peers.get_mut(id)?;
        let previous = peer.trust;
        peer.trust = trust;
        Some(previous)
    }

    pub fn set_name(&mut self, id: &PeerId, name: &str) {
        if let Some(peer) = self.peers.get_mut(id) {
            peer.display_name = name.to_string();
        }
    }

    /// Ids of all peers currently `Online`, sorted for determinism.
    pub fn online(&self) -> Vec<PeerId> {
        let mut ids: Vec<PeerId> = self
            .peers
            .values()
            .filter(|p| p.trust == TrustStatus::Online)
            .map(|p| p.id.clone())
            .collect();
        ids.sort();
        ids
    }

    pub fn iter(&self) -> impl Iterator<Item = &Participant> {
        self.peers.values()
    }

    pub fn contains(&self, id: &PeerId) -> bool {
        self.peers.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.peers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }

    pub fn clear(&mut self) {
        self.peers.clear();
    }

    /// Full roster including the local participant, which always comes
    /// first; remote peers follow sorted by id.
    pub fn snapshot(&self) -> Vec<Participant> {
        let mut roster = Vec::with_capacity(self.peers.len() + 1);
        roster.push(Participant {
            id: self.local_id.clone(),
            display_name: self.local_name.clone(),
            role: self.local_role,
            trust: TrustStatus::Online,
            fingerprint: String::new(),
            last_seen_ms: now_ms(),
        });

        let mut peers: Vec<Participant> = self.peers.values().cloned().collect();
        peers.sort_by(|a, b| a.id.cmp(&b.id));
        roster.extend(peers);
        roster
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn participant(id: &str, trust: TrustStatus) -> Participant {
        Participant {
            id: PeerId::new(id),
            display_name: format!("name-{id}"),
            role: Role::Client,
            trust,
            fingerprint: "ABCD EF01".to_string(),
            last_seen_ms: 1_000,
        }
    }

    fn registry() -> Registry {
        Registry::new(PeerId::new("host-1"), "host", Role::Host)
    }

    #[test]
    fn upsert_and_get() {
        let mut reg = registry();
        reg.upsert(participant("c1", TrustStatus::Verifying));

        let peer = reg.get(&PeerId::new("c1")).expect("present");
        assert_eq!(peer.trust, TrustStatus::Verifying);
        assert_eq!(peer.display_name, "name-c1");
    }

    #[test]
    fn upsert_replaces() {
        let mut reg = registry();
        reg.upsert(participant("c1", TrustStatus::Verifying));
        reg.upsert(participant("c1", TrustStatus::Online));

        assert_eq!(reg.len(), 1);
        assert_eq!(
            reg.get(&PeerId::new("c1")).map(|p| p.trust),
            Some(TrustStatus::Online)
        );
    }

    #[test]
    fn set_trust_returns_previous() {
        let mut reg = registry();
        reg.upsert(participant("c1", TrustStatus::Verifying));

        let previous = reg.set_trust(&PeerId::new("c1"), TrustStatus::Online);
        assert_eq!(previous, Some(TrustStatus::Verifying));
        assert_eq!(
            reg.get(&PeerId::new("c1")).map(|p| p.trust),
            Some(TrustStatus::Online)
        );

        assert_eq!(reg.set_trust(&PeerId::new("ghost"), TrustStatus::Online), None);
    }

    #[test]
    fn online_filters_and_sorts() {
        let mut reg = registry();
        reg.upsert(participant("c3", TrustStatus::Online));
        reg.upsert(participant("c1", TrustStatus::Online));
        reg.upsert(participant("c2", TrustStatus::Verifying));
        reg.upsert(participant("c4", TrustStatus::Reconnecting));

        assert_eq!(reg.online(), vec![PeerId::new("c1"), PeerId::new("c3")]);
    }

    #[test]
    fn touch_updates_last_seen() {
        let mut reg = registry();
        reg.upsert(participant("c1", TrustStatus::Online));
        reg.touch(&PeerId::new("c1"), 9_999);
        assert_eq!(reg.get(&PeerId::new("c1")).map(|p| p.last_seen_ms), Some(9_999));
    }

    #[test]
    fn snapshot_puts_self_first_then_sorted_peers() {
        let mut reg = registry();
        reg.upsert(participant("c2", TrustStatus::Online));
        reg.upsert(participant("c1", TrustStatus::Verifying));

        let roster = reg.snapshot();
        assert_eq!(roster.len(), 3);
        assert_eq!(roster[0].id, PeerId::new("host-1"));
        assert_eq!(roster[0].role, Role::Host);
        assert_eq!(roster[0].trust, TrustStatus::Online);
        assert_eq!(roster[1].id, PeerId::new("c1"));
        assert_eq!(roster[2].id, PeerId::new("c2"));
    }

    #[test]
    fn remove_and_clear() {
        let mut reg = registry();
        reg.upsert(participant("c1", TrustStatus::Online));
        reg.upsert(participant("c2", TrustStatus::Online));

        assert!(reg.remove(&PeerId::new("c1")).is_some());
        assert!(reg.remove(&PeerId::new("c1")).is_none());
        assert_eq!(reg.len(), 1);

        reg.clear();
        assert!(reg.is_empty());
    }
}
