use std::collections::HashMap;

use crate::types::PeerId;

/// Heartbeat broadcast interval.
pub const HEARTBEAT_INTERVAL_MS: u64 = 5_000;

/// A peer with no traffic inside this window is declared offline.
pub const PEER_TIMEOUT_MS: u64 = 15_000;

/// Tracks peer liveness via last-traffic timestamps.
///
/// Pure state machine: any packet counts as traffic, heartbeats exist
/// only so the window never runs dry in a quiet room. Callers pass the
/// clock in, so tests drive time explicitly.
pub struct LivenessTracker {
    last_seen: HashMap<PeerId, u64>,
    timeout_ms: u64,
}

impl LivenessTracker {
    /// Create a tracker with the default timeout.
    pub fn new() -> Self {
        Self::with_timeout(PEER_TIMEOUT_MS)
    }

    /// Create with a custom timeout (for testing).
    pub fn with_timeout(timeout_ms: u64) -> Self {
        Self {
            last_seen: HashMap::new(),
            timeout_ms,
        }
    }

    /// Record traffic from a peer.
    pub fn record(&mut self, peer: &PeerId, now_ms: u64) {
        self.last_seen.insert(peer.clone(), now_ms);
    }

    /// Peers whose window has run dry, sorted for determinism.
    ///
    /// Expired peers stay tracked until [`untrack`](Self::untrack) is
    /// called; the caller decides what expiry means.
    pub fn expired(&self, now_ms: u64) -> Vec<PeerId> {
        let mut ids: Vec<PeerId> = self
            .last_seen
            .iter()
            .filter(|(_, &last)| now_ms.saturating_sub(last) >= self.timeout_ms)
            .map(|(id, _)| id.clone())
            .collect();
        ids.sort();
        ids
    }

    pub fn last_seen(&self, peer: &PeerId) -> Option<u64> {
        self.last_seen.get(peer).copied()
    }

    /// Stop tracking a peer.
    pub fn untrack(&mut self, peer: &PeerId) {
        self.last_seen.remove(peer);
    }

    pub fn tracked_count(&self) -> usize {
        self.last_seen.len()
    }

    pub fn clear(&mut self) {
        self.last_seen.clear();
    }
}

impl Default for LivenessTracker {
    fn default() -> Self {
        Self::new()
    }
}
