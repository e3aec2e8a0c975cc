use std::fmt;

use serde::{Deserialize, Serialize};

/// Stable identity of a room participant.
///
/// The transport decides what the string actually is (a node id, a public
/// key fingerprint, a session token). The protocol only compares and sorts
/// it, so any non-empty stable string works.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PeerId(String);

impl PeerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PeerId {
    fn from(id: &str) -> Self {
        Self(id.to_owned())
    }
}

impl From<String> for PeerId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Milliseconds since the Unix epoch.
pub fn now_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .expect("system time before epoch")
        .as_millis() as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_peer_id_roundtrip_msgpack() {
        let id = PeerId::new("peer-42");
        let bytes = rmp_serde::to_vec(&id).expect("serialize");
        let decoded: PeerId = rmp_serde::from_slice(&bytes).expect("deserialize");
        assert_eq!(id, decoded);
    }

    #[test]
    fn test_peer_id_serializes_as_plain_string() {
        let id = PeerId::new("abc");
        let bytes = rmp_serde::to_vec(&id).expect("serialize");
        let as_string: String = rmp_serde::from_slice(&bytes).expect("deserialize");
        assert_eq!(as_string, "abc");
    }

    #[test]
    fn test_peer_id_ordering_is_lexicographic() {
        let a = PeerId::new("alpha");
        let b = PeerId::new("beta");
        assert!(a < b);
    }

    #[test]
    fn test_now_ms_is_monotonic_enough() {
        let a = now_ms();
        let b = now_ms();
        assert!(b >= a);
    }
}
