//! Fragmentation and reassembly for oversized packets.
//!
//! Serialized packets larger than [`FRAGMENT_SIZE`] are split into
//! numbered chunks sharing a random group id. The receiving side buffers
//! chunks per group and hands back the original payload once every index
//! has arrived. Incomplete groups are evicted on a timer and when their
//! sender disconnects, so a malicious or broken peer cannot pin memory.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::PeerId;

/// Chunk size for fragmented packets, safely below typical transport frames.
pub const FRAGMENT_SIZE: usize = 16 * 1024;

/// How long an incomplete group may linger before eviction.
pub const REASSEMBLY_TIMEOUT_MS: u64 = 30_000;

/// Maximum number of concurrently pending groups.
pub const MAX_PENDING_GROUPS: usize = 64;

/// Maximum accumulated bytes for a single group.
pub const MAX_GROUP_BYTES: usize = 1024 * 1024;

/// One chunk of a fragmented packet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fragment {
    /// Random id shared by all chunks of one packet.
    pub group_id: String,
    /// Zero-based position of this chunk.
    pub index: u32,
    /// Total chunk count for the group.
    pub total: u32,
    /// Raw payload slice.
    pub chunk: Vec<u8>,
}

/// Split a serialized packet into fragments of at most `fragment_size` bytes.
///
/// All fragments share one freshly generated group id. An empty payload
/// still produces a single empty fragment so that reassembly of any
/// fragmented packet is total.
pub fn fragment(payload: &[u8], fragment_size: usize) -> Vec<Fragment> {
    let group_id = Uuid::new_v4().to_string();
    let size = fragment_size.max(1);

    if payload.is_empty() {
        return vec![Fragment {
            group_id,
            index: 0,
            total: 1,
            chunk: Vec::new(),
        }];
    }

    let total = payload.len().div_ceil(size) as u32;
    payload
        .chunks(size)
        .enumerate()
        .map(|(index, chunk)| Fragment {
            group_id: group_id.clone(),
            index: index as u32,
            total,
            chunk: chunk.to_vec(),
        })
        .collect()
}

struct PendingGroup {
    sender: PeerId,
    total: u32,
    received: BTreeMap<u32, Vec<u8>>,
    bytes: usize,
    first_seen_ms: u64,
}

/// Buffers incoming fragments until their group completes.
///
/// Groups are keyed by group id and pinned to the sender that opened
/// them; fragments from anyone else for the same id are dropped. Chunks
/// are stored sparsely, so buffered memory grows only with bytes actually
/// received, never with what a fragment header claims.
#[derive(Default)]
pub struct Reassembler {
    groups: HashMap<String, PendingGroup>,
}

impl Reassembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accept one fragment. Returns the reassembled payload when this
    /// fragment completes its group, `None` otherwise.
    ///
    /// Malformed, inconsistent, duplicate, and over-budget fragments are
    /// dropped without signalling the sender.
    pub fn accept(&mut self, sender: &PeerId, fragment: Fragment, now_ms: u64) -> Option<Vec<u8>> {
        let total = fragment.total as usize;
        let index = fragment.index as usize;

        if total == 0 || index >= total {
            tracing::debug!("dropping fragment from {sender}: index {index} of {total}");
            return None;
        }
        // Every chunk of a multi-chunk group carries at least one byte (the
        // splitter only emits an empty chunk for a single-fragment empty
        // payload), so a group claiming more chunks than the byte budget can
        // never complete. Reject the claim before tracking the group.
        if total > MAX_GROUP_BYTES {
            tracing::warn!("dropping fragment from {sender}: claimed total {total} over byte budget");
            return None;
        }
        if fragment.chunk.is_empty() && total != 1 {
            tracing::debug!("dropping fragment from {sender}: empty chunk in multi-chunk group");
            return None;
        }

        if let Some(group) = self.groups.get(&fragment.group_id) {
            if group.sender != *sender || group.total != fragment.total {
                tracing::debug!(
                    "dropping fragment from {sender}: inconsistent with group {}",
                    fragment.group_id
                );
                return None;
            }
            if group.received.contains_key(&fragment.index) {
                // Duplicate delivery; first chunk wins.
                return None;
            }
            if group.bytes + fragment.chunk.len() > MAX_GROUP_BYTES {
                self.groups.remove(&fragment.group_id);
                tracing::warn!(
                    "evicting group {} from {sender}: over byte budget",
                    fragment.group_id
                );
                return None;
            }
        } else {
            if self.groups.len() >= MAX_PENDING_GROUPS {
                tracing::warn!("dropping fragment from {sender}: pending group cap reached");
                return None;
            }
            if fragment.chunk.len() > MAX_GROUP_BYTES {
                tracing::warn!("dropping fragment from {sender}: chunk over byte budget");
                return None;
            }
            self.groups.insert(
                fragment.group_id.clone(),
                PendingGroup {
                    sender: sender.clone(),
                    total: fragment.total,
                    received: BTreeMap::new(),
                    bytes: 0,
                    first_seen_ms: now_ms,
                },
            );
        }

        let Some(group) = self.groups.get_mut(&fragment.group_id) else {
            return None;
        };
        group.bytes += fragment.chunk.len();
        group.received.insert(fragment.index, fragment.chunk);

        if group.received.len() < total {
            return None;
        }

        let done = self.groups.remove(&fragment.group_id)?;
        let mut payload = Vec::with_capacity(done.bytes);
        for chunk in done.received.into_values() {
            payload.extend_from_slice(&chunk);
        }
        Some(payload)
    }

    /// Drop groups older than [`REASSEMBLY_TIMEOUT_MS`]. Returns how many
    /// were evicted.
    pub fn evict_expired(&mut self, now_ms: u64) -> usize {
        let before = self.groups.len();
        self.groups
            .retain(|_, group| now_ms.saturating_sub(group.first_seen_ms) < REASSEMBLY_TIMEOUT_MS);
        before - self.groups.len()
    }

    /// Drop every pending group opened by `sender`. Returns how many were
    /// evicted.
    pub fn evict_sender(&mut self, sender: &PeerId) -> usize {
        let before = self.groups.len();
        self.groups.retain(|_, group| group.sender != *sender);
        before - self.groups.len()
    }

    pub fn pending_groups(&self) -> usize {
        self.groups.len()
    }

    pub fn clear(&mut self) {
        self.groups.clear();
    }
}
