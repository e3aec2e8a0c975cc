use std::collections::{HashSet, VecDeque};

use crate::message::{ChatMessage, MessageKind};

/// Maximum messages retained in memory per room.
pub const HISTORY_CAP: usize = 200;

/// How many trailing messages a sync response carries.
pub const SYNC_TAIL: usize = 20;

/// Per-message content ceiling for sync responses, in bytes.
pub const SYNC_CONTENT_CEILING: usize = 8 * 1024;

/// Placeholder substituted for media content too large to sync.
pub const OMITTED_CONTENT_MARKER: &str = "[media omitted]";

/// In-memory message log for one room.
///
/// Deduplicates by message id, so relay echoes and retransmits are
/// absorbed here, and prunes oldest-first past the cap. Nothing is
/// persisted; a fresh process starts empty and refills over sync.
pub struct RoomHistory {
    entries: VecDeque<ChatMessage>,
    seen_ids: HashSet<String>,
    cap: usize,
}

impl RoomHistory {
    pub fn new(cap: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            seen_ids: HashSet::new(),
            cap,
        }
    }

    /// Append a message. Returns `false` if its id was already seen.
    ///
    /// Pruned messages leave the dedup set with them, so the dedup
    /// window is exactly the retained history.
    pub fn push(&mut self, message: ChatMessage) -> bool {
        if !self.seen_ids.insert(message.id.clone()) {
            return false;
        }
        self.entries.push_back(message);

        while self.entries.len() > self.cap {
            if let Some(dropped) = self.entries.pop_front() {
                self.seen_ids.remove(&dropped.id);
            }
        }
        true
    }

    /// The trailing `limit` messages, oldest first, shaped for sync.
    ///
    /// Media content over [`SYNC_CONTENT_CEILING`] is replaced with
    /// [`OMITTED_CONTENT_MARKER`] so a sync response stays small; text
    /// is carried verbatim regardless of size.
    pub fn sync_tail(&self, limit: usize) -> Vec<ChatMessage> {
        let skip = self.entries.len().saturating_sub(limit);
        self.entries
            .iter()
            .skip(skip)
            .map(|msg| {
                if msg.kind != MessageKind::Text && msg.content.len() > SYNC_CONTENT_CEILING {
                    let mut slim = msg.clone();
                    slim.content = OMITTED_CONTENT_MARKER.to_string();
                    slim
                } else {
                    msg.clone()
                }
            })
            .collect()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.seen_ids.contains(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ChatMessage> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.seen_ids.clear();
    }
}

impl Default for RoomHistory {
    fn default() -> Self {
        Self::new(HISTORY_CAP)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PeerId;

    fn message(id: &str, kind: MessageKind, content: &str) -> ChatMessage {
        ChatMessage {
            id: id.to_string(),
            sender_id: PeerId::new("peer-1"),
            sender_name: "alice".to_string(),
            kind,
            content: content.to_string(),
            timestamp: 1708000000000,
            delivery_status: Default::default(),
        }
    }

    #[test]
    fn push_deduplicates_by_id() {
        let mut history = RoomHistory::default();
        assert!(history.push(message("m1", MessageKind::Text, "hello")));
        assert!(!history.push(message("m1", MessageKind::Text, "hello again")));
        assert_eq!(history.len(), 1);
    }

    #[test]
    fn cap_prunes_oldest_first() {
        let mut history = RoomHistory::new(3);
        for i in 0..5 {
            history.push(message(&format!("m{i}"), MessageKind::Text, "x"));
        }
        assert_eq!(history.len(), 3);
        let ids: Vec<&str> = history.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, ["m2", "m3", "m4"]);
    }

    #[test]
    fn pruned_ids_leave_the_dedup_window() {
        let mut history = RoomHistory::new(2);
        history.push(message("m1", MessageKind::Text, "x"));
        history.push(message("m2", MessageKind::Text, "x"));
        history.push(message("m3", MessageKind::Text, "x"));
        assert!(!history.contains("m1"));
        // m1 fell out of the window, so a replay is accepted again.
        assert!(history.push(message("m1", MessageKind::Text, "x")));
    }

    #[test]
    fn sync_tail_takes_the_newest() {
        let mut history = RoomHistory::default();
        for i in 0..30 {
            history.push(message(&format!("m{i}"), MessageKind::Text, "x"));
        }
        let tail = history.sync_tail(SYNC_TAIL);
        assert_eq!(tail.len(), SYNC_TAIL);
        assert_eq!(tail.first().map(|m| m.id.as_str()), Some("m10"));
        assert_eq!(tail.last().map(|m| m.id.as_str()), Some("m29"));
    }

    #[test]
    fn sync_tail_shorter_than_limit() {
        let mut history = RoomHistory::default();
        history.push(message("m1", MessageKind::Text, "x"));
        assert_eq!(history.sync_tail(SYNC_TAIL).len(), 1);
    }

    #[test]
    fn sync_tail_omits_oversized_media() {
        let mut history = RoomHistory::default();
        let big = "A".repeat(SYNC_CONTENT_CEILING + 1);
        history.push(message("img", MessageKind::Image, &big));

        let tail = history.sync_tail(SYNC_TAIL);
        assert_eq!(tail[0].content, OMITTED_CONTENT_MARKER);
        // The stored entry is untouched.
        assert_eq!(history.iter().next().map(|m| m.content.len()), Some(big.len()));
    }

    #[test]
    fn sync_tail_keeps_oversized_text() {
        let mut history = RoomHistory::default();
        let big = "B".repeat(SYNC_CONTENT_CEILING + 1);
        history.push(message("txt", MessageKind::Text, &big));

        let tail = history.sync_tail(SYNC_TAIL);
        assert_eq!(tail[0].content.len(), big.len());
    }

    #[test]
    fn sync_tail_keeps_small_media() {
        let mut history = RoomHistory::default();
        history.push(message("img", MessageKind::Image, "tiny-data-url"));
        assert_eq!(history.sync_tail(SYNC_TAIL)[0].content, "tiny-data-url");
    }

    #[test]
    fn clear_resets_everything() {
        let mut history = RoomHistory::default();
        history.push(message("m1", MessageKind::Text, "x"));
        history.clear();
        assert!(history.is_empty());
        assert!(!history.contains("m1"));
        assert!(history.push(message("m1", MessageKind::Text, "x")));
    }
}
