//! Per-session index document
//!
//! The index is the single durable source of truth for how many messages
//! a session holds and which chunks are summarized. Chunk bodies live in
//! the chunk store; the index only carries bounds and counts.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Recorded bounds of one chunk
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkBounds {
    /// Nominal first sequence number of the chunk
    pub start: u64,
    /// Actual filled end (min of nominal end and total messages)
    pub end: u64,
    /// Messages currently stored in the chunk
    pub count: usize,
    /// Time of the last write into this chunk
    pub updated_at: DateTime<Utc>,
}

/// Reference to a stored summary artifact
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummaryRef {
    /// Storage key of the summary document
    pub key: String,
    /// Time the summary was created (recompression overwrites)
    pub created_at: DateTime<Utc>,
}

/// Session index document
///
/// `total_messages` is monotonic; it is raised by chunk writes and never
/// lowered. `next_message_number` is the sole numbering authority for a
/// session under the single-writer assumption.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionIndex {
    /// Caller-supplied session identifier
    pub session_id: String,
    /// Highest sequence number ever recorded
    pub total_messages: u64,
    /// Chunk bounds keyed by chunk index
    ///
    /// Serialized with string keys, so the JSON document matches the
    /// `{"1": {...}}` shape other consumers of the storage expect.
    pub chunks: BTreeMap<u64, ChunkBounds>,
    /// Summary registry keyed by chunk index
    pub summaries: BTreeMap<u64, SummaryRef>,
    /// Creation time of the index document
    pub created_at: DateTime<Utc>,
    /// Time of the last mutation
    pub last_updated: DateTime<Utc>,
}

impl SessionIndex {
    /// Fresh zero-valued index for a session
    ///
    /// Not persisted until a caller explicitly saves it.
    pub fn new(session_id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            session_id: session_id.into(),
            total_messages: 0,
            chunks: BTreeMap::new(),
            summaries: BTreeMap::new(),
            created_at: now,
            last_updated: now,
        }
    }

    /// Next sequence number to assign
    pub fn next_message_number(&self) -> u64 {
        self.total_messages + 1
    }

    /// Record a chunk write, raising `total_messages` monotonically
    pub fn record_chunk_write(&mut self, chunk_index: u64, start: u64, end: u64, count: usize) {
        let now = Utc::now();
        self.chunks.insert(
            chunk_index,
            ChunkBounds {
                start,
                end,
                count,
                updated_at: now,
            },
        );
        self.total_messages = self.total_messages.max(end);
        self.last_updated = now;
    }

    /// Register (or replace) the summary for a chunk
    ///
    /// The raw chunk stays retrievable; compression is additive.
    pub fn record_summary(&mut self, chunk_index: u64, key: impl Into<String>) {
        let now = Utc::now();
        self.summaries.insert(
            chunk_index,
            SummaryRef {
                key: key.into(),
                created_at: now,
            },
        );
        self.last_updated = now;
    }

    /// Chunk indices that have at least one write
    pub fn chunk_indices(&self) -> Vec<u64> {
        self.chunks.keys().copied().collect()
    }

    /// Newest chunk with writes but no summary, if any
    pub fn latest_uncompressed_chunk(&self) -> Option<u64> {
        self.chunks
            .keys()
            .rev()
            .find(|index| !self.summaries.contains_key(index))
            .copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_index_is_zero_valued() {
        let index = SessionIndex::new("s1");
        assert_eq!(index.session_id, "s1");
        assert_eq!(index.total_messages, 0);
        assert!(index.chunks.is_empty());
        assert!(index.summaries.is_empty());
        assert_eq!(index.next_message_number(), 1);
    }

    #[test]
    fn test_record_chunk_write_raises_total() {
        let mut index = SessionIndex::new("s1");
        index.record_chunk_write(1, 1, 7, 7);
        assert_eq!(index.total_messages, 7);
        assert_eq!(index.next_message_number(), 8);
    }

    #[test]
    fn test_record_chunk_write_never_lowers_total() {
        let mut index = SessionIndex::new("s1");
        index.record_chunk_write(2, 101, 150, 50);
        assert_eq!(index.total_messages, 150);
        // Re-recording an older chunk must not shrink the session.
        index.record_chunk_write(1, 1, 100, 100);
        assert_eq!(index.total_messages, 150);
    }

    #[test]
    fn test_record_summary_upserts() {
        let mut index = SessionIndex::new("s1");
        index.record_summary(1, "s1:000001");
        index.record_summary(1, "s1:000001-v2");
        assert_eq!(index.summaries.len(), 1);
        assert_eq!(index.summaries[&1].key, "s1:000001-v2");
    }

    #[test]
    fn test_latest_uncompressed_chunk() {
        let mut index = SessionIndex::new("s1");
        assert_eq!(index.latest_uncompressed_chunk(), None);

        index.record_chunk_write(1, 1, 100, 100);
        index.record_chunk_write(2, 101, 150, 50);
        assert_eq!(index.latest_uncompressed_chunk(), Some(2));

        index.record_summary(2, "k2");
        assert_eq!(index.latest_uncompressed_chunk(), Some(1));

        index.record_summary(1, "k1");
        assert_eq!(index.latest_uncompressed_chunk(), None);
    }

    #[test]
    fn test_index_json_uses_string_keys() {
        let mut index = SessionIndex::new("s1");
        index.record_chunk_write(3, 201, 250, 50);
        let json = serde_json::to_value(&index).expect("serialize failed");
        assert!(json["chunks"]["3"]["start"].is_u64());
        assert_eq!(json["chunks"]["3"]["start"], 201);
    }

    #[test]
    fn test_mutations_refresh_last_updated() {
        let mut index = SessionIndex::new("s1");
        let created = index.last_updated;
        std::thread::sleep(std::time::Duration::from_millis(5));
        index.record_chunk_write(1, 1, 1, 1);
        assert!(index.last_updated > created);
    }
}
