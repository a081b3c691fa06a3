//! Chunked conversation memory
//!
//! An unbounded, append-only message stream per session, partitioned
//! into fixed-capacity chunks so arbitrary sub-ranges load without
//! touching the full history. A per-session index document carries the
//! numbering authority and the summary registry; chunks can be
//! compressed on demand into short summaries to bound future context.

pub mod addressing;
pub mod index;
pub mod manager;
pub mod message;
pub mod store;
pub mod summarizer;

pub use addressing::ChunkAddressing;
pub use index::{ChunkBounds, SessionIndex, SummaryRef};
pub use manager::{new_session_id, MemoryManager, ReadOptions, SessionStats};
pub use message::{MemoryEntry, Role, StoredMessage, SummaryMessage, SummarySource};
pub use store::{
    ChunkStore, IndexStore, MemoryStore, SledMemoryStore, SummaryRecord, SummaryStore,
};
pub use summarizer::Summarizer;
