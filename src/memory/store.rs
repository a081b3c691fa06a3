//! Durable storage for chunks, session indexes, and summaries
//!
//! Three narrow capability traits keep the facade independent of the
//! backend; `SledMemoryStore` is the production implementation, holding
//! one embedded database with a tree per document family. Every document
//! is a JSON value written whole (read-modify-write), so a write is
//! either fully visible or absent.

use crate::config::StorageConfig;
use crate::error::{ChronicaError, Result};
use crate::memory::index::SessionIndex;
use crate::memory::message::StoredMessage;
use chrono::{DateTime, Utc};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Persisted summary artifact for one chunk
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummaryRecord {
    /// Index of the summarized chunk
    pub chunk_index: u64,
    /// Raw message count at compression time
    pub original_count: usize,
    /// The summary text
    pub summary_text: String,
    /// Model label used (or attempted) for generation
    pub model: String,
    /// Creation time
    pub created_at: DateTime<Utc>,
}

/// Append/read access to chunk bodies
pub trait ChunkStore: Send + Sync {
    /// Append a message to a chunk, persisting the whole body
    ///
    /// Returns the resulting message count in the chunk. A stored tail
    /// with sequence numbers at or past the incoming one is replaced, so
    /// retrying a partially failed append cannot duplicate numbers.
    ///
    /// # Errors
    ///
    /// Storage failures here are hard errors; the caller must not report
    /// the message as stored.
    fn append_message(
        &self,
        session_id: &str,
        chunk_index: u64,
        message: StoredMessage,
    ) -> Result<usize>;

    /// Load a chunk's messages in stored order
    ///
    /// An absent chunk is a normal state and yields an empty Vec.
    fn load_chunk(&self, session_id: &str, chunk_index: u64) -> Result<Vec<StoredMessage>>;
}

/// Load/save access to session index documents
pub trait IndexStore: Send + Sync {
    /// Load a session's index, synthesizing a fresh one when absent
    ///
    /// The not-found path is side-effect free; nothing is persisted
    /// until the caller saves.
    fn load_index(&self, session_id: &str) -> Result<SessionIndex>;

    /// Persist the whole index document
    fn save_index(&self, index: &SessionIndex) -> Result<()>;

    /// Session ids with a persisted index
    fn list_sessions(&self) -> Result<Vec<String>>;
}

/// Load/save access to summary artifacts
pub trait SummaryStore: Send + Sync {
    /// Persist a summary, returning its storage key
    fn save_summary(&self, session_id: &str, record: &SummaryRecord) -> Result<String>;

    /// Load a chunk's summary, None when absent
    fn load_summary(&self, session_id: &str, chunk_index: u64) -> Result<Option<SummaryRecord>>;
}

/// Combined storage capability the facade depends on
pub trait MemoryStore: ChunkStore + IndexStore + SummaryStore {}

impl<T: ChunkStore + IndexStore + SummaryStore> MemoryStore for T {}

/// Sled-backed memory store
///
/// Documents are JSON values in three trees: `chunks` and `summaries`
/// keyed by `{session_id}:{chunk_index:06}`, `indexes` keyed by the
/// session id.
pub struct SledMemoryStore {
    db: sled::Db,
    chunks: sled::Tree,
    indexes: sled::Tree,
    summaries: sled::Tree,
}

impl SledMemoryStore {
    /// Open the store at the configured location
    ///
    /// Falls back to the user's data directory when no path is
    /// configured.
    pub fn open(storage: &StorageConfig) -> Result<Self> {
        let path = match &storage.path {
            Some(path) => PathBuf::from(path),
            None => Self::default_path()?,
        };
        Self::open_at(path)
    }

    /// Open the store at an explicit path
    ///
    /// Primarily useful for tests running against a temporary directory.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use chronica::memory::SledMemoryStore;
    ///
    /// let store = SledMemoryStore::open_at("/tmp/chronica-memory.db").unwrap();
    /// ```
    pub fn open_at(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                ChronicaError::Storage(format!("Failed to create storage directory: {}", e))
            })?;
        }

        let db = sled::open(&path)
            .map_err(|e| ChronicaError::Storage(format!("Failed to open database: {}", e)))?;

        let chunks = db
            .open_tree("chunks")
            .map_err(|e| ChronicaError::Storage(format!("Failed to open chunks tree: {}", e)))?;
        let indexes = db
            .open_tree("indexes")
            .map_err(|e| ChronicaError::Storage(format!("Failed to open indexes tree: {}", e)))?;
        let summaries = db.open_tree("summaries").map_err(|e| {
            ChronicaError::Storage(format!("Failed to open summaries tree: {}", e))
        })?;

        Ok(Self {
            db,
            chunks,
            indexes,
            summaries,
        })
    }

    fn default_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("dev", "chronica", "chronica")
            .ok_or_else(|| ChronicaError::Storage("Could not determine data directory".into()))?;
        Ok(proj_dirs.data_dir().join("memory.db"))
    }

    /// Composite key for per-chunk documents
    ///
    /// Zero-padded so keys within a session sort in chunk order.
    fn chunk_key(session_id: &str, chunk_index: u64) -> String {
        format!("{}:{:06}", session_id, chunk_index)
    }

    fn flush(&self) -> Result<()> {
        self.db
            .flush()
            .map_err(|e| ChronicaError::Storage(format!("Flush failed: {}", e)))?;
        Ok(())
    }
}

impl ChunkStore for SledMemoryStore {
    fn append_message(
        &self,
        session_id: &str,
        chunk_index: u64,
        message: StoredMessage,
    ) -> Result<usize> {
        let key = Self::chunk_key(session_id, chunk_index);

        let mut messages: Vec<StoredMessage> = match self
            .chunks
            .get(&key)
            .map_err(|e| ChronicaError::Storage(format!("Chunk read failed: {}", e)))?
        {
            Some(bytes) => serde_json::from_slice(&bytes).map_err(|e| {
                ChronicaError::Storage(format!("Chunk deserialization failed: {}", e))
            })?,
            None => Vec::new(),
        };

        // A retry after a failed index save re-assigns the same number;
        // drop the stale tail instead of storing duplicates.
        if messages
            .last()
            .map(|last| last.number >= message.number)
            .unwrap_or(false)
        {
            tracing::warn!(
                "Replacing stale tail of chunk {} for session {} from number {}",
                chunk_index,
                session_id,
                message.number
            );
            messages.retain(|stored| stored.number < message.number);
        }

        messages.push(message);

        let value = serde_json::to_vec(&messages)
            .map_err(|e| ChronicaError::Storage(format!("Chunk serialization failed: {}", e)))?;
        self.chunks
            .insert(key.as_bytes(), value)
            .map_err(|e| ChronicaError::Storage(format!("Chunk insert failed: {}", e)))?;
        self.flush()?;

        Ok(messages.len())
    }

    fn load_chunk(&self, session_id: &str, chunk_index: u64) -> Result<Vec<StoredMessage>> {
        let key = Self::chunk_key(session_id, chunk_index);
        match self
            .chunks
            .get(&key)
            .map_err(|e| ChronicaError::Storage(format!("Chunk read failed: {}", e)))?
        {
            Some(bytes) => serde_json::from_slice(&bytes).map_err(|e| {
                ChronicaError::Storage(format!("Chunk deserialization failed: {}", e)).into()
            }),
            None => Ok(Vec::new()),
        }
    }
}

impl IndexStore for SledMemoryStore {
    fn load_index(&self, session_id: &str) -> Result<SessionIndex> {
        match self
            .indexes
            .get(session_id.as_bytes())
            .map_err(|e| ChronicaError::Storage(format!("Index read failed: {}", e)))?
        {
            Some(bytes) => serde_json::from_slice(&bytes).map_err(|e| {
                ChronicaError::Storage(format!("Index deserialization failed: {}", e)).into()
            }),
            None => Ok(SessionIndex::new(session_id)),
        }
    }

    fn save_index(&self, index: &SessionIndex) -> Result<()> {
        let value = serde_json::to_vec(index)
            .map_err(|e| ChronicaError::Storage(format!("Index serialization failed: {}", e)))?;
        self.indexes
            .insert(index.session_id.as_bytes(), value)
            .map_err(|e| ChronicaError::Storage(format!("Index insert failed: {}", e)))?;
        self.flush()
    }

    fn list_sessions(&self) -> Result<Vec<String>> {
        let mut sessions = Vec::new();
        for entry in self.indexes.iter() {
            let (key, _) =
                entry.map_err(|e| ChronicaError::Storage(format!("Index scan failed: {}", e)))?;
            sessions.push(String::from_utf8_lossy(&key).to_string());
        }
        Ok(sessions)
    }
}

impl SummaryStore for SledMemoryStore {
    fn save_summary(&self, session_id: &str, record: &SummaryRecord) -> Result<String> {
        let key = Self::chunk_key(session_id, record.chunk_index);
        let value = serde_json::to_vec(record).map_err(|e| {
            ChronicaError::Storage(format!("Summary serialization failed: {}", e))
        })?;
        self.summaries
            .insert(key.as_bytes(), value)
            .map_err(|e| ChronicaError::Storage(format!("Summary insert failed: {}", e)))?;
        self.flush()?;
        Ok(key)
    }

    fn load_summary(&self, session_id: &str, chunk_index: u64) -> Result<Option<SummaryRecord>> {
        let key = Self::chunk_key(session_id, chunk_index);
        match self
            .summaries
            .get(&key)
            .map_err(|e| ChronicaError::Storage(format!("Summary read failed: {}", e)))?
        {
            Some(bytes) => {
                let record = serde_json::from_slice(&bytes).map_err(|e| {
                    ChronicaError::Storage(format!("Summary deserialization failed: {}", e))
                })?;
                Ok(Some(record))
            }
            None => Ok(None),
        }
    }
}
