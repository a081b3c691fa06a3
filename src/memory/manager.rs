//! Memory manager facade
//!
//! Composes addressing, the chunk store, the session index, and the
//! summarizer into the operations callers use: append, ranged and
//! recent reads, per-chunk compression, and statistics.
//!
//! The engine assumes a single writer per session. The index is
//! read-modify-written whole on every mutation with no versioning, so a
//! concurrent second writer would observe stale numbering and clobber
//! updates; embedding applications serialize appends per session.

use crate::config::MemoryConfig;
use crate::error::Result;
use crate::memory::addressing::ChunkAddressing;
use crate::memory::message::{MemoryEntry, Role, StoredMessage, SummaryMessage, SummarySource};
use crate::memory::store::{MemoryStore, SummaryRecord};
use crate::memory::summarizer::Summarizer;
use crate::providers::ProviderRegistry;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Options controlling a ranged or recent read
#[derive(Debug, Clone, Default)]
pub struct ReadOptions {
    /// Summarize the loaded raw messages into one ephemeral entry
    pub compress_on_read: bool,
    /// Read stored per-chunk summaries instead of raw chunk bodies
    ///
    /// Takes precedence over `compress_on_read` when both are set.
    pub read_stored_summaries: bool,
    /// Model label for `compress_on_read`; the configured default
    /// compression model applies when unset
    pub model: Option<String>,
}

/// Session statistics derived from the index document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionStats {
    pub session_id: String,
    pub total_messages: u64,
    /// Chunks with at least one write
    pub chunk_count: usize,
    /// Chunks with a live summary
    pub compressed_chunks: usize,
    pub chunk_capacity: u64,
    pub created_at: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
}

/// Facade over the chunked conversation memory
pub struct MemoryManager {
    store: Arc<dyn MemoryStore>,
    registry: Arc<ProviderRegistry>,
    summarizer: Summarizer,
    addressing: ChunkAddressing,
    compression_model: String,
}

impl MemoryManager {
    /// Create a manager over a storage backend and provider registry
    pub fn new(
        store: Arc<dyn MemoryStore>,
        registry: Arc<ProviderRegistry>,
        memory: &MemoryConfig,
    ) -> Self {
        Self {
            store,
            registry,
            summarizer: Summarizer::new(),
            addressing: ChunkAddressing::new(memory.chunk_capacity),
            compression_model: memory.compression_model.clone(),
        }
    }

    /// The addressing scheme in use
    pub fn addressing(&self) -> ChunkAddressing {
        self.addressing
    }

    /// Append one message, returning its assigned sequence number
    ///
    /// Numbering comes from the session index; the message is written to
    /// its owning chunk, then the index is updated with the chunk's
    /// actual filled bound.
    ///
    /// # Errors
    ///
    /// Storage failures on this path are hard errors. A message must
    /// never be reported as stored when it is not, or the numbering
    /// authority would drift from the stored content.
    pub fn append_message(
        &self,
        session_id: &str,
        role: Role,
        content: impl Into<String>,
    ) -> Result<u64> {
        let mut index = self.store.load_index(session_id)?;
        let number = index.next_message_number();
        let chunk_index = self.addressing.chunk_of(number);

        let message = StoredMessage::new(number, role, content);
        let count = self.store.append_message(session_id, chunk_index, message)?;

        let (nominal_start, nominal_end) = self.addressing.bounds_of(chunk_index);
        index.record_chunk_write(chunk_index, nominal_start, nominal_end.min(number), count);
        self.store.save_index(&index)?;

        tracing::debug!(
            "Appended message {} to session {} (chunk {})",
            number,
            session_id,
            chunk_index
        );

        Ok(number)
    }

    /// Load messages in the inclusive range `[start, end]`
    ///
    /// `end` defaults to the session's total. Ranges are clamped; an
    /// inverted or out-of-session range yields an empty Vec, never an
    /// error. See [`ReadOptions`] for the summary-reading modes.
    pub async fn load_range(
        &self,
        session_id: &str,
        start: u64,
        end: Option<u64>,
        options: &ReadOptions,
    ) -> Result<Vec<MemoryEntry>> {
        let index = self.store.load_index(session_id)?;
        let total = index.total_messages;
        if total == 0 {
            return Ok(Vec::new());
        }

        let start = start.max(1);
        let end = end.unwrap_or(total).min(total);
        if start > end {
            return Ok(Vec::new());
        }

        if options.read_stored_summaries {
            return self.load_stored_summaries(session_id, &index.summaries, start, end);
        }

        let mut entries = Vec::new();
        for chunk_index in self.addressing.chunks_covering(start, end) {
            let chunk = self.store.load_chunk(session_id, chunk_index)?;
            // A chunk may span beyond the requested slice.
            entries.extend(
                chunk
                    .into_iter()
                    .filter(|message| message.number >= start && message.number <= end)
                    .map(MemoryEntry::Raw),
            );
        }

        if options.compress_on_read && !entries.is_empty() {
            return Ok(self.compress_entries(session_id, entries, options).await);
        }

        Ok(entries)
    }

    /// Load the most recent `count` messages
    pub async fn load_recent(
        &self,
        session_id: &str,
        count: u64,
        options: &ReadOptions,
    ) -> Result<Vec<MemoryEntry>> {
        let index = self.store.load_index(session_id)?;
        let total = index.total_messages;
        if total == 0 || count == 0 {
            return Ok(Vec::new());
        }

        let start = total.saturating_sub(count - 1).max(1);
        self.load_range(session_id, start, Some(total), options).await
    }

    /// Compress one chunk into a stored summary
    ///
    /// Best-effort by contract: every failure (unknown model, empty
    /// chunk, storage trouble) is logged and reported as `false` so a
    /// generation pipeline triggering compression as a side activity is
    /// never crashed by it. Generation failures still count as success
    /// because the summarizer falls back to a deterministic summary.
    pub async fn compress_chunk(
        &self,
        session_id: &str,
        chunk_index: u64,
        model: Option<&str>,
        instruction_override: Option<&str>,
    ) -> bool {
        let label = model.unwrap_or(&self.compression_model);
        match self
            .try_compress(session_id, chunk_index, label, instruction_override)
            .await
        {
            Ok(compressed) => compressed,
            Err(e) => {
                tracing::warn!(
                    "Compression of chunk {} for session {} failed: {}",
                    chunk_index,
                    session_id,
                    e
                );
                false
            }
        }
    }

    async fn try_compress(
        &self,
        session_id: &str,
        chunk_index: u64,
        label: &str,
        instruction_override: Option<&str>,
    ) -> Result<bool> {
        let messages = self.store.load_chunk(session_id, chunk_index)?;
        if messages.is_empty() {
            tracing::warn!(
                "Chunk {} of session {} has no messages, skipping compression",
                chunk_index,
                session_id
            );
            return Ok(false);
        }

        let generator = self.registry.resolve(label)?;
        let summary_text = self
            .summarizer
            .summarize(&messages, generator.as_ref(), instruction_override)
            .await;

        let record = SummaryRecord {
            chunk_index,
            original_count: messages.len(),
            summary_text,
            model: label.to_string(),
            created_at: Utc::now(),
        };
        let key = self.store.save_summary(session_id, &record)?;

        let mut index = self.store.load_index(session_id)?;
        index.record_summary(chunk_index, key);
        self.store.save_index(&index)?;

        tracing::info!(
            "Compressed chunk {} of session {} ({} messages, model {})",
            chunk_index,
            session_id,
            record.original_count,
            label
        );

        Ok(true)
    }

    /// Compress several chunks independently
    ///
    /// One chunk's failure never aborts the others; the result maps each
    /// requested index to its outcome.
    pub async fn batch_compress(
        &self,
        session_id: &str,
        chunk_indices: &[u64],
        model: Option<&str>,
        instruction_override: Option<&str>,
    ) -> BTreeMap<u64, bool> {
        let mut results = BTreeMap::new();
        for &chunk_index in chunk_indices {
            let success = self
                .compress_chunk(session_id, chunk_index, model, instruction_override)
                .await;
            results.insert(chunk_index, success);
        }
        results
    }

    /// Opportunistically compress the newest chunk without a summary
    ///
    /// Intended to run right after an append; failures are logged and
    /// never unwind the caller. Returns the compressed chunk index on
    /// success.
    pub async fn auto_compress(&self, session_id: &str, model: Option<&str>) -> Option<u64> {
        let index = match self.store.load_index(session_id) {
            Ok(index) => index,
            Err(e) => {
                tracing::warn!("Auto-compression skipped for {}: {}", session_id, e);
                return None;
            }
        };

        let chunk_index = index.latest_uncompressed_chunk()?;
        if self
            .compress_chunk(session_id, chunk_index, model, None)
            .await
        {
            Some(chunk_index)
        } else {
            None
        }
    }

    /// Statistics derived from the index document alone
    ///
    /// No chunk bodies are read, and the not-found path persists
    /// nothing, so repeated calls without writes are identical.
    pub fn get_stats(&self, session_id: &str) -> Result<SessionStats> {
        let index = self.store.load_index(session_id)?;
        Ok(SessionStats {
            session_id: index.session_id.clone(),
            total_messages: index.total_messages,
            chunk_count: index.chunks.len(),
            compressed_chunks: index.summaries.len(),
            chunk_capacity: self.addressing.capacity(),
            created_at: index.created_at,
            last_updated: index.last_updated,
        })
    }

    /// Session ids with persisted state
    pub fn list_sessions(&self) -> Result<Vec<String>> {
        self.store.list_sessions()
    }

    /// Case-insensitive substring search across a session's messages
    ///
    /// Scans chunks in ascending order and stops after `limit` hits.
    pub fn search(&self, session_id: &str, query: &str, limit: usize) -> Result<Vec<StoredMessage>> {
        if limit == 0 {
            return Ok(Vec::new());
        }

        let index = self.store.load_index(session_id)?;
        let needle = query.to_lowercase();
        let mut hits = Vec::new();

        for chunk_index in index.chunk_indices() {
            for message in self.store.load_chunk(session_id, chunk_index)? {
                if message.content.to_lowercase().contains(&needle) {
                    hits.push(message);
                    if hits.len() >= limit {
                        return Ok(hits);
                    }
                }
            }
        }

        Ok(hits)
    }

    fn load_stored_summaries(
        &self,
        session_id: &str,
        summaries: &BTreeMap<u64, crate::memory::index::SummaryRef>,
        start: u64,
        end: u64,
    ) -> Result<Vec<MemoryEntry>> {
        let mut entries = Vec::new();
        for chunk_index in self.addressing.chunks_covering(start, end) {
            if !summaries.contains_key(&chunk_index) {
                continue;
            }
            match self.store.load_summary(session_id, chunk_index)? {
                Some(record) => entries.push(MemoryEntry::Summary(SummaryMessage {
                    text: record.summary_text,
                    original_count: record.original_count,
                    model: record.model,
                    source: SummarySource::Stored { chunk_index },
                })),
                None => {
                    // Registered but missing document: treat as absent.
                    tracing::warn!(
                        "Summary for chunk {} of session {} is registered but missing",
                        chunk_index,
                        session_id
                    );
                }
            }
        }
        Ok(entries)
    }

    async fn compress_entries(
        &self,
        session_id: &str,
        entries: Vec<MemoryEntry>,
        options: &ReadOptions,
    ) -> Vec<MemoryEntry> {
        let raw: Vec<StoredMessage> = entries
            .iter()
            .filter_map(|entry| match entry {
                MemoryEntry::Raw(message) => Some(message.clone()),
                MemoryEntry::Summary(_) => None,
            })
            .collect();

        let label = options
            .model
            .as_deref()
            .unwrap_or(&self.compression_model)
            .to_string();

        let text = match self.registry.resolve(&label) {
            Ok(generator) => {
                self.summarizer
                    .summarize(&raw, generator.as_ref(), None)
                    .await
            }
            Err(e) => {
                tracing::warn!(
                    "Read-time compression for {} fell back to local summary: {}",
                    session_id,
                    e
                );
                self.summarizer.fallback_summary(&raw)
            }
        };

        vec![MemoryEntry::Summary(SummaryMessage {
            text,
            original_count: raw.len(),
            model: label,
            source: SummarySource::Ephemeral,
        })]
    }
}

/// Generate a new session identifier
///
/// ULIDs are preferred over UUIDs as they are sortable by timestamp and
/// more human-readable.
pub fn new_session_id() -> String {
    ulid::Ulid::new().to_string()
}
