//! Message and memory-entry data model
//!
//! Stored messages are immutable once written; summaries produced by
//! compression are a distinct variant rather than a flagged message, so
//! downstream consumers stay exhaustive over both cases.

use crate::error::ChronicaError;
use crate::providers::ChatMessage;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Role of a conversation message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

impl Role {
    /// Wire name of the role
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::System => "system",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = ChronicaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Role::User),
            "assistant" => Ok(Role::Assistant),
            "system" => Ok(Role::System),
            other => Err(ChronicaError::Config(format!(
                "Invalid role: {} (expected user, assistant, or system)",
                other
            ))),
        }
    }
}

/// A message as persisted in a chunk
///
/// Sequence numbers are globally unique per session, strictly
/// increasing, and assigned by the session index starting at 1.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredMessage {
    /// Global sequence number within the session
    pub number: u64,
    /// Role of the sender
    pub role: Role,
    /// Message content
    pub content: String,
    /// Time the message was appended
    pub timestamp: DateTime<Utc>,
}

impl StoredMessage {
    /// Create a message stamped with the current time
    pub fn new(number: u64, role: Role, content: impl Into<String>) -> Self {
        Self {
            number,
            role,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }
}

/// Where a summary entry came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SummarySource {
    /// A persisted per-chunk summary created by `compress_chunk`
    Stored {
        /// Index of the summarized chunk
        chunk_index: u64,
    },
    /// An on-the-fly summary produced during a read; never persisted
    Ephemeral,
}

/// A synthetic summary standing in for raw messages
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummaryMessage {
    /// The summary text
    pub text: String,
    /// Number of raw messages the summary replaces
    pub original_count: usize,
    /// Model label that produced the summary (or attempted to, when the
    /// deterministic fallback was used)
    pub model: String,
    /// Stored vs ephemeral origin
    pub source: SummarySource,
}

/// One entry returned from a memory read
///
/// Either a raw stored message or a summary substituted for a range of
/// them. Matching on this enum is how consumers decide rendering; there
/// are no boolean "compressed" flags.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum MemoryEntry {
    Raw(StoredMessage),
    Summary(SummaryMessage),
}

impl MemoryEntry {
    /// Role under which this entry enters a prompt
    ///
    /// Summaries always read as system context.
    pub fn role(&self) -> Role {
        match self {
            MemoryEntry::Raw(message) => message.role,
            MemoryEntry::Summary(_) => Role::System,
        }
    }

    /// Flatten to the provider wire shape
    pub fn to_chat_message(&self) -> ChatMessage {
        match self {
            MemoryEntry::Raw(message) => ChatMessage {
                role: message.role.as_str().to_string(),
                content: message.content.clone(),
            },
            MemoryEntry::Summary(summary) => ChatMessage {
                role: Role::System.as_str().to_string(),
                content: summary.text.clone(),
            },
        }
    }
}
