//! Base text-generation trait and wire types
//!
//! The memory engine never talks to a model API directly; it is handed a
//! `TextGenerator` capability and feeds it ordered `ChatMessage` values.
//! Provider, auth, and transport concerns live behind the trait.

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A single role/content pair on the provider wire
///
/// This is the opaque message shape the generation capability consumes.
/// It is deliberately smaller than the stored message type: sequence
/// numbers and timestamps are a storage concern, not a provider one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Role of the message sender (user, assistant, system)
    pub role: String,
    /// Content of the message
    pub content: String,
}

impl ChatMessage {
    /// Creates a new user message
    ///
    /// # Examples
    ///
    /// ```
    /// use chronica::providers::ChatMessage;
    ///
    /// let msg = ChatMessage::user("Hello!");
    /// assert_eq!(msg.role, "user");
    /// ```
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }

    /// Creates a new assistant message
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: "assistant".to_string(),
            content: content.into(),
        }
    }

    /// Creates a new system message
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }
}

/// Text-generation capability injected into the summarizer
///
/// Implementations translate a conversation into generated text. Any
/// provider, network, or auth failure surfaces as an error; callers in
/// the memory engine treat such failures as recoverable.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Generate a text completion for the given messages
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying provider call fails or the
    /// response cannot be interpreted.
    async fn generate(&self, messages: &[ChatMessage]) -> Result<String>;

    /// Label identifying this generator (model label from the config table)
    fn label(&self) -> &str;
}

impl std::fmt::Debug for dyn TextGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TextGenerator")
            .field("label", &self.label())
            .finish()
    }
}
