//! Summarization of message batches
//!
//! Turns an ordered batch of stored messages into a short text via an
//! injected text-generation capability. Generation failures never reach
//! the caller; a deterministic local summary stands in so compression
//! always yields some artifact.

use crate::memory::message::StoredMessage;
use crate::providers::{ChatMessage, TextGenerator};

/// Instruction template used when no override is supplied
///
/// `{history}` is replaced with the numbered transcript.
const DEFAULT_INSTRUCTION: &str = "Condense the following conversation history into a short \
summary that preserves key facts, decisions, and open plot threads.\n\n\
Conversation history:\n{history}\n\nReturn only the summary text.";

/// Maximum characters of the last message quoted in a fallback summary
const FALLBACK_PREVIEW_CHARS: usize = 50;

/// Batch summarizer with a deterministic fallback
#[derive(Debug, Clone, Default)]
pub struct Summarizer;

impl Summarizer {
    pub fn new() -> Self {
        Self
    }

    /// Summarize a batch of messages
    ///
    /// Formats the batch as a numbered transcript, embeds it into the
    /// instruction template (`instruction_override` replaces the default
    /// when given), and delegates to the generator. Infallible: any
    /// generator error degrades to [`Summarizer::fallback_summary`].
    pub async fn summarize(
        &self,
        messages: &[StoredMessage],
        generator: &dyn TextGenerator,
        instruction_override: Option<&str>,
    ) -> String {
        if messages.is_empty() {
            return String::new();
        }

        let transcript = format_transcript(messages);
        let template = instruction_override.unwrap_or(DEFAULT_INSTRUCTION);
        let instruction = template.replace("{history}", &transcript);

        let request = vec![ChatMessage::user(instruction)];
        match generator.generate(&request).await {
            Ok(summary) if !summary.trim().is_empty() => summary,
            Ok(_) => {
                tracing::warn!(
                    "Generator {} returned an empty summary, using fallback",
                    generator.label()
                );
                self.fallback_summary(messages)
            }
            Err(e) => {
                tracing::warn!(
                    "Generator {} failed ({}), using fallback summary",
                    generator.label(),
                    e
                );
                self.fallback_summary(messages)
            }
        }
    }

    /// Deterministic local summary used when generation fails
    ///
    /// Carries the message count, the approximate character volume, and
    /// a short preview of the last message.
    pub fn fallback_summary(&self, messages: &[StoredMessage]) -> String {
        if messages.is_empty() {
            return String::new();
        }

        let total_chars: usize = messages.iter().map(|m| m.content.chars().count()).sum();
        let mut summary = format!(
            "Conversation record of {} messages, roughly {} characters in total.",
            messages.len(),
            total_chars
        );

        if let Some(last) = messages.last() {
            summary.push_str(&format!(
                " Last message: [{}] {}",
                last.role,
                truncate_string(&last.content, FALLBACK_PREVIEW_CHARS)
            ));
        }

        summary
    }
}

/// Numbered transcript in `"{n}. [{role}]: {content}"` form
///
/// Numbering is local to the batch, so a summary prompt always starts
/// at 1 regardless of where the chunk sits in the session.
fn format_transcript(messages: &[StoredMessage]) -> String {
    messages
        .iter()
        .enumerate()
        .map(|(i, message)| format!("{}. [{}]: {}", i + 1, message.role, message.content))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Truncates a string to a maximum length, adding ellipsis if truncated
fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let mut truncated = s.chars().take(max_len).collect::<String>();
        truncated.push_str("...");
        truncated
    }
}
