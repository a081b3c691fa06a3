/*!
Command handlers for the CLI

Each handler takes the already-constructed `MemoryManager` and prints
its result to the terminal. The handlers are intentionally small; all
memory semantics live in the library.
*/

use crate::error::{ChronicaError, Result};
use crate::memory::{MemoryEntry, MemoryManager, ReadOptions, Role, SummarySource};
use colored::Colorize;
use prettytable::{format, Table};
use std::path::Path;

/// Append a message, optionally compressing the newest chunk afterwards
pub async fn append(
    manager: &MemoryManager,
    session: Option<String>,
    role: &str,
    content: String,
    compress: bool,
    model: Option<String>,
) -> Result<()> {
    let role: Role = role.parse()?;
    let session = session.unwrap_or_else(|| {
        let id = crate::memory::new_session_id();
        println!("Created session {}", id.cyan());
        id
    });

    let number = manager.append_message(&session, role, content)?;
    println!(
        "Stored message {} in session {}",
        number.to_string().green(),
        session.cyan()
    );

    if compress {
        match manager.auto_compress(&session, model.as_deref()).await {
            Some(chunk_index) => {
                println!("Compressed chunk {}", chunk_index.to_string().green())
            }
            None => println!("{}", "No chunk compressed".yellow()),
        }
    }

    Ok(())
}

/// Show a message range
pub async fn show(
    manager: &MemoryManager,
    session: &str,
    start: u64,
    end: Option<u64>,
    summaries: bool,
    compress: bool,
    model: Option<String>,
) -> Result<()> {
    let options = ReadOptions {
        compress_on_read: compress,
        read_stored_summaries: summaries,
        model,
    };
    let entries = manager.load_range(session, start, end, &options).await?;
    print_entries(&entries);
    Ok(())
}

/// Show the most recent messages
pub async fn recent(
    manager: &MemoryManager,
    session: &str,
    count: u64,
    summaries: bool,
    compress: bool,
    model: Option<String>,
) -> Result<()> {
    let options = ReadOptions {
        compress_on_read: compress,
        read_stored_summaries: summaries,
        model,
    };
    let entries = manager.load_recent(session, count, &options).await?;
    print_entries(&entries);
    Ok(())
}

/// Compress the given chunks, reporting per-chunk outcomes
pub async fn compress(
    manager: &MemoryManager,
    session: &str,
    chunks: &[u64],
    model: Option<String>,
    prompt_file: Option<&Path>,
) -> Result<()> {
    let instruction = match prompt_file {
        Some(path) => Some(std::fs::read_to_string(path).map_err(|e| {
            ChronicaError::Config(format!("Failed to read prompt file: {}", e))
        })?),
        None => None,
    };

    let results = manager
        .batch_compress(session, chunks, model.as_deref(), instruction.as_deref())
        .await;

    for (chunk_index, success) in &results {
        if *success {
            println!("chunk {}: {}", chunk_index, "compressed".green());
        } else {
            println!("chunk {}: {}", chunk_index, "failed".red());
        }
    }

    let failed = results.values().filter(|success| !*success).count();
    if failed > 0 {
        println!(
            "{}",
            format!("{} of {} chunks failed", failed, results.len()).yellow()
        );
    }

    Ok(())
}

/// Print session statistics
pub fn stats(manager: &MemoryManager, session: &str) -> Result<()> {
    let stats = manager.get_stats(session)?;

    println!("\nSession {}:", stats.session_id.cyan());
    println!("  messages:          {}", stats.total_messages);
    println!("  chunks:            {}", stats.chunk_count);
    println!("  compressed chunks: {}", stats.compressed_chunks);
    println!("  chunk capacity:    {}", stats.chunk_capacity);
    println!(
        "  created:           {}",
        stats.created_at.format("%Y-%m-%d %H:%M")
    );
    println!(
        "  updated:           {}",
        stats.last_updated.format("%Y-%m-%d %H:%M")
    );
    println!();

    Ok(())
}

/// List known sessions in a table
pub fn sessions(manager: &MemoryManager) -> Result<()> {
    let mut session_ids = manager.list_sessions()?;
    session_ids.sort();

    if session_ids.is_empty() {
        println!("{}", "No sessions found.".yellow());
        return Ok(());
    }

    let mut table = Table::new();
    table.set_format(*format::consts::FORMAT_BORDERS_ONLY);
    table.add_row(prettytable::row![
        "Session".bold(),
        "Messages".bold(),
        "Chunks".bold(),
        "Compressed".bold(),
        "Last Updated".bold()
    ]);

    for session_id in session_ids {
        let stats = manager.get_stats(&session_id)?;
        table.add_row(prettytable::row![
            session_id.cyan(),
            stats.total_messages,
            stats.chunk_count,
            stats.compressed_chunks,
            stats.last_updated.format("%Y-%m-%d %H:%M")
        ]);
    }

    println!();
    table.printstd();
    println!();

    Ok(())
}

/// Search a session's messages
pub fn search(manager: &MemoryManager, session: &str, query: &str, limit: usize) -> Result<()> {
    let hits = manager.search(session, query, limit)?;

    if hits.is_empty() {
        println!("{}", "No matches.".yellow());
        return Ok(());
    }

    for message in hits {
        println!(
            "{} [{}] {}",
            format!("#{}", message.number).green(),
            message.role,
            preview(&message.content, 120)
        );
    }

    Ok(())
}

fn print_entries(entries: &[MemoryEntry]) {
    if entries.is_empty() {
        println!("{}", "No messages.".yellow());
        return;
    }

    for entry in entries {
        match entry {
            MemoryEntry::Raw(message) => {
                println!(
                    "{} [{}] {}",
                    format!("#{}", message.number).green(),
                    message.role,
                    message.content
                );
            }
            MemoryEntry::Summary(summary) => {
                let origin = match summary.source {
                    SummarySource::Stored { chunk_index } => {
                        format!("chunk {}", chunk_index)
                    }
                    SummarySource::Ephemeral => "on-the-fly".to_string(),
                };
                println!(
                    "{} {}",
                    format!(
                        "[summary: {}, {} messages, model {}]",
                        origin, summary.original_count, summary.model
                    )
                    .magenta(),
                    summary.text
                );
            }
        }
    }
}

fn preview(content: &str, max_len: usize) -> String {
    if content.chars().count() <= max_len {
        content.to_string()
    } else {
        let mut truncated: String = content.chars().take(max_len).collect();
        truncated.push_str("...");
        truncated
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preview_short_content_unchanged() {
        assert_eq!(preview("short", 10), "short");
    }

    #[test]
    fn test_preview_truncates_long_content() {
        let long = "y".repeat(200);
        let shown = preview(&long, 10);
        assert_eq!(shown, format!("{}...", "y".repeat(10)));
    }
}
