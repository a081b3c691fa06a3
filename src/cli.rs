//! Command-line interface definition for Chronica
//!
//! This module defines the CLI structure using clap's derive API,
//! providing commands for appending, reading, compressing, and
//! inspecting session memory.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Chronica - chunked conversation memory engine
///
/// Append-only session memory partitioned into fixed-size chunks, with
/// on-demand summary compression through configured model endpoints.
#[derive(Parser, Debug, Clone)]
#[command(name = "chronica")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/config.yaml")]
    pub config: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Override the memory database path
    #[arg(long, env = "CHRONICA_MEMORY_DB")]
    pub storage_path: Option<String>,

    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands for Chronica
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Append a message to a session
    Append {
        /// Session id; a fresh ULID session is created when omitted
        #[arg(short, long)]
        session: Option<String>,

        /// Message role (user, assistant, system)
        #[arg(short, long, default_value = "user")]
        role: String,

        /// Message content
        content: String,

        /// Opportunistically compress the newest uncompressed chunk
        /// after appending
        #[arg(long)]
        compress: bool,

        /// Model label for compression (defaults to the configured one)
        #[arg(short, long)]
        model: Option<String>,
    },

    /// Show a message range from a session
    Show {
        /// Session id
        #[arg(short, long)]
        session: String,

        /// First message number
        #[arg(long, default_value_t = 1)]
        start: u64,

        /// Last message number (defaults to the session total)
        #[arg(long)]
        end: Option<u64>,

        /// Read stored chunk summaries instead of raw messages
        #[arg(long)]
        summaries: bool,

        /// Summarize the loaded range on the fly (not persisted)
        #[arg(long)]
        compress: bool,

        /// Model label for on-the-fly compression
        #[arg(short, long)]
        model: Option<String>,
    },

    /// Show the most recent messages of a session
    Recent {
        /// Session id
        #[arg(short, long)]
        session: String,

        /// Number of messages
        #[arg(short = 'n', long, default_value_t = 20)]
        count: u64,

        /// Read stored chunk summaries instead of raw messages
        #[arg(long)]
        summaries: bool,

        /// Summarize the loaded range on the fly (not persisted)
        #[arg(long)]
        compress: bool,

        /// Model label for on-the-fly compression
        #[arg(short, long)]
        model: Option<String>,
    },

    /// Compress one or more chunks into stored summaries
    Compress {
        /// Session id
        #[arg(short, long)]
        session: String,

        /// Chunk indices to compress
        #[arg(required = true)]
        chunks: Vec<u64>,

        /// Model label (defaults to the configured compression model)
        #[arg(short, long)]
        model: Option<String>,

        /// File holding a custom instruction template ({history} is
        /// replaced with the transcript)
        #[arg(long)]
        prompt_file: Option<PathBuf>,
    },

    /// Show statistics for a session
    Stats {
        /// Session id
        #[arg(short, long)]
        session: String,
    },

    /// List known sessions
    Sessions,

    /// Search a session's messages
    Search {
        /// Session id
        #[arg(short, long)]
        session: String,

        /// Substring to look for (case-insensitive)
        query: String,

        /// Maximum number of hits
        #[arg(short = 'n', long, default_value_t = 10)]
        limit: usize,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parse_append() {
        let cli = Cli::try_parse_from(["chronica", "append", "--session", "s1", "hello there"])
            .expect("parse failed");
        if let Commands::Append {
            session,
            role,
            content,
            compress,
            model,
        } = cli.command
        {
            assert_eq!(session, Some("s1".to_string()));
            assert_eq!(role, "user");
            assert_eq!(content, "hello there");
            assert!(!compress);
            assert!(model.is_none());
        } else {
            panic!("Expected Append command");
        }
    }

    #[test]
    fn test_cli_parse_show_defaults() {
        let cli =
            Cli::try_parse_from(["chronica", "show", "--session", "s1"]).expect("parse failed");
        if let Commands::Show {
            start,
            end,
            summaries,
            compress,
            ..
        } = cli.command
        {
            assert_eq!(start, 1);
            assert_eq!(end, None);
            assert!(!summaries);
            assert!(!compress);
        } else {
            panic!("Expected Show command");
        }
    }

    #[test]
    fn test_cli_parse_compress_multiple_chunks() {
        let cli = Cli::try_parse_from(["chronica", "compress", "--session", "s1", "1", "2", "3"])
            .expect("parse failed");
        if let Commands::Compress { chunks, .. } = cli.command {
            assert_eq!(chunks, vec![1, 2, 3]);
        } else {
            panic!("Expected Compress command");
        }
    }

    #[test]
    fn test_cli_parse_compress_requires_chunks() {
        let cli = Cli::try_parse_from(["chronica", "compress", "--session", "s1"]);
        assert!(cli.is_err());
    }

    #[test]
    fn test_cli_parse_recent_count() {
        let cli = Cli::try_parse_from(["chronica", "recent", "--session", "s1", "-n", "5"])
            .expect("parse failed");
        if let Commands::Recent { count, .. } = cli.command {
            assert_eq!(count, 5);
        } else {
            panic!("Expected Recent command");
        }
    }

    #[test]
    fn test_cli_parse_sessions() {
        let cli = Cli::try_parse_from(["chronica", "sessions"]).expect("parse failed");
        assert!(matches!(cli.command, Commands::Sessions));
    }
}
