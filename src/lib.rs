//! Chronica - chunked conversation memory engine
//!
//! This library stores an unbounded, append-only stream of conversation
//! messages per session, partitioned into fixed-capacity chunks, and can
//! collapse chunks into short summaries through an injected
//! text-generation capability.
//!
//! # Architecture
//!
//! - `memory`: addressing math, chunk/index/summary storage, the
//!   summarizer, and the `MemoryManager` facade
//! - `providers`: the `TextGenerator` capability, an OpenAI-compatible
//!   implementation, and the model registry
//! - `config`: configuration management and validation
//! - `error`: error types and result aliases
//! - `cli` / `commands`: command-line interface
//!
//! # Example
//!
//! ```no_run
//! use chronica::config::Config;
//! use chronica::memory::{MemoryManager, ReadOptions, Role, SledMemoryStore};
//! use chronica::providers::ProviderRegistry;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::default();
//!     let store = SledMemoryStore::open(&config.storage)?;
//!     let registry = ProviderRegistry::from_config(&config);
//!     let manager = MemoryManager::new(Arc::new(store), Arc::new(registry), &config.memory);
//!
//!     manager.append_message("story-1", Role::User, "Begin chapter one.")?;
//!     let history = manager
//!         .load_recent("story-1", 20, &ReadOptions::default())
//!         .await?;
//!     println!("{} entries", history.len());
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod memory;
pub mod providers;

// Re-export commonly used types
pub use config::Config;
pub use error::{ChronicaError, Result};
pub use memory::{MemoryEntry, MemoryManager, ReadOptions, Role, SessionStats, StoredMessage};
