//! Chronica - chunked conversation memory CLI
//!
//! Main entry point wiring configuration, storage, and providers into
//! the memory manager, then dispatching to the command handlers.

use anyhow::Result;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use chronica::cli::{Cli, Commands};
use chronica::commands;
use chronica::config::Config;
use chronica::memory::{MemoryManager, SledMemoryStore};
use chronica::providers::ProviderRegistry;

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let cli = Cli::parse_args();

    let config_path = cli.config.as_deref().unwrap_or("config/config.yaml");
    let config = Config::load(config_path, &cli)?;
    config.validate()?;

    let store = SledMemoryStore::open(&config.storage)?;
    let registry = ProviderRegistry::from_config(&config);
    let manager = MemoryManager::new(Arc::new(store), Arc::new(registry), &config.memory);

    match cli.command {
        Commands::Append {
            session,
            role,
            content,
            compress,
            model,
        } => commands::append(&manager, session, &role, content, compress, model).await,
        Commands::Show {
            session,
            start,
            end,
            summaries,
            compress,
            model,
        } => commands::show(&manager, &session, start, end, summaries, compress, model).await,
        Commands::Recent {
            session,
            count,
            summaries,
            compress,
            model,
        } => commands::recent(&manager, &session, count, summaries, compress, model).await,
        Commands::Compress {
            session,
            chunks,
            model,
            prompt_file,
        } => {
            commands::compress(&manager, &session, &chunks, model, prompt_file.as_deref()).await
        }
        Commands::Stats { session } => commands::stats(&manager, &session),
        Commands::Sessions => commands::sessions(&manager),
        Commands::Search {
            session,
            query,
            limit,
        } => commands::search(&manager, &session, &query, limit),
    }
}

/// Initialize tracing subscriber with environment filter
fn init_tracing() {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("chronica=info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}
