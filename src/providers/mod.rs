//! Text-generation providers for Chronica
//!
//! The summarizer receives its generation capability through the
//! `TextGenerator` trait; this module holds the trait, the
//! OpenAI-compatible implementation, and the registry that turns the
//! config model table into ready-to-use generators.

pub mod base;
pub mod openai;

pub use base::{ChatMessage, TextGenerator};
pub use openai::OpenAiCompatGenerator;

use crate::config::Config;
use crate::error::{ChronicaError, Result};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// Registry of text generators keyed by model label
///
/// Built from the explicit model table in [`Config`]; generators are
/// constructed lazily on first use and cached. Test doubles can be
/// registered with [`ProviderRegistry::insert`] and resolve exactly like
/// configured models, which keeps the summarizer and facade free of any
/// test-specific wiring.
pub struct ProviderRegistry {
    models: HashMap<String, crate::config::ModelConfig>,
    generators: RwLock<HashMap<String, Arc<dyn TextGenerator>>>,
}

impl ProviderRegistry {
    /// Build a registry from the configuration's model table
    pub fn from_config(config: &Config) -> Self {
        Self {
            models: config.models.clone().into_iter().collect(),
            generators: RwLock::new(HashMap::new()),
        }
    }

    /// Create an empty registry
    ///
    /// Useful for embedding callers that register generators directly.
    pub fn empty() -> Self {
        Self {
            models: HashMap::new(),
            generators: RwLock::new(HashMap::new()),
        }
    }

    /// Register a generator under a label, replacing any existing entry
    pub fn insert(&self, label: impl Into<String>, generator: Arc<dyn TextGenerator>) {
        let mut generators = self
            .generators
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        generators.insert(label.into(), generator);
    }

    /// Resolve a generator by model label
    ///
    /// # Errors
    ///
    /// Returns `ChronicaError::Provider` if the label is neither
    /// registered nor present in the config model table, or if the
    /// generator cannot be constructed (e.g. a missing API key variable).
    pub fn resolve(&self, label: &str) -> Result<Arc<dyn TextGenerator>> {
        {
            let generators = self.generators.read().map_err(|_| {
                ChronicaError::Provider("Failed to acquire read lock on registry".to_string())
            })?;
            if let Some(generator) = generators.get(label) {
                return Ok(Arc::clone(generator));
            }
        }

        let model_config = self.models.get(label).ok_or_else(|| {
            ChronicaError::Provider(format!("Unknown model label: {}", label))
        })?;

        let generator: Arc<dyn TextGenerator> =
            Arc::new(OpenAiCompatGenerator::new(label, model_config)?);

        let mut generators = self.generators.write().map_err(|_| {
            ChronicaError::Provider("Failed to acquire write lock on registry".to_string())
        })?;
        generators.insert(label.to_string(), Arc::clone(&generator));

        Ok(generator)
    }

    /// Labels known to this registry (configured or directly registered)
    pub fn labels(&self) -> Vec<String> {
        let generators = self
            .generators
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let mut labels: Vec<String> = self
            .models
            .keys()
            .chain(generators.keys())
            .cloned()
            .collect();
        labels.sort();
        labels.dedup();
        labels
    }
}
