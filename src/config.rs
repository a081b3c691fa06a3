//! Configuration management for Chronica
//!
//! This module handles loading, parsing, validating, and managing
//! configuration from files, environment variables, and CLI overrides.

use crate::error::{ChronicaError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Main configuration structure for Chronica
///
/// Holds everything the memory engine needs: storage location, chunk
/// partitioning settings, and the table of text-generation models
/// available for compression.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Storage backend configuration
    #[serde(default)]
    pub storage: StorageConfig,

    /// Memory partitioning and compression configuration
    #[serde(default)]
    pub memory: MemoryConfig,

    /// Named text-generation models usable for compression
    ///
    /// The key is a caller-facing label (e.g. "deepseek-chat"); the value
    /// describes how to reach the model. This table is passed explicitly
    /// into the provider registry rather than consulted through any
    /// global lookup.
    #[serde(default)]
    pub models: BTreeMap<String, ModelConfig>,
}

/// Storage backend configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Path to the memory database directory
    ///
    /// When unset, the database lives in the user's data directory
    /// (resolved via `directories::ProjectDirs`).
    #[serde(default)]
    pub path: Option<String>,
}

/// Memory partitioning and compression configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryConfig {
    /// Number of messages per chunk
    #[serde(default = "default_chunk_capacity")]
    pub chunk_capacity: u64,

    /// Default model label used when compression is requested without
    /// an explicit model
    #[serde(default = "default_compression_model")]
    pub compression_model: String,
}

fn default_chunk_capacity() -> u64 {
    100
}

fn default_compression_model() -> String {
    "deepseek-chat".to_string()
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            chunk_capacity: default_chunk_capacity(),
            compression_model: default_compression_model(),
        }
    }
}

/// A single text-generation model entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Model identifier sent to the API (e.g. "deepseek-chat")
    pub model: String,

    /// Base URL of an OpenAI-compatible chat-completions endpoint
    pub base_url: String,

    /// Name of the environment variable holding the API key
    ///
    /// Keys are never stored in the config file itself.
    #[serde(default)]
    pub api_key_env: Option<String>,

    /// Sampling temperature
    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

fn default_temperature() -> f32 {
    0.7
}

impl Config {
    /// Load configuration from a file with environment and CLI overrides
    ///
    /// Missing files fall back to the built-in defaults; overrides are
    /// applied afterwards, so environment and CLI settings always win.
    pub fn load(path: &str, cli: &crate::cli::Cli) -> Result<Self> {
        let mut config = if Path::new(path).exists() {
            Self::from_file(path)?
        } else {
            tracing::warn!("Config file not found at {}, using defaults", path);
            Self::default_config()
        };

        config.apply_env_vars();
        config.apply_cli_overrides(cli);

        Ok(config)
    }

    fn default_config() -> Self {
        let mut models = BTreeMap::new();
        models.insert(
            "deepseek-chat".to_string(),
            ModelConfig {
                model: "deepseek-chat".to_string(),
                base_url: "https://api.deepseek.com/v1".to_string(),
                api_key_env: Some("DEEPSEEK_API_KEY".to_string()),
                temperature: default_temperature(),
            },
        );

        Self {
            storage: StorageConfig::default(),
            memory: MemoryConfig::default(),
            models,
        }
    }

    fn from_file(path: &str) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ChronicaError::Config(format!("Failed to read config file: {}", e)))?;
        serde_yaml::from_str(&contents)
            .map_err(|e| ChronicaError::Config(format!("Failed to parse config: {}", e)).into())
    }

    fn apply_env_vars(&mut self) {
        if let Ok(db_path) = std::env::var("CHRONICA_MEMORY_DB") {
            self.storage.path = Some(db_path);
        }

        if let Ok(capacity) = std::env::var("CHRONICA_CHUNK_CAPACITY") {
            match capacity.parse::<u64>() {
                Ok(value) => self.memory.chunk_capacity = value,
                Err(_) => {
                    tracing::warn!("Ignoring non-numeric CHRONICA_CHUNK_CAPACITY: {}", capacity)
                }
            }
        }

        if let Ok(model) = std::env::var("CHRONICA_COMPRESSION_MODEL") {
            self.memory.compression_model = model;
        }
    }

    fn apply_cli_overrides(&mut self, cli: &crate::cli::Cli) {
        if let Some(path) = &cli.storage_path {
            self.storage.path = Some(path.clone());
        }
    }

    /// Validate the configuration
    ///
    /// # Errors
    ///
    /// Returns `ChronicaError::Config` describing the first invalid field.
    pub fn validate(&self) -> Result<()> {
        if self.memory.chunk_capacity == 0 {
            return Err(ChronicaError::Config(
                "memory.chunk_capacity must be greater than 0".to_string(),
            )
            .into());
        }

        if self.memory.compression_model.is_empty() {
            return Err(ChronicaError::Config(
                "memory.compression_model cannot be empty".to_string(),
            )
            .into());
        }

        for (label, model) in &self.models {
            if model.model.is_empty() {
                return Err(ChronicaError::Config(format!(
                    "models.{}: model identifier cannot be empty",
                    label
                ))
                .into());
            }

            if model.base_url.is_empty() {
                return Err(ChronicaError::Config(format!(
                    "models.{}: base_url cannot be empty",
                    label
                ))
                .into());
            }

            if !(0.0..=2.0).contains(&model.temperature) {
                return Err(ChronicaError::Config(format!(
                    "models.{}: temperature must be between 0.0 and 2.0",
                    label
                ))
                .into());
            }
        }

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::default_config()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.memory.chunk_capacity, 100);
        assert!(config.models.contains_key("deepseek-chat"));
    }

    #[test]
    fn test_validate_rejects_zero_capacity() {
        let mut config = Config::default();
        config.memory.chunk_capacity = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("chunk_capacity"));
    }

    #[test]
    fn test_validate_rejects_empty_compression_model() {
        let mut config = Config::default();
        config.memory.compression_model = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_empty_base_url() {
        let mut config = Config::default();
        config.models.insert(
            "broken".to_string(),
            ModelConfig {
                model: "m".to_string(),
                base_url: String::new(),
                api_key_env: None,
                temperature: 0.7,
            },
        );
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("base_url"));
    }

    #[test]
    fn test_validate_rejects_out_of_range_temperature() {
        let mut config = Config::default();
        config.models.insert(
            "hot".to_string(),
            ModelConfig {
                model: "m".to_string(),
                base_url: "http://localhost".to_string(),
                api_key_env: None,
                temperature: 3.0,
            },
        );
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_parse_yaml_config() {
        let yaml = r#"
memory:
  chunk_capacity: 50
  compression_model: local
models:
  local:
    model: llama3
    base_url: http://localhost:11434/v1
"#;
        let config: Config = serde_yaml::from_str(yaml).expect("parse failed");
        assert_eq!(config.memory.chunk_capacity, 50);
        assert_eq!(config.memory.compression_model, "local");
        let local = config.models.get("local").expect("model entry");
        assert_eq!(local.model, "llama3");
        assert!((local.temperature - 0.7).abs() < f32::EPSILON);
        assert!(local.api_key_env.is_none());
    }

    #[test]
    #[serial]
    fn test_env_override_storage_path() {
        std::env::set_var("CHRONICA_MEMORY_DB", "/tmp/override.db");
        let mut config = Config::default();
        config.apply_env_vars();
        assert_eq!(config.storage.path.as_deref(), Some("/tmp/override.db"));
        std::env::remove_var("CHRONICA_MEMORY_DB");
    }

    #[test]
    #[serial]
    fn test_env_override_ignores_bad_capacity() {
        std::env::set_var("CHRONICA_CHUNK_CAPACITY", "not-a-number");
        let mut config = Config::default();
        config.apply_env_vars();
        assert_eq!(config.memory.chunk_capacity, 100);
        std::env::remove_var("CHRONICA_CHUNK_CAPACITY");
    }
}
