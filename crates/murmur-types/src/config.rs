//! Configuration types, deserialized from `~/.murmur/config.toml`.

use crate::error::{MurmurError, MurmurResult};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Default read threshold: minimum similarity to reuse a stored answer.
pub const DEFAULT_SIMILARITY_THRESHOLD: f32 = 0.85;

/// Default write threshold: similarity at which a new vector is considered a
/// near-duplicate and not written.
pub const DEFAULT_ADMISSION_THRESHOLD: f32 = 0.98;

/// Default number of neighbors fetched per semantic query.
pub const DEFAULT_TOP_K: usize = 5;

/// Default freshness window for cached per-user data (15 minutes).
pub const DEFAULT_USER_CACHE_TTL_SECS: u64 = 900;

/// Returns the Murmur home directory (`~/.murmur`).
pub fn murmur_home() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join(".murmur")
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MurmurConfig {
    /// Tiered memory settings.
    pub memory: MemoryConfig,
    /// Embedding provider settings.
    pub embedding: EmbeddingSettings,
}

impl MurmurConfig {
    /// Check cross-field constraints.
    pub fn validate(&self) -> MurmurResult<()> {
        self.memory.validate()
    }
}

/// Tiered memory settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryConfig {
    /// Minimum similarity for a semantic hit on lookup (inclusive).
    pub similarity_threshold: f32,
    /// Minimum similarity for a neighbor to suppress a vector write (inclusive).
    pub admission_threshold: f32,
    /// Neighbors fetched per semantic query.
    pub top_k: usize,
    /// Freshness window for cached per-user data. Zero disables the cache.
    pub user_cache_ttl_secs: u64,
    /// SQLite database path. Defaults to `~/.murmur/memory.db`.
    pub db_path: Option<PathBuf>,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: DEFAULT_SIMILARITY_THRESHOLD,
            admission_threshold: DEFAULT_ADMISSION_THRESHOLD,
            top_k: DEFAULT_TOP_K,
            user_cache_ttl_secs: DEFAULT_USER_CACHE_TTL_SECS,
            db_path: None,
        }
    }
}

impl MemoryConfig {
    /// Resolved database path.
    pub fn resolved_db_path(&self) -> PathBuf {
        self.db_path
            .clone()
            .unwrap_or_else(|| murmur_home().join("memory.db"))
    }

    /// Thresholds must lie in [0, 1], the write threshold must not be looser
    /// than the read threshold, and at least one neighbor must be fetched.
    pub fn validate(&self) -> MurmurResult<()> {
        for (name, value) in [
            ("similarity_threshold", self.similarity_threshold),
            ("admission_threshold", self.admission_threshold),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(MurmurError::Config(format!(
                    "memory.{name} must be within [0, 1], got {value}"
                )));
            }
        }
        if self.admission_threshold < self.similarity_threshold {
            return Err(MurmurError::Config(format!(
                "memory.admission_threshold ({}) must not be below memory.similarity_threshold ({})",
                self.admission_threshold, self.similarity_threshold
            )));
        }
        if self.top_k == 0 {
            return Err(MurmurError::Config(
                "memory.top_k must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Embedding provider settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingSettings {
    /// Provider name (`local`, `openai`, `ollama`, ...).
    pub provider: String,
    /// Model name.
    pub model: String,
    /// Environment variable holding the API key. Empty for keyless providers.
    pub api_key_env: String,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            provider: "local".to_string(),
            model: "hash-384".to_string(),
            api_key_env: String::new(),
        }
    }
}
