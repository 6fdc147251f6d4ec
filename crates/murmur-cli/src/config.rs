//! Configuration loading for the `murmur` binary.

use murmur_types::config::{murmur_home, MurmurConfig};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

pub fn default_config_path() -> PathBuf {
    murmur_home().join("config.toml")
}

/// Load configuration from `path` (or `~/.murmur/config.toml`).
///
/// A missing file yields defaults. An unreadable or malformed file is logged
/// and also yields defaults; semantic checks happen later in `validate()`.
pub fn load_config(path: Option<&Path>) -> MurmurConfig {
    let config_path = path
        .map(|p| p.to_path_buf())
        .unwrap_or_else(default_config_path);

    if !config_path.exists() {
        info!(path = %config_path.display(), "Config file not found, using defaults");
        return MurmurConfig::default();
    }

    match std::fs::read_to_string(&config_path) {
        Ok(contents) => match toml::from_str::<MurmurConfig>(&contents) {
            Ok(config) => {
                info!(path = %config_path.display(), "Loaded configuration");
                config
            }
            Err(e) => {
                warn!(
                    error = %e,
                    path = %config_path.display(),
                    "Failed to parse config, using defaults"
                );
                MurmurConfig::default()
            }
        },
        Err(e) => {
            warn!(
                error = %e,
                path = %config_path.display(),
                "Failed to read config file, using defaults"
            );
            MurmurConfig::default()
        }
    }
}
