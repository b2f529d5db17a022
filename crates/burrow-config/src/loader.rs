//! Config file discovery and loading.
//!
//! `Config::load()` looks in the home directory for, in order:
//! 1. `~/.burrow/config.toml`
//! 2. `~/.easyftp` (legacy JSON layout)
//!
//! and falls back to built-in defaults when neither exists.

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::error::{ConfigError, ConfigResult};
use crate::types::{Config, LegacyConfig};
use crate::validate;

/// Maximum allowed config file size (1 MB).
const MAX_CONFIG_FILE_SIZE: u64 = 1_048_576;

/// Result of a discovery-based load.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    /// The validated configuration.
    pub config: Config,
    /// File the configuration came from, `None` for built-in defaults.
    pub source: Option<PathBuf>,
}

/// Discover and load the user's configuration.
///
/// `home_override` replaces the detected home directory.
///
/// # Errors
///
/// Returns a [`ConfigError`] if the home directory cannot be determined, a
/// discovered file is malformed, or validation fails.
pub fn load(home_override: Option<&Path>) -> ConfigResult<LoadedConfig> {
    let home = match home_override {
        Some(h) => h.to_path_buf(),
        None => home_directory()?,
    };

    let candidates = [
        home.join(".burrow").join("config.toml"),
        home.join(".easyftp"),
    ];

    for path in candidates {
        if let Some(content) = try_read(&path)? {
            let config = parse(&path, &content)?;
            validate::validate(&config)?;
            info!(
                path = %path.display(),
                users = config.users.len(),
                "loaded config"
            );
            return Ok(LoadedConfig {
                config,
                source: Some(path),
            });
        }
    }

    info!("no config file found, using defaults");
    let config = Config::default();
    validate::validate(&config)?;
    Ok(LoadedConfig {
        config,
        source: None,
    })
}

/// Load a config from a specific file path.
///
/// Files ending in `.json`, and the legacy `.easyftp` file, are read with the
/// legacy JSON layout; everything else is TOML.
///
/// # Errors
///
/// Returns a [`ConfigError`] if the file cannot be read, parsed, or fails
/// validation.
pub fn load_file(path: &Path) -> ConfigResult<Config> {
    let content = try_read(path)?.ok_or_else(|| ConfigError::ReadError {
        path: path.display().to_string(),
        source: std::io::Error::from(std::io::ErrorKind::NotFound),
    })?;

    let config = parse(path, &content)?;
    validate::validate(&config)?;
    Ok(config)
}

fn is_legacy_json(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == "json")
        || path.file_name().is_some_and(|name| name == ".easyftp")
}

fn parse(path: &Path, content: &str) -> ConfigResult<Config> {
    if is_legacy_json(path) {
        let legacy: LegacyConfig =
            serde_json::from_str(content).map_err(|e| ConfigError::JsonError {
                path: path.display().to_string(),
                source: e,
            })?;
        return Ok(legacy.into());
    }

    toml::from_str(content).map_err(|e| ConfigError::ParseError {
        path: path.display().to_string(),
        source: e,
    })
}

/// Read a file, returning `None` if it doesn't exist.
///
/// Uses a single read operation to avoid TOCTOU races (no separate
/// exists/metadata checks before reading).
fn try_read(path: &Path) -> ConfigResult<Option<String>> {
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "config file not found, skipping");
            return Ok(None);
        },
        Err(e) => {
            return Err(ConfigError::ReadError {
                path: path.display().to_string(),
                source: e,
            });
        },
    };

    if content.len() as u64 > MAX_CONFIG_FILE_SIZE {
        return Err(ConfigError::ValidationError {
            field: path.display().to_string(),
            message: format!(
                "config file is {} bytes, exceeding the {} byte limit",
                content.len(),
                MAX_CONFIG_FILE_SIZE
            ),
        });
    }

    Ok(Some(content))
}

/// Determine the user's home directory.
fn home_directory() -> ConfigResult<PathBuf> {
    directories::BaseDirs::new()
        .map(|d| d.home_dir().to_path_buf())
        .ok_or(ConfigError::NoHomeDir)
}
