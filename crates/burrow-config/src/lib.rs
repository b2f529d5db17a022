#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
//! Configuration for the Burrow FTP driver.
//!
//! Holds the listener settings handed to the protocol engine, logging
//! settings, and the account list that becomes the driver's user registry.
//!
//! # Usage
//!
//! ```rust,no_run
//! use burrow_config::Config;
//!
//! let config = Config::load_file(std::path::Path::new("burrow.toml")).unwrap();
//! println!("{} accounts, listening on {}:{}", config.users.len(), config.server.host, config.server.port);
//! ```
//!
//! # Design
//!
//! This crate has **no dependencies on other internal burrow crates**.
//! Conversion into driver and telemetry types happens in those crates.

/// Configuration error types.
pub mod error;
/// Configuration file discovery and loading.
pub mod loader;
/// Configuration struct definitions.
pub mod types;
/// Configuration validation rules.
pub mod validate;

pub use error::{ConfigError, ConfigResult};
pub use loader::LoadedConfig;
pub use types::*;

impl Config {
    /// Discover and load configuration from the home directory.
    ///
    /// See [`loader::load`] for the search order.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if a discovered file is malformed or the
    /// configuration fails validation.
    pub fn load(home_override: Option<&std::path::Path>) -> ConfigResult<LoadedConfig> {
        loader::load(home_override)
    }

    /// Load configuration from a single file.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the file cannot be read, parsed, or fails
    /// validation.
    pub fn load_file(path: &std::path::Path) -> ConfigResult<Self> {
        loader::load_file(path)
    }
}
