//! Configuration struct definitions.

use std::path::PathBuf;

use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize};

/// Top-level Burrow configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Listener settings handed to the protocol engine.
    pub server: ServerSection,
    /// Logging settings.
    pub logging: LoggingSection,
    /// Configured accounts.
    pub users: Vec<UserSection>,
}

/// Listener settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSection {
    /// Address to bind the control connection to.
    pub host: String,
    /// Control connection port.
    pub port: u16,
    /// Name announced in the greeting banner.
    pub name: String,
    /// Port range for passive data connections.
    pub passive_ports: PassivePortRange,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_owned(),
            port: 2121,
            name: "Burrow FTP server".to_owned(),
            passive_ports: PassivePortRange::default(),
        }
    }
}

/// Inclusive port range for passive data connections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PassivePortRange {
    /// Lowest port.
    pub low: u16,
    /// Highest port.
    pub high: u16,
}

impl Default for PassivePortRange {
    fn default() -> Self {
        Self {
            low: 42000,
            high: 45000,
        }
    }
}

/// Logging settings, converted to a subscriber config by `burrow-telemetry`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Level filter (e.g. "info", "burrow_vfs=debug").
    pub level: String,
    /// One of "pretty", "compact" or "json".
    pub format: String,
    /// Write rolling log files here instead of stderr.
    pub directory: Option<PathBuf>,
    /// Extra filter directives.
    pub directives: Vec<String>,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "info".to_owned(),
            format: "pretty".to_owned(),
            directory: None,
            directives: Vec::new(),
        }
    }
}

/// One FTP account.
///
/// `Debug` and `Serialize` never expose the password.
#[derive(Clone, Deserialize)]
pub struct UserSection {
    /// Login name.
    pub username: String,
    /// Plaintext password.
    pub password: String,
    /// Directory the account is confined to.
    pub root: PathBuf,
}

impl std::fmt::Debug for UserSection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserSection")
            .field("username", &self.username)
            .field("has_password", &!self.password.is_empty())
            .field("root", &self.root)
            .finish()
    }
}

impl Serialize for UserSection {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("UserSection", 2)?;
        state.serialize_field("username", &self.username)?;
        // password is intentionally omitted.
        state.serialize_field("root", &self.root)?;
        state.end()
    }
}

/// The JSON layout of `~/.easyftp` files written for the earlier server.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct LegacyConfig {
    #[serde(default)]
    host: Option<String>,
    #[serde(default)]
    port: Option<u16>,
    #[serde(default)]
    users: Vec<LegacyUser>,
}

#[derive(Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct LegacyUser {
    username: String,
    password: String,
    fs_root: PathBuf,
}

impl std::fmt::Debug for LegacyUser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LegacyUser")
            .field("username", &self.username)
            .field("fs_root", &self.fs_root)
            .finish_non_exhaustive()
    }
}

impl From<LegacyConfig> for Config {
    fn from(legacy: LegacyConfig) -> Self {
        let defaults = ServerSection::default();
        Self {
            server: ServerSection {
                host: legacy.host.unwrap_or(defaults.host),
                port: legacy.port.unwrap_or(defaults.port),
                ..ServerSection::default()
            },
            logging: LoggingSection::default(),
            users: legacy
                .users
                .into_iter()
                .map(|u| UserSection {
                    username: u.username,
                    password: u.password,
                    root: u.fs_root,
                })
                .collect(),
        }
    }
}
