//! Configuration validation.
//!
//! Checks value ranges and cross-field invariants. Root directories are only
//! checked syntactically; their existence is the driver's concern at use time.

use std::collections::HashSet;

use crate::error::{ConfigError, ConfigResult};
use crate::types::Config;

/// Validate a deserialized configuration.
///
/// # Errors
///
/// Returns the first validation error found.
pub fn validate(config: &Config) -> ConfigResult<()> {
    validate_server(config)?;
    validate_logging(config)?;
    validate_users(config)?;
    Ok(())
}

fn invalid(field: impl Into<String>, message: impl Into<String>) -> ConfigError {
    ConfigError::ValidationError {
        field: field.into(),
        message: message.into(),
    }
}

fn validate_server(config: &Config) -> ConfigResult<()> {
    let s = &config.server;

    if s.host.trim().is_empty() {
        return Err(invalid("server.host", "host must not be empty"));
    }

    if s.port == 0 {
        return Err(invalid("server.port", "port must be between 1 and 65535"));
    }

    let range = s.passive_ports;
    if range.low == 0 || range.low > range.high {
        return Err(invalid(
            "server.passive_ports",
            format!(
                "passive port range {}-{} is empty or starts at 0",
                range.low, range.high
            ),
        ));
    }

    if (range.low..=range.high).contains(&s.port) {
        return Err(invalid(
            "server.passive_ports",
            format!("control port {} lies inside the passive range", s.port),
        ));
    }

    Ok(())
}

fn validate_logging(config: &Config) -> ConfigResult<()> {
    let l = &config.logging;

    if l.level.trim().is_empty() {
        return Err(invalid("logging.level", "level must not be empty"));
    }

    if !matches!(l.format.as_str(), "pretty" | "compact" | "json") {
        return Err(invalid(
            "logging.format",
            format!(
                "unsupported format '{}'; expected one of: pretty, compact, json",
                l.format
            ),
        ));
    }

    Ok(())
}

fn validate_users(config: &Config) -> ConfigResult<()> {
    if config.users.is_empty() {
        tracing::warn!("no users configured; every login will be refused");
    }

    let mut seen = HashSet::new();
    for (i, user) in config.users.iter().enumerate() {
        if user.username.is_empty() {
            return Err(invalid(
                format!("users[{i}].username"),
                "username must not be empty",
            ));
        }
        if !seen.insert(user.username.as_str()) {
            return Err(invalid(
                format!("users[{i}].username"),
                format!("duplicate username '{}'", user.username),
            ));
        }
        if !user.root.is_absolute() {
            return Err(invalid(
                format!("users[{i}].root"),
                format!("root '{}' must be an absolute path", user.root.display()),
            ));
        }
    }

    Ok(())
}
