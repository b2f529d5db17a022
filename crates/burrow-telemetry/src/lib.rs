//! Burrow Telemetry - Logging and session tracing for the Burrow FTP driver.
//!
//! This crate provides:
//! - Configurable `tracing-subscriber` setup with pretty, compact or JSON output
//! - Rolling file output through `tracing-appender`
//! - A per-connection [`SessionContext`] for log correlation
//!
//! # Example
//!
//! ```rust,no_run
//! use burrow_telemetry::{LogConfig, LogFormat, SessionContext, setup_logging};
//!
//! # fn main() -> Result<(), burrow_telemetry::TelemetryError> {
//! let config = LogConfig::new("info")
//!     .with_format(LogFormat::Compact)
//!     .with_directive("burrow_vfs=debug");
//!
//! setup_logging(&config)?;
//!
//! let mut ctx = SessionContext::new();
//! ctx.set_username("alice");
//! let _guard = ctx.span().entered();
//! tracing::info!("client connected");
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

mod context;
mod error;
mod logging;

pub use context::SessionContext;
pub use error::{TelemetryError, TelemetryResult};
pub use logging::{FileRotation, LogConfig, LogFormat, LogTarget, setup_default_logging, setup_logging};
