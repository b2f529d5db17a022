//! Burrow storage driver for FTP protocol engines.
//!
//! A protocol engine asks a [`DriverFactory`] for one [`FtpDriver`] per
//! connection, authenticates it once, then issues filesystem operations that
//! are confined to the authenticated user's root directory.
//!
//! # Example
//!
//! ```rust,no_run
//! use burrow_driver::{DriverFactory, FsDriverFactory, FtpDriver, UserRecord, UserRegistry};
//!
//! # async fn run() -> Result<(), burrow_driver::DriverError> {
//! let registry = UserRegistry::new([UserRecord::new("alice", "secret", "/srv/ftp/alice")])?;
//! let factory = FsDriverFactory::new(registry);
//!
//! let mut driver = factory.new_driver()?;
//! if driver.authenticate("alice", "secret") {
//!     let listing = driver.list_directory("/").await;
//!     println!("{listing:?}");
//! }
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

/// Credential registry and session state.
pub mod auth;
/// Driver and factory traits consumed by protocol engines.
pub mod driver;
/// Driver construction errors.
pub mod error;
/// Host filesystem driver.
pub mod fs;

pub use auth::{Session, UserRecord, UserRegistry};
pub use driver::{DriverFactory, FtpDriver};
pub use error::{DriverError, DriverResult};
pub use fs::{FsDriver, FsDriverFactory};

pub use burrow_vfs::{EntryKind, FileReader, VfsDirEntry};
