//! Contract between the FTP protocol engine and a storage driver.

use std::time::SystemTime;

use async_trait::async_trait;
use burrow_vfs::{FileReader, VfsDirEntry};
use tokio::io::AsyncRead;

use crate::error::DriverResult;

/// Operations a protocol engine invokes on behalf of one connection.
///
/// Results are deliberately coarse: the engine maps every negative result to
/// its generic "action not taken" reply, so implementations report failure as
/// `false` or `None` and never panic on missing files or denied access.
///
/// Methods are called sequentially within a connection. Nothing but
/// [`authenticate`](FtpDriver::authenticate) may be relied on before a
/// successful authentication; implementations fail every operation until then.
#[async_trait]
pub trait FtpDriver: Send + Sync {
    /// Check credentials and bind the session to the matching account.
    fn authenticate(&mut self, username: &str, password: &str) -> bool;

    /// Byte length of the entry at `path`, `None` if it cannot be stat'ed.
    async fn size(&self, path: &str) -> Option<u64>;

    /// Modification time of the entry at `path`, `None` if it is absent.
    async fn modified_time(&self, path: &str) -> Option<SystemTime>;

    /// True iff `path` exists and is a directory.
    async fn is_directory(&self, path: &str) -> bool;

    /// Entries of the directory at `path`, `None` on any read failure.
    async fn list_directory(&self, path: &str) -> Option<Vec<VfsDirEntry>>;

    /// Remove a directory and its contents. True only if the removal succeeded.
    async fn remove_directory_recursive(&self, path: &str) -> bool;

    /// Remove a single file.
    async fn remove_file(&self, path: &str) -> bool;

    /// Rename `from` to `to`; both stay inside the sandbox.
    async fn rename(&self, from: &str, to: &str) -> bool;

    /// Create `path` and any missing parents. Succeeds if it already exists.
    async fn make_directory_path(&self, path: &str) -> bool;

    /// Open the file at `path` for download, positioned at `offset`.
    async fn open_for_read(&self, path: &str, offset: u64) -> Option<FileReader>;

    /// Create or truncate `path` and stream `source` into it until exhausted.
    ///
    /// Returns false if the file cannot be created or the copy fails partway.
    async fn open_for_write(&self, path: &str, source: &mut (dyn AsyncRead + Send + Unpin)) -> bool;
}

/// Produces one independent driver per client connection.
pub trait DriverFactory: Send + Sync {
    /// Create a fresh, unauthenticated driver.
    ///
    /// # Errors
    ///
    /// Returns a [`DriverError`](crate::DriverError) if the driver cannot be
    /// assembled.
    fn new_driver(&self) -> DriverResult<Box<dyn FtpDriver>>;
}
