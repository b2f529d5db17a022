//! Burrow Virtual File System (VFS).
//!
//! Confines filesystem operations to a per-user root directory on the host.
//! Every operation resolves the client's logical path lexically, verifies
//! the canonical ancestry of what already exists on disk, and only then
//! touches the filesystem.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

/// Virtual filesystem error types.
pub mod error;
/// Host-backed virtual filesystem implementation.
pub mod host;
/// Path resolution and sandboxing utilities.
pub mod path;

pub use error::{VfsError, VfsResult};
pub use host::{FileReader, HostVfs};
pub use path::resolve_path;

use std::time::SystemTime;

/// File metadata returned by stat.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct VfsMetadata {
    /// True if the entry is a directory.
    pub is_dir: bool,
    /// True if the entry is a file.
    pub is_file: bool,
    /// Size of the entry in bytes.
    pub size: u64,
    /// Last modification time.
    pub modified: SystemTime,
}

impl VfsMetadata {
    fn from_std(meta: &std::fs::Metadata) -> Self {
        Self {
            is_dir: meta.is_dir(),
            is_file: meta.is_file(),
            size: meta.len(),
            modified: meta.modified().unwrap_or(SystemTime::UNIX_EPOCH),
        }
    }
}

/// Kind of a directory entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    /// Regular file.
    File,
    /// Directory.
    Directory,
    /// Symbolic link, reported as the link itself.
    ///
    /// A link to a directory is listed with this kind, so
    /// [`VfsDirEntry::is_dir`] is false for it even though a stat through the
    /// link reports a directory.
    Symlink,
}

/// Directory entry returned by readdir.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct VfsDirEntry {
    /// Name of the entry.
    pub name: String,
    /// Size of the entry in bytes.
    pub size: u64,
    /// Entry type.
    pub kind: EntryKind,
    /// Last modification time.
    pub modified: SystemTime,
}

impl VfsDirEntry {
    /// True if the entry is a directory.
    #[must_use]
    pub fn is_dir(&self) -> bool {
        self.kind == EntryKind::Directory
    }
}
