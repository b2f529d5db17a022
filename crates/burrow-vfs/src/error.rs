use std::io;

use thiserror::Error;

/// Virtual filesystem errors.
///
/// Callers facing the protocol engine collapse these into negative results,
/// but the variants are kept intact up to that point for diagnostics.
#[derive(Debug, Error)]
pub enum VfsError {
    /// Sandbox path traversal violation.
    #[error("Path resolves outside sandbox boundaries: {0}")]
    SandboxViolation(String),

    /// No user is bound to the session yet.
    #[error("Session is not authenticated")]
    NotAuthenticated,

    /// Missing directory or file.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Expected a directory.
    #[error("Not a directory: {0}")]
    NotADirectory(String),

    /// Expected a file.
    #[error("Is a directory: {0}")]
    IsADirectory(String),

    /// Target already exists with an incompatible type.
    #[error("Already exists: {0}")]
    AlreadyExists(String),

    /// Insufficient permission.
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// Native IO error wrapper.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl VfsError {
    /// Classify an OS error for the given logical path.
    ///
    /// Kinds with a dedicated variant are mapped onto it; everything else is
    /// kept as [`VfsError::Io`].
    #[must_use]
    pub fn from_io(err: io::Error, path: &str) -> Self {
        match err.kind() {
            io::ErrorKind::NotFound => Self::NotFound(path.to_owned()),
            io::ErrorKind::PermissionDenied => Self::PermissionDenied(path.to_owned()),
            io::ErrorKind::NotADirectory => Self::NotADirectory(path.to_owned()),
            io::ErrorKind::IsADirectory => Self::IsADirectory(path.to_owned()),
            io::ErrorKind::AlreadyExists => Self::AlreadyExists(path.to_owned()),
            _ => Self::Io(err),
        }
    }

    /// True for errors raised by the containment checks.
    #[must_use]
    pub fn is_sandbox_violation(&self) -> bool {
        matches!(self, Self::SandboxViolation(_))
    }
}

/// Convenience result type for VFS operations.
pub type VfsResult<T> = Result<T, VfsError>;
