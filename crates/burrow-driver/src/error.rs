use thiserror::Error;

/// Errors raised while assembling drivers.
///
/// Filesystem failures never surface here; they are collapsed into the
/// negative results of [`FtpDriver`](crate::FtpDriver).
#[derive(Debug, Error)]
pub enum DriverError {
    /// Two user records share a username.
    #[error("Duplicate user in registry: {0}")]
    DuplicateUser(String),

    /// A user record is unusable.
    #[error("Invalid user record '{username}': {message}")]
    InvalidUser {
        /// Username of the offending record.
        username: String,
        /// What is wrong with it.
        message: String,
    },
}

/// Result type for driver construction.
pub type DriverResult<T> = Result<T, DriverError>;
