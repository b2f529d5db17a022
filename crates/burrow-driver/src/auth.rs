//! Credential registry and per-connection session state.

use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use burrow_telemetry::SessionContext;
use sha2::{Digest, Sha256};
use subtle::{Choice, ConstantTimeEq};

use crate::error::{DriverError, DriverResult};

type CredentialDigest = [u8; 32];

fn digest(value: &str) -> CredentialDigest {
    Sha256::digest(value.as_bytes()).into()
}

/// A configured FTP account.
///
/// Only SHA-256 digests of the credentials are kept so that comparisons run
/// over fixed-length values in constant time.
#[derive(Clone)]
pub struct UserRecord {
    username: String,
    username_digest: CredentialDigest,
    password_digest: CredentialDigest,
    root: PathBuf,
}

impl UserRecord {
    /// Create a record from plaintext credentials and a root directory.
    #[must_use]
    pub fn new(username: impl Into<String>, password: &str, root: impl Into<PathBuf>) -> Self {
        let username = username.into();
        Self {
            username_digest: digest(&username),
            password_digest: digest(password),
            username,
            root: root.into(),
        }
    }

    /// Account name.
    #[must_use]
    pub fn username(&self) -> &str {
        &self.username
    }

    /// Directory this account is confined to.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn matches(&self, username: &CredentialDigest, password: &CredentialDigest) -> Choice {
        self.username_digest[..].ct_eq(&username[..]) & self.password_digest[..].ct_eq(&password[..])
    }
}

impl fmt::Debug for UserRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UserRecord")
            .field("username", &self.username)
            .field("password", &"***")
            .field("root", &self.root)
            .finish()
    }
}

/// Immutable set of accounts shared by every session.
#[derive(Debug, Clone, Default)]
pub struct UserRegistry {
    users: Vec<Arc<UserRecord>>,
}

impl UserRegistry {
    /// Build a registry, rejecting duplicate or malformed accounts.
    ///
    /// Root directories are not checked for existence.
    ///
    /// # Errors
    ///
    /// Returns [`DriverError::DuplicateUser`] when two records share a
    /// username and [`DriverError::InvalidUser`] for an empty username or a
    /// relative root.
    pub fn new(users: impl IntoIterator<Item = UserRecord>) -> DriverResult<Self> {
        let mut seen = HashSet::new();
        let mut records = Vec::new();

        for user in users {
            if user.username.is_empty() {
                return Err(DriverError::InvalidUser {
                    username: String::new(),
                    message: "username must not be empty".to_owned(),
                });
            }
            if !user.root.is_absolute() {
                return Err(DriverError::InvalidUser {
                    username: user.username.clone(),
                    message: format!("root {} is not absolute", user.root.display()),
                });
            }
            if !seen.insert(user.username.clone()) {
                return Err(DriverError::DuplicateUser(user.username));
            }
            records.push(Arc::new(user));
        }

        Ok(Self { users: records })
    }

    /// Number of configured accounts.
    #[must_use]
    pub fn len(&self) -> usize {
        self.users.len()
    }

    /// True when no accounts are configured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }

    /// Find the account matching both credentials exactly.
    ///
    /// Every record is compared, so the time taken depends only on the
    /// registry size.
    #[must_use]
    pub fn verify(&self, username: &str, password: &str) -> Option<Arc<UserRecord>> {
        let username = digest(username);
        let password = digest(password);

        let mut found = None;
        for user in &self.users {
            let hit = bool::from(user.matches(&username, &password));
            if hit && found.is_none() {
                found = Some(Arc::clone(user));
            }
        }
        found
    }
}

/// Per-connection session state.
///
/// Starts unbound and binds to at most one account for its whole life.
#[derive(Debug)]
pub struct Session {
    context: SessionContext,
    user: Option<Arc<UserRecord>>,
}

impl Session {
    /// Create an unauthenticated session.
    #[must_use]
    pub fn new(context: SessionContext) -> Self {
        Self {
            context,
            user: None,
        }
    }

    /// Logging context of this connection.
    #[must_use]
    pub fn context(&self) -> &SessionContext {
        &self.context
    }

    /// The bound account, if authenticated.
    #[must_use]
    pub fn user(&self) -> Option<&Arc<UserRecord>> {
        self.user.as_ref()
    }

    /// True once an account is bound.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }

    /// Bind the session to `user`. Returns false if already bound.
    pub fn bind(&mut self, user: Arc<UserRecord>) -> bool {
        if self.user.is_some() {
            return false;
        }
        self.context.set_username(user.username());
        self.user = Some(user);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> UserRegistry {
        UserRegistry::new([
            UserRecord::new("alice", "wonderland", "/srv/alice"),
            UserRecord::new("bob", "builder", "/srv/bob"),
        ])
        .unwrap()
    }

    #[test]
    fn test_verify_exact_match() {
        let reg = registry();
        let user = reg.verify("bob", "builder").unwrap();
        assert_eq!(user.username(), "bob");
        assert_eq!(user.root(), Path::new("/srv/bob"));
    }

    #[test]
    fn test_verify_rejects_near_misses() {
        let reg = registry();
        assert!(reg.verify("alice", "builder").is_none());
        assert!(reg.verify("alice", "wonderlan").is_none());
        assert!(reg.verify("alice", "wonderland ").is_none());
        assert!(reg.verify("Alice", "wonderland").is_none());
        assert!(reg.verify("", "").is_none());
        assert!(reg.verify("carol", "wonderland").is_none());
    }

    #[test]
    fn test_duplicate_rejected() {
        let err = UserRegistry::new([
            UserRecord::new("alice", "a", "/srv/a"),
            UserRecord::new("alice", "b", "/srv/b"),
        ])
        .unwrap_err();
        assert!(matches!(err, DriverError::DuplicateUser(name) if name == "alice"));
    }

    #[test]
    fn test_relative_root_rejected() {
        let err = UserRegistry::new([UserRecord::new("alice", "a", "srv/a")]).unwrap_err();
        assert!(matches!(err, DriverError::InvalidUser { .. }));
    }

    #[test]
    fn test_debug_redacts_password() {
        let record = UserRecord::new("alice", "hunter2", "/srv/alice");
        let debug_str = format!("{record:?}");
        assert!(!debug_str.contains("hunter2"));
        assert!(debug_str.contains("alice"));
    }

    #[test]
    fn test_session_binds_once() {
        let reg = registry();
        let mut session = Session::new(SessionContext::new());
        assert!(!session.is_authenticated());

        assert!(session.bind(reg.verify("alice", "wonderland").unwrap()));
        assert!(!session.bind(reg.verify("bob", "builder").unwrap()));
        assert_eq!(session.user().unwrap().username(), "alice");
        assert_eq!(session.context().username.as_deref(), Some("alice"));
    }
}
