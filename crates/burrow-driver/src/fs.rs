//! Host filesystem driver confined to the authenticated user's root.

use std::sync::Arc;
use std::time::SystemTime;

use async_trait::async_trait;
use burrow_config::Config;
use burrow_telemetry::SessionContext;
use burrow_vfs::{FileReader, HostVfs, VfsDirEntry, VfsError, VfsResult};
use tokio::io::AsyncRead;
use tracing::{debug, info, warn};

use crate::auth::{Session, UserRecord, UserRegistry};
use crate::driver::{DriverFactory, FtpDriver};
use crate::error::DriverResult;

/// Driver serving one connection from the host filesystem.
#[derive(Debug)]
pub struct FsDriver {
    registry: Arc<UserRegistry>,
    session: Session,
    vfs: Option<HostVfs>,
}

impl FsDriver {
    /// Create an unauthenticated driver over a shared registry.
    #[must_use]
    pub fn new(registry: Arc<UserRegistry>) -> Self {
        Self {
            registry,
            session: Session::new(SessionContext::new()),
            vfs: None,
        }
    }

    /// Session state of this connection.
    #[must_use]
    pub fn session(&self) -> &Session {
        &self.session
    }

    fn vfs(&self) -> VfsResult<&HostVfs> {
        self.vfs.as_ref().ok_or(VfsError::NotAuthenticated)
    }

    /// Collapse an internal result into the boundary shape, logging the cause.
    fn settle<T>(&self, op: &'static str, path: &str, result: VfsResult<T>) -> Option<T> {
        let e = match result {
            Ok(value) => return Some(value),
            Err(e) => e,
        };
        let _guard = self.session.context().span().entered();
        if e.is_sandbox_violation() {
            warn!(op, path, error = %e, "refused path outside sandbox");
        } else {
            debug!(op, path, error = %e, "operation failed");
        }
        None
    }

    fn succeeded(&self, op: &'static str, path: &str, result: VfsResult<()>) -> bool {
        self.settle(op, path, result).is_some()
    }
}

#[async_trait]
impl FtpDriver for FsDriver {
    fn authenticate(&mut self, username: &str, password: &str) -> bool {
        if self.session.is_authenticated() {
            let _guard = self.session.context().span().entered();
            warn!(username, "session already authenticated; refusing to rebind");
            return false;
        }

        let Some(user) = self.registry.verify(username, password) else {
            let _guard = self.session.context().span().entered();
            info!(username, "authentication failed");
            return false;
        };

        let vfs = HostVfs::new(user.root());
        if !self.session.bind(user) {
            return false;
        }
        self.vfs = Some(vfs);

        let _guard = self.session.context().span().entered();
        info!("authenticated");
        true
    }

    async fn size(&self, path: &str) -> Option<u64> {
        let result = match self.vfs() {
            Ok(vfs) => vfs.stat(path).await.map(|meta| meta.size),
            Err(e) => Err(e),
        };
        self.settle("size", path, result)
    }

    async fn modified_time(&self, path: &str) -> Option<SystemTime> {
        let result = match self.vfs() {
            Ok(vfs) => vfs.stat(path).await.map(|meta| meta.modified),
            Err(e) => Err(e),
        };
        self.settle("modified_time", path, result)
    }

    async fn is_directory(&self, path: &str) -> bool {
        let result = match self.vfs() {
            Ok(vfs) => vfs.stat(path).await.map(|meta| meta.is_dir),
            Err(e) => Err(e),
        };
        self.settle("is_directory", path, result).unwrap_or(false)
    }

    async fn list_directory(&self, path: &str) -> Option<Vec<VfsDirEntry>> {
        let result = match self.vfs() {
            Ok(vfs) => vfs.readdir(path).await,
            Err(e) => Err(e),
        };
        self.settle("list_directory", path, result)
    }

    async fn remove_directory_recursive(&self, path: &str) -> bool {
        let result = match self.vfs() {
            Ok(vfs) => vfs.remove_dir_all(path).await,
            Err(e) => Err(e),
        };
        self.succeeded("remove_directory_recursive", path, result)
    }

    async fn remove_file(&self, path: &str) -> bool {
        let result = match self.vfs() {
            Ok(vfs) => vfs.remove_file(path).await,
            Err(e) => Err(e),
        };
        self.succeeded("remove_file", path, result)
    }

    async fn rename(&self, from: &str, to: &str) -> bool {
        let result = match self.vfs() {
            Ok(vfs) => vfs.rename(from, to).await,
            Err(e) => Err(e),
        };
        self.succeeded("rename", from, result)
    }

    async fn make_directory_path(&self, path: &str) -> bool {
        let result = match self.vfs() {
            Ok(vfs) => vfs.mkdir_all(path).await,
            Err(e) => Err(e),
        };
        self.succeeded("make_directory_path", path, result)
    }

    async fn open_for_read(&self, path: &str, offset: u64) -> Option<FileReader> {
        let result = match self.vfs() {
            Ok(vfs) => vfs.open_read(path, offset).await,
            Err(e) => Err(e),
        };
        self.settle("open_for_read", path, result)
    }

    async fn open_for_write(&self, path: &str, source: &mut (dyn AsyncRead + Send + Unpin)) -> bool {
        let result = match self.vfs() {
            Ok(vfs) => vfs.write_from(path, source).await,
            Err(e) => Err(e),
        };
        self.settle("open_for_write", path, result).is_some()
    }
}

/// Factory handing each connection its own [`FsDriver`].
///
/// The registry is shared read-only; session state is never shared.
#[derive(Debug, Clone)]
pub struct FsDriverFactory {
    registry: Arc<UserRegistry>,
}

impl FsDriverFactory {
    /// Create a factory over an already-built registry.
    #[must_use]
    pub fn new(registry: UserRegistry) -> Self {
        Self {
            registry: Arc::new(registry),
        }
    }

    /// Build the registry from the `[[users]]` section of a loaded config.
    ///
    /// # Errors
    ///
    /// Returns a [`DriverError`](crate::DriverError) if the user list is
    /// rejected by [`UserRegistry::new`].
    pub fn from_config(config: &Config) -> DriverResult<Self> {
        let users = config
            .users
            .iter()
            .map(|u| UserRecord::new(u.username.clone(), &u.password, u.root.clone()));
        let registry = UserRegistry::new(users)?;
        info!(users = registry.len(), "loaded user registry");
        Ok(Self::new(registry))
    }

    /// Shared account registry.
    #[must_use]
    pub fn registry(&self) -> &Arc<UserRegistry> {
        &self.registry
    }

    /// Create a concrete driver, for callers that do not need dynamic dispatch.
    #[must_use]
    pub fn driver(&self) -> FsDriver {
        FsDriver::new(Arc::clone(&self.registry))
    }
}

impl DriverFactory for FsDriverFactory {
    fn new_driver(&self) -> DriverResult<Box<dyn FtpDriver>> {
        Ok(Box::new(self.driver()))
    }
}
