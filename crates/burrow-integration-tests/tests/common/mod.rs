//! Shared test harness for integration tests.

use std::path::PathBuf;

use burrow_driver::{FsDriver, FsDriverFactory, FtpDriver, UserRecord, UserRegistry};
use tempfile::TempDir;
use tokio::io::AsyncReadExt;

/// Two accounts with sibling roots under one tempdir.
///
/// Layout: `<tmp>/alice` and `<tmp>/bob`, both created empty.
#[allow(dead_code)]
pub struct Harness {
    /// Factory over the two-account registry.
    pub factory: FsDriverFactory,
    /// Alice's root directory.
    pub alice_root: PathBuf,
    /// Bob's root directory.
    pub bob_root: PathBuf,
    /// Held to prevent cleanup.
    _dir: TempDir,
}

#[allow(dead_code)]
impl Harness {
    pub fn new() -> Self {
        let dir = TempDir::new().expect("failed to create tempdir");
        let alice_root = dir.path().join("alice");
        let bob_root = dir.path().join("bob");
        std::fs::create_dir(&alice_root).expect("failed to create alice root");
        std::fs::create_dir(&bob_root).expect("failed to create bob root");

        let registry = UserRegistry::new([
            UserRecord::new("alice", "wonderland", &alice_root),
            UserRecord::new("bob", "builder", &bob_root),
        ])
        .expect("registry should build");

        Self {
            factory: FsDriverFactory::new(registry),
            alice_root,
            bob_root,
            _dir: dir,
        }
    }

    /// A driver already authenticated as alice.
    pub fn alice(&self) -> FsDriver {
        let mut driver = self.factory.driver();
        assert!(driver.authenticate("alice", "wonderland"));
        driver
    }

    /// A driver already authenticated as bob.
    pub fn bob(&self) -> FsDriver {
        let mut driver = self.factory.driver();
        assert!(driver.authenticate("bob", "builder"));
        driver
    }
}

/// Upload `data` to `path` through the driver.
#[allow(dead_code)]
pub async fn upload(driver: &(impl FtpDriver + ?Sized), path: &str, data: &[u8]) -> bool {
    let mut source = data;
    driver.open_for_write(path, &mut source).await
}

/// Download `path` from `offset`, `None` if the driver refuses to open it.
#[allow(dead_code)]
pub async fn download(driver: &(impl FtpDriver + ?Sized), path: &str, offset: u64) -> Option<Vec<u8>> {
    let mut reader = driver.open_for_read(path, offset).await?;
    let mut buf = Vec::new();
    reader
        .read_to_end(&mut buf)
        .await
        .expect("read from an opened file should succeed");
    Some(buf)
}
