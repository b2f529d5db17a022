use std::ffi::OsString;
use std::io::SeekFrom;
use std::path::{Path, PathBuf};

use tokio::fs;
use tokio::io::{AsyncRead, AsyncSeekExt, AsyncWriteExt};
use tracing::{debug, trace};

use crate::path::resolve_path;
use crate::{EntryKind, VfsDirEntry, VfsError, VfsMetadata, VfsResult};

/// Readable stream handed to the protocol engine for downloads.
///
/// Owns the underlying file handle; dropping it closes the file.
pub type FileReader = Box<dyn AsyncRead + Send + Unpin>;

/// Permissions for directories created on behalf of a client.
#[cfg(unix)]
const DIR_MODE: u32 = 0o700;

/// Sandboxed view of the host filesystem rooted at one directory.
///
/// All paths taken by its methods are untrusted logical paths. They are
/// resolved lexically with [`resolve_path`], then the existing part of the
/// result is canonicalized and checked against the canonical root so that
/// symlinks cannot lead outside the sandbox.
#[derive(Debug, Clone)]
pub struct HostVfs {
    root: PathBuf,
}

impl HostVfs {
    /// Create a host VFS confined to `root`.
    ///
    /// The root is not checked for existence here; operations on a missing
    /// root fail with [`VfsError::NotFound`].
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The configured session root.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    async fn canonical_root(&self) -> PathBuf {
        fs::canonicalize(&self.root)
            .await
            .unwrap_or_else(|_| self.root.clone())
    }

    /// Resolve a logical path and verify it stays inside the sandbox on disk.
    ///
    /// The parent chain is canonicalized; the final component is kept as-is so
    /// that removing or renaming a symlink acts on the link itself. A final
    /// component that is a symlink must point inside the root.
    ///
    /// # Errors
    ///
    /// Returns [`VfsError::SandboxViolation`] when the lexical resolution or
    /// any symlink leaves the root, and [`VfsError::NotFound`] when the root
    /// itself is missing.
    pub async fn confine(&self, logical: &str) -> VfsResult<PathBuf> {
        let resolved = resolve_path(&self.root, logical)?;
        let canonical_base = self.canonical_root().await;

        let (Some(parent), Some(name)) = (resolved.parent(), resolved.file_name()) else {
            return self.anchor(&resolved, &canonical_base, logical).await;
        };
        if resolved == self.root {
            return self.anchor(&resolved, &canonical_base, logical).await;
        }

        let target = self
            .anchor(parent, &canonical_base, logical)
            .await?
            .join(name);

        if let Ok(meta) = fs::symlink_metadata(&target).await
            && meta.is_symlink()
        {
            match fs::canonicalize(&target).await {
                Ok(pointee) if pointee.starts_with(&canonical_base) => {},
                Ok(_) => {
                    return Err(VfsError::SandboxViolation(format!(
                        "{logical} is a symlink leading outside the sandbox"
                    )));
                },
                Err(_) => {
                    return Err(VfsError::SandboxViolation(format!(
                        "{logical} is a dangling symlink"
                    )));
                },
            }
        }

        trace!(logical, target = %target.display(), "confined path");
        Ok(target)
    }

    /// Canonicalize the deepest existing ancestor of `path` and re-append the
    /// components that do not exist yet.
    async fn anchor(
        &self,
        path: &Path,
        canonical_base: &Path,
        logical: &str,
    ) -> VfsResult<PathBuf> {
        let mut current = path.to_path_buf();
        let mut missing: Vec<OsString> = Vec::new();

        loop {
            if fs::symlink_metadata(&current).await.is_ok() {
                let canonical = fs::canonicalize(&current)
                    .await
                    .map_err(|e| VfsError::from_io(e, logical))?;
                if !canonical.starts_with(canonical_base) {
                    return Err(VfsError::SandboxViolation(format!(
                        "{logical} resolves outside sandbox boundaries via symlink"
                    )));
                }

                let mut final_path = canonical;
                for comp in missing.into_iter().rev() {
                    final_path.push(comp);
                }
                return Ok(final_path);
            }

            if current == self.root {
                return Err(VfsError::NotFound("session root".into()));
            }

            let Some(name) = current.file_name() else {
                return Err(VfsError::SandboxViolation(format!(
                    "{logical} has no anchor inside the sandbox"
                )));
            };
            missing.push(name.to_owned());
            if !current.pop() {
                return Err(VfsError::SandboxViolation(format!(
                    "{logical} has no anchor inside the sandbox"
                )));
            }
        }
    }

    /// Confine a path that names something other than the root itself.
    async fn confine_non_root(&self, logical: &str) -> VfsResult<PathBuf> {
        let target = self.confine(logical).await?;
        if target == self.canonical_root().await {
            return Err(VfsError::PermissionDenied(
                "Cannot operate on the session root directly".into(),
            ));
        }
        Ok(target)
    }

    /// Get metadata for a path, following an in-sandbox symlink.
    ///
    /// # Errors
    ///
    /// Returns a [`VfsError`] when the path escapes the sandbox or cannot be
    /// stat'ed.
    pub async fn stat(&self, path: &str) -> VfsResult<VfsMetadata> {
        let target = self.confine(path).await?;
        let metadata = fs::metadata(&target)
            .await
            .map_err(|e| VfsError::from_io(e, path))?;
        Ok(VfsMetadata::from_std(&metadata))
    }

    /// Read the contents of a directory, sorted by name.
    ///
    /// Entries that vanish or cannot be stat'ed between the scan and the
    /// metadata lookup are skipped. So are entries whose names are not valid
    /// UTF-8, since a lossy name could not be used to address them again.
    ///
    /// # Errors
    ///
    /// Returns a [`VfsError`] when the directory is missing, is not a
    /// directory, or cannot be read.
    pub async fn readdir(&self, path: &str) -> VfsResult<Vec<VfsDirEntry>> {
        let target = self.confine(path).await?;
        debug!(path, "listing directory");

        let mut read_dir = fs::read_dir(&target)
            .await
            .map_err(|e| VfsError::from_io(e, path))?;
        let mut entries = Vec::new();

        while let Some(entry) = read_dir
            .next_entry()
            .await
            .map_err(|e| VfsError::from_io(e, path))?
        {
            let name = match entry.file_name().into_string() {
                Ok(name) => name,
                Err(raw) => {
                    debug!(path, entry = ?raw, "skipping entry with non-UTF-8 name");
                    continue;
                },
            };
            let meta = match entry.metadata().await {
                Ok(meta) => meta,
                Err(e) => {
                    debug!(path, entry = %name, error = %e, "skipping unreadable entry");
                    continue;
                },
            };
            let kind = if meta.is_symlink() {
                EntryKind::Symlink
            } else if meta.is_dir() {
                EntryKind::Directory
            } else {
                EntryKind::File
            };
            entries.push(VfsDirEntry {
                name,
                size: meta.len(),
                kind,
                modified: meta.modified().unwrap_or(std::time::SystemTime::UNIX_EPOCH),
            });
        }

        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }

    /// Create a directory and all missing parents.
    ///
    /// Succeeds if the directory already exists. On unix, every directory
    /// created is private to the server's user (`0700`).
    ///
    /// # Errors
    ///
    /// Returns a [`VfsError`] when a non-directory occupies the path or any
    /// parent, or the directory cannot be created.
    pub async fn mkdir_all(&self, path: &str) -> VfsResult<()> {
        let target = self.confine(path).await?;
        let mut builder = fs::DirBuilder::new();
        builder.recursive(true);
        #[cfg(unix)]
        builder.mode(DIR_MODE);
        builder
            .create(&target)
            .await
            .map_err(|e| VfsError::from_io(e, path))
    }

    /// Remove a directory and everything below it.
    ///
    /// # Errors
    ///
    /// Refuses the session root and anything that is not a directory
    /// (symlinks to directories included). Returns the OS error if the
    /// removal itself fails.
    pub async fn remove_dir_all(&self, path: &str) -> VfsResult<()> {
        let target = self.confine_non_root(path).await?;
        let meta = fs::symlink_metadata(&target)
            .await
            .map_err(|e| VfsError::from_io(e, path))?;
        if !meta.is_dir() {
            return Err(VfsError::NotADirectory(path.to_owned()));
        }
        fs::remove_dir_all(&target)
            .await
            .map_err(|e| VfsError::from_io(e, path))
    }

    /// Remove a single file or symlink.
    ///
    /// # Errors
    ///
    /// Returns [`VfsError::IsADirectory`] for directories and the OS error
    /// when the file is missing or cannot be removed.
    pub async fn remove_file(&self, path: &str) -> VfsResult<()> {
        let target = self.confine_non_root(path).await?;
        let meta = fs::symlink_metadata(&target)
            .await
            .map_err(|e| VfsError::from_io(e, path))?;
        if meta.is_dir() {
            return Err(VfsError::IsADirectory(path.to_owned()));
        }
        fs::remove_file(&target)
            .await
            .map_err(|e| VfsError::from_io(e, path))
    }

    /// Rename a file or directory. Both ends are confined independently.
    ///
    /// # Errors
    ///
    /// Returns a [`VfsError`] if either path escapes the sandbox, names the
    /// root, or the OS rename fails.
    pub async fn rename(&self, from: &str, to: &str) -> VfsResult<()> {
        let from_path = self.confine_non_root(from).await?;
        let to_path = self.confine_non_root(to).await?;
        fs::rename(&from_path, &to_path)
            .await
            .map_err(|e| VfsError::from_io(e, from))
    }

    /// Open a file for reading, positioned at `offset`.
    ///
    /// An offset past the end of the file yields a reader that is
    /// immediately exhausted.
    ///
    /// # Errors
    ///
    /// Returns a [`VfsError`] if the file cannot be opened, is a directory,
    /// or the seek fails.
    pub async fn open_read(&self, path: &str, offset: u64) -> VfsResult<FileReader> {
        let target = self.confine(path).await?;
        let mut file = fs::File::open(&target)
            .await
            .map_err(|e| VfsError::from_io(e, path))?;

        let meta = file
            .metadata()
            .await
            .map_err(|e| VfsError::from_io(e, path))?;
        if meta.is_dir() {
            return Err(VfsError::IsADirectory(path.to_owned()));
        }

        file.seek(SeekFrom::Start(offset))
            .await
            .map_err(|e| VfsError::from_io(e, path))?;

        Ok(Box::new(file))
    }

    /// Create or truncate a file and stream `source` into it until exhausted.
    ///
    /// Returns the number of bytes written. The file handle is closed on
    /// every exit path.
    ///
    /// # Errors
    ///
    /// Returns a [`VfsError`] if the file cannot be created, or if reading
    /// the source, writing, flushing or syncing fails partway through.
    pub async fn write_from<R>(&self, path: &str, source: &mut R) -> VfsResult<u64>
    where
        R: AsyncRead + Unpin + ?Sized,
    {
        let target = self.confine_non_root(path).await?;
        let mut file = fs::File::create(&target)
            .await
            .map_err(|e| VfsError::from_io(e, path))?;

        let written = tokio::io::copy(source, &mut file)
            .await
            .map_err(VfsError::Io)?;
        file.flush().await.map_err(VfsError::Io)?;
        file.sync_all().await.map_err(VfsError::Io)?;

        debug!(path, bytes = written, "stored file");
        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use tokio::io::AsyncReadExt;

    fn setup() -> (HostVfs, TempDir) {
        let dir = TempDir::new().unwrap();
        let vfs = HostVfs::new(dir.path());
        (vfs, dir)
    }

    async fn read_all(vfs: &HostVfs, path: &str, offset: u64) -> Vec<u8> {
        let mut reader = vfs.open_read(path, offset).await.unwrap();
        let mut buf = Vec::new();
        reader.read_to_end(&mut buf).await.unwrap();
        buf
    }

    #[tokio::test]
    async fn test_write_then_read() {
        let (vfs, _dir) = setup();

        let mut source: &[u8] = b"hello world";
        let written = vfs.write_from("test.txt", &mut source).await.unwrap();
        assert_eq!(written, 11);

        assert_eq!(read_all(&vfs, "test.txt", 0).await, b"hello world");
        assert_eq!(read_all(&vfs, "/test.txt", 6).await, b"world");
        assert_eq!(read_all(&vfs, "test.txt", 11).await, b"");
        assert!(read_all(&vfs, "test.txt", 500).await.is_empty());
    }

    #[tokio::test]
    async fn test_write_truncates() {
        let (vfs, dir) = setup();
        std::fs::write(dir.path().join("f.txt"), "a much longer original").unwrap();

        let mut source: &[u8] = b"short";
        vfs.write_from("f.txt", &mut source).await.unwrap();
        assert_eq!(std::fs::read(dir.path().join("f.txt")).unwrap(), b"short");
    }

    #[tokio::test]
    async fn test_stat() {
        let (vfs, dir) = setup();
        std::fs::write(dir.path().join("a.bin"), [0u8; 42]).unwrap();
        std::fs::create_dir(dir.path().join("sub")).unwrap();

        let meta = vfs.stat("a.bin").await.unwrap();
        assert!(meta.is_file);
        assert_eq!(meta.size, 42);

        let meta = vfs.stat("sub").await.unwrap();
        assert!(meta.is_dir);

        assert!(vfs.stat("").await.unwrap().is_dir);
        assert!(matches!(
            vfs.stat("missing").await,
            Err(VfsError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_readdir_sorted_with_kinds() {
        let (vfs, dir) = setup();
        std::fs::write(dir.path().join("y"), "yy").unwrap();
        std::fs::write(dir.path().join("x"), "x").unwrap();
        std::fs::create_dir(dir.path().join("z")).unwrap();

        let entries = vfs.readdir("/").await.unwrap();
        let names: Vec<_> = entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, ["x", "y", "z"]);
        assert_eq!(entries[0].kind, EntryKind::File);
        assert_eq!(entries[1].size, 2);
        assert!(entries[2].is_dir());
    }

    #[tokio::test]
    async fn test_readdir_on_file_fails() {
        let (vfs, dir) = setup();
        std::fs::write(dir.path().join("plain"), "").unwrap();
        assert!(vfs.readdir("plain").await.is_err());
        assert!(vfs.readdir("nope").await.is_err());
    }

    #[tokio::test]
    async fn test_mkdir_all_idempotent() {
        let (vfs, dir) = setup();
        vfs.mkdir_all("a/b/c").await.unwrap();
        vfs.mkdir_all("a/b/c").await.unwrap();
        assert!(dir.path().join("a/b/c").is_dir());

        std::fs::write(dir.path().join("file"), "").unwrap();
        assert!(vfs.mkdir_all("file").await.is_err());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_mkdir_all_is_private() {
        use std::os::unix::fs::PermissionsExt;

        let (vfs, dir) = setup();
        vfs.mkdir_all("p/q").await.unwrap();

        for created in ["p", "p/q"] {
            let mode = std::fs::metadata(dir.path().join(created))
                .unwrap()
                .permissions()
                .mode();
            assert_eq!(mode & 0o777, 0o700, "{created} has mode {mode:o}");
        }
    }

    #[cfg(target_os = "linux")]
    #[tokio::test]
    async fn test_readdir_skips_non_utf8_names() {
        use std::os::unix::ffi::OsStrExt;

        let (vfs, dir) = setup();
        let raw = std::ffi::OsStr::from_bytes(b"bad\xff");
        std::fs::write(dir.path().join(raw), "x").unwrap();
        std::fs::write(dir.path().join("good"), "x").unwrap();

        let entries = vfs.readdir("").await.unwrap();
        let names: Vec<_> = entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, ["good"]);
    }

    #[tokio::test]
    async fn test_remove_dir_all() {
        let (vfs, dir) = setup();
        std::fs::create_dir_all(dir.path().join("tree/inner")).unwrap();
        std::fs::write(dir.path().join("tree/inner/f"), "data").unwrap();

        vfs.remove_dir_all("tree").await.unwrap();
        assert!(!dir.path().join("tree").exists());

        assert!(vfs.remove_dir_all("tree").await.is_err());
    }

    #[tokio::test]
    async fn test_remove_dir_all_refuses_root_and_files() {
        let (vfs, dir) = setup();
        std::fs::write(dir.path().join("f"), "").unwrap();

        assert!(matches!(
            vfs.remove_dir_all("/").await,
            Err(VfsError::PermissionDenied(_))
        ));
        assert!(matches!(
            vfs.remove_dir_all("f").await,
            Err(VfsError::NotADirectory(_))
        ));
        assert!(dir.path().join("f").exists());
    }

    #[tokio::test]
    async fn test_remove_file() {
        let (vfs, dir) = setup();
        std::fs::write(dir.path().join("f"), "").unwrap();
        std::fs::create_dir(dir.path().join("d")).unwrap();

        vfs.remove_file("f").await.unwrap();
        assert!(!dir.path().join("f").exists());
        assert!(matches!(
            vfs.remove_file("f").await,
            Err(VfsError::NotFound(_))
        ));
        assert!(matches!(
            vfs.remove_file("d").await,
            Err(VfsError::IsADirectory(_))
        ));
    }

    #[tokio::test]
    async fn test_rename_across_directories() {
        let (vfs, dir) = setup();
        std::fs::create_dir(dir.path().join("src")).unwrap();
        std::fs::create_dir(dir.path().join("dst")).unwrap();
        std::fs::write(dir.path().join("src/old.txt"), "content").unwrap();

        vfs.rename("src/old.txt", "/dst/new.txt").await.unwrap();
        assert!(!dir.path().join("src/old.txt").exists());
        assert_eq!(read_all(&vfs, "dst/new.txt", 0).await, b"content");
    }

    #[tokio::test]
    async fn test_traversal_refused_before_io() {
        let (vfs, _dir) = setup();
        let err = vfs.open_read("../../../etc/passwd", 0).await.err().unwrap();
        assert!(err.is_sandbox_violation());

        let mut source: &[u8] = b"x";
        let err = vfs.write_from("a/../../escape", &mut source).await.unwrap_err();
        assert!(err.is_sandbox_violation());
    }

    #[tokio::test]
    async fn test_open_read_directory_fails() {
        let (vfs, dir) = setup();
        std::fs::create_dir(dir.path().join("d")).unwrap();
        assert!(matches!(
            vfs.open_read("d", 0).await.err().unwrap(),
            VfsError::IsADirectory(_)
        ));
    }

    #[tokio::test]
    async fn test_missing_root() {
        let dir = TempDir::new().unwrap();
        let vfs = HostVfs::new(dir.path().join("not-there"));
        assert!(matches!(
            vfs.stat("file").await,
            Err(VfsError::NotFound(_))
        ));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_symlink_escape_refused() {
        let outside = TempDir::new().unwrap();
        std::fs::write(outside.path().join("secret"), "top secret").unwrap();

        let (vfs, dir) = setup();
        std::os::unix::fs::symlink(outside.path(), dir.path().join("door")).unwrap();
        std::os::unix::fs::symlink(
            outside.path().join("secret"),
            dir.path().join("secret-link"),
        )
        .unwrap();

        assert!(vfs.confine("door/secret").await.unwrap_err().is_sandbox_violation());
        assert!(vfs.confine("secret-link").await.unwrap_err().is_sandbox_violation());
        assert!(vfs.open_read("door/secret", 0).await.is_err());
        assert!(vfs.readdir("door").await.is_err());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_symlink_inside_root_allowed() {
        let (vfs, dir) = setup();
        std::fs::write(dir.path().join("real.txt"), "inside").unwrap();
        std::os::unix::fs::symlink(dir.path().join("real.txt"), dir.path().join("alias")).unwrap();

        assert_eq!(read_all(&vfs, "alias", 0).await, b"inside");

        std::fs::create_dir(dir.path().join("real-dir")).unwrap();
        std::os::unix::fs::symlink(dir.path().join("real-dir"), dir.path().join("dir-alias"))
            .unwrap();
        let entries = vfs.readdir("").await.unwrap();
        let listed = entries.iter().find(|e| e.name == "dir-alias").unwrap();
        assert_eq!(listed.kind, EntryKind::Symlink);
        assert!(!listed.is_dir());
        assert!(vfs.stat("dir-alias").await.unwrap().is_dir);

        // Removing the link leaves its target untouched.
        vfs.remove_file("alias").await.unwrap();
        assert!(dir.path().join("real.txt").exists());
    }
}
