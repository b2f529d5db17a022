use crate::{VfsError, VfsResult};
use std::path::{Component, Path, PathBuf};

/// Lexically resolves a client-supplied logical path against a secure base root.
///
/// Logical paths are virtual: a leading `/` anchors at `base_root`, not at the
/// host's `/`. Empty and `.` segments are dropped, `..` pops one segment, and
/// an empty path resolves to `base_root` itself.
/// Does NOT touch the filesystem; symlink checks happen in the host adapter.
///
/// # Errors
///
/// Returns `VfsError::SandboxViolation` if a `..` segment would climb above
/// `base_root`, or if the path carries a platform prefix (e.g. `C:`).
pub fn resolve_path(base_root: &Path, request_path: &str) -> VfsResult<PathBuf> {
    let req = Path::new(request_path.trim_start_matches(['/', '\\']));

    let mut resolved = base_root.to_path_buf();

    for component in req.components() {
        match component {
            Component::Prefix(_) | Component::RootDir => {
                return Err(VfsError::SandboxViolation(
                    "Prefix or root components are not allowed".into(),
                ));
            },
            Component::CurDir => {},
            Component::ParentDir => {
                // Popping past the base root is a traversal attempt, not a clamp.
                if resolved == base_root {
                    return Err(VfsError::SandboxViolation(
                        "Attempted to traverse above sandbox root".into(),
                    ));
                }
                resolved.pop();
            },
            Component::Normal(p) => {
                resolved.push(p);
            },
        }
    }

    if !resolved.starts_with(base_root) {
        return Err(VfsError::SandboxViolation(format!(
            "{request_path} does not resolve under the session root"
        )));
    }

    Ok(resolved)
}
