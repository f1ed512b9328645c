//! Path utilities
//!
//! Every path stored in the graph is relative to the repository root and uses
//! Unix-style separators, whatever platform ingested it.

use std::path::{Component, MAIN_SEPARATOR, Path, PathBuf};

/// Convert a path under `root` to a relative Unix-style path
///
/// Tries a plain prefix strip first (walker output is always `root.join(..)`),
/// then canonicalizes both sides to see through symlinks such as
/// `/var -> /private/var`. Returns `None` for paths outside `root` or paths that
/// are not valid UTF-8.
pub fn to_relative_unix_style(path: &Path, root: &Path) -> Option<String> {
    let relative: PathBuf = match path.strip_prefix(root) {
        Ok(relative) => relative.to_path_buf(),
        Err(_) => {
            let canonical_path = path.canonicalize().ok()?;
            let canonical_root = root.canonicalize().ok()?;
            canonical_path.strip_prefix(&canonical_root).ok()?.to_path_buf()
        }
    };

    let path_str = relative.to_str()?;
    if MAIN_SEPARATOR == '\\' {
        Some(path_str.replace('\\', "/"))
    } else {
        Some(path_str.to_string())
    }
}

/// Whether a stored relative path stays inside the directory it is joined to
///
/// Absolute paths, drive prefixes and any `..` component are rejected.
pub fn is_contained_relative(relative: &str) -> bool {
    if relative.is_empty() || relative.starts_with('/') || relative.starts_with('\\') {
        return false;
    }
    Path::new(relative)
        .components()
        .all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
        && !relative.split(['/', '\\']).any(|segment| segment == "..")
}
