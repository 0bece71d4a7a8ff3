//! Path display helpers for cross-platform status output.

use std::path::Path;

/// `path` relative to `root` with forward slashes, for status lines.
///
/// Falls back to the full path when `path` is not under `root`, and to the
/// file name when `path` *is* `root`.
pub fn display_path(path: &Path, root: &Path) -> String {
    let relative = match path.strip_prefix(root) {
        Ok(rel) if rel.as_os_str().is_empty() => path.file_name().map(Path::new).unwrap_or(path),
        Ok(rel) => rel,
        Err(_) => path,
    };
    relative.to_string_lossy().replace('\\', "/")
}
