//! Source file discovery.
//!
//! Walks a root directory (or accepts a single file) and returns every
//! `.ts` / `.tsx` source that should be annotated. Declaration files, the
//! dependency folder, VCS metadata and anything matching a user glob are
//! excluded.

use std::path::{Path, PathBuf};

use globset::{Glob, GlobSet, GlobSetBuilder};
use walkdir::WalkDir;

use crate::parser::SourceLanguage;
use crate::AnatomistError;

/// Directory names that are never descended into, besides the dependency folder.
const ALWAYS_EXCLUDED_DIRS: &[&str] = &[".git", ".hg", ".svn"];

/// Inputs of [`list_source_files`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanOptions {
    /// Only look at files directly inside the root.
    pub shallow: bool,
    /// Extra glob patterns; a file matching any of them is skipped.
    pub ignore_patterns: Vec<String>,
    /// Name of the dependency folder (`node_modules`).
    pub dependency_dir: String,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            shallow: false,
            ignore_patterns: Vec::new(),
            dependency_dir: "node_modules".to_string(),
        }
    }
}

/// Compiles the ignore globs. Patterns without a `/` match at any depth
/// (`*.spec.ts` behaves like `**/*.spec.ts`).
pub fn build_ignore_set(patterns: &[String]) -> Result<GlobSet, AnatomistError> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = Glob::new(pattern).map_err(|e| AnatomistError::InvalidGlob {
            pattern: pattern.clone(),
            reason: e.to_string(),
        })?;
        builder.add(glob);
        if !pattern.contains('/') {
            let anywhere = format!("**/{pattern}");
            if let Ok(glob) = Glob::new(&anywhere) {
                builder.add(glob);
            }
        }
    }
    builder.build().map_err(|e| AnatomistError::InvalidGlob {
        pattern: patterns.join(", "),
        reason: e.to_string(),
    })
}

/// Lists the source files under `root`, sorted, as absolute paths.
///
/// A `root` that is itself a file is returned as-is when it is a supported
/// source (the ignore globs still apply).
///
/// # Errors
/// - `IoError`: `root` does not exist
/// - `InvalidGlob`: an ignore pattern does not compile
pub fn list_source_files(root: &Path, options: &ScanOptions) -> Result<Vec<PathBuf>, AnatomistError> {
    let root = dunce::canonicalize(root)?;
    let ignore = build_ignore_set(&options.ignore_patterns)?;

    if root.is_file() {
        let base = root.parent().unwrap_or(&root).to_path_buf();
        let keep = SourceLanguage::from_path(&root).is_some() && !is_ignored(&ignore, &base, &root);
        return Ok(if keep { vec![root] } else { Vec::new() });
    }

    let max_depth = if options.shallow { 1 } else { usize::MAX };
    let mut files: Vec<PathBuf> = WalkDir::new(&root)
        .max_depth(max_depth)
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !is_excluded_dir(e, &options.dependency_dir))
        .flatten()
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|p| SourceLanguage::from_path(p).is_some())
        .filter(|p| !is_ignored(&ignore, &root, p))
        .collect();

    files.sort();
    Ok(files)
}

fn is_excluded_dir(entry: &walkdir::DirEntry, dependency_dir: &str) -> bool {
    entry.file_type().is_dir()
        && entry
            .file_name()
            .to_str()
            .map(|name| name == dependency_dir || ALWAYS_EXCLUDED_DIRS.contains(&name))
            .unwrap_or(false)
}

/// Matches globs against the path relative to `root` and the absolute path.
fn is_ignored(ignore: &GlobSet, root: &Path, path: &Path) -> bool {
    if ignore.is_empty() {
        return false;
    }
    let relative = path.strip_prefix(root).unwrap_or(path);
    ignore.is_match(relative) || ignore.is_match(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn touch(root: &Path, rel: &str) {
        let path = root.join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, "export {};\n").unwrap();
    }

    fn names(root: &Path, files: &[PathBuf]) -> Vec<String> {
        let root = dunce::canonicalize(root).unwrap();
        files
            .iter()
            .map(|f| {
                f.strip_prefix(&root)
                    .unwrap()
                    .to_string_lossy()
                    .replace('\\', "/")
            })
            .collect()
    }

    fn fixture() -> tempfile::TempDir {
        let tmp = tempfile::tempdir().unwrap();
        touch(tmp.path(), "index.ts");
        touch(tmp.path(), "view.tsx");
        touch(tmp.path(), "types.d.ts");
        touch(tmp.path(), "readme.md");
        touch(tmp.path(), "src/lib/util.ts");
        touch(tmp.path(), "src/util.spec.ts");
        touch(tmp.path(), "node_modules/pkg/index.ts");
        touch(tmp.path(), ".git/hooks/x.ts");
        tmp
    }

    #[test]
    fn test_recursive_listing_excludes_declarations_and_dependencies() {
        let tmp = fixture();
        let files = list_source_files(tmp.path(), &ScanOptions::default()).unwrap();
        assert_eq!(
            names(tmp.path(), &files),
            vec!["index.ts", "src/lib/util.ts", "src/util.spec.ts", "view.tsx"]
        );
        assert!(files.iter().all(|f| f.is_absolute()));
    }

    #[test]
    fn test_shallow_listing() {
        let tmp = fixture();
        let options = ScanOptions {
            shallow: true,
            ..Default::default()
        };
        let files = list_source_files(tmp.path(), &options).unwrap();
        assert_eq!(names(tmp.path(), &files), vec!["index.ts", "view.tsx"]);
    }

    #[test]
    fn test_ignore_patterns() {
        let tmp = fixture();
        let options = ScanOptions {
            ignore_patterns: vec!["*.spec.ts".into(), "src/lib/**".into()],
            ..Default::default()
        };
        let files = list_source_files(tmp.path(), &options).unwrap();
        assert_eq!(names(tmp.path(), &files), vec!["index.ts", "view.tsx"]);
    }

    #[test]
    fn test_custom_dependency_dir() {
        let tmp = fixture();
        touch(tmp.path(), "vendor/lib.ts");
        let options = ScanOptions {
            dependency_dir: "vendor".into(),
            ..Default::default()
        };
        let found = names(tmp.path(), &list_source_files(tmp.path(), &options).unwrap());
        assert!(!found.iter().any(|f| f.starts_with("vendor/")));
        assert!(found.iter().any(|f| f.starts_with("node_modules/")));
    }

    #[test]
    fn test_single_file_root() {
        let tmp = fixture();
        let files = list_source_files(&tmp.path().join("index.ts"), &ScanOptions::default()).unwrap();
        assert_eq!(files.len(), 1);
        let files = list_source_files(&tmp.path().join("types.d.ts"), &ScanOptions::default()).unwrap();
        assert!(files.is_empty());
    }

    #[test]
    fn test_invalid_glob() {
        let tmp = fixture();
        let options = ScanOptions {
            ignore_patterns: vec!["src/[".into()],
            ..Default::default()
        };
        assert!(matches!(
            list_source_files(tmp.path(), &options),
            Err(AnatomistError::InvalidGlob { .. })
        ));
    }

    #[test]
    fn test_missing_root() {
        assert!(matches!(
            list_source_files(Path::new("/this/does/not/exist"), &ScanOptions::default()),
            Err(AnatomistError::IoError(_))
        ));
    }
}
