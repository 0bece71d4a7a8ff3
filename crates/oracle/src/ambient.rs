//! Ambient type packages: which bare import specifiers the oracle may trust.
//!
//! The dependency scanner walks from the project root up to the nearest VCS
//! root, reads every `package.json` on the way and collects the package
//! names listed in its dependency tables. A class imported from a package
//! outside that set has no declarations available, so constructing it is
//! typed `any` instead of by name.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::{debug, warn};

const MANIFEST: &str = "package.json";

/// Node built-in modules importable without the `node:` prefix.
const NODE_BUILTINS: &[&str] = &[
    "assert", "buffer", "child_process", "crypto", "events", "fs", "http", "https", "net", "os",
    "path", "process", "querystring", "readline", "stream", "url", "util", "worker_threads", "zlib",
];

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct Manifest {
    dependencies: HashMap<String, serde_json::Value>,
    dev_dependencies: HashMap<String, serde_json::Value>,
    peer_dependencies: HashMap<String, serde_json::Value>,
    optional_dependencies: HashMap<String, serde_json::Value>,
}

impl Manifest {
    fn package_names(self) -> impl Iterator<Item = String> {
        self.dependencies
            .into_keys()
            .chain(self.dev_dependencies.into_keys())
            .chain(self.peer_dependencies.into_keys())
            .chain(self.optional_dependencies.into_keys())
    }
}

/// Directories from `start` (or its parent, for a file) up to and including
/// the first one that contains `.git`. Without a VCS root the walk ends at
/// the filesystem root.
fn directories_to_vcs_root(start: &Path) -> Vec<PathBuf> {
    let mut dir = if start.is_dir() {
        start.to_path_buf()
    } else {
        start.parent().unwrap_or_else(|| Path::new(".")).to_path_buf()
    };
    let mut dirs = Vec::new();
    loop {
        let is_vcs_root = dir.join(".git").exists();
        dirs.push(dir.clone());
        if is_vcs_root || !dir.pop() {
            break;
        }
    }
    dirs
}

/// Deduplicated, sorted package names referenced by any manifest between
/// `root` and the nearest VCS root.
///
/// Unreadable or malformed manifests are logged and skipped.
pub fn scan_dependencies(root: &Path) -> Vec<String> {
    let mut names = BTreeSet::new();
    for dir in directories_to_vcs_root(root) {
        let path = dir.join(MANIFEST);
        if !path.is_file() {
            continue;
        }
        let manifest = std::fs::read_to_string(&path)
            .map_err(|e| e.to_string())
            .and_then(|text| serde_json::from_str::<Manifest>(&text).map_err(|e| e.to_string()));
        match manifest {
            Ok(manifest) => {
                let before = names.len();
                names.extend(manifest.package_names());
                debug!(manifest = %path.display(), added = names.len() - before, "read dependencies");
            }
            Err(reason) => warn!(manifest = %path.display(), %reason, "skipping unreadable manifest"),
        }
    }
    names.into_iter().collect()
}

/// The set of packages whose type declarations are assumed available.
#[derive(Debug, Clone, Default)]
pub struct AmbientTypes {
    packages: HashSet<String>,
}

impl AmbientTypes {
    pub fn new(packages: impl IntoIterator<Item = String>) -> Self {
        Self {
            packages: packages.into_iter().collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.packages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }

    /// `true` if declarations for `specifier` can be expected: relative
    /// imports always, packages when they or their `@types/` companion are
    /// listed, Node built-ins when `@types/node` is.
    pub fn resolves(&self, specifier: &str) -> bool {
        if specifier.starts_with('.') || specifier.starts_with('/') {
            return true;
        }
        if let Some(builtin) = specifier.strip_prefix("node:") {
            return !builtin.is_empty() && self.packages.contains("@types/node");
        }
        let package = package_name(specifier);
        if NODE_BUILTINS.contains(&package) && self.packages.contains("@types/node") {
            return true;
        }
        self.packages.contains(package) || self.packages.contains(&types_companion(package))
    }
}

/// `lodash/fp` → `lodash`, `@scope/pkg/sub` → `@scope/pkg`.
fn package_name(specifier: &str) -> &str {
    let segments = if specifier.starts_with('@') { 2 } else { 1 };
    match specifier.match_indices('/').nth(segments - 1) {
        Some((idx, _)) => &specifier[..idx],
        None => specifier,
    }
}

/// `react` → `@types/react`, `@scope/pkg` → `@types/scope__pkg`.
fn types_companion(package: &str) -> String {
    match package.strip_prefix('@') {
        Some(scoped) => format!("@types/{}", scoped.replacen('/', "__", 1)),
        None => format!("@types/{package}"),
    }
}
