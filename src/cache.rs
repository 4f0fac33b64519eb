//! Permanent cache utilities
//!
//! Models pulled with `save_to_cache` and staged pushes live under one root:
//! ```text
//! ~/.cache/model-manager/
//! ├── repos--acme--sentiment-small/
//! │   ├── config.yaml
//! │   └── model.pt
//! └── repos--acme--tagger-base/
//!     └── ...
//! ```

use crate::config::CONFIG_FILENAME;
use std::path::{Path, PathBuf};

/// Resolve the permanent cache root
///
/// Checks in order:
/// 1. `$MODEL_MANAGER_HOME`
/// 2. `$XDG_CACHE_HOME/model-manager`
/// 3. `~/.cache/model-manager`
pub fn cache_root() -> PathBuf {
    if let Ok(home) = std::env::var("MODEL_MANAGER_HOME") {
        return PathBuf::from(home);
    }

    if let Ok(xdg_cache) = std::env::var("XDG_CACHE_HOME") {
        return PathBuf::from(xdg_cache).join("model-manager");
    }

    dirs::home_dir()
        .map(|h| h.join(".cache/model-manager"))
        .unwrap_or_else(|| PathBuf::from("/tmp/model-manager"))
}

/// Per-process temp cache for hub downloads
///
/// Unique per-process paths stand in for cross-process locking.
pub fn tmp_cache_dir() -> PathBuf {
    std::env::temp_dir().join(format!("model-manager-{}", std::process::id()))
}

/// Convert a repo id to a cache directory name
///
/// e.g., "acme/sentiment-small" -> "repos--acme--sentiment-small"
fn repo_to_dir_name(repo_id: &str) -> String {
    format!("repos--{}", repo_id.replace('/', "--"))
}

/// Convert a cache directory name back to a repo id
fn dir_name_to_repo(name: &str) -> Option<String> {
    name.strip_prefix("repos--")
        .map(|s| s.replacen("--", "/", 1))
}

/// Cache directory backing a repo id
pub fn repo_cache_dir(root: &Path, repo_id: &str) -> PathBuf {
    root.join(repo_to_dir_name(repo_id))
}

/// List repo ids with a config file present in the permanent cache
pub fn list_cached_repos(root: &Path) -> Vec<String> {
    let mut repos = Vec::new();

    if let Ok(entries) = std::fs::read_dir(root) {
        for entry in entries.flatten() {
            let name = entry.file_name().to_string_lossy().to_string();
            if let Some(repo_id) = dir_name_to_repo(&name)
                && entry.path().join(CONFIG_FILENAME).is_file()
            {
                repos.push(repo_id);
            }
        }
    }

    repos.sort();
    repos
}

/// Recursively calculate directory size in bytes
pub fn dir_size(path: &Path) -> u64 {
    let mut size = 0;

    if let Ok(entries) = std::fs::read_dir(path) {
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                size += dir_size(&path);
            } else if let Ok(metadata) = std::fs::metadata(&path) {
                size += metadata.len();
            }
        }
    }

    size
}
