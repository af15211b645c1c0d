//! Registry of every path the engine has evaluated
//!
//! Append-only: a path stays registered for the lifetime of the engine, even
//! after its process is gone.

use parking_lot::RwLock;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

#[derive(Debug, Default)]
pub struct WatchedRegistry {
    paths: RwLock<BTreeSet<PathBuf>>,
}

impl WatchedRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a path; returns true the first time it is seen
    pub fn register(&self, path: &Path) -> bool {
        if self.paths.read().contains(path) {
            return false;
        }
        self.paths.write().insert(path.to_path_buf())
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.paths.read().contains(path)
    }

    pub fn len(&self) -> usize {
        self.paths.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.read().is_empty()
    }

    /// Registered paths in sorted order
    pub fn paths(&self) -> Vec<PathBuf> {
        self.paths.read().iter().cloned().collect()
    }

    /// Current size of every registered path (0 if it no longer exists)
    pub async fn sizes(&self) -> BTreeMap<PathBuf, u64> {
        let mut sizes = BTreeMap::new();
        for path in self.paths() {
            let size = tokio::fs::metadata(&path)
                .await
                .map(|m| m.len())
                .unwrap_or(0);
            sizes.insert(path, size);
        }
        sizes
    }
}
