//! Root log directory listing and size gauges

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::{Result, RotationError, RotationErrorKind};

/// File name -> size for regular files directly in `dir`
pub async fn dir_contents(dir: &Path) -> Result<BTreeMap<String, u64>> {
    let list_err = |e: std::io::Error| {
        RotationError::io(RotationErrorKind::DirectoryListFailure, dir, &e)
    };

    let mut entries = tokio::fs::read_dir(dir).await.map_err(list_err)?;
    let mut contents = BTreeMap::new();

    while let Some(entry) = entries.next_entry().await.map_err(list_err)? {
        // Entries can vanish between listing and stat (pruned concurrently)
        let Ok(metadata) = entry.metadata().await else {
            continue;
        };
        if !metadata.is_file() {
            continue;
        }
        contents.insert(
            entry.file_name().to_string_lossy().into_owned(),
            metadata.len(),
        );
    }

    Ok(contents)
}

/// Aggregate size and file count of the root log directory
#[derive(Debug, Default)]
pub struct LogDirGauges {
    total_bytes: AtomicU64,
    file_count: AtomicU64,
}

impl LogDirGauges {
    pub fn new() -> Self {
        Self::default()
    }

    /// Recompute both gauges; on failure the previous values are kept
    pub async fn refresh(&self, dir: &Path) -> Result<()> {
        let contents = dir_contents(dir).await?;
        let total: u64 = contents.values().sum();
        self.total_bytes.store(total, Ordering::Relaxed);
        self.file_count
            .store(contents.len() as u64, Ordering::Relaxed);
        Ok(())
    }

    pub fn total_bytes(&self) -> u64 {
        self.total_bytes.load(Ordering::Relaxed)
    }

    pub fn file_count(&self) -> u64 {
        self.file_count.load(Ordering::Relaxed)
    }
}
