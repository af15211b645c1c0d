//! Retention pruning of archives sharing a base prefix

use oxirotate_core::ARCHIVE_SEPARATOR;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::error::{Result, RotationError, RotationErrorKind};
use crate::naming::base_of;

/// What a pruning pass did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PruneReport {
    /// Archives kept, newest first
    pub kept: Vec<PathBuf>,
    pub deleted: Vec<PathBuf>,
    /// Individual deletions that failed
    pub failures: Vec<RotationError>,
}

/// List the archives of one base file, newest first
pub async fn list_archives(dir: &Path, prefix: &str) -> Result<Vec<PathBuf>> {
    let list_err = |e: std::io::Error| {
        RotationError::io(RotationErrorKind::DirectoryListFailure, dir, &e)
    };

    let stem = prefix.strip_suffix(ARCHIVE_SEPARATOR).unwrap_or(prefix);
    let mut entries = tokio::fs::read_dir(dir).await.map_err(list_err)?;
    let mut names = Vec::new();

    while let Some(entry) = entries.next_entry().await.map_err(list_err)? {
        let file_name = entry.file_name();
        let Some(name) = file_name.to_str() else {
            continue;
        };
        // Only archive-shaped siblings; the live file never carries the separator
        if name.starts_with(prefix) && base_of(name) == Some(stem) {
            names.push(name.to_string());
        }
    }

    names.sort();
    names.reverse();
    Ok(names.into_iter().map(|n| dir.join(n)).collect())
}

/// Keep the `retain` newest archives for `prefix` in `dir` and delete the rest.
///
/// A listing failure aborts the pass. Deletion failures are collected in the
/// report and do not stop the remaining deletions.
pub async fn prune(dir: &Path, prefix: &str, retain: usize) -> Result<PruneReport> {
    let mut archives = list_archives(dir, prefix).await?;
    let excess = archives.split_off(retain.min(archives.len()));

    let mut report = PruneReport {
        kept: archives,
        ..Default::default()
    };

    for stale in excess {
        match tokio::fs::remove_file(&stale).await {
            Ok(()) => {
                debug!("Pruned archive {}", stale.display());
                report.deleted.push(stale);
            }
            Err(e) => {
                warn!("Failed to prune archive {}: {}", stale.display(), e);
                report
                    .failures
                    .push(RotationError::io(RotationErrorKind::DeleteFailure, &stale, &e));
            }
        }
    }

    Ok(report)
}
