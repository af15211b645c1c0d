//! Rotation executor: size/force decision and the copy -> truncate -> prune pipeline

use chrono::Utc;
use oxirotate_core::{is_null_target, RotationConfig, TriggerReason};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::archive::write_archive;
use crate::error::{Result, RotationError, RotationErrorKind};
use crate::guard::InFlight;
use crate::naming::ArchiveNamer;
use crate::registry::WatchedRegistry;
use crate::retention;
use crate::stats;

/// Successful result of evaluating one path
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RotationOutcome {
    Rotated {
        archive: PathBuf,
        /// Bytes moved out of the live file
        bytes: u64,
        /// Archives removed by retention
        pruned: Vec<PathBuf>,
        /// Non-fatal retention faults (listing or single deletions)
        faults: Vec<RotationError>,
    },
    /// Source does not exist
    SkippedMissing,
    /// Another trigger is rotating this path right now
    SkippedInFlight,
    /// Empty file on a scheduled tick
    NoOpTooSmall,
    NoOpBelowThreshold { size: u64 },
}

impl RotationOutcome {
    pub fn archive(&self) -> Option<&Path> {
        match self {
            RotationOutcome::Rotated { archive, .. } => Some(archive),
            _ => None,
        }
    }

    pub fn is_rotated(&self) -> bool {
        matches!(self, RotationOutcome::Rotated { .. })
    }
}

/// Rotation engine shared by both triggers
#[derive(Debug)]
pub struct RotationEngine {
    config: Arc<RotationConfig>,
    registry: WatchedRegistry,
    in_flight: InFlight,
    #[cfg(test)]
    refuse_truncate: bool,
}

impl RotationEngine {
    pub fn new(config: RotationConfig) -> Self {
        Self {
            config: Arc::new(config),
            registry: WatchedRegistry::new(),
            in_flight: InFlight::new(),
            #[cfg(test)]
            refuse_truncate: false,
        }
    }

    pub fn config(&self) -> &RotationConfig {
        &self.config
    }

    pub fn registry(&self) -> &WatchedRegistry {
        &self.registry
    }

    pub fn in_flight(&self) -> &InFlight {
        &self.in_flight
    }

    /// Watched path -> current size
    pub async fn watched(&self) -> BTreeMap<PathBuf, u64> {
        self.registry.sizes().await
    }

    /// File name -> size for the root log directory
    pub async fn root_contents(&self) -> Result<BTreeMap<String, u64>> {
        stats::dir_contents(&self.config.logs_dir()).await
    }

    /// Entry point for both triggers
    pub async fn rotate(&self, path: &Path, reason: TriggerReason) -> Result<RotationOutcome> {
        self.proceed(path, reason.is_forced()).await
    }

    /// Evaluate one path and rotate it if it qualifies.
    ///
    /// A path is rotated only when it is non-empty and either at least
    /// `max_size_bytes` long or `force` is set.
    pub async fn proceed(&self, path: &Path, force: bool) -> Result<RotationOutcome> {
        if is_null_target(path) {
            return Err(RotationError::invalid_target(path));
        }

        match tokio::fs::try_exists(path).await {
            Ok(true) => {}
            Ok(false) => {
                debug!("Skipping missing log file {}", path.display());
                return Ok(RotationOutcome::SkippedMissing);
            }
            Err(e) => return Err(RotationError::io(RotationErrorKind::StatFailure, path, &e)),
        }

        self.registry.register(path);

        let Some(_guard) = self.in_flight.try_acquire(path) else {
            debug!("Rotation already in flight for {}", path.display());
            return Ok(RotationOutcome::SkippedInFlight);
        };

        let metadata = match tokio::fs::metadata(path).await {
            Ok(m) => m,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(RotationOutcome::SkippedMissing);
            }
            Err(e) => return Err(RotationError::io(RotationErrorKind::StatFailure, path, &e)),
        };
        if !metadata.is_file() {
            return Err(RotationError::invalid_target(path));
        }

        let size = metadata.len();
        if size == 0 && !force {
            return Ok(RotationOutcome::NoOpTooSmall);
        }
        if !(size > 0 && (size >= self.config.max_size_bytes || force)) {
            return Ok(RotationOutcome::NoOpBelowThreshold { size });
        }

        self.rotate_file(path).await
    }

    async fn rotate_file(&self, path: &Path) -> Result<RotationOutcome> {
        let namer = ArchiveNamer::new(path, &self.config, Utc::now())
            .ok_or_else(|| RotationError::invalid_target(path))?;

        let source = path.to_path_buf();
        let copy_namer = namer.clone();
        let compress = self.config.compress;
        let (archive, bytes) =
            tokio::task::spawn_blocking(move || write_archive(&source, &copy_namer, compress))
                .await
                .map_err(|e| {
                    RotationError::new(
                        RotationErrorKind::WriteFailure,
                        path,
                        format!("copy task aborted: {}", e),
                    )
                })??;

        // Anything written between the copy finishing and this point is lost
        if let Err(e) = self.truncate(path).await {
            warn!(
                "Archived {} to {} but failed to truncate: {}",
                path.display(),
                archive.display(),
                e
            );
            return Err(RotationError::new(
                RotationErrorKind::TruncateFailure,
                path,
                format!("{} (archive {} kept)", e, archive.display()),
            ));
        }

        info!(
            "Rotated {} -> {} ({} bytes)",
            path.display(),
            archive.display(),
            bytes
        );

        let mut pruned = Vec::new();
        let mut faults = Vec::new();
        if let Some(retain) = self.config.retain {
            match retention::prune(namer.dir(), namer.prefix(), retain).await {
                Ok(report) => {
                    pruned = report.deleted;
                    faults = report.failures;
                }
                Err(e) => {
                    warn!("Retention skipped for {}: {}", path.display(), e);
                    faults.push(e);
                }
            }
        }

        Ok(RotationOutcome::Rotated {
            archive,
            bytes,
            pruned,
            faults,
        })
    }

    async fn truncate(&self, path: &Path) -> std::io::Result<()> {
        #[cfg(test)]
        if self.refuse_truncate {
            return Err(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                "truncate refused",
            ));
        }

        let file = tokio::fs::OpenOptions::new().write(true).open(path).await?;
        file.set_len(0).await
    }
}
