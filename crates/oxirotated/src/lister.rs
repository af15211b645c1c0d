//! Process listers: where the scheduler learns which logs exist

use async_trait::async_trait;
use oxirotate_core::{Error, ListerKind, ManagedProcess, Result};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::debug;

const OUT_SUFFIX: &str = "-out.log";
const ERR_SUFFIX: &str = "-err.log";

/// Source of the managed process list, queried once per tick
#[async_trait]
pub trait ProcessLister: Send + Sync {
    async fn list(&self) -> Result<Vec<ManagedProcess>>;
}

/// Fixed list declared under `apps` in the config file
#[derive(Debug, Clone, Default)]
pub struct StaticLister {
    processes: Vec<ManagedProcess>,
}

impl StaticLister {
    pub fn new(processes: Vec<ManagedProcess>) -> Self {
        Self { processes }
    }
}

#[async_trait]
impl ProcessLister for StaticLister {
    async fn list(&self) -> Result<Vec<ManagedProcess>> {
        Ok(self.processes.clone())
    }
}

/// Infers processes from `<app>-out.log` / `<app>-err.log` in a log directory.
///
/// Every distinct `<app>` is its own process. Cluster instances write to
/// their own files (`api-0-out.log`, `api-1-out.log`), so none of them may be
/// folded into another.
#[derive(Debug, Clone)]
pub struct LogDirLister {
    dir: PathBuf,
}

impl LogDirLister {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

#[async_trait]
impl ProcessLister for LogDirLister {
    async fn list(&self) -> Result<Vec<ManagedProcess>> {
        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("Log directory {} does not exist yet", self.dir.display());
                return Ok(Vec::new());
            }
            Err(e) => {
                return Err(Error::lister(format!(
                    "cannot read {}: {}",
                    self.dir.display(),
                    e
                )))
            }
        };

        // Keyed by app name so listing order is stable
        let mut apps: BTreeMap<String, ManagedProcess> = BTreeMap::new();

        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| Error::lister(format!("cannot read {}: {}", self.dir.display(), e)))?
        {
            let file_name = entry.file_name();
            let Some(file_name) = file_name.to_str() else {
                continue;
            };

            let (app, is_out) = if let Some(app) = file_name.strip_suffix(OUT_SUFFIX) {
                (app, true)
            } else if let Some(app) = file_name.strip_suffix(ERR_SUFFIX) {
                (app, false)
            } else {
                continue;
            };
            if app.is_empty() {
                continue;
            }

            let process = apps
                .entry(app.to_string())
                .or_insert_with(|| ManagedProcess::new(app));

            let path = entry.path();
            if is_out {
                process.out_log = Some(path);
            } else {
                process.err_log = Some(path);
            }
        }

        Ok(apps.into_values().collect())
    }
}

/// Build the lister selected by configuration
pub fn build_lister(
    kind: ListerKind,
    apps: Vec<ManagedProcess>,
    logs_dir: &Path,
) -> Box<dyn ProcessLister> {
    match kind {
        ListerKind::Static => Box::new(StaticLister::new(apps)),
        ListerKind::LogDir => Box::new(LogDirLister::new(logs_dir)),
    }
}
