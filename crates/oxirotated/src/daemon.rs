//! Main daemon orchestration

use anyhow::{Context, Result};
use oxirotate_core::{constants, ConfigFile, ListerKind, ManagedProcess, RotationConfig};
use oxirotate_logs::{LogDirGauges, RotationEngine};
use oxirotate_notify::{NotificationManager, Notifier, NotifyConfig};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::cron::CronSchedule;
use crate::lister::build_lister;
use crate::scheduler::{report_fault, Scheduler};

/// Startup options coming from the command line
#[derive(Debug, Clone, Default)]
pub struct DaemonOptions {
    /// Explicit config file; otherwise the root directory is searched
    pub config_path: Option<PathBuf>,
    /// Overrides `root_path` from the config file
    pub root: Option<PathBuf>,
}

/// Everything the daemon needs, resolved from the config file
#[derive(Debug)]
pub struct LoadedConfig {
    pub rotation: RotationConfig,
    pub lister: ListerKind,
    pub apps: Vec<ManagedProcess>,
    pub source: Option<PathBuf>,
}

/// Load the config file (explicit path, else the first one found in the root)
pub fn load_config(options: &DaemonOptions) -> Result<LoadedConfig> {
    let search_root = options.root.clone().unwrap_or_else(constants::default_root);

    let found = match &options.config_path {
        Some(path) => Some((ConfigFile::load(path)?, path.clone())),
        None => ConfigFile::find_and_load(&search_root)?,
    };

    let (file, source) = match found {
        Some((file, path)) => (file, Some(path)),
        None => (ConfigFile::default(), None),
    };

    let mut rotation = file.rotation_config()?;
    if let Some(root) = &options.root {
        rotation.root_path = root.clone();
    }

    Ok(LoadedConfig {
        rotation,
        lister: file.lister_kind(),
        apps: file.apps,
        source,
    })
}

fn load_notifier(root: &Path) -> Arc<dyn Notifier> {
    match NotificationManager::from_root(root) {
        Ok(manager) => {
            if manager.is_configured() {
                info!("Notifications enabled");
            }
            Arc::new(manager)
        }
        Err(e) => {
            warn!("Ignoring notification config: {}", e);
            Arc::new(NotificationManager::new(NotifyConfig::default()))
        }
    }
}

/// Main daemon struct
pub struct Daemon {
    scheduler: Arc<Scheduler>,
    notifier: Arc<dyn Notifier>,
    gauges: Arc<LogDirGauges>,
    cron: Option<CronSchedule>,
}

impl Daemon {
    /// Create a new daemon instance
    pub fn new(options: DaemonOptions) -> Result<Self> {
        let loaded = load_config(&options)?;
        match &loaded.source {
            Some(path) => info!("Loaded config from {}", path.display()),
            None => info!("No config file found, using defaults"),
        }

        let cron = loaded
            .rotation
            .rotate_cron
            .as_deref()
            .map(CronSchedule::parse)
            .transpose()
            .context("rotate_cron")?;

        let root = loaded.rotation.root_path.clone();
        let logs_dir = loaded.rotation.logs_dir();
        info!(
            "Watching {} (max {} bytes, retain {:?}, compress {})",
            logs_dir.display(),
            loaded.rotation.max_size_bytes,
            loaded.rotation.retain,
            loaded.rotation.compress
        );

        let lister = build_lister(loaded.lister, loaded.apps, &logs_dir);
        let engine = Arc::new(RotationEngine::new(loaded.rotation));
        let notifier = load_notifier(&root);
        let scheduler = Scheduler::new(engine, Arc::from(lister), Arc::clone(&notifier));

        Ok(Self {
            scheduler: Arc::new(scheduler),
            notifier,
            gauges: Arc::new(LogDirGauges::new()),
            cron,
        })
    }

    pub fn gauges(&self) -> &Arc<LogDirGauges> {
        &self.gauges
    }

    /// Run the triggers and the gauge refresher until the process is stopped
    pub async fn run(&self) {
        let config = self.scheduler.engine().config().clone();
        let mut tasks = JoinSet::new();

        tasks.spawn(refresh_gauges(
            Arc::clone(&self.gauges),
            Arc::clone(&self.notifier),
            config.logs_dir(),
            Duration::from_secs(constants::GAUGE_REFRESH_SECS),
        ));

        let poll = config.poll_interval();
        if let Some(every) = poll {
            tasks.spawn(Arc::clone(&self.scheduler).run_poll(every));
        }
        if let Some(cron) = self.cron.clone() {
            tasks.spawn(Arc::clone(&self.scheduler).run_cron(cron, config.timezone));
        }
        if poll.is_none() && self.cron.is_none() {
            warn!("Size polling and forced rotation are both disabled; only refreshing gauges");
        }

        info!("Daemon running");
        while tasks.join_next().await.is_some() {}
    }
}

/// Refresh the log directory gauges forever, reporting once per failure streak
async fn refresh_gauges(
    gauges: Arc<LogDirGauges>,
    notifier: Arc<dyn Notifier>,
    dir: PathBuf,
    every: Duration,
) {
    let mut interval = tokio::time::interval(every);
    let mut failing = false;

    loop {
        interval.tick().await;
        match gauges.refresh(&dir).await {
            Ok(()) => {
                failing = false;
                debug!(
                    "Log dir: {} files, {} bytes",
                    gauges.file_count(),
                    gauges.total_bytes()
                );
            }
            Err(e) if !failing => {
                failing = true;
                report_fault(&notifier, &e).await;
            }
            Err(_) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use oxirotate_notify::mock::MockNotifier;
    use oxirotate_notify::RotationEvent;
    use std::fs;
    use tempfile::TempDir;

    fn options(root: &Path) -> DaemonOptions {
        DaemonOptions {
            config_path: None,
            root: Some(root.to_path_buf()),
        }
    }

    #[test]
    fn test_load_defaults_without_file() {
        let root = TempDir::new().unwrap();
        let loaded = load_config(&options(root.path())).unwrap();
        assert!(loaded.source.is_none());
        assert_eq!(loaded.rotation.root_path, root.path());
        assert_eq!(loaded.rotation.retain, Some(30));
        assert_eq!(loaded.lister, ListerKind::LogDir);
    }

    #[test]
    fn test_load_config_from_root() {
        let root = TempDir::new().unwrap();
        fs::write(
            root.path().join("oxirotate.toml"),
            r#"
max_size = "1K"
retain = 2
rotate_cron = ""

[[apps]]
name = "api"
out_log = "/var/log/api-out.log"
"#,
        )
        .unwrap();

        let loaded = load_config(&options(root.path())).unwrap();
        assert_eq!(loaded.source, Some(root.path().join("oxirotate.toml")));
        assert_eq!(loaded.rotation.max_size_bytes, 1024);
        assert_eq!(loaded.rotation.retain, Some(2));
        assert!(loaded.rotation.rotate_cron.is_none());
        assert_eq!(loaded.lister, ListerKind::Static);
        assert_eq!(loaded.apps.len(), 1);
    }

    #[test]
    fn test_explicit_config_path() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("custom.yaml");
        fs::write(&path, "compress: true\n").unwrap();

        let loaded = load_config(&DaemonOptions {
            config_path: Some(path.clone()),
            root: Some(dir.path().to_path_buf()),
        })
        .unwrap();
        assert!(loaded.rotation.compress);
        assert_eq!(loaded.source, Some(path));
    }

    #[test]
    fn test_missing_explicit_config_fails() {
        let dir = TempDir::new().unwrap();
        let result = load_config(&DaemonOptions {
            config_path: Some(dir.path().join("nope.toml")),
            root: None,
        });
        assert!(result.is_err());
    }

    #[test]
    fn test_invalid_cron_fails_startup() {
        let root = TempDir::new().unwrap();
        fs::write(root.path().join("oxirotate.toml"), "rotate_cron = \"61 * * * *\"\n").unwrap();
        assert!(Daemon::new(options(root.path())).is_err());
    }

    #[test]
    fn test_daemon_builds_default_schedule() {
        let root = TempDir::new().unwrap();
        let daemon = Daemon::new(options(root.path())).unwrap();
        assert_eq!(
            daemon.cron.as_ref().map(|c| c.to_string()),
            Some("0 0 * * *".to_string())
        );
        assert_eq!(daemon.gauges().file_count(), 0);
    }

    #[tokio::test]
    async fn test_refresh_gauges_tracks_log_dir() {
        let root = TempDir::new().unwrap();
        fs::write(root.path().join("api-out.log"), b"12345").unwrap();
        let gauges = Arc::new(LogDirGauges::new());

        let notifier = Arc::new(MockNotifier::new());

        let task = tokio::spawn(refresh_gauges(
            Arc::clone(&gauges),
            notifier.clone(),
            root.path().to_path_buf(),
            Duration::from_millis(10),
        ));
        tokio::time::sleep(Duration::from_millis(100)).await;
        task.abort();

        assert_eq!(gauges.file_count(), 1);
        assert_eq!(gauges.total_bytes(), 5);
        assert!(notifier.events().await.is_empty());
    }

    #[tokio::test]
    async fn test_gauge_failure_notifies_once_per_streak() {
        let root = TempDir::new().unwrap();
        let dir = root.path().join("logs");
        let gauges = Arc::new(LogDirGauges::new());
        let notifier = Arc::new(MockNotifier::new());

        let task = tokio::spawn(refresh_gauges(
            Arc::clone(&gauges),
            notifier.clone(),
            dir.clone(),
            Duration::from_millis(10),
        ));
        tokio::time::sleep(Duration::from_millis(100)).await;

        let events = notifier.events().await;
        assert_eq!(events.len(), 1);
        assert!(matches!(
            &events[0],
            RotationEvent::Failed { kind, path, .. }
                if kind == "directory_list_failure" && path == &dir.display().to_string()
        ));

        // Recovery ends the streak; the next failure is reported again
        fs::create_dir(&dir).unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;
        fs::remove_dir(&dir).unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;
        task.abort();

        assert_eq!(notifier.events().await.len(), 2);
    }
}
