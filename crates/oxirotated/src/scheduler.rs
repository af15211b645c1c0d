//! Poll and cron triggers feeding the rotation engine

use chrono::{Local, Utc};
use oxirotate_core::{Result, Timezone, TriggerReason};
use oxirotate_logs::{RotationEngine, RotationError, RotationOutcome};
use oxirotate_notify::{Notifier, RotationEvent};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::cron::CronSchedule;
use crate::lister::ProcessLister;
use crate::targets::resolve_targets;

/// Dispatches target files to the engine on every trigger
pub struct Scheduler {
    engine: Arc<RotationEngine>,
    lister: Arc<dyn ProcessLister>,
    notifier: Arc<dyn Notifier>,
}

impl Scheduler {
    pub fn new(
        engine: Arc<RotationEngine>,
        lister: Arc<dyn ProcessLister>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            engine,
            lister,
            notifier,
        }
    }

    pub fn engine(&self) -> &Arc<RotationEngine> {
        &self.engine
    }

    /// Resolve this tick's files; a lister failure still yields the system logs
    async fn target_paths(&self) -> Vec<PathBuf> {
        let processes = match self.lister.list().await {
            Ok(processes) => processes,
            Err(e) => {
                warn!("Process list unavailable: {}", e);
                report(
                    &self.notifier,
                    RotationEvent::ListFailed {
                        error: e.to_string(),
                    },
                )
                .await;
                Vec::new()
            }
        };

        resolve_targets(&processes, self.engine.config())
            .into_iter()
            .map(|t| t.path)
            .collect()
    }

    /// Run one trigger: every target is evaluated in its own task.
    ///
    /// The returned handles may be dropped; the tasks keep running.
    pub async fn tick(&self, reason: TriggerReason) -> Vec<JoinHandle<()>> {
        let paths = self.target_paths().await;
        debug!("{} tick over {} files", reason, paths.len());

        paths
            .into_iter()
            .map(|path| {
                let engine = Arc::clone(&self.engine);
                let notifier = Arc::clone(&self.notifier);
                tokio::spawn(async move {
                    let result = engine.rotate(&path, reason).await;
                    handle_result(&notifier, &path, result).await;
                })
            })
            .collect()
    }

    /// Size polling loop; the first tick fires after one full interval
    pub async fn run_poll(self: Arc<Self>, every: Duration) {
        let mut interval = tokio::time::interval_at(Instant::now() + every, every);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!("Size polling every {:?}", every);

        loop {
            interval.tick().await;
            self.tick(TriggerReason::Scheduled).await;
        }
    }

    /// Forced rotation loop following `schedule`
    pub async fn run_cron(self: Arc<Self>, schedule: CronSchedule, timezone: Timezone) {
        info!("Forced rotation on '{}' ({:?} time)", schedule, timezone);

        loop {
            let delay = match delay_until_next(&schedule, timezone) {
                Ok(delay) => delay,
                Err(e) => {
                    error!("Cron schedule stopped: {}", e);
                    return;
                }
            };
            debug!("Next forced rotation in {:?}", delay);
            tokio::time::sleep(delay).await;
            self.tick(TriggerReason::Forced).await;
        }
    }
}

fn delay_until_next(schedule: &CronSchedule, timezone: Timezone) -> Result<Duration> {
    let wait = match timezone {
        Timezone::Utc => {
            let now = Utc::now();
            schedule.next_after(&now)? - now
        }
        Timezone::Local => {
            let now = Local::now();
            schedule.next_after(&now)? - now
        }
    };
    Ok(wait.to_std().unwrap_or_default())
}

async fn handle_result(
    notifier: &Arc<dyn Notifier>,
    path: &Path,
    result: oxirotate_logs::Result<RotationOutcome>,
) {
    match result {
        Ok(RotationOutcome::Rotated {
            archive,
            bytes,
            pruned,
            faults,
        }) => {
            if !pruned.is_empty() {
                debug!("Pruned {} archives of {}", pruned.len(), path.display());
            }
            report(
                notifier,
                RotationEvent::Rotated {
                    path: path.display().to_string(),
                    archive: archive.display().to_string(),
                    bytes,
                },
            )
            .await;
            for fault in faults {
                report_fault(notifier, &fault).await;
            }
        }
        Ok(outcome) => debug!("{}: {:?}", path.display(), outcome),
        Err(e) => report_fault(notifier, &e).await,
    }
}

pub(crate) async fn report_fault(notifier: &Arc<dyn Notifier>, fault: &RotationError) {
    warn!("{}", fault);
    report(
        notifier,
        RotationEvent::Failed {
            path: fault.path.display().to_string(),
            kind: fault.kind.as_str().to_string(),
            error: fault.message.clone(),
        },
    )
    .await;
}

async fn report(notifier: &Arc<dyn Notifier>, event: RotationEvent) {
    if let Err(e) = notifier.send_rotation_event(&event).await {
        warn!("Failed to send notification: {}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use oxirotate_core::{Error, ManagedProcess, RotationConfig};
    use oxirotate_notify::mock::MockNotifier;
    use std::fs;
    use tempfile::TempDir;

    use crate::lister::StaticLister;

    struct BrokenLister;

    #[async_trait]
    impl ProcessLister for BrokenLister {
        async fn list(&self) -> Result<Vec<ManagedProcess>> {
            Err(Error::lister("connection refused"))
        }
    }

    fn archive_count(dir: &Path, prefix: &str) -> usize {
        fs::read_dir(dir)
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().starts_with(prefix))
            .count()
    }

    async fn join(handles: Vec<JoinHandle<()>>) {
        for handle in handles {
            handle.await.unwrap();
        }
    }

    fn scheduler(
        root: &Path,
        max_size: u64,
        lister: Arc<dyn ProcessLister>,
        notifier: Arc<MockNotifier>,
    ) -> Scheduler {
        let config = RotationConfig::new(max_size, Some(3)).with_root(root);
        Scheduler::new(Arc::new(RotationEngine::new(config)), lister, notifier)
    }

    #[tokio::test]
    async fn test_scheduled_tick_rotates_oversized_files() {
        let root = TempDir::new().unwrap();
        let logs = root.path().join("logs");
        fs::create_dir(&logs).unwrap();
        let big = logs.join("api-out.log");
        let small = logs.join("api-err.log");
        fs::write(&big, vec![b'x'; 200]).unwrap();
        fs::write(&small, b"tiny").unwrap();

        let lister = Arc::new(StaticLister::new(vec![ManagedProcess::new("api")
            .with_out(&big)
            .with_err(&small)]));
        let notifier = Arc::new(MockNotifier::new());
        let scheduler = scheduler(root.path(), 100, lister, Arc::clone(&notifier));

        join(scheduler.tick(TriggerReason::Scheduled).await).await;

        assert_eq!(fs::metadata(&big).unwrap().len(), 0);
        assert_eq!(fs::metadata(&small).unwrap().len(), 4);
        assert_eq!(archive_count(&logs, "api-out__"), 1);
        assert_eq!(archive_count(&logs, "api-err__"), 0);
        assert_eq!(notifier.events().await.len(), 1);
        assert!(notifier.was_event_type_sent("rotate").await);

        // Both paths were evaluated, so both are watched
        let watched = scheduler.engine().watched().await;
        assert!(watched.contains_key(&big));
        assert!(watched.contains_key(&small));
    }

    #[tokio::test]
    async fn test_forced_tick_rotates_any_non_empty_file() {
        let root = TempDir::new().unwrap();
        let daemon_log = root.path().join("daemon.log");
        let agent_log = root.path().join("agent.log");
        fs::write(&daemon_log, b"started\n").unwrap();
        fs::write(&agent_log, b"").unwrap();

        let lister = Arc::new(StaticLister::default());
        let notifier = Arc::new(MockNotifier::new());
        let scheduler = scheduler(root.path(), 1024 * 1024, lister, Arc::clone(&notifier));

        join(scheduler.tick(TriggerReason::Forced).await).await;

        assert_eq!(fs::metadata(&daemon_log).unwrap().len(), 0);
        assert_eq!(archive_count(root.path(), "daemon__"), 1);
        assert_eq!(archive_count(root.path(), "agent__"), 0);
    }

    #[tokio::test]
    async fn test_lister_failure_still_rotates_system_logs() {
        let root = TempDir::new().unwrap();
        let daemon_log = root.path().join("daemon.log");
        fs::write(&daemon_log, b"boot\n").unwrap();

        let notifier = Arc::new(MockNotifier::new());
        let scheduler = scheduler(root.path(), 1, Arc::new(BrokenLister), Arc::clone(&notifier));

        join(scheduler.tick(TriggerReason::Scheduled).await).await;

        assert_eq!(archive_count(root.path(), "daemon__"), 1);
        let events = notifier.events().await;
        assert!(events
            .iter()
            .any(|e| matches!(e, RotationEvent::ListFailed { error } if error.contains("connection refused"))));
        assert!(notifier.was_event_type_sent("rotate").await);
    }

    #[tokio::test]
    async fn test_faults_are_reported_and_do_not_stop_other_paths() {
        let root = TempDir::new().unwrap();
        let logs = root.path().join("logs");
        fs::create_dir(&logs).unwrap();
        // A directory where a log file is expected is an invalid target
        let bogus = logs.join("bad-out.log");
        fs::create_dir(&bogus).unwrap();
        let good = logs.join("good-out.log");
        fs::write(&good, vec![b'y'; 50]).unwrap();

        let lister = Arc::new(StaticLister::new(vec![
            ManagedProcess::new("bad").with_out(&bogus),
            ManagedProcess::new("good").with_out(&good),
        ]));
        let notifier = Arc::new(MockNotifier::new());
        let scheduler = scheduler(root.path(), 10, lister, Arc::clone(&notifier));

        join(scheduler.tick(TriggerReason::Scheduled).await).await;

        assert_eq!(fs::metadata(&good).unwrap().len(), 0);
        let events = notifier.events().await;
        assert!(events.iter().any(|e| matches!(
            e,
            RotationEvent::Failed { kind, .. } if kind == "invalid_target"
        )));
        assert!(events
            .iter()
            .any(|e| matches!(e, RotationEvent::Rotated { .. })));
    }

    #[tokio::test]
    async fn test_failing_notifier_is_not_fatal() {
        let root = TempDir::new().unwrap();
        let daemon_log = root.path().join("daemon.log");
        fs::write(&daemon_log, b"boot\n").unwrap();

        let notifier = Arc::new(MockNotifier::failing());
        let scheduler = scheduler(
            root.path(),
            1,
            Arc::new(StaticLister::default()),
            Arc::clone(&notifier),
        );

        join(scheduler.tick(TriggerReason::Scheduled).await).await;
        assert_eq!(archive_count(root.path(), "daemon__"), 1);
        assert_eq!(notifier.call_count(), 1);
    }

    #[test]
    fn test_delay_until_next_is_bounded() {
        let schedule = CronSchedule::parse("* * * * *").unwrap();
        let delay = delay_until_next(&schedule, Timezone::Utc).unwrap();
        assert!(delay <= Duration::from_secs(60));
    }
}
