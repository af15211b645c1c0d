//! Constants and default values for OxiRotate

use std::path::{Path, PathBuf};

/// Environment variable overriding the root directory
pub const ROOT_ENV: &str = "OXIROTATE_ROOT";

/// Default root directory name (shared with the process manager home)
pub const ROOT_DIR: &str = ".oxidepm";

/// Log directory name under the root
pub const LOGS_DIR: &str = "logs";

/// System log files under the root, rotated on every tick
pub const SYSTEM_LOG_FILES: &[&str] = &["daemon.log", "agent.log"];

/// Paths that are never rotated
pub const NULL_DEVICES: &[&str] = &["/dev/null", "NUL"];

/// Separator between the base name and the disambiguator in archive names
pub const ARCHIVE_SEPARATOR: &str = "__";

/// Extension of every archive
pub const ARCHIVE_EXTENSION: &str = "log";

/// Extra suffix appended to compressed archives
pub const COMPRESSED_SUFFIX: &str = "gz";

/// Default config file names to search for (in priority order)
pub const CONFIG_FILES: &[&str] = &[
    "oxirotate.toml",
    "oxirotate.yaml",
    "oxirotate.yml",
    "oxirotate.json",
];

/// Default rotation threshold
pub const DEFAULT_MAX_SIZE: &str = "10M";

/// Default number of archives kept per base file
pub const DEFAULT_RETAIN: usize = 30;

/// Default archive timestamp pattern
pub const DEFAULT_DATE_FORMAT: &str = "YYYY-MM-DD_HH-mm-ss";

/// Default forced rotation schedule (daily at midnight)
pub const DEFAULT_ROTATE_CRON: &str = "0 0 * * *";

/// Default size polling interval in seconds
pub const DEFAULT_WORKER_INTERVAL_SECS: i64 = 30;

/// Worker interval value that disables size polling
pub const WORKER_INTERVAL_DISABLED: i64 = -1;

/// Gauge refresh interval in seconds
pub const GAUGE_REFRESH_SECS: u64 = 10;

/// Get the OxiRotate root directory
pub fn default_root() -> PathBuf {
    if let Some(root) = std::env::var_os(ROOT_ENV).filter(|v| !v.is_empty()) {
        return PathBuf::from(root);
    }
    dirs::home_dir()
        .map(|h| h.join(ROOT_DIR))
        .unwrap_or_else(|| PathBuf::from(ROOT_DIR))
}

/// Get the log directory under a root
pub fn logs_dir(root: &Path) -> PathBuf {
    root.join(LOGS_DIR)
}

/// Get the system log paths under a root
pub fn system_log_paths(root: &Path) -> Vec<PathBuf> {
    SYSTEM_LOG_FILES.iter().map(|f| root.join(f)).collect()
}

/// Check whether a path is empty or a null device
pub fn is_null_target(path: &Path) -> bool {
    let raw = path.as_os_str();
    raw.is_empty() || NULL_DEVICES.iter().any(|d| raw == *d)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_log_paths() {
        let paths = system_log_paths(Path::new("/srv/pm"));
        assert_eq!(paths.len(), 2);
        assert_eq!(paths[0], PathBuf::from("/srv/pm/daemon.log"));
        assert_eq!(paths[1], PathBuf::from("/srv/pm/agent.log"));
    }

    #[test]
    fn test_logs_dir() {
        assert_eq!(logs_dir(Path::new("/srv/pm")), PathBuf::from("/srv/pm/logs"));
    }

    #[test]
    fn test_null_targets() {
        assert!(is_null_target(Path::new("")));
        assert!(is_null_target(Path::new("/dev/null")));
        assert!(is_null_target(Path::new("NUL")));
        assert!(!is_null_target(Path::new("/tmp/app-out.log")));
    }
}
