//! Configuration file parsing for OxiRotate
//!
//! Supports multiple configuration file formats:
//! - TOML (.toml)
//! - YAML (.yaml, .yml)
//! - JSON (.json)
//!
//! Keys are snake_case; the camelCase names used by the PM2 logrotate module
//! (`maxSize`, `workerInterval`, ...) are accepted as aliases.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::constants::*;
use crate::datefmt;
use crate::error::{Error, Result};
use crate::size::parse_size;
use crate::types::{ListerKind, ManagedProcess, Timezone};

/// Default rotation threshold in bytes (10MB)
const DEFAULT_MAX_SIZE_BYTES: u64 = 10 * 1024 * 1024;

/// Default strftime form of `DEFAULT_DATE_FORMAT`
const DEFAULT_DATE_FORMAT_STRFTIME: &str = "%Y-%m-%d_%H-%M-%S";

/// Supported configuration file formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Toml,
    Yaml,
    Json,
}

impl ConfigFormat {
    /// Detect format from file extension
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "toml" => Some(ConfigFormat::Toml),
            "yaml" | "yml" => Some(ConfigFormat::Yaml),
            "json" => Some(ConfigFormat::Json),
            _ => None,
        }
    }

    /// Detect format from file path
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_extension)
    }
}

/// Integer option that may also be written as a string ("30", "all")
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum Lenient {
    Int(i64),
    Text(String),
}

impl Lenient {
    fn as_int(&self, key: &str) -> Result<i64> {
        match self {
            Lenient::Int(v) => Ok(*v),
            Lenient::Text(s) => s
                .trim()
                .parse()
                .map_err(|_| Error::config(format!("{} must be an integer, got '{}'", key, s))),
        }
    }
}

/// Configuration file structure (oxirotate.toml/yaml/json)
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFile {
    #[serde(default, alias = "maxSize")]
    pub max_size: Option<String>,
    /// Archives kept per base file; "all" keeps everything
    #[serde(default)]
    pub retain: Option<Lenient>,
    #[serde(default)]
    pub compress: Option<bool>,
    #[serde(default, alias = "dateFormat")]
    pub date_format: Option<String>,
    #[serde(default, alias = "TZ")]
    pub timezone: Option<String>,
    /// Forced rotation schedule; empty string disables it
    #[serde(default, alias = "rotateCron", alias = "rotateInterval")]
    pub rotate_cron: Option<String>,
    /// Size polling interval in seconds; -1 disables polling
    #[serde(default, alias = "workerInterval")]
    pub worker_interval: Option<Lenient>,
    #[serde(default, alias = "rotateModule")]
    pub rotate_module: Option<bool>,
    #[serde(default, alias = "rotateOut")]
    pub rotate_out: Option<bool>,
    #[serde(default, alias = "rotateErr")]
    pub rotate_err: Option<bool>,
    #[serde(default, alias = "rootPath")]
    pub root_path: Option<String>,
    #[serde(default)]
    pub lister: Option<ListerKind>,
    #[serde(default)]
    pub apps: Vec<ManagedProcess>,
}

impl ConfigFile {
    /// Load config from file, automatically detecting format from extension
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(Error::ConfigNotFound(path.to_path_buf()));
        }

        let format = ConfigFormat::from_path(path).ok_or_else(|| {
            Error::ConfigError(format!(
                "Unsupported config file extension: {}. Expected .toml, .yaml, .yml, or .json",
                path.display()
            ))
        })?;

        let content = std::fs::read_to_string(path)?;
        Self::parse(&content, format)
    }

    /// Parse config content with specified format
    pub fn parse(content: &str, format: ConfigFormat) -> Result<Self> {
        match format {
            ConfigFormat::Toml => Ok(toml::from_str(content)?),
            ConfigFormat::Yaml => Ok(serde_yaml::from_str(content)?),
            ConfigFormat::Json => Ok(serde_json::from_str(content)?),
        }
    }

    /// Find and load the first known config file in a directory
    pub fn find_and_load(dir: &Path) -> Result<Option<(Self, PathBuf)>> {
        for name in CONFIG_FILES {
            let path = dir.join(name);
            if path.exists() {
                let config = Self::load(&path)?;
                return Ok(Some((config, path)));
            }
        }
        Ok(None)
    }

    /// Which process lister to use
    pub fn lister_kind(&self) -> ListerKind {
        match self.lister {
            Some(kind) => kind,
            None if !self.apps.is_empty() => ListerKind::Static,
            None => ListerKind::default(),
        }
    }

    /// Build the validated rotation snapshot
    pub fn rotation_config(&self) -> Result<RotationConfig> {
        let defaults = RotationConfig::default();

        let max_size_bytes = match &self.max_size {
            Some(raw) => parse_size(raw)?,
            None => defaults.max_size_bytes,
        };

        let retain = match &self.retain {
            None => defaults.retain,
            Some(Lenient::Text(s))
                if matches!(s.trim().to_lowercase().as_str(), "all" | "none" | "unlimited") =>
            {
                None
            }
            Some(value) => {
                let count = value.as_int("retain")?;
                let count = usize::try_from(count)
                    .map_err(|_| Error::config(format!("retain must be >= 0, got {}", count)))?;
                Some(count)
            }
        };

        let date_format = match &self.date_format {
            Some(pattern) => datefmt::normalize(pattern)?,
            None => defaults.date_format,
        };

        let timezone = match &self.timezone {
            Some(tz) => tz.parse()?,
            None => defaults.timezone,
        };

        let rotate_cron = match &self.rotate_cron {
            Some(expr) if expr.trim().is_empty() => None,
            Some(expr) => Some(expr.trim().to_string()),
            None => defaults.rotate_cron,
        };

        let worker_interval_secs = match &self.worker_interval {
            Some(value) => value.as_int("worker_interval")?,
            None => defaults.worker_interval_secs,
        };

        let root_path = match &self.root_path {
            Some(raw) => expand_home(raw),
            None => defaults.root_path,
        };

        let config = RotationConfig {
            max_size_bytes,
            retain,
            compress: self.compress.unwrap_or(defaults.compress),
            date_format,
            timezone,
            rotate_cron,
            worker_interval_secs,
            rotate_module: self.rotate_module.unwrap_or(defaults.rotate_module),
            rotate_out: self.rotate_out.unwrap_or(defaults.rotate_out),
            rotate_err: self.rotate_err.unwrap_or(defaults.rotate_err),
            root_path,
        };
        config.validate()?;
        Ok(config)
    }
}

fn expand_home(raw: &str) -> PathBuf {
    match raw.strip_prefix("~/") {
        Some(rest) => dirs::home_dir()
            .map(|h| h.join(rest))
            .unwrap_or_else(|| PathBuf::from(raw)),
        None => PathBuf::from(raw),
    }
}

/// Immutable rotation settings shared by the engine and the scheduler
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RotationConfig {
    /// Rotation threshold in bytes
    pub max_size_bytes: u64,
    /// Archives kept per base file (None = keep all)
    pub retain: Option<usize>,
    /// Gzip archives
    pub compress: bool,
    /// strftime pattern for the archive timestamp
    pub date_format: String,
    pub timezone: Timezone,
    /// Forced rotation schedule (None = disabled)
    pub rotate_cron: Option<String>,
    /// Size polling interval in seconds (-1 = disabled)
    pub worker_interval_secs: i64,
    /// Rotate logs of externally owned modules
    pub rotate_module: bool,
    pub rotate_out: bool,
    pub rotate_err: bool,
    /// Process manager home; logs live under `<root>/logs`
    pub root_path: PathBuf,
}

impl Default for RotationConfig {
    fn default() -> Self {
        Self {
            max_size_bytes: DEFAULT_MAX_SIZE_BYTES,
            retain: Some(DEFAULT_RETAIN),
            compress: false,
            date_format: DEFAULT_DATE_FORMAT_STRFTIME.to_string(),
            timezone: Timezone::Local,
            rotate_cron: Some(DEFAULT_ROTATE_CRON.to_string()),
            worker_interval_secs: DEFAULT_WORKER_INTERVAL_SECS,
            rotate_module: true,
            rotate_out: true,
            rotate_err: true,
            root_path: default_root(),
        }
    }
}

impl RotationConfig {
    pub fn new(max_size_bytes: u64, retain: Option<usize>) -> Self {
        Self {
            max_size_bytes,
            retain,
            ..Default::default()
        }
    }

    pub fn with_compress(mut self, compress: bool) -> Self {
        self.compress = compress;
        self
    }

    pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root_path = root.into();
        self
    }

    pub fn with_timezone(mut self, timezone: Timezone) -> Self {
        self.timezone = timezone;
        self
    }

    /// Set the archive timestamp pattern (strftime or moment style)
    pub fn with_date_format(mut self, pattern: &str) -> Result<Self> {
        self.date_format = datefmt::normalize(pattern)?;
        Ok(self)
    }

    /// Check cross-field constraints
    pub fn validate(&self) -> Result<()> {
        if self.worker_interval_secs != WORKER_INTERVAL_DISABLED && self.worker_interval_secs < 1 {
            return Err(Error::config(format!(
                "worker_interval must be >= 1 or {}, got {}",
                WORKER_INTERVAL_DISABLED, self.worker_interval_secs
            )));
        }
        if self.poll_interval().is_some() && self.max_size_bytes == 0 {
            return Err(Error::config("max_size must be > 0 when polling is enabled"));
        }
        Ok(())
    }

    /// Size polling interval, None when disabled
    pub fn poll_interval(&self) -> Option<Duration> {
        u64::try_from(self.worker_interval_secs)
            .ok()
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
    }

    /// Directory holding the managed process logs
    pub fn logs_dir(&self) -> PathBuf {
        logs_dir(&self.root_path)
    }

    /// System log files rotated on every tick
    pub fn system_log_paths(&self) -> Vec<PathBuf> {
        system_log_paths(&self.root_path)
    }
}
