//! Core types for OxiRotate

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;

use crate::error::{Error, Result};

/// Which stream of a process a log file carries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogRole {
    Stdout,
    Stderr,
    Combined,
    System,
}

impl LogRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogRole::Stdout => "stdout",
            LogRole::Stderr => "stderr",
            LogRole::Combined => "combined",
            LogRole::System => "system",
        }
    }
}

impl std::fmt::Display for LogRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Why a rotation was requested
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TriggerReason {
    /// Size polling tick: rotate only past the threshold
    Scheduled,
    /// Cron tick: rotate any non-empty file
    Forced,
}

impl TriggerReason {
    pub fn is_forced(&self) -> bool {
        matches!(self, TriggerReason::Forced)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TriggerReason::Scheduled => "scheduled",
            TriggerReason::Forced => "forced",
        }
    }
}

impl std::fmt::Display for TriggerReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Clock used to render archive timestamps
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Timezone {
    #[default]
    Local,
    Utc,
}

impl FromStr for Timezone {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "local" => Ok(Timezone::Local),
            "utc" | "z" => Ok(Timezone::Utc),
            _ => Err(Error::config(format!(
                "Invalid timezone '{}'. Expected 'local' or 'utc'",
                s
            ))),
        }
    }
}

/// Where the process list comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListerKind {
    /// Processes declared under `apps` in the config file
    Static,
    /// Processes inferred from `<app>-out.log` / `<app>-err.log` in the log dir
    #[default]
    LogDir,
}

/// A process managed by the external process manager, as seen by the lister
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManagedProcess {
    /// Process name (shared by all instances of a cluster)
    pub name: String,
    /// Instance index within the cluster
    #[serde(default)]
    pub instance_id: Option<u32>,
    #[serde(default, alias = "out_file")]
    pub out_log: Option<PathBuf>,
    #[serde(default, alias = "error_file")]
    pub err_log: Option<PathBuf>,
    #[serde(default, alias = "log_file")]
    pub combined_log: Option<PathBuf>,
    /// Externally owned module (e.g. a process-manager plugin)
    #[serde(default)]
    pub is_module: bool,
}

impl ManagedProcess {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            instance_id: None,
            out_log: None,
            err_log: None,
            combined_log: None,
            is_module: false,
        }
    }

    pub fn with_out(mut self, path: impl Into<PathBuf>) -> Self {
        self.out_log = Some(path.into());
        self
    }

    pub fn with_err(mut self, path: impl Into<PathBuf>) -> Self {
        self.err_log = Some(path.into());
        self
    }

    pub fn with_combined(mut self, path: impl Into<PathBuf>) -> Self {
        self.combined_log = Some(path.into());
        self
    }

    pub fn with_instance(mut self, instance_id: u32) -> Self {
        self.instance_id = Some(instance_id);
        self
    }

    pub fn as_module(mut self) -> Self {
        self.is_module = true;
        self
    }

    /// Log paths by role, in stdout, stderr, combined order
    pub fn log_paths(&self) -> impl Iterator<Item = (LogRole, &PathBuf)> {
        [
            (LogRole::Stdout, self.out_log.as_ref()),
            (LogRole::Stderr, self.err_log.as_ref()),
            (LogRole::Combined, self.combined_log.as_ref()),
        ]
        .into_iter()
        .filter_map(|(role, path)| path.map(|p| (role, p)))
    }
}

/// Identity of the process owning a target file
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProcessIdentity {
    pub name: String,
    pub instance_id: Option<u32>,
}

/// A file to evaluate for rotation on one tick
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetFile {
    pub path: PathBuf,
    pub role: LogRole,
    /// None for system logs
    pub owner: Option<ProcessIdentity>,
}

impl TargetFile {
    pub fn system(path: PathBuf) -> Self {
        Self {
            path,
            role: LogRole::System,
            owner: None,
        }
    }

    pub fn owned(path: PathBuf, role: LogRole, process: &ManagedProcess) -> Self {
        Self {
            path,
            role,
            owner: Some(ProcessIdentity {
                name: process.name.clone(),
                instance_id: process.instance_id,
            }),
        }
    }
}
