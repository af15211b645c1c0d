//! Turn a process list into the files to evaluate on one tick

use oxirotate_core::{is_null_target, LogRole, ManagedProcess, RotationConfig, TargetFile};
use std::collections::HashSet;
use std::path::{Component, Path, PathBuf};
use tracing::debug;

fn role_enabled(role: LogRole, config: &RotationConfig) -> bool {
    match role {
        LogRole::Stdout => config.rotate_out,
        LogRole::Stderr => config.rotate_err,
        LogRole::Combined | LogRole::System => true,
    }
}

/// Identity used to dedupe paths: the canonical path when the file exists,
/// else the path with `.` and `..` folded away. Hard links are not detected.
fn path_key(path: &Path) -> PathBuf {
    std::fs::canonicalize(path).unwrap_or_else(|_| normalize_lexically(path))
}

fn normalize_lexically(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match out.components().next_back() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => out.push(".."),
            },
            other => out.push(other),
        }
    }
    out
}

/// Resolve the target files for one tick.
///
/// Only the first instance of each named process is considered. Module
/// processes are skipped unless `rotate_module` is set. A path shared by
/// several roles or processes appears once, including when it is spelled
/// through `..` or a symlink. System logs are always appended last.
pub fn resolve_targets(processes: &[ManagedProcess], config: &RotationConfig) -> Vec<TargetFile> {
    let mut seen_names: HashSet<&str> = HashSet::new();
    let mut seen_paths = HashSet::new();
    let mut targets = Vec::new();

    for process in processes {
        if !seen_names.insert(process.name.as_str()) {
            continue;
        }
        if process.is_module && !config.rotate_module {
            debug!("Skipping module {}", process.name);
            continue;
        }

        for (role, path) in process.log_paths() {
            if !role_enabled(role, config) || is_null_target(path) {
                continue;
            }
            if seen_paths.insert(path_key(path)) {
                targets.push(TargetFile::owned(path.clone(), role, process));
            }
        }
    }

    for path in config.system_log_paths() {
        if seen_paths.insert(path_key(&path)) {
            targets.push(TargetFile::system(path));
        }
    }

    targets
}
