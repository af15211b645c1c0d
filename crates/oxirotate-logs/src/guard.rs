//! Per-path in-flight tracking so overlapping triggers never rotate one file twice

use parking_lot::Mutex;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Set of paths currently mid-rotation
#[derive(Debug, Default, Clone)]
pub struct InFlight {
    paths: Arc<Mutex<HashSet<PathBuf>>>,
}

impl InFlight {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim a path; None if another rotation holds it
    pub fn try_acquire(&self, path: &Path) -> Option<InFlightGuard> {
        let mut paths = self.paths.lock();
        if !paths.insert(path.to_path_buf()) {
            return None;
        }
        Some(InFlightGuard {
            paths: Arc::clone(&self.paths),
            path: path.to_path_buf(),
        })
    }

    pub fn is_in_flight(&self, path: &Path) -> bool {
        self.paths.lock().contains(path)
    }

    pub fn len(&self) -> usize {
        self.paths.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.lock().is_empty()
    }
}

/// Releases the path on drop, whether the rotation succeeded or failed
#[derive(Debug)]
pub struct InFlightGuard {
    paths: Arc<Mutex<HashSet<PathBuf>>>,
    path: PathBuf,
}

impl InFlightGuard {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.paths.lock().remove(&self.path);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_acquire_is_exclusive() {
        let in_flight = InFlight::new();
        let path = Path::new("/logs/api-out.log");

        let guard = in_flight.try_acquire(path).unwrap();
        assert!(in_flight.is_in_flight(path));
        assert!(in_flight.try_acquire(path).is_none());

        drop(guard);
        assert!(!in_flight.is_in_flight(path));
        assert!(in_flight.try_acquire(path).is_some());
    }

    #[test]
    fn test_distinct_paths_independent() {
        let in_flight = InFlight::new();
        let _a = in_flight.try_acquire(Path::new("/logs/a.log")).unwrap();
        let _b = in_flight.try_acquire(Path::new("/logs/b.log")).unwrap();
        assert_eq!(in_flight.len(), 2);
    }

    #[test]
    fn test_clones_share_state() {
        let in_flight = InFlight::new();
        let other = in_flight.clone();
        let _guard = in_flight.try_acquire(Path::new("/logs/a.log")).unwrap();
        assert!(other.try_acquire(Path::new("/logs/a.log")).is_none());
    }
}
