//! Fixture cleanup tracking
//!
//! Every fixture root is registered the moment it is created and removed
//! once, after the whole suite has run. [`CleanupScope`] ties that removal to
//! a drop guard so it happens on every exit path.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use tempfile::TempDir;

use crate::common::Result;

/// Registry of fixture directories created during a run
#[derive(Debug)]
pub struct CleanupTracker {
    prefix: String,
    registry: Mutex<Registry>,
}

#[derive(Debug, Default)]
struct Registry {
    /// Paths awaiting removal
    pending: Vec<Tracked>,
    /// Every path ever registered, in registration order
    history: Vec<PathBuf>,
}

#[derive(Debug)]
struct Tracked {
    path: PathBuf,
    /// Held for roots created by the tracker so a crash still removes them
    handle: Option<TempDir>,
}

/// Outcome of [`CleanupTracker::release_all`]
#[derive(Debug, Default)]
pub struct CleanupReport {
    pub removed: Vec<PathBuf>,
    pub failed: Vec<(PathBuf, String)>,
}

impl CleanupTracker {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            registry: Mutex::new(Registry::default()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Registry> {
        self.registry.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Create a uniquely named temporary root and register it
    pub fn create_root(&self, label: &str) -> Result<PathBuf> {
        let dir = tempfile::Builder::new()
            .prefix(&format!("{}_{}_", self.prefix, label))
            .tempdir()?;
        let path = dir.path().to_path_buf();
        tracing::debug!("Created fixture root {}", path.display());

        let mut registry = self.lock();
        registry.history.push(path.clone());
        registry.pending.push(Tracked {
            path: path.clone(),
            handle: Some(dir),
        });
        Ok(path)
    }

    /// Register an externally created path for removal
    pub fn register(&self, path: impl Into<PathBuf>) {
        let path = path.into();
        let mut registry = self.lock();
        registry.history.push(path.clone());
        registry.pending.push(Tracked { path, handle: None });
    }

    /// Every path registered so far, including already released ones
    pub fn registered(&self) -> Vec<PathBuf> {
        self.lock().history.clone()
    }

    /// Number of paths still awaiting removal
    pub fn pending(&self) -> usize {
        self.lock().pending.len()
    }

    /// Remove every pending path that still exists
    pub fn release_all(&self) -> CleanupReport {
        let pending = std::mem::take(&mut self.lock().pending);
        let mut report = CleanupReport::default();

        for tracked in pending {
            let result = match tracked.handle {
                Some(handle) => handle.close(),
                None => remove_if_exists(&tracked.path),
            };
            match result {
                Ok(()) => report.removed.push(tracked.path),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    report.removed.push(tracked.path)
                }
                Err(e) => {
                    tracing::warn!("Failed to remove fixture {}: {}", tracked.path.display(), e);
                    report.failed.push((tracked.path, e.to_string()));
                }
            }
        }

        tracing::debug!(
            "Released {} fixture(s), {} failure(s)",
            report.removed.len(),
            report.failed.len()
        );
        report
    }

    /// Guard that releases everything when dropped
    pub fn scope(&self) -> CleanupScope<'_> {
        CleanupScope { tracker: self }
    }
}

fn remove_if_exists(path: &Path) -> std::io::Result<()> {
    match std::fs::symlink_metadata(path) {
        Ok(meta) if meta.is_dir() => std::fs::remove_dir_all(path),
        Ok(_) => std::fs::remove_file(path),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}

/// Releases all tracked fixtures on drop
#[must_use = "fixtures are released when the scope is dropped"]
pub struct CleanupScope<'a> {
    tracker: &'a CleanupTracker,
}

impl CleanupScope<'_> {
    /// Release now and report what happened
    pub fn release(self) -> CleanupReport {
        let report = self.tracker.release_all();
        // Drop runs release_all again but finds nothing pending
        drop(self);
        report
    }
}

impl Drop for CleanupScope<'_> {
    fn drop(&mut self) {
        if self.tracker.pending() > 0 {
            self.tracker.release_all();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_root_registers_and_uses_prefix() {
        let tracker = CleanupTracker::new("knot_test");
        let root = tracker.create_root("basic").unwrap();

        assert!(root.is_dir());
        let name = root.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("knot_test_basic_"), "unexpected name {name}");
        assert_eq!(tracker.registered(), vec![root.clone()]);
        assert_eq!(tracker.pending(), 1);

        tracker.release_all();
        assert!(!root.exists());
    }

    #[test]
    fn test_roots_are_unique() {
        let tracker = CleanupTracker::new("knot_test");
        let a = tracker.create_root("same").unwrap();
        let b = tracker.create_root("same").unwrap();
        assert_ne!(a, b);
        tracker.release_all();
    }

    #[test]
    fn test_release_removes_registered_paths() {
        let outer = tempfile::tempdir().unwrap();
        let dir = outer.path().join("manual");
        std::fs::create_dir_all(dir.join("nested")).unwrap();
        std::fs::write(dir.join("nested/file.txt"), "x").unwrap();

        let tracker = CleanupTracker::new("knot_test");
        tracker.register(&dir);
        let report = tracker.release_all();

        assert!(!dir.exists());
        assert_eq!(report.removed, vec![dir]);
        assert!(report.failed.is_empty());
    }

    #[test]
    fn test_already_removed_paths_are_not_failures() {
        let tracker = CleanupTracker::new("knot_test");
        let root = tracker.create_root("gone").unwrap();
        std::fs::remove_dir_all(&root).unwrap();
        tracker.register(root.join("never-existed"));

        let report = tracker.release_all();
        assert!(report.failed.is_empty());
        assert_eq!(report.removed.len(), 2);
    }

    #[test]
    fn test_release_drains_once() {
        let tracker = CleanupTracker::new("knot_test");
        tracker.create_root("once").unwrap();
        assert_eq!(tracker.release_all().removed.len(), 1);
        assert!(tracker.release_all().removed.is_empty());
        assert_eq!(tracker.registered().len(), 1);
    }

    #[test]
    fn test_scope_releases_on_drop() {
        let tracker = CleanupTracker::new("knot_test");
        let root = {
            let _scope = tracker.scope();
            tracker.create_root("scoped").unwrap()
        };
        assert!(!root.exists());
        assert_eq!(tracker.pending(), 0);
    }

    #[test]
    fn test_scope_releases_during_panic() {
        let tracker = CleanupTracker::new("knot_test");
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _scope = tracker.scope();
            let root = tracker.create_root("panicking").unwrap();
            assert!(root.exists());
            panic!("scenario blew up");
        }));
        assert!(result.is_err());
        for path in tracker.registered() {
            assert!(!path.exists(), "{} survived", path.display());
        }
    }
}
