// src/vfs/service.rs

//! The shared virtual file system.
//!
//! One [`VirtualFileSystem`] is shared by every task evaluation of a build.
//! Readers take a cheap clone of the current immutable [`SnapshotHierarchy`]
//! and never wait on writers for longer than a pointer swap. Writers are
//! serialized, compute the new hierarchy off-lock and then publish it.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use tracing::{debug, info, trace};

use crate::types::CaseSensitivity;
use crate::vfs::hierarchy::SnapshotHierarchy;
use crate::vfs::path::{is_same_or_ancestor, normalize};
use crate::vfs::snapshot::FileSystemSnapshot;
use crate::vfs::version::VersionHierarchy;
use crate::watch::{WatchEvent, WatchEventKind};

#[derive(Debug, Clone)]
struct VfsState {
    hierarchy: SnapshotHierarchy,
    versions: VersionHierarchy,
}

#[derive(Debug)]
pub struct VirtualFileSystem {
    case_sensitivity: CaseSensitivity,
    state: RwLock<Arc<VfsState>>,
    writer: Mutex<()>,
    version: AtomicU64,
    watched_roots: Mutex<Vec<String>>,
}

impl VirtualFileSystem {
    pub fn new(case_sensitivity: CaseSensitivity) -> Self {
        Self {
            case_sensitivity,
            state: RwLock::new(Arc::new(VfsState {
                hierarchy: SnapshotHierarchy::empty(case_sensitivity),
                versions: VersionHierarchy::empty(0),
            })),
            writer: Mutex::new(()),
            version: AtomicU64::new(0),
            watched_roots: Mutex::new(Vec::new()),
        }
    }

    pub fn case_sensitivity(&self) -> CaseSensitivity {
        self.case_sensitivity
    }

    fn current(&self) -> Arc<VfsState> {
        let guard = self.state.read().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&guard)
    }

    /// The current hierarchy. Later writes do not affect the returned value.
    pub fn root(&self) -> SnapshotHierarchy {
        self.current().hierarchy.clone()
    }

    /// Latest version handed out by a write.
    pub fn current_version(&self) -> u64 {
        self.version.load(Ordering::SeqCst)
    }

    /// Highest version of any write at or below `path`.
    pub fn version_at(&self, path: &str) -> u64 {
        self.current()
            .versions
            .version_at(&normalize(path), self.case_sensitivity)
    }

    /// Whether anything at or below `path` was written after `version`.
    pub fn changed_since(&self, path: &str, version: u64) -> bool {
        self.version_at(path) > version
    }

    pub fn snapshot_at(&self, path: &str) -> Option<Arc<FileSystemSnapshot>> {
        self.current().hierarchy.snapshot_at(&normalize(path))
    }

    pub fn root_snapshots_under(&self, path: &str) -> Vec<Arc<FileSystemSnapshot>> {
        self.current().hierarchy.root_snapshots_under(&normalize(path))
    }

    /// Record a fresh snapshot. Returns `false` if it was already known.
    pub fn store(&self, snapshot: impl Into<Arc<FileSystemSnapshot>>) -> bool {
        let snapshot = snapshot.into();
        let path = normalize(snapshot.path());
        self.update(&path, |hierarchy| hierarchy.store(&path, snapshot))
    }

    /// Forget everything at and below `path`. Returns `false` if nothing was
    /// known there.
    pub fn invalidate(&self, path: &str) -> bool {
        let path = normalize(path);
        self.update(&path, |hierarchy| hierarchy.invalidate(&path))
    }

    pub fn invalidate_all(&self) {
        let _writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        let version = self.version.fetch_add(1, Ordering::SeqCst) + 1;
        self.publish(VfsState {
            hierarchy: SnapshotHierarchy::empty(self.case_sensitivity),
            versions: VersionHierarchy::empty(version),
        });
        info!(version, "invalidated the whole virtual file system");
    }

    fn update<F>(&self, path: &str, f: F) -> bool
    where
        F: FnOnce(&SnapshotHierarchy) -> SnapshotHierarchy,
    {
        let _writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        let current = self.current();
        let hierarchy = f(&current.hierarchy);
        if hierarchy.ptr_eq(&current.hierarchy) {
            trace!(path, "vfs unchanged");
            return false;
        }

        let version = self.version.fetch_add(1, Ordering::SeqCst) + 1;
        let versions = current
            .versions
            .update_version(path, version, self.case_sensitivity);
        self.publish(VfsState {
            hierarchy,
            versions,
        });
        trace!(path, version, "vfs updated");
        true
    }

    fn publish(&self, state: VfsState) {
        let mut guard = self.state.write().unwrap_or_else(PoisonError::into_inner);
        *guard = Arc::new(state);
    }

    /// Register a root whose contents are kept current by a watcher.
    pub fn add_watched_root(&self, path: &str) {
        let path = normalize(path);
        let mut roots = self.watched_roots.lock().unwrap_or_else(PoisonError::into_inner);
        if !roots.contains(&path) {
            roots.push(path);
        }
    }

    pub fn watched_roots(&self) -> Vec<String> {
        self.watched_roots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Bring the VFS in line with a change notification.
    ///
    /// Any change invalidates the affected path; an overflow invalidates every
    /// watched root (or everything, when no roots are registered).
    pub fn apply_watch_event(&self, event: &WatchEvent) {
        match event.kind {
            WatchEventKind::Created | WatchEventKind::Modified | WatchEventKind::Removed => {
                let changed = self.invalidate(&event.path);
                debug!(path = %event.path, kind = ?event.kind, changed, "applied watch event");
            }
            WatchEventKind::Overflow => {
                let roots = self.watched_roots();
                if roots.is_empty() {
                    self.invalidate_all();
                    return;
                }
                info!(roots = roots.len(), "watch overflow; invalidating watched roots");
                for root in roots {
                    self.invalidate(&root);
                }
            }
        }
    }

    /// Whether `path` lies inside one of the watched roots.
    pub fn is_watched(&self, path: &str) -> bool {
        let path = normalize(path);
        self.watched_roots()
            .iter()
            .any(|root| is_same_or_ancestor(root, &path, self.case_sensitivity))
    }
}
