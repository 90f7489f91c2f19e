// src/vfs/scan.rs

//! Building snapshots from a real (or mocked) file system.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use tracing::{debug, warn};

use crate::fs::FileSystem;
use crate::hash::compute_file_hash;
use crate::types::{CaseSensitivity, FileType};
use crate::vfs::path::{file_name, normalize};
use crate::vfs::service::VirtualFileSystem;
use crate::vfs::snapshot::FileSystemSnapshot;

/// Symlinked directories can form cycles; give up below this depth.
const MAX_DEPTH: usize = 128;

#[derive(Debug, Clone)]
pub struct Scanner {
    fs: Arc<dyn FileSystem>,
    excludes: GlobSet,
    case_sensitivity: CaseSensitivity,
}

impl Scanner {
    pub fn new(fs: Arc<dyn FileSystem>, case_sensitivity: CaseSensitivity) -> Self {
        Self {
            fs,
            excludes: GlobSet::empty(),
            case_sensitivity,
        }
    }

    /// Skip entries whose name or absolute path matches any of `patterns`.
    pub fn with_excludes(mut self, patterns: &[String]) -> Result<Self> {
        let mut builder = GlobSetBuilder::new();
        for pattern in patterns {
            let glob = Glob::new(pattern).with_context(|| format!("invalid exclude glob {pattern:?}"))?;
            builder.add(glob);
        }
        self.excludes = builder.build().context("building exclude set")?;
        Ok(self)
    }

    fn is_excluded(&self, path: &str) -> bool {
        self.excludes.is_match(path) || self.excludes.is_match(file_name(path))
    }

    /// Snapshot `path` and everything below it.
    pub fn snapshot(&self, path: &str) -> Result<FileSystemSnapshot> {
        let path = normalize(path);
        self.snapshot_at_depth(&path, 0)
    }

    fn snapshot_at_depth(&self, path: &str, depth: usize) -> Result<FileSystemSnapshot> {
        let stat = self.fs.stat(Path::new(path))?;
        match stat.file_type {
            FileType::Missing => Ok(FileSystemSnapshot::missing(path, stat.access)),
            FileType::RegularFile => {
                let hash = compute_file_hash(self.fs.as_ref(), Path::new(path))?;
                Ok(FileSystemSnapshot::regular_file(path, hash, stat.access))
            }
            FileType::Directory => {
                let mut children = Vec::new();
                if depth >= MAX_DEPTH {
                    warn!(path, "directory nesting too deep; treating as empty");
                } else {
                    for entry in self.fs.read_dir(Path::new(path))? {
                        let Some(child) = entry.to_str().map(normalize) else {
                            warn!(?entry, "skipping non UTF-8 path");
                            continue;
                        };
                        if self.is_excluded(&child) {
                            continue;
                        }
                        children.push(Arc::new(self.snapshot_at_depth(&child, depth + 1)?));
                    }
                }
                Ok(FileSystemSnapshot::directory(
                    path,
                    stat.access,
                    children,
                    self.case_sensitivity,
                ))
            }
        }
    }

    /// Scan `path` and store the result, returning the stored snapshot.
    pub fn refresh(&self, vfs: &VirtualFileSystem, path: &str) -> Result<Arc<FileSystemSnapshot>> {
        let snapshot = Arc::new(self.snapshot(path)?);
        let changed = vfs.store(Arc::clone(&snapshot));
        debug!(path, changed, "refreshed snapshot");
        Ok(snapshot)
    }

    /// Scan `path` only if the VFS knows nothing about it yet.
    pub fn ensure(&self, vfs: &VirtualFileSystem, path: &str) -> Result<Arc<FileSystemSnapshot>> {
        match vfs.snapshot_at(path) {
            Some(snapshot) => Ok(snapshot),
            None => self.refresh(vfs, path),
        }
    }
}
