// src/fingerprint/strategy.rs

//! Path-sensitivity strategies.
//!
//! Each strategy walks the root snapshots of a property in order and decides
//! which normalized path, if any, every visited entry is recorded under:
//!
//! | strategy | root directory | nested directory | file |
//! |----------|----------------|------------------|------|
//! | absolute | absolute path  | absolute path    | absolute path |
//! | relative | `""`           | path below root  | path below root (root file: its name) |
//! | name-only| `""`           | skipped          | file name |
//! | ignored  | `""`           | skipped          | `""` |
//!
//! The first occurrence of an absolute path wins; overlapping roots never
//! record a file twice.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use tracing::trace;

use crate::fingerprint::{
    CurrentFileCollectionFingerprint, FingerprintCompareStrategy, FingerprintEntry,
    NormalizedFingerprint,
};
use crate::hash::{dir_signature, missing_file_signature};
use crate::types::{FileType, PathSensitivity};
use crate::vfs::snapshot::{FileSystemSnapshot, SnapshotVisitor};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FingerprintingStrategy {
    Absolute,
    Relative,
    NameOnly,
    Ignored,
}

impl FingerprintingStrategy {
    pub fn for_sensitivity(sensitivity: PathSensitivity) -> Self {
        match sensitivity {
            PathSensitivity::Absolute => FingerprintingStrategy::Absolute,
            PathSensitivity::Relative => FingerprintingStrategy::Relative,
            PathSensitivity::NameOnly => FingerprintingStrategy::NameOnly,
            PathSensitivity::Ignored => FingerprintingStrategy::Ignored,
        }
    }

    pub fn identifier(self) -> &'static str {
        match self {
            FingerprintingStrategy::Absolute => "ABSOLUTE_PATH",
            FingerprintingStrategy::Relative => "RELATIVE_PATH",
            FingerprintingStrategy::NameOnly => "NAME_ONLY",
            FingerprintingStrategy::Ignored => "IGNORED_PATH",
        }
    }

    /// Stable tag used by the history wire format.
    pub fn tag(self) -> u8 {
        match self {
            FingerprintingStrategy::Absolute => 0,
            FingerprintingStrategy::Relative => 1,
            FingerprintingStrategy::NameOnly => 2,
            FingerprintingStrategy::Ignored => 3,
        }
    }

    pub fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            0 => Some(FingerprintingStrategy::Absolute),
            1 => Some(FingerprintingStrategy::Relative),
            2 => Some(FingerprintingStrategy::NameOnly),
            3 => Some(FingerprintingStrategy::Ignored),
            _ => None,
        }
    }

    /// Relative paths are compared in order; everything else as a multiset
    /// keyed by normalized path.
    pub fn compare_strategy(self) -> FingerprintCompareStrategy {
        match self {
            FingerprintingStrategy::Relative => FingerprintCompareStrategy::Ordered,
            _ => FingerprintCompareStrategy::Unordered,
        }
    }

    /// Whether individual files of a property using this strategy can be
    /// told apart in an incremental delta.
    pub fn is_addressable(self) -> bool {
        self != FingerprintingStrategy::Ignored
    }

    pub fn fingerprint(self, roots: &[Arc<FileSystemSnapshot>]) -> CurrentFileCollectionFingerprint {
        let mut collector = Collector {
            strategy: self,
            processed: HashSet::new(),
            entries: Vec::new(),
            relative: Vec::new(),
            depth: 0,
        };
        for root in roots {
            root.accept(&mut collector);
            collector.relative.clear();
            collector.depth = 0;
        }
        trace!(
            strategy = self.identifier(),
            roots = roots.len(),
            entries = collector.entries.len(),
            "fingerprinted file collection"
        );
        CurrentFileCollectionFingerprint::new(self, collector.entries)
    }
}

impl fmt::Display for FingerprintingStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.identifier())
    }
}

struct Collector {
    strategy: FingerprintingStrategy,
    processed: HashSet<String>,
    entries: Vec<FingerprintEntry>,
    /// Names of the directories between the current root and the entry.
    relative: Vec<String>,
    depth: usize,
}

impl Collector {
    fn normalized_path(&self, snapshot: &FileSystemSnapshot, is_root: bool) -> Option<String> {
        let is_dir = snapshot.file_type() == FileType::Directory;
        match self.strategy {
            FingerprintingStrategy::Absolute => Some(snapshot.path().to_string()),
            FingerprintingStrategy::Relative => {
                if is_root {
                    Some(if is_dir { String::new() } else { snapshot.name().to_string() })
                } else {
                    let mut path = self.relative.join("/");
                    if !path.is_empty() {
                        path.push('/');
                    }
                    path.push_str(snapshot.name());
                    Some(path)
                }
            }
            FingerprintingStrategy::NameOnly => match (is_root, is_dir) {
                (true, true) => Some(String::new()),
                (false, true) => None,
                (_, false) => Some(snapshot.name().to_string()),
            },
            FingerprintingStrategy::Ignored => {
                if is_dir && !is_root {
                    None
                } else {
                    Some(String::new())
                }
            }
        }
    }

    fn record(&mut self, snapshot: &FileSystemSnapshot, is_root: bool) {
        let Some(normalized_path) = self.normalized_path(snapshot, is_root) else {
            return;
        };
        if !self.processed.insert(snapshot.path().to_string()) {
            return;
        }
        let content_hash = match snapshot.file_type() {
            FileType::Directory => dir_signature(),
            FileType::Missing => missing_file_signature(),
            FileType::RegularFile => snapshot.content_hash().unwrap_or_else(missing_file_signature),
        };
        self.entries.push(FingerprintEntry {
            absolute_path: snapshot.path().to_string(),
            fingerprint: NormalizedFingerprint {
                normalized_path,
                content_hash,
                file_type: snapshot.file_type(),
            },
        });
    }
}

impl SnapshotVisitor for Collector {
    fn pre_visit_directory(&mut self, directory: &FileSystemSnapshot) -> bool {
        let is_root = self.depth == 0;
        self.record(directory, is_root);
        if !is_root {
            self.relative.push(directory.name().to_string());
        }
        self.depth += 1;
        true
    }

    fn visit_file(&mut self, file: &FileSystemSnapshot) {
        let is_root = self.depth == 0;
        self.record(file, is_root);
    }

    fn post_visit_directory(&mut self, _directory: &FileSystemSnapshot) {
        self.depth -= 1;
        if self.depth > 0 {
            self.relative.pop();
        }
    }
}
