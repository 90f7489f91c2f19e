// src/fingerprint/mod.rs

//! File-collection fingerprints.
//!
//! A fingerprint maps every absolute path of a file property to a
//! [`NormalizedFingerprint`]: the path as the property's path sensitivity
//! sees it, plus the content hash. Two executions are compared on these
//! normalized views, so moving a project directory does not invalidate a
//! relative-path input, for example.
//!
//! Current fingerprints are computed from VFS snapshots and keep entries in a
//! deterministic order. Historical fingerprints come back from the history
//! store and are only ever compared against.

pub mod compare;
pub mod strategy;

use crate::change::{ChangeVisitor, PropertyDirection};
use crate::hash::{ContentHash, Hasher};
use crate::types::FileType;

pub use compare::{CompareOptions, FingerprintCompareStrategy};
pub use strategy::FingerprintingStrategy;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NormalizedFingerprint {
    pub normalized_path: String,
    pub content_hash: ContentHash,
    pub file_type: FileType,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FingerprintEntry {
    pub absolute_path: String,
    pub fingerprint: NormalizedFingerprint,
}

/// Behaviour shared by current and historical fingerprints.
pub trait FileCollectionFingerprint {
    fn entries(&self) -> &[FingerprintEntry];
    fn compare_strategy(&self) -> FingerprintCompareStrategy;
    /// Combined hash over all entries, when known.
    fn hash(&self) -> Option<ContentHash>;

    fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }

    /// Absolute paths of all regular files.
    fn file_paths(&self) -> Vec<&str> {
        self.entries()
            .iter()
            .filter(|e| e.fingerprint.file_type == FileType::RegularFile)
            .map(|e| e.absolute_path.as_str())
            .collect()
    }
}

/// Combined hash over entries, order-sensitive.
pub fn combined_hash(entries: &[FingerprintEntry]) -> ContentHash {
    let mut hasher = Hasher::new();
    hasher.put_u64(entries.len() as u64);
    for entry in entries {
        let fp = &entry.fingerprint;
        hasher
            .put_str(&fp.normalized_path)
            .put_hash(&fp.content_hash)
            .put_u8(fp.file_type.tag());
    }
    hasher.finish()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentFileCollectionFingerprint {
    strategy: FingerprintingStrategy,
    entries: Vec<FingerprintEntry>,
    hash: ContentHash,
}

impl CurrentFileCollectionFingerprint {
    pub fn new(strategy: FingerprintingStrategy, entries: Vec<FingerprintEntry>) -> Self {
        let hash = combined_hash(&entries);
        Self {
            strategy,
            entries,
            hash,
        }
    }

    pub fn strategy(&self) -> FingerprintingStrategy {
        self.strategy
    }

    pub fn combined_hash(&self) -> ContentHash {
        self.hash
    }

    /// Freeze into the form that is persisted.
    pub fn archive(&self) -> HistoricalFileCollectionFingerprint {
        HistoricalFileCollectionFingerprint {
            strategy: Some(self.strategy),
            compare_strategy: self.compare_strategy(),
            hash: Some(self.hash),
            entries: self.entries.clone(),
        }
    }

    /// Visit all changes between `previous` and `self`.
    ///
    /// Returns `false` if the visitor stopped the walk.
    pub fn visit_changes_since(
        &self,
        previous: &dyn FileCollectionFingerprint,
        property: &str,
        direction: PropertyDirection,
        options: CompareOptions,
        visitor: &mut dyn ChangeVisitor,
    ) -> bool {
        if previous.hash() == Some(self.hash) && previous.compare_strategy() == self.compare_strategy() {
            return true;
        }
        self.compare_strategy().visit_changes_since(
            previous.entries(),
            &self.entries,
            property,
            direction,
            options,
            visitor,
        )
    }
}

impl FileCollectionFingerprint for CurrentFileCollectionFingerprint {
    fn entries(&self) -> &[FingerprintEntry] {
        &self.entries
    }

    fn compare_strategy(&self) -> FingerprintCompareStrategy {
        self.strategy.compare_strategy()
    }

    fn hash(&self) -> Option<ContentHash> {
        Some(self.hash)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoricalFileCollectionFingerprint {
    /// Normalization the entries were recorded with, if known.
    pub strategy: Option<FingerprintingStrategy>,
    pub compare_strategy: FingerprintCompareStrategy,
    pub hash: Option<ContentHash>,
    pub entries: Vec<FingerprintEntry>,
}

impl HistoricalFileCollectionFingerprint {
    pub fn empty(strategy: FingerprintingStrategy) -> Self {
        Self {
            strategy: Some(strategy),
            compare_strategy: strategy.compare_strategy(),
            hash: Some(combined_hash(&[])),
            entries: Vec::new(),
        }
    }
}

impl FileCollectionFingerprint for HistoricalFileCollectionFingerprint {
    fn entries(&self) -> &[FingerprintEntry] {
        &self.entries
    }

    fn compare_strategy(&self) -> FingerprintCompareStrategy {
        self.compare_strategy
    }

    fn hash(&self) -> Option<ContentHash> {
        self.hash
    }
}
