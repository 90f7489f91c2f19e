// src/task/spec.rs

//! What the decision engine needs to know about a task.

use std::collections::BTreeMap;
use std::fmt;

use crate::fingerprint::FingerprintingStrategy;
use crate::hash::{hash_bytes, ContentHash};
use crate::types::PathSensitivity;

/// Identity of the code that implements a task.
///
/// A task whose implementation hash is unknown can never be up to date and is
/// never cached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImplementationSnapshot {
    pub type_name: String,
    pub implementation_hash: Option<ContentHash>,
}

impl ImplementationSnapshot {
    pub fn new(type_name: impl Into<String>, implementation_hash: ContentHash) -> Self {
        Self {
            type_name: type_name.into(),
            implementation_hash: Some(implementation_hash),
        }
    }

    /// Identify an implementation by an arbitrary identity string, such as a
    /// command line or a tool version.
    pub fn from_identity(type_name: impl Into<String>, identity: &str) -> Self {
        Self::new(type_name, hash_bytes(identity.as_bytes()))
    }

    pub fn unknown(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            implementation_hash: None,
        }
    }

    pub fn is_unknown(&self) -> bool {
        self.implementation_hash.is_none()
    }
}

impl fmt::Display for ImplementationSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.implementation_hash {
            Some(hash) => write!(f, "{}@{}", self.type_name, &hash.to_hex()[..12]),
            None => write!(f, "{}@<unknown>", self.type_name),
        }
    }
}

/// Snapshot of a non-file input value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ValueSnapshot(ContentHash);

impl ValueSnapshot {
    pub fn of_str(value: &str) -> Self {
        Self::of_bytes(value.as_bytes())
    }

    pub fn of_bytes(value: &[u8]) -> Self {
        Self(hash_bytes(value))
    }

    pub fn from_hash(hash: ContentHash) -> Self {
        Self(hash)
    }

    pub fn hash(&self) -> ContentHash {
        self.0
    }
}

/// A named set of file roots with a path-sensitivity policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilePropertySpec {
    pub name: String,
    /// Absolute, normalized roots in declared order.
    pub roots: Vec<String>,
    pub sensitivity: PathSensitivity,
}

impl FilePropertySpec {
    pub fn new(name: impl Into<String>, roots: Vec<String>, sensitivity: PathSensitivity) -> Self {
        Self {
            name: name.into(),
            roots,
            sensitivity,
        }
    }

    pub fn strategy(&self) -> FingerprintingStrategy {
        FingerprintingStrategy::for_sensitivity(self.sensitivity)
    }
}

#[derive(Debug, Clone)]
pub struct TaskSpec {
    pub name: String,
    pub implementation: ImplementationSnapshot,
    pub input_properties: BTreeMap<String, ValueSnapshot>,
    pub input_files: Vec<FilePropertySpec>,
    /// Output roots. Outputs are always fingerprinted by absolute path.
    pub output_files: Vec<FilePropertySpec>,
    /// Whether the task can consume an input delta instead of rebuilding.
    pub incremental: bool,
    pub cacheable: bool,
    /// Tasks that must be evaluated before this one.
    pub depends_on: Vec<String>,
}

impl TaskSpec {
    pub fn new(name: impl Into<String>, implementation: ImplementationSnapshot) -> Self {
        Self {
            name: name.into(),
            implementation,
            input_properties: BTreeMap::new(),
            input_files: Vec::new(),
            output_files: Vec::new(),
            incremental: false,
            cacheable: true,
            depends_on: Vec::new(),
        }
    }

    pub fn input_file_property(&self, name: &str) -> Option<&FilePropertySpec> {
        self.input_files.iter().find(|p| p.name == name)
    }

    /// Every declared output root.
    pub fn output_roots(&self) -> impl Iterator<Item = (&str, &str)> {
        self.output_files
            .iter()
            .flat_map(|p| p.roots.iter().map(move |r| (p.name.as_str(), r.as_str())))
    }
}
