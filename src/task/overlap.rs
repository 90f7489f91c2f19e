// src/task/overlap.rs

//! Detecting outputs that a task does not exclusively own.
//!
//! Two sources of overlap are recognized:
//!
//! - another task of the build declares the same output root, or one that
//!   contains or is contained by ours ([`OutputRegistry`]);
//! - before execution, an output root holds regular files that were not there
//!   after this task's previous execution ([`detect_overlap`]).
//!
//! Either way the task is rebuilt, caching is disabled, and only the files
//! this task demonstrably produced are recorded as its outputs
//! ([`filter_outputs_after_execution`]).

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, PoisonError};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::fingerprint::{
    CurrentFileCollectionFingerprint, FileCollectionFingerprint, FingerprintEntry,
    HistoricalFileCollectionFingerprint,
};
use crate::task::spec::TaskSpec;
use crate::types::{CaseSensitivity, FileType};
use crate::vfs::path::is_same_or_ancestor;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverlappingOutputs {
    pub property: String,
    pub path: String,
    /// The other task declaring an overlapping root, if the overlap comes
    /// from a declaration rather than from files on disk.
    pub other_task: Option<String>,
}

impl OverlappingOutputs {
    pub fn message(&self) -> String {
        match &self.other_task {
            Some(other) => format!(
                "Output property '{}' with path '{}' overlaps with the outputs of task '{}'.",
                self.property, self.path, other
            ),
            None => format!(
                "Output property '{}' contains '{}', which was not produced by this task.",
                self.property, self.path
            ),
        }
    }
}

#[derive(Debug, Clone)]
struct RegisteredRoot {
    task: String,
    property: String,
    path: String,
}

/// Output roots declared by every task of the build.
#[derive(Debug)]
pub struct OutputRegistry {
    case_sensitivity: CaseSensitivity,
    roots: Mutex<Vec<RegisteredRoot>>,
}

impl OutputRegistry {
    pub fn new(case_sensitivity: CaseSensitivity) -> Self {
        Self {
            case_sensitivity,
            roots: Mutex::new(Vec::new()),
        }
    }

    pub fn register(&self, spec: &TaskSpec) {
        let mut roots = self.roots.lock().unwrap_or_else(PoisonError::into_inner);
        roots.retain(|r| r.task != spec.name);
        for (property, path) in spec.output_roots() {
            roots.push(RegisteredRoot {
                task: spec.name.clone(),
                property: property.to_string(),
                path: path.to_string(),
            });
        }
    }

    pub fn unregister(&self, task: &str) {
        let mut roots = self.roots.lock().unwrap_or_else(PoisonError::into_inner);
        roots.retain(|r| r.task != task);
    }

    /// First output root of `spec` that overlaps a root registered by a
    /// different task.
    pub fn find_overlap(&self, spec: &TaskSpec) -> Option<OverlappingOutputs> {
        let roots = self.roots.lock().unwrap_or_else(PoisonError::into_inner);
        for (property, path) in spec.output_roots() {
            let clash = roots.iter().find(|other| {
                other.task != spec.name
                    && (is_same_or_ancestor(&other.path, path, self.case_sensitivity)
                        || is_same_or_ancestor(path, &other.path, self.case_sensitivity))
            });
            if let Some(other) = clash {
                debug!(
                    task = %spec.name,
                    other = %other.task,
                    other_property = %other.property,
                    path,
                    "declared outputs overlap"
                );
                return Some(OverlappingOutputs {
                    property: property.to_string(),
                    path: path.to_string(),
                    other_task: Some(other.task.clone()),
                });
            }
        }
        None
    }
}

/// Find a regular file in the outputs before execution that the previous
/// execution did not leave behind.
pub fn detect_overlap(
    previous_outputs: &[(String, HistoricalFileCollectionFingerprint)],
    outputs_before: &[(String, CurrentFileCollectionFingerprint)],
) -> Option<OverlappingOutputs> {
    for (property, before) in outputs_before {
        let previous: HashSet<&str> = previous_outputs
            .iter()
            .filter(|(name, _)| name == property)
            .flat_map(|(_, fp)| fp.entries().iter().map(|e| e.absolute_path.as_str()))
            .collect();

        let stray = before.entries().iter().find(|entry| {
            entry.fingerprint.file_type == FileType::RegularFile
                && !previous.contains(entry.absolute_path.as_str())
        });
        if let Some(entry) = stray {
            return Some(OverlappingOutputs {
                property: property.clone(),
                path: entry.absolute_path.clone(),
                other_task: None,
            });
        }
    }
    None
}

/// Keep only the output entries this task produced.
///
/// An entry counts when it was created or modified during execution, or was
/// already an output of the previous execution. Missing entries never count.
pub fn filter_outputs_after_execution(
    previous_after: Option<&HistoricalFileCollectionFingerprint>,
    before: &CurrentFileCollectionFingerprint,
    after: &CurrentFileCollectionFingerprint,
) -> Vec<FingerprintEntry> {
    let before_by_path: HashMap<&str, &FingerprintEntry> = before
        .entries()
        .iter()
        .map(|e| (e.absolute_path.as_str(), e))
        .collect();
    let previous: HashSet<&str> = previous_after
        .map(|fp| fp.entries().iter().map(|e| e.absolute_path.as_str()).collect())
        .unwrap_or_default();

    after
        .entries()
        .iter()
        .filter(|entry| {
            if entry.fingerprint.file_type == FileType::Missing {
                return false;
            }
            match before_by_path.get(entry.absolute_path.as_str()) {
                None => true,
                Some(before_entry) if before_entry.fingerprint != entry.fingerprint => true,
                Some(_) => previous.contains(entry.absolute_path.as_str()),
            }
        })
        .cloned()
        .collect()
}
