// src/history/mod.rs

//! Execution history: what a task looked like the last time it ran.

pub mod codec;
pub mod store;

use std::collections::BTreeMap;

use crate::fingerprint::HistoricalFileCollectionFingerprint;
use crate::task::cache_key::CacheKey;
use crate::task::overlap::OverlappingOutputs;
use crate::task::spec::{ImplementationSnapshot, ValueSnapshot};

pub use store::{FileHistoryStore, HistoryStore, MemoryHistoryStore, HISTORY_DIR};

/// Persisted state of one task execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskExecutionRecord {
    pub task: String,
    /// Build that produced the recorded outputs.
    pub build_invocation_id: String,
    /// Milliseconds since the Unix epoch.
    pub execution_time_ms: u64,
    pub successful: bool,
    pub implementation: ImplementationSnapshot,
    pub input_properties: BTreeMap<String, ValueSnapshot>,
    pub input_files: Vec<(String, HistoricalFileCollectionFingerprint)>,
    pub output_files: Vec<(String, HistoricalFileCollectionFingerprint)>,
    pub cache_key: Option<CacheKey>,
    pub overlapping_outputs: Option<OverlappingOutputs>,
}

impl TaskExecutionRecord {
    pub fn input_file(&self, property: &str) -> Option<&HistoricalFileCollectionFingerprint> {
        self.input_files
            .iter()
            .find(|(name, _)| name == property)
            .map(|(_, fp)| fp)
    }

    pub fn output_file(&self, property: &str) -> Option<&HistoricalFileCollectionFingerprint> {
        self.output_files
            .iter()
            .find(|(name, _)| name == property)
            .map(|(_, fp)| fp)
    }
}
