// src/task/checker.rs

//! Shared entry point of the decision engine.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, warn};
use uuid::Uuid;

use crate::fingerprint::{CurrentFileCollectionFingerprint, FingerprintingStrategy};
use crate::history::{HistoryStore, TaskExecutionRecord};
use crate::errors::{Result, SnapcheckError};
use crate::task::overlap::OutputRegistry;
use crate::task::spec::{FilePropertySpec, TaskSpec};
use crate::task::state::TaskArtifactState;
use crate::vfs::{Scanner, SnapshotHierarchy, VirtualFileSystem};

/// Decides, for every task of a build, whether it must run.
///
/// One checker is shared by all tasks of a build. It may be used from several
/// threads: evaluation only reads the VFS, and history access is serialized.
pub struct UpToDateChecker {
    vfs: Arc<VirtualFileSystem>,
    history: Mutex<Box<dyn HistoryStore>>,
    registry: OutputRegistry,
    scanner: Option<Scanner>,
    build_invocation_id: String,
}

impl std::fmt::Debug for UpToDateChecker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpToDateChecker")
            .field("build_invocation_id", &self.build_invocation_id)
            .field("scanner", &self.scanner.is_some())
            .finish()
    }
}

impl UpToDateChecker {
    pub fn new(vfs: Arc<VirtualFileSystem>, history: Box<dyn HistoryStore>) -> Self {
        let case_sensitivity = vfs.case_sensitivity();
        Self {
            vfs,
            history: Mutex::new(history),
            registry: OutputRegistry::new(case_sensitivity),
            scanner: None,
            build_invocation_id: Uuid::new_v4().to_string(),
        }
    }

    /// Scan file roots on demand: unknown roots before evaluation, output
    /// roots again after execution. Without a scanner the caller keeps the VFS
    /// current.
    pub fn with_scanner(mut self, scanner: Scanner) -> Self {
        self.scanner = Some(scanner);
        self
    }

    pub fn with_build_invocation_id(mut self, id: impl Into<String>) -> Self {
        self.build_invocation_id = id.into();
        self
    }

    pub fn build_invocation_id(&self) -> &str {
        &self.build_invocation_id
    }

    pub fn vfs(&self) -> &Arc<VirtualFileSystem> {
        &self.vfs
    }

    pub fn registry(&self) -> &OutputRegistry {
        &self.registry
    }

    /// Declare the outputs of every task taking part in the build, so
    /// overlaps between them are found no matter the evaluation order.
    pub fn register_tasks<'a>(&self, specs: impl IntoIterator<Item = &'a TaskSpec>) {
        for spec in specs {
            self.registry.register(spec);
        }
    }

    /// Start evaluating `spec`.
    pub fn state_for<'a>(&'a self, spec: &'a TaskSpec) -> TaskArtifactState<'a> {
        TaskArtifactState::new(self, spec)
    }

    fn history(&self) -> MutexGuard<'_, Box<dyn HistoryStore>> {
        self.history.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Previous execution of `task`. A corrupt record is logged and treated
    /// as absent.
    pub fn load_history(&self, task: &str) -> Result<Option<TaskExecutionRecord>> {
        match self.history().load(task) {
            Ok(record) => Ok(record),
            Err(SnapcheckError::HistoryCorrupt { task, reason }) => {
                warn!(task = %task, reason = %reason, "discarding corrupt execution history");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    pub fn save_history(&self, record: &TaskExecutionRecord) -> Result<()> {
        self.history().save(&record.task, record)?;
        Ok(())
    }

    /// Drop records of tasks that no longer exist.
    pub fn prune_history(&self, active_tasks: &[&str]) -> Result<()> {
        self.history().prune(active_tasks)?;
        Ok(())
    }

    /// Make sure the VFS knows every root of `properties`.
    pub(crate) fn ensure_scanned(&self, properties: &[FilePropertySpec]) -> Result<()> {
        let Some(scanner) = &self.scanner else {
            return Ok(());
        };
        for root in properties.iter().flat_map(|p| p.roots.iter()) {
            scanner.ensure(&self.vfs, root)?;
        }
        Ok(())
    }

    /// Re-scan every root of `properties`, e.g. after a task wrote them.
    pub(crate) fn rescan(&self, properties: &[FilePropertySpec]) -> Result<()> {
        let Some(scanner) = &self.scanner else {
            return Ok(());
        };
        for root in properties.iter().flat_map(|p| p.roots.iter()) {
            scanner.refresh(&self.vfs, root)?;
        }
        Ok(())
    }
}

/// Fingerprint each property from one consistent hierarchy.
pub(crate) fn fingerprint_properties(
    hierarchy: &SnapshotHierarchy,
    properties: &[FilePropertySpec],
    strategy_override: Option<FingerprintingStrategy>,
) -> Vec<(String, CurrentFileCollectionFingerprint)> {
    let mut seen: HashMap<&str, usize> = HashMap::new();
    let mut out = Vec::with_capacity(properties.len());
    for property in properties {
        if let Some(idx) = seen.get(property.name.as_str()) {
            debug!(property = %property.name, index = *idx, "duplicate file property ignored");
            continue;
        }
        seen.insert(&property.name, out.len());

        let roots: Vec<_> = property
            .roots
            .iter()
            .flat_map(|root| hierarchy.root_snapshots_under(root))
            .collect();
        let strategy = strategy_override.unwrap_or_else(|| property.strategy());
        out.push((property.name.clone(), strategy.fingerprint(&roots)));
    }
    out
}
