// src/task/state.rs

//! Evaluation state of a single task.
//!
//! A [`TaskArtifactState`] moves through
//! `NotEvaluated → Evaluating → Decided(verdict) → Recorded`. The decision
//! is computed once; adjustments before execution (outputs removed, stale
//! outputs) can only downgrade it to a rebuild.

use std::fmt;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use tracing::{debug, info, warn};

use crate::change::{CollectingVisitor, FileChange, MessageCollector, TaskStateChange};
use crate::errors::{Result, SnapcheckError};
use crate::fingerprint::{
    CurrentFileCollectionFingerprint, FileCollectionFingerprint, FingerprintingStrategy,
    HistoricalFileCollectionFingerprint,
};
use crate::fs::FileSystem;
use crate::history::TaskExecutionRecord;
use crate::task::cache_key::{compute_cache_key, CacheKey};
use crate::task::changes::{ChangeDetector, CurrentExecution};
use crate::task::checker::{fingerprint_properties, UpToDateChecker};
use crate::task::overlap::{detect_overlap, filter_outputs_after_execution, OverlappingOutputs};
use crate::task::spec::TaskSpec;
use crate::types::FileType;

/// Cap on rebuild reasons kept in a decision.
const MAX_REPORTED_CHANGES: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    UpToDate,
    /// Only input files changed; the task may process just the delta.
    Incremental,
    Rebuild,
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verdict::UpToDate => f.write_str("UP-TO-DATE"),
            Verdict::Incremental => f.write_str("INCREMENTAL"),
            Verdict::Rebuild => f.write_str("REBUILD"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvaluationStatus {
    NotEvaluated,
    Evaluating,
    Decided(Verdict),
    Recorded,
}

#[derive(Debug, Clone)]
pub struct Decision {
    pub verdict: Verdict,
    /// For a rebuild, the reasons. For an incremental execution, every
    /// changed input file.
    pub changes: Vec<TaskStateChange>,
    pub cache_key: Option<CacheKey>,
    pub overlapping_outputs: Option<OverlappingOutputs>,
}

impl Decision {
    /// The input-file delta, in detection order.
    pub fn input_changes(&self) -> impl Iterator<Item = &FileChange> {
        self.changes.iter().filter_map(TaskStateChange::as_file_change)
    }

    /// Up to `max` human-readable reasons, plus a summary line if there are
    /// more.
    pub fn messages(&self, max: usize) -> Vec<String> {
        MessageCollector::collect(max, &self.changes)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionOutcome {
    Succeeded,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordOutcome {
    /// The task did not run; history is untouched.
    UpToDate,
    /// The task failed without touching its outputs; the previous record
    /// still describes them.
    KeptPrevious,
    /// A new record was written. `output_files` are the regular files that
    /// belong to the task, i.e. what a build cache would store under
    /// `cache_key`.
    Stored {
        cache_key: Option<CacheKey>,
        output_files: Vec<String>,
    },
}

pub struct TaskArtifactState<'a> {
    checker: &'a UpToDateChecker,
    spec: &'a TaskSpec,
    status: EvaluationStatus,
    previous: Option<TaskExecutionRecord>,
    current: Option<CurrentExecution>,
    decision: Option<Decision>,
}

impl<'a> TaskArtifactState<'a> {
    pub(crate) fn new(checker: &'a UpToDateChecker, spec: &'a TaskSpec) -> Self {
        Self {
            checker,
            spec,
            status: EvaluationStatus::NotEvaluated,
            previous: None,
            current: None,
            decision: None,
        }
    }

    pub fn status(&self) -> EvaluationStatus {
        self.status
    }

    pub fn decision(&self) -> Option<&Decision> {
        self.decision.as_ref()
    }

    pub fn verdict(&self) -> Option<Verdict> {
        self.decision.as_ref().map(|d| d.verdict)
    }

    pub fn previous_execution(&self) -> Option<&TaskExecutionRecord> {
        self.previous.as_ref()
    }

    /// Build that produced the outputs currently on disk.
    pub fn origin_build_invocation_id(&self) -> Option<&str> {
        self.previous.as_ref().map(|p| p.build_invocation_id.as_str())
    }

    /// Regular files recorded as outputs of the previous execution.
    pub fn previous_output_files(&self) -> Vec<String> {
        self.previous
            .iter()
            .flat_map(|p| p.output_files.iter())
            .flat_map(|(_, fp)| fp.file_paths())
            .map(str::to_string)
            .collect()
    }

    /// Decide whether the task must run. Calling this again after a decision
    /// returns the same decision.
    pub fn evaluate(&mut self) -> Result<&Decision> {
        match self.status {
            EvaluationStatus::Decided(_) => {}
            EvaluationStatus::Recorded => {
                return Err(SnapcheckError::InvalidState(format!(
                    "task '{}' was already recorded",
                    self.spec.name
                )));
            }
            EvaluationStatus::NotEvaluated | EvaluationStatus::Evaluating => {
                self.status = EvaluationStatus::Evaluating;
                if let Err(e) = self.compute_decision() {
                    self.status = EvaluationStatus::NotEvaluated;
                    return Err(e);
                }
            }
        }
        self.decision
            .as_ref()
            .ok_or_else(|| SnapcheckError::InvalidState("decided without a decision".to_string()))
    }

    fn compute_decision(&mut self) -> Result<()> {
        let spec = self.spec;
        let previous = self.checker.load_history(&spec.name)?;

        self.checker.ensure_scanned(&spec.input_files)?;
        self.checker.ensure_scanned(&spec.output_files)?;
        let hierarchy = self.checker.vfs().root();

        let current = CurrentExecution {
            implementation: spec.implementation.clone(),
            input_properties: spec.input_properties.clone(),
            input_files: fingerprint_properties(&hierarchy, &spec.input_files, None),
            outputs_before: fingerprint_properties(
                &hierarchy,
                &spec.output_files,
                Some(FingerprintingStrategy::Absolute),
            ),
        };

        let overlapping = self.checker.registry().find_overlap(spec).or_else(|| {
            previous
                .as_ref()
                .and_then(|p| detect_overlap(&p.output_files, &current.outputs_before))
        });

        let cache_key = if overlapping.is_some() || !spec.cacheable {
            None
        } else {
            compute_cache_key(spec, &current.input_files, &current.input_properties)
        };

        let (verdict, changes) = decide(spec, previous.as_ref(), &current, overlapping.as_ref());

        info!(
            task = %spec.name,
            verdict = %verdict,
            reasons = ?MessageCollector::collect(MessageCollector::DEFAULT_MAX, &changes),
            cache_key = ?cache_key.map(|k| k.to_string()),
            "evaluated task"
        );

        self.previous = previous;
        self.current = Some(current);
        self.decision = Some(Decision {
            verdict,
            changes,
            cache_key,
            overlapping_outputs: overlapping,
        });
        self.status = EvaluationStatus::Decided(verdict);
        Ok(())
    }

    fn decided(&mut self, operation: &str) -> Result<&mut Decision> {
        match (self.status, self.decision.as_mut()) {
            (EvaluationStatus::Decided(_), Some(decision)) => Ok(decision),
            (status, _) => Err(SnapcheckError::InvalidState(format!(
                "{operation} called for task '{}' while {status:?}",
                self.spec.name
            ))),
        }
    }

    /// The executor deleted all outputs before running: an incremental
    /// execution is no longer possible.
    pub fn outputs_removed(&mut self) -> Result<()> {
        let decision = self.decided("outputs_removed")?;
        if decision.verdict == Verdict::Incremental {
            decision.verdict = Verdict::Rebuild;
            decision.changes.insert(0, TaskStateChange::OutputsRemoved);
            self.status = EvaluationStatus::Decided(Verdict::Rebuild);
        }
        Ok(())
    }

    /// Override the decision with a rebuild.
    pub fn force_rebuild(&mut self, reason: TaskStateChange) -> Result<()> {
        let decision = self.decided("force_rebuild")?;
        if decision.verdict != Verdict::Rebuild {
            decision.changes.clear();
        }
        decision.verdict = Verdict::Rebuild;
        decision.changes.insert(0, reason);
        self.status = EvaluationStatus::Decided(Verdict::Rebuild);
        Ok(())
    }

    /// Check that every output file recorded by the previous execution still
    /// exists on disk. An output that cannot be stat'ed counts as gone.
    pub fn verify_outputs(&self, fs: &dyn FileSystem) -> Result<()> {
        for path in self.previous_output_files() {
            let stat = match fs.stat(Path::new(&path)) {
                Ok(stat) => stat,
                Err(e) => {
                    debug!(path = %path, error = %e, "cannot stat recorded output");
                    return Err(SnapcheckError::StaleState { path });
                }
            };
            if stat.file_type != FileType::RegularFile {
                return Err(SnapcheckError::StaleState { path });
            }
        }
        Ok(())
    }

    /// Run [`verify_outputs`](Self::verify_outputs) and recover from stale
    /// state: the VFS entry is dropped and the task is rebuilt.
    pub fn verify_outputs_or_rebuild(&mut self, fs: &dyn FileSystem) -> Result<Verdict> {
        match self.verify_outputs(fs) {
            Ok(()) => {}
            Err(SnapcheckError::StaleState { path }) => {
                warn!(task = %self.spec.name, path = %path, "recorded output vanished; rebuilding");
                self.checker.vfs().invalidate(&path);
                self.force_rebuild(TaskStateChange::StaleOutputs { path })?;
            }
            Err(e) => return Err(e),
        }
        Ok(self.decided("verify_outputs_or_rebuild")?.verdict)
    }

    /// Record the execution. Must be called once the task has run (or was
    /// skipped as up to date) and its outputs are on disk.
    pub fn after_execution(&mut self, outcome: ExecutionOutcome) -> Result<RecordOutcome> {
        let decision = self.decided("after_execution")?.clone();
        if decision.verdict == Verdict::UpToDate {
            self.status = EvaluationStatus::Recorded;
            return Ok(RecordOutcome::UpToDate);
        }

        let spec = self.spec;
        let current = self.current.as_ref().ok_or_else(|| {
            SnapcheckError::InvalidState(format!("task '{}' has no captured state", spec.name))
        })?;

        self.checker.rescan(&spec.output_files)?;
        let hierarchy = self.checker.vfs().root();
        let outputs_after = fingerprint_properties(
            &hierarchy,
            &spec.output_files,
            Some(FingerprintingStrategy::Absolute),
        );

        let outputs_changed = outputs_after.iter().any(|(name, after)| {
            current
                .output_before(name)
                .is_none_or(|before| before.combined_hash() != after.combined_hash())
        });
        let successful = outcome == ExecutionOutcome::Succeeded;

        if !successful && !outputs_changed {
            info!(task = %spec.name, "task failed without changing outputs; keeping previous record");
            self.status = EvaluationStatus::Recorded;
            return Ok(RecordOutcome::KeptPrevious);
        }

        let mut output_files: Vec<(String, HistoricalFileCollectionFingerprint)> = Vec::new();
        for (name, after) in &outputs_after {
            let archived = match (&decision.overlapping_outputs, current.output_before(name)) {
                (Some(_), Some(before)) => {
                    let previous = self.previous.as_ref().and_then(|p| p.output_file(name));
                    let owned = filter_outputs_after_execution(previous, before, after);
                    debug!(
                        task = %spec.name,
                        property = %name,
                        kept = owned.len(),
                        total = after.entries().len(),
                        "filtered overlapping outputs"
                    );
                    CurrentFileCollectionFingerprint::new(FingerprintingStrategy::Absolute, owned)
                        .archive()
                }
                _ => after.archive(),
            };
            output_files.push((name.clone(), archived));
        }

        let record = TaskExecutionRecord {
            task: spec.name.clone(),
            build_invocation_id: self.checker.build_invocation_id().to_string(),
            execution_time_ms: now_millis(),
            successful,
            implementation: current.implementation.clone(),
            input_properties: current.input_properties.clone(),
            input_files: current
                .input_files
                .iter()
                .map(|(name, fp)| (name.clone(), fp.archive()))
                .collect(),
            output_files,
            cache_key: decision.cache_key,
            overlapping_outputs: decision.overlapping_outputs.clone(),
        };
        self.checker.save_history(&record)?;

        let output_paths: Vec<String> = record
            .output_files
            .iter()
            .flat_map(|(_, fp)| fp.file_paths())
            .map(str::to_string)
            .collect();
        info!(
            task = %spec.name,
            successful,
            outputs = output_paths.len(),
            "recorded task execution"
        );

        self.status = EvaluationStatus::Recorded;
        Ok(RecordOutcome::Stored {
            cache_key: decision.cache_key,
            output_files: output_paths,
        })
    }
}

fn decide(
    spec: &TaskSpec,
    previous: Option<&TaskExecutionRecord>,
    current: &CurrentExecution,
    overlapping: Option<&OverlappingOutputs>,
) -> (Verdict, Vec<TaskStateChange>) {
    let Some(previous) = previous else {
        return (Verdict::Rebuild, vec![TaskStateChange::NoHistory]);
    };
    if let Some(overlap) = overlapping {
        return (
            Verdict::Rebuild,
            vec![TaskStateChange::OverlappingOutputs {
                message: overlap.message(),
            }],
        );
    }
    if !previous.successful {
        return (Verdict::Rebuild, vec![TaskStateChange::PreviousExecutionFailed]);
    }

    let detector = ChangeDetector::new(previous, current);

    let mut rebuild = CollectingVisitor::with_limit(MAX_REPORTED_CHANGES);
    detector.visit_rebuild_changes(&mut rebuild);
    if !rebuild.changes.is_empty() {
        return (Verdict::Rebuild, rebuild.into_changes());
    }

    let mut inputs = CollectingVisitor::new();
    detector.visit_input_file_changes(&mut inputs);
    let changes = inputs.into_changes();
    if changes.is_empty() {
        return (Verdict::UpToDate, changes);
    }

    let addressable = changes
        .iter()
        .filter_map(TaskStateChange::as_file_change)
        .all(|change| {
            spec.input_file_property(&change.property)
                .is_some_and(|p| p.strategy().is_addressable())
        });
    let verdict = if spec.incremental && addressable {
        Verdict::Incremental
    } else {
        Verdict::Rebuild
    };
    (verdict, changes)
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}
