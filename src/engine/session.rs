// src/engine/session.rs

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info};

use crate::change::MessageCollector;
use crate::config::ConfigFile;
use crate::errors::{Result, SnapcheckError};
use crate::fs::FileSystem;
use crate::history::{FileHistoryStore, HistoryStore, MemoryHistoryStore};
use crate::task::{ExecutionOutcome, RecordOutcome, TaskSpec, UpToDateChecker, Verdict};
use crate::types::HistoryStorageMode;
use crate::vfs::{Scanner, VirtualFileSystem};

use super::TaskReport;

/// Every task of one config, bound to a shared checker and VFS.
///
/// This is the synchronous core: it evaluates tasks on request and knows
/// nothing about channels or signals.
#[derive(Debug)]
pub struct Session {
    config_dir: PathBuf,
    tasks: Vec<TaskSpec>,
    checker: UpToDateChecker,
    fs: Arc<dyn FileSystem>,
}

impl Session {
    /// Build a session with the history store selected by `[config].history`.
    pub fn from_config(
        cfg: &ConfigFile,
        config_dir: impl Into<PathBuf>,
        fs: Arc<dyn FileSystem>,
    ) -> Result<Self> {
        let config_dir = config_dir.into();
        let history: Box<dyn HistoryStore> = match cfg.config.history {
            HistoryStorageMode::File => Box::new(FileHistoryStore::new(
                cfg.history_dir(&config_dir),
                Arc::clone(&fs),
            )),
            HistoryStorageMode::Memory => Box::new(MemoryHistoryStore::new()),
        };
        Self::with_history(cfg, config_dir, fs, history)
    }

    pub fn with_history(
        cfg: &ConfigFile,
        config_dir: impl Into<PathBuf>,
        fs: Arc<dyn FileSystem>,
        history: Box<dyn HistoryStore>,
    ) -> Result<Self> {
        let config_dir = config_dir.into();
        let case_sensitivity = cfg.case_sensitivity();

        let specs = cfg.task_specs(&config_dir);
        let mut tasks = Vec::with_capacity(specs.len());
        for name in cfg.evaluation_order()? {
            let spec = specs
                .iter()
                .find(|s| s.name == name)
                .ok_or_else(|| SnapcheckError::ConfigError(format!("unknown task '{name}'")))?;
            tasks.push(spec.clone());
        }

        let scanner =
            Scanner::new(Arc::clone(&fs), case_sensitivity).with_excludes(&cfg.default.exclude)?;
        let vfs = Arc::new(VirtualFileSystem::new(case_sensitivity));
        let checker = UpToDateChecker::new(vfs, history).with_scanner(scanner);
        checker.register_tasks(&tasks);

        let names: Vec<&str> = tasks.iter().map(|t| t.name.as_str()).collect();
        checker.prune_history(&names)?;

        info!(
            tasks = tasks.len(),
            build = %checker.build_invocation_id(),
            "session ready"
        );

        Ok(Self {
            config_dir,
            tasks,
            checker,
            fs,
        })
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    /// Tasks in evaluation order.
    pub fn tasks(&self) -> &[TaskSpec] {
        &self.tasks
    }

    pub fn task(&self, name: &str) -> Option<&TaskSpec> {
        self.tasks.iter().find(|t| t.name == name)
    }

    pub fn checker(&self) -> &UpToDateChecker {
        &self.checker
    }

    pub fn vfs(&self) -> &Arc<VirtualFileSystem> {
        self.checker.vfs()
    }

    /// Every declared input and output root, without duplicates.
    pub fn roots(&self) -> Vec<String> {
        let mut roots: Vec<String> = Vec::new();
        for task in &self.tasks {
            for root in task
                .input_files
                .iter()
                .chain(task.output_files.iter())
                .flat_map(|p| p.roots.iter())
            {
                if !roots.contains(root) {
                    roots.push(root.clone());
                }
            }
        }
        roots
    }

    /// Evaluate one task. With `record`, a task that is not up to date is
    /// recorded as successfully executed with its files as they are now.
    pub fn evaluate(&self, spec: &TaskSpec, record: bool) -> Result<TaskReport> {
        let mut state = self.checker.state_for(spec);
        state.evaluate()?;
        if state.verdict() == Some(Verdict::UpToDate) {
            state.verify_outputs_or_rebuild(self.fs.as_ref())?;
        }

        let decision = state
            .decision()
            .cloned()
            .ok_or_else(|| SnapcheckError::InvalidState(format!("task '{}' undecided", spec.name)))?;
        let origin_build = state.origin_build_invocation_id().map(str::to_string);

        let recorded = if record {
            match state.after_execution(ExecutionOutcome::Succeeded)? {
                RecordOutcome::Stored { output_files, .. } => Some(output_files.len()),
                RecordOutcome::UpToDate | RecordOutcome::KeptPrevious => None,
            }
        } else {
            None
        };

        Ok(TaskReport {
            task: spec.name.clone(),
            verdict: decision.verdict,
            cache_key: decision.cache_key,
            reasons: decision.messages(MessageCollector::DEFAULT_MAX),
            input_changes: decision.input_changes().count(),
            origin_build,
            recorded_outputs: recorded,
        })
    }

    /// Evaluate every task in dependency order.
    pub fn check_all(&self, record: bool) -> Result<Vec<TaskReport>> {
        self.tasks
            .iter()
            .map(|spec| self.evaluate(spec, record))
            .collect()
    }

    /// Tasks with a root written after `version`, in evaluation order.
    pub fn tasks_changed_since(&self, version: u64) -> Vec<&TaskSpec> {
        let vfs = self.vfs();
        self.tasks
            .iter()
            .filter(|task| {
                task.input_files
                    .iter()
                    .chain(task.output_files.iter())
                    .flat_map(|p| p.roots.iter())
                    .any(|root| vfs.changed_since(root, version))
            })
            .collect()
    }

    /// Re-evaluate the tasks affected by writes after `version`.
    pub fn recheck_changed(&self, version: u64, record: bool) -> Result<Vec<TaskReport>> {
        let changed = self.tasks_changed_since(version);
        debug!(
            since = version,
            tasks = ?changed.iter().map(|t| t.name.as_str()).collect::<Vec<_>>(),
            "re-evaluating changed tasks"
        );
        changed
            .into_iter()
            .map(|spec| self.evaluate(spec, record))
            .collect()
    }
}
