// src/config/validate.rs

use std::collections::{BTreeMap, HashSet};

use globset::Glob;
use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;

use crate::config::model::{ConfigFile, FilePropertyConfig, RawConfigFile, TaskConfig};
use crate::errors::{Result, SnapcheckError};
use crate::types::HistoryStorageMode;

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = SnapcheckError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(ConfigFile::new_unchecked(raw.config, raw.default, raw.task))
    }
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    ensure_has_tasks(cfg)?;
    validate_global_config(cfg)?;
    validate_file_properties(cfg)?;
    validate_task_dependencies(cfg)?;
    order_tasks(&cfg.task)?;
    Ok(())
}

fn ensure_has_tasks(cfg: &RawConfigFile) -> Result<()> {
    if cfg.task.is_empty() {
        return Err(SnapcheckError::ConfigError(
            "config must contain at least one [task.<name>] section".to_string(),
        ));
    }
    Ok(())
}

fn validate_global_config(cfg: &RawConfigFile) -> Result<()> {
    if cfg.config.history == HistoryStorageMode::File && cfg.config.history_dir.trim().is_empty() {
        return Err(SnapcheckError::ConfigError(
            "[config].history_dir must not be empty when history = \"file\"".to_string(),
        ));
    }

    for pattern in &cfg.default.exclude {
        Glob::new(pattern).map_err(|e| {
            SnapcheckError::ConfigError(format!("invalid [default].exclude glob {pattern:?}: {e}"))
        })?;
    }
    Ok(())
}

fn validate_file_properties(cfg: &RawConfigFile) -> Result<()> {
    for (name, task) in cfg.task.iter() {
        check_properties(name, "inputs", &task.inputs)?;
        check_properties(name, "outputs", &task.outputs)?;
    }
    Ok(())
}

fn check_properties(task: &str, field: &str, properties: &[FilePropertyConfig]) -> Result<()> {
    let mut seen = HashSet::new();
    for property in properties {
        if property.name.trim().is_empty() {
            return Err(SnapcheckError::ConfigError(format!(
                "task '{task}' has a property without a name in `{field}`"
            )));
        }
        if !seen.insert(property.name.as_str()) {
            return Err(SnapcheckError::ConfigError(format!(
                "task '{task}' declares property '{}' twice in `{field}`",
                property.name
            )));
        }
        if property.paths.is_empty() || property.paths.iter().any(|p| p.trim().is_empty()) {
            return Err(SnapcheckError::ConfigError(format!(
                "property '{}' of task '{task}' needs at least one non-empty path",
                property.name
            )));
        }
    }
    Ok(())
}

fn validate_task_dependencies(cfg: &RawConfigFile) -> Result<()> {
    for (name, task) in cfg.task.iter() {
        for dep in task.after.iter() {
            if !cfg.task.contains_key(dep) {
                return Err(SnapcheckError::ConfigError(format!(
                    "task '{}' has unknown dependency '{}' in `after`",
                    name, dep
                )));
            }
            if dep == name {
                return Err(SnapcheckError::ConfigError(format!(
                    "task '{}' cannot depend on itself in `after`",
                    name
                )));
            }
        }
    }
    Ok(())
}

/// Task names ordered so every task comes after the tasks in its `after`
/// list. Fails on a cycle.
fn order_tasks(tasks: &BTreeMap<String, TaskConfig>) -> Result<Vec<String>> {
    // Edge direction: dep -> task. For `[task.B] after = ["A"]` we add A -> B.
    let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();

    for name in tasks.keys() {
        graph.add_node(name.as_str());
    }

    for (name, task) in tasks.iter() {
        for dep in task.after.iter() {
            graph.add_edge(dep.as_str(), name.as_str(), ());
        }
    }

    match toposort(&graph, None) {
        Ok(order) => Ok(order.into_iter().map(str::to_string).collect()),
        Err(cycle) => Err(SnapcheckError::DependencyCycle(format!(
            "cycle detected in task dependencies involving task '{}'",
            cycle.node_id()
        ))),
    }
}

impl ConfigFile {
    /// Task names in dependency order.
    pub fn evaluation_order(&self) -> Result<Vec<String>> {
        order_tasks(&self.task)
    }
}
