// src/change.rs

//! Changes detected between two executions of a task, and the visitors that
//! consume them.
//!
//! Detection code pushes every change into a [`ChangeVisitor`]; the visitor
//! returns `false` to stop the walk early. That lets an up-to-date check stop
//! at the first change while diagnostics or incremental execution can see all
//! of them.

use std::fmt;

use crate::types::FileType;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeKind {
    Added,
    Removed,
    Modified,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PropertyDirection {
    Input,
    Output,
}

impl fmt::Display for PropertyDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyDirection::Input => f.write_str("Input"),
            PropertyDirection::Output => f.write_str("Output"),
        }
    }
}

/// One added, removed or modified file of a file property.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileChange {
    pub property: String,
    pub direction: PropertyDirection,
    /// Absolute path of the file (current path for additions and
    /// modifications, previous path for removals).
    pub path: String,
    pub normalized_path: String,
    pub kind: ChangeKind,
    pub previous_type: Option<FileType>,
    pub current_type: Option<FileType>,
}

impl FileChange {
    pub fn message(&self) -> String {
        let what = match self.kind {
            ChangeKind::Added => "has been added",
            ChangeKind::Removed => "has been removed",
            ChangeKind::Modified => "has changed",
        };
        format!(
            "{} property '{}' file {} {}.",
            self.direction, self.property, self.path, what
        )
    }
}

/// Any reason a task may not be up to date.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskStateChange {
    /// No previous execution is recorded.
    NoHistory,
    PreviousExecutionFailed,
    /// Another task, or something outside the build, wrote into this task's
    /// outputs.
    OverlappingOutputs { message: String },
    ImplementationChanged { previous: String, current: String },
    ImplementationUnknown { type_name: String },
    InputPropertyValueChanged { property: String },
    InputPropertyAdded { property: String },
    InputPropertyRemoved { property: String },
    /// The set of file properties, or the way one is normalized, changed.
    FilePropertySetChanged {
        direction: PropertyDirection,
        property: String,
        added: bool,
    },
    FilePropertyNormalizationChanged {
        direction: PropertyDirection,
        property: String,
    },
    File(FileChange),
    /// Recorded outputs disappeared between evaluation and execution.
    StaleOutputs { path: String },
    OutputsRemoved,
}

impl TaskStateChange {
    pub fn message(&self) -> String {
        match self {
            TaskStateChange::NoHistory => "No history is available.".to_string(),
            TaskStateChange::PreviousExecutionFailed => {
                "Task has failed previously.".to_string()
            }
            TaskStateChange::OverlappingOutputs { message } => message.clone(),
            TaskStateChange::ImplementationChanged { previous, current } => format!(
                "Task implementation has changed from '{previous}' to '{current}'."
            ),
            TaskStateChange::ImplementationUnknown { type_name } => {
                format!("Implementation of '{type_name}' is unknown.")
            }
            TaskStateChange::InputPropertyValueChanged { property } => {
                format!("Value of input property '{property}' has changed.")
            }
            TaskStateChange::InputPropertyAdded { property } => {
                format!("Input property '{property}' has been added.")
            }
            TaskStateChange::InputPropertyRemoved { property } => {
                format!("Input property '{property}' has been removed.")
            }
            TaskStateChange::FilePropertySetChanged {
                direction,
                property,
                added,
            } => format!(
                "{direction} file property '{property}' has been {}.",
                if *added { "added" } else { "removed" }
            ),
            TaskStateChange::FilePropertyNormalizationChanged {
                direction,
                property,
            } => format!("{direction} file property '{property}' changed its path sensitivity."),
            TaskStateChange::File(change) => change.message(),
            TaskStateChange::StaleOutputs { path } => {
                format!("Output file {path} no longer exists.")
            }
            TaskStateChange::OutputsRemoved => "Outputs were removed before execution.".to_string(),
        }
    }

    pub fn as_file_change(&self) -> Option<&FileChange> {
        match self {
            TaskStateChange::File(change) => Some(change),
            _ => None,
        }
    }
}

impl fmt::Display for TaskStateChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message())
    }
}

pub trait ChangeVisitor {
    /// Return `false` to stop receiving changes.
    fn visit_change(&mut self, change: TaskStateChange) -> bool;
}

/// Stops at the first change.
#[derive(Debug, Default)]
pub struct FirstChange {
    pub change: Option<TaskStateChange>,
}

impl ChangeVisitor for FirstChange {
    fn visit_change(&mut self, change: TaskStateChange) -> bool {
        self.change = Some(change);
        false
    }
}

/// Keeps every change, optionally up to a limit.
#[derive(Debug, Default)]
pub struct CollectingVisitor {
    pub changes: Vec<TaskStateChange>,
    limit: Option<usize>,
}

impl CollectingVisitor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_limit(limit: usize) -> Self {
        Self {
            changes: Vec::new(),
            limit: Some(limit),
        }
    }

    pub fn into_changes(self) -> Vec<TaskStateChange> {
        self.changes
    }
}

impl ChangeVisitor for CollectingVisitor {
    fn visit_change(&mut self, change: TaskStateChange) -> bool {
        self.changes.push(change);
        self.limit.is_none_or(|limit| self.changes.len() < limit)
    }
}

/// Human-readable messages for a log line, capped at `max` with a summary of
/// how many more there were.
#[derive(Debug)]
pub struct MessageCollector {
    max: usize,
    messages: Vec<String>,
    total: usize,
}

impl MessageCollector {
    pub const DEFAULT_MAX: usize = 3;

    pub fn new(max: usize) -> Self {
        Self {
            max,
            messages: Vec::new(),
            total: 0,
        }
    }

    pub fn collect<'a>(max: usize, changes: impl IntoIterator<Item = &'a TaskStateChange>) -> Vec<String> {
        let mut collector = Self::new(max);
        for change in changes {
            collector.visit_change(change.clone());
        }
        collector.into_messages()
    }

    pub fn into_messages(mut self) -> Vec<String> {
        if self.total > self.messages.len() {
            let more = self.total - self.messages.len();
            self.messages.push(format!("and more... ({more} more change(s))"));
        }
        self.messages
    }
}

impl Default for MessageCollector {
    fn default() -> Self {
        Self::new(Self::DEFAULT_MAX)
    }
}

impl ChangeVisitor for MessageCollector {
    fn visit_change(&mut self, change: TaskStateChange) -> bool {
        self.total += 1;
        if self.messages.len() < self.max {
            self.messages.push(change.message());
        }
        true
    }
}
