// src/task/changes.rs

//! Comparing the current state of a task against its previous execution.
//!
//! Changes fall into two groups. *Rebuild* changes (implementation, input
//! values, the set of file properties, any output change) always force a full
//! rebuild. *Input file* changes may be handed to an incremental task as a
//! delta.

use std::collections::BTreeMap;

use crate::change::{ChangeVisitor, PropertyDirection, TaskStateChange};
use crate::fingerprint::{
    CompareOptions, CurrentFileCollectionFingerprint, FileCollectionFingerprint,
    HistoricalFileCollectionFingerprint,
};
use crate::history::TaskExecutionRecord;
use crate::task::spec::{ImplementationSnapshot, ValueSnapshot};

/// Everything captured about a task right before it would execute.
#[derive(Debug, Clone)]
pub struct CurrentExecution {
    pub implementation: ImplementationSnapshot,
    pub input_properties: BTreeMap<String, ValueSnapshot>,
    pub input_files: Vec<(String, CurrentFileCollectionFingerprint)>,
    pub outputs_before: Vec<(String, CurrentFileCollectionFingerprint)>,
}

impl CurrentExecution {
    pub fn input_file(&self, property: &str) -> Option<&CurrentFileCollectionFingerprint> {
        self.input_files
            .iter()
            .find(|(name, _)| name == property)
            .map(|(_, fp)| fp)
    }

    pub fn output_before(&self, property: &str) -> Option<&CurrentFileCollectionFingerprint> {
        self.outputs_before
            .iter()
            .find(|(name, _)| name == property)
            .map(|(_, fp)| fp)
    }
}

pub struct ChangeDetector<'a> {
    previous: &'a TaskExecutionRecord,
    current: &'a CurrentExecution,
}

impl<'a> ChangeDetector<'a> {
    pub fn new(previous: &'a TaskExecutionRecord, current: &'a CurrentExecution) -> Self {
        Self { previous, current }
    }

    /// Visit changes that rule out both up-to-date and incremental execution.
    pub fn visit_rebuild_changes(&self, visitor: &mut dyn ChangeVisitor) -> bool {
        self.visit_implementation_changes(visitor)
            && self.visit_input_property_changes(visitor)
            && visit_property_set_changes(
                PropertyDirection::Input,
                &self.previous.input_files,
                &self.current.input_files,
                visitor,
            )
            && visit_property_set_changes(
                PropertyDirection::Output,
                &self.previous.output_files,
                &self.current.outputs_before,
                visitor,
            )
            && self.visit_output_file_changes(visitor)
    }

    /// Visit added, removed and modified input files of properties present in
    /// both executions.
    pub fn visit_input_file_changes(&self, visitor: &mut dyn ChangeVisitor) -> bool {
        for (name, current) in &self.current.input_files {
            let Some(previous) = self.previous.input_file(name) else {
                continue;
            };
            if !current.visit_changes_since(
                previous,
                name,
                PropertyDirection::Input,
                CompareOptions::ALL,
                visitor,
            ) {
                return false;
            }
        }
        true
    }

    fn visit_implementation_changes(&self, visitor: &mut dyn ChangeVisitor) -> bool {
        let current = &self.current.implementation;
        if current.is_unknown() {
            return visitor.visit_change(TaskStateChange::ImplementationUnknown {
                type_name: current.type_name.clone(),
            });
        }
        if *current != self.previous.implementation {
            return visitor.visit_change(TaskStateChange::ImplementationChanged {
                previous: self.previous.implementation.to_string(),
                current: current.to_string(),
            });
        }
        true
    }

    fn visit_input_property_changes(&self, visitor: &mut dyn ChangeVisitor) -> bool {
        let previous = &self.previous.input_properties;
        let current = &self.current.input_properties;

        for (name, value) in current {
            let change = match previous.get(name) {
                None => TaskStateChange::InputPropertyAdded {
                    property: name.clone(),
                },
                Some(old) if old != value => TaskStateChange::InputPropertyValueChanged {
                    property: name.clone(),
                },
                Some(_) => continue,
            };
            if !visitor.visit_change(change) {
                return false;
            }
        }
        for name in previous.keys().filter(|name| !current.contains_key(*name)) {
            if !visitor.visit_change(TaskStateChange::InputPropertyRemoved {
                property: name.clone(),
            }) {
                return false;
            }
        }
        true
    }

    fn visit_output_file_changes(&self, visitor: &mut dyn ChangeVisitor) -> bool {
        for (name, current) in &self.current.outputs_before {
            let Some(previous) = self.previous.output_file(name) else {
                continue;
            };
            if !current.visit_changes_since(
                previous,
                name,
                PropertyDirection::Output,
                CompareOptions::OUTPUTS,
                visitor,
            ) {
                return false;
            }
        }
        true
    }
}

fn visit_property_set_changes(
    direction: PropertyDirection,
    previous: &[(String, HistoricalFileCollectionFingerprint)],
    current: &[(String, CurrentFileCollectionFingerprint)],
    visitor: &mut dyn ChangeVisitor,
) -> bool {
    for (name, fp) in current {
        let change = match previous.iter().find(|(prev, _)| prev == name) {
            None => TaskStateChange::FilePropertySetChanged {
                direction,
                property: name.clone(),
                added: true,
            },
            Some((_, prev)) if normalization_changed(prev, fp) => {
                TaskStateChange::FilePropertyNormalizationChanged {
                    direction,
                    property: name.clone(),
                }
            }
            Some(_) => continue,
        };
        if !visitor.visit_change(change) {
            return false;
        }
    }
    for (name, _) in previous {
        if current.iter().any(|(cur, _)| cur == name) {
            continue;
        }
        if !visitor.visit_change(TaskStateChange::FilePropertySetChanged {
            direction,
            property: name.clone(),
            added: false,
        }) {
            return false;
        }
    }
    true
}

fn normalization_changed(
    previous: &HistoricalFileCollectionFingerprint,
    current: &CurrentFileCollectionFingerprint,
) -> bool {
    if previous.compare_strategy() != current.compare_strategy() {
        return true;
    }
    previous.strategy.is_some_and(|s| s != current.strategy())
}
