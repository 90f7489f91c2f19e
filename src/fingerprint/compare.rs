// src/fingerprint/compare.rs

//! Comparing two file-collection fingerprints.
//!
//! `Unordered` treats each side as a multiset keyed by normalized path:
//! identical entries cancel out first, leftovers under the same normalized
//! path pair up as modifications, and the rest are additions or removals.
//!
//! `Ordered` keeps entry order meaningful. It runs a Myers diff over the two
//! sequences, then pairs deletions with insertions of the same normalized
//! path. A pair with identical content is a pure reorder and is not reported;
//! a pair with different content is a modification.

use std::collections::{HashMap, VecDeque};

use similar::{capture_diff_slices, Algorithm, DiffOp};

use crate::change::{ChangeKind, ChangeVisitor, FileChange, PropertyDirection, TaskStateChange};
use crate::fingerprint::FingerprintEntry;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FingerprintCompareStrategy {
    Ordered,
    Unordered,
}

/// Which kinds of change to report. Modifications are always reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompareOptions {
    pub include_added: bool,
    pub include_removed: bool,
}

impl CompareOptions {
    pub const ALL: CompareOptions = CompareOptions {
        include_added: true,
        include_removed: true,
    };

    /// Used for outputs: files that appeared in an output directory since the
    /// last execution (e.g. written by another tool) do not invalidate it,
    /// deleted ones do.
    pub const OUTPUTS: CompareOptions = CompareOptions {
        include_added: false,
        include_removed: true,
    };
}

impl Default for CompareOptions {
    fn default() -> Self {
        Self::ALL
    }
}

impl FingerprintCompareStrategy {
    /// Stable tag used by the history wire format.
    pub fn tag(self) -> u8 {
        match self {
            FingerprintCompareStrategy::Ordered => 0,
            FingerprintCompareStrategy::Unordered => 1,
        }
    }

    pub fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            0 => Some(FingerprintCompareStrategy::Ordered),
            1 => Some(FingerprintCompareStrategy::Unordered),
            _ => None,
        }
    }

    /// Visit the changes from `previous` to `current`.
    ///
    /// Returns `false` if the visitor stopped the walk.
    pub fn visit_changes_since(
        self,
        previous: &[FingerprintEntry],
        current: &[FingerprintEntry],
        property: &str,
        direction: PropertyDirection,
        options: CompareOptions,
        visitor: &mut dyn ChangeVisitor,
    ) -> bool {
        let mut emitter = Emitter {
            property,
            direction,
            options,
            visitor,
        };
        match self {
            FingerprintCompareStrategy::Unordered => visit_unordered(previous, current, &mut emitter),
            FingerprintCompareStrategy::Ordered => visit_ordered(previous, current, &mut emitter),
        }
    }
}

struct Emitter<'a> {
    property: &'a str,
    direction: PropertyDirection,
    options: CompareOptions,
    visitor: &'a mut dyn ChangeVisitor,
}

impl Emitter<'_> {
    fn added(&mut self, entry: &FingerprintEntry) -> bool {
        if !self.options.include_added {
            return true;
        }
        self.emit(entry, ChangeKind::Added, None, Some(entry))
    }

    fn removed(&mut self, entry: &FingerprintEntry) -> bool {
        if !self.options.include_removed {
            return true;
        }
        self.emit(entry, ChangeKind::Removed, Some(entry), None)
    }

    fn modified(&mut self, previous: &FingerprintEntry, current: &FingerprintEntry) -> bool {
        self.emit(current, ChangeKind::Modified, Some(previous), Some(current))
    }

    fn emit(
        &mut self,
        entry: &FingerprintEntry,
        kind: ChangeKind,
        previous: Option<&FingerprintEntry>,
        current: Option<&FingerprintEntry>,
    ) -> bool {
        self.visitor.visit_change(TaskStateChange::File(FileChange {
            property: self.property.to_string(),
            direction: self.direction,
            path: entry.absolute_path.clone(),
            normalized_path: entry.fingerprint.normalized_path.clone(),
            kind,
            previous_type: previous.map(|e| e.fingerprint.file_type),
            current_type: current.map(|e| e.fingerprint.file_type),
        }))
    }
}

fn visit_unordered(
    previous: &[FingerprintEntry],
    current: &[FingerprintEntry],
    emitter: &mut Emitter<'_>,
) -> bool {
    if previous == current {
        return true;
    }

    let mut unmatched: HashMap<&str, VecDeque<usize>> = HashMap::new();
    for (idx, entry) in previous.iter().enumerate() {
        unmatched
            .entry(entry.fingerprint.normalized_path.as_str())
            .or_default()
            .push_back(idx);
    }

    // Identical entries cancel out before anything is paired as modified.
    let mut matched = vec![false; current.len()];
    for (cur_idx, entry) in current.iter().enumerate() {
        if let Some(bucket) = unmatched.get_mut(entry.fingerprint.normalized_path.as_str()) {
            if let Some(pos) = bucket
                .iter()
                .position(|&prev_idx| previous[prev_idx].fingerprint == entry.fingerprint)
            {
                bucket.remove(pos);
                matched[cur_idx] = true;
            }
        }
    }

    for (cur_idx, entry) in current.iter().enumerate() {
        if matched[cur_idx] {
            continue;
        }
        let paired = unmatched
            .get_mut(entry.fingerprint.normalized_path.as_str())
            .and_then(VecDeque::pop_front);
        let keep_going = match paired {
            Some(prev_idx) => emitter.modified(&previous[prev_idx], entry),
            None => emitter.added(entry),
        };
        if !keep_going {
            return false;
        }
    }

    let mut removed: Vec<usize> = unmatched.into_values().flatten().collect();
    removed.sort_unstable();
    for prev_idx in removed {
        if !emitter.removed(&previous[prev_idx]) {
            return false;
        }
    }
    true
}

fn visit_ordered(
    previous: &[FingerprintEntry],
    current: &[FingerprintEntry],
    emitter: &mut Emitter<'_>,
) -> bool {
    if previous == current {
        return true;
    }

    let old: Vec<_> = previous.iter().map(|e| &e.fingerprint).collect();
    let new: Vec<_> = current.iter().map(|e| &e.fingerprint).collect();

    let mut deleted: Vec<usize> = Vec::new();
    let mut inserted: Vec<usize> = Vec::new();
    for op in capture_diff_slices(Algorithm::Myers, &old, &new) {
        match op {
            DiffOp::Equal { .. } => {}
            DiffOp::Delete {
                old_index, old_len, ..
            } => deleted.extend(old_index..old_index + old_len),
            DiffOp::Insert {
                new_index, new_len, ..
            } => inserted.extend(new_index..new_index + new_len),
            DiffOp::Replace {
                old_index,
                old_len,
                new_index,
                new_len,
            } => {
                deleted.extend(old_index..old_index + old_len);
                inserted.extend(new_index..new_index + new_len);
            }
        }
    }

    let mut by_path: HashMap<&str, VecDeque<usize>> = HashMap::new();
    for &idx in &deleted {
        by_path
            .entry(previous[idx].fingerprint.normalized_path.as_str())
            .or_default()
            .push_back(idx);
    }

    let mut paired = vec![false; previous.len()];
    for &cur_idx in &inserted {
        let entry = &current[cur_idx];
        let counterpart = by_path
            .get_mut(entry.fingerprint.normalized_path.as_str())
            .and_then(VecDeque::pop_front);
        let keep_going = match counterpart {
            Some(prev_idx) => {
                paired[prev_idx] = true;
                if previous[prev_idx].fingerprint == entry.fingerprint {
                    // moved within the sequence, content unchanged
                    true
                } else {
                    emitter.modified(&previous[prev_idx], entry)
                }
            }
            None => emitter.added(entry),
        };
        if !keep_going {
            return false;
        }
    }

    for &prev_idx in &deleted {
        if !paired[prev_idx] && !emitter.removed(&previous[prev_idx]) {
            return false;
        }
    }
    true
}
