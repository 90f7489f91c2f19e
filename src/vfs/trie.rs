// src/vfs/trie.rs

//! Persistent, path-keyed child map.
//!
//! A [`ChildMap`] holds the children of one hierarchy node. Keys are
//! relative paths of one or more segments (the trie is path-compressed), and
//! siblings never share a first segment. Entries are kept sorted by first
//! segment under the hierarchy's [`CaseSensitivity`], which makes lookups a
//! binary search and sibling iteration deterministic.
//!
//! The map is immutable: every "mutation" returns a new map that shares all
//! untouched children with the old one. Node types (`FileSystemNode`,
//! `VersionHierarchy`) recurse by holding a `ChildMap` of themselves and
//! express each operation by matching on the [`Relation`] between a queried
//! path and the existing children.

use std::fmt;
use std::sync::Arc;

use crate::types::CaseSensitivity;
use crate::vfs::path::{common_prefix, compare_segments, first_segment, VfsRelativePath};

/// How a queried path relates to the children of a [`ChildMap`].
#[derive(Debug)]
pub enum Relation<'a, T> {
    /// A child is stored at exactly the queried path.
    ExactMatch { child: &'a T },
    /// The queried path lies below `child`; `path_in_child` is the rest.
    DescendantOfChild {
        child: &'a T,
        path_in_child: VfsRelativePath<'a>,
    },
    /// The queried path is an ancestor of `child`, stored at `child_path`
    /// relative to this map.
    AncestorOfChild { child: &'a T, child_path: &'a str },
    /// No child shares a full segment-prefix with the queried path.
    Unrelated,
}

/// Outcome of invalidating a path inside a node.
#[derive(Debug)]
pub enum Invalidated<T> {
    Unchanged,
    Replaced(T),
    Removed,
}

struct ChildEntry<T> {
    path: Arc<str>,
    value: T,
}

impl<T: Clone> Clone for ChildEntry<T> {
    fn clone(&self) -> Self {
        Self {
            path: Arc::clone(&self.path),
            value: self.value.clone(),
        }
    }
}

/// Where a path would land among the entries.
enum Slot {
    Exact(usize),
    Descendant { index: usize, path_len: usize },
    Ancestor(usize),
    /// Shares some leading segments with an entry but neither contains the
    /// other; storing here splits the entry.
    SharedPrefix {
        index: usize,
        key_len: usize,
        path_len: usize,
    },
    Vacant(usize),
}

pub struct ChildMap<T> {
    entries: Arc<[ChildEntry<T>]>,
}

impl<T> Clone for ChildMap<T> {
    fn clone(&self) -> Self {
        Self {
            entries: Arc::clone(&self.entries),
        }
    }
}

impl<T> Default for ChildMap<T> {
    fn default() -> Self {
        Self {
            entries: Arc::from(Vec::new()),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for ChildMap<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.entries.iter().map(|e| (&*e.path, &e.value)))
            .finish()
    }
}

impl<T> ChildMap<T> {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// True when both maps are the very same allocation.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.entries, &other.entries)
    }

    /// Children in canonical sibling order, with their relative keys.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &T)> {
        self.entries.iter().map(|e| (&*e.path, &e.value))
    }

    pub fn values(&self) -> impl Iterator<Item = &T> {
        self.entries.iter().map(|e| &e.value)
    }

    /// Classify `path` against the children of this map.
    pub fn with_node<'a>(
        &'a self,
        path: VfsRelativePath<'a>,
        case_sensitivity: CaseSensitivity,
    ) -> Relation<'a, T> {
        match self.locate(path, case_sensitivity) {
            Slot::Exact(index) => Relation::ExactMatch {
                child: &self.entries[index].value,
            },
            Slot::Descendant { index, path_len } => Relation::DescendantOfChild {
                child: &self.entries[index].value,
                path_in_child: path.suffix_after(path_len),
            },
            Slot::Ancestor(index) => {
                let entry = &self.entries[index];
                Relation::AncestorOfChild {
                    child: &entry.value,
                    child_path: &entry.path,
                }
            }
            Slot::SharedPrefix { .. } | Slot::Vacant(_) => Relation::Unrelated,
        }
    }

    fn locate(&self, path: VfsRelativePath<'_>, case_sensitivity: CaseSensitivity) -> Slot {
        let segment = path.first_segment();
        let found = self.entries.binary_search_by(|entry| {
            compare_segments(first_segment(&entry.path), segment, case_sensitivity)
        });

        let index = match found {
            Ok(index) => index,
            Err(pos) => return Slot::Vacant(pos),
        };

        let key = &*self.entries[index].path;
        let (key_len, path_len) = common_prefix(key, path.as_str(), case_sensitivity);
        let covers_key = key_len == key.len();
        let covers_path = path_len == path.len();

        match (covers_key, covers_path) {
            (true, true) => Slot::Exact(index),
            (true, false) => Slot::Descendant { index, path_len },
            (false, true) => Slot::Ancestor(index),
            (false, false) => Slot::SharedPrefix {
                index,
                key_len,
                path_len,
            },
        }
    }
}

impl<T: Clone> ChildMap<T> {
    /// Build a map from `(key, value)` pairs that are already in canonical
    /// order and do not share first segments.
    pub fn from_sorted(entries: Vec<(Arc<str>, T)>) -> Self {
        let entries: Vec<ChildEntry<T>> = entries
            .into_iter()
            .map(|(path, value)| ChildEntry { path, value })
            .collect();
        Self {
            entries: Arc::from(entries),
        }
    }

    /// Store a value at `path`.
    ///
    /// `update` is called exactly once with the relation of `path` to the
    /// existing children and must return the node to place at `path`:
    ///
    /// - `ExactMatch`: replace the existing child.
    /// - `DescendantOfChild`: return the child with the value stored inside.
    /// - `AncestorOfChild`: the new node absorbs the child, which is dropped.
    /// - `Unrelated`: create a fresh node.
    ///
    /// When `path` shares leading segments with an existing child, that child
    /// is split: `from_children` builds the intermediate node holding both the
    /// old child and the freshly created one.
    pub fn store<U, C>(
        &self,
        path: VfsRelativePath<'_>,
        case_sensitivity: CaseSensitivity,
        update: U,
        from_children: C,
    ) -> ChildMap<T>
    where
        U: FnOnce(Relation<'_, T>) -> T,
        C: FnOnce(ChildMap<T>) -> T,
    {
        match self.locate(path, case_sensitivity) {
            Slot::Exact(index) => {
                let entry = &self.entries[index];
                let value = update(Relation::ExactMatch {
                    child: &entry.value,
                });
                self.replace(index, Arc::clone(&entry.path), value)
            }
            Slot::Descendant { index, path_len } => {
                let entry = &self.entries[index];
                let value = update(Relation::DescendantOfChild {
                    child: &entry.value,
                    path_in_child: path.suffix_after(path_len),
                });
                self.replace(index, Arc::clone(&entry.path), value)
            }
            Slot::Ancestor(index) => {
                let entry = &self.entries[index];
                let value = update(Relation::AncestorOfChild {
                    child: &entry.value,
                    child_path: &entry.path,
                });
                self.replace(index, Arc::from(path.as_str()), value)
            }
            Slot::Vacant(pos) => {
                let value = update(Relation::Unrelated);
                self.insert(pos, Arc::from(path.as_str()), value)
            }
            Slot::SharedPrefix {
                index,
                key_len,
                path_len,
            } => {
                let entry = &self.entries[index];
                let old_rest: Arc<str> = Arc::from(&entry.path[key_len + 1..]);
                let new_rest: Arc<str> = Arc::from(path.suffix_after(path_len).as_str());
                let created = update(Relation::Unrelated);

                let old_first = compare_segments(
                    first_segment(&old_rest),
                    first_segment(&new_rest),
                    case_sensitivity,
                )
                .is_lt();
                let pair = if old_first {
                    vec![(old_rest, entry.value.clone()), (new_rest, created)]
                } else {
                    vec![(new_rest, created), (old_rest, entry.value.clone())]
                };

                let parent = from_children(ChildMap::from_sorted(pair));
                self.replace(index, Arc::from(&entry.path[..key_len]), parent)
            }
        }
    }

    /// Invalidate `path` and everything below it.
    ///
    /// Children at or below `path` are removed; for a child containing
    /// `path`, `invalidate_child` decides what remains of it. Returns `None`
    /// when nothing changed, so callers can keep sharing the old map.
    pub fn invalidate<F>(
        &self,
        path: VfsRelativePath<'_>,
        case_sensitivity: CaseSensitivity,
        invalidate_child: F,
    ) -> Option<ChildMap<T>>
    where
        F: FnOnce(&T, VfsRelativePath<'_>) -> Invalidated<T>,
    {
        match self.locate(path, case_sensitivity) {
            Slot::Exact(index) | Slot::Ancestor(index) => Some(self.remove(index)),
            Slot::Descendant { index, path_len } => {
                let entry = &self.entries[index];
                match invalidate_child(&entry.value, path.suffix_after(path_len)) {
                    Invalidated::Unchanged => None,
                    Invalidated::Replaced(value) => {
                        Some(self.replace(index, Arc::clone(&entry.path), value))
                    }
                    Invalidated::Removed => Some(self.remove(index)),
                }
            }
            Slot::SharedPrefix { .. } | Slot::Vacant(_) => None,
        }
    }

    fn replace(&self, index: usize, path: Arc<str>, value: T) -> ChildMap<T> {
        let mut entries: Vec<ChildEntry<T>> = self.entries.to_vec();
        entries[index] = ChildEntry { path, value };
        Self {
            entries: Arc::from(entries),
        }
    }

    fn insert(&self, pos: usize, path: Arc<str>, value: T) -> ChildMap<T> {
        let mut entries: Vec<ChildEntry<T>> = Vec::with_capacity(self.entries.len() + 1);
        entries.extend_from_slice(&self.entries[..pos]);
        entries.push(ChildEntry { path, value });
        entries.extend_from_slice(&self.entries[pos..]);
        Self {
            entries: Arc::from(entries),
        }
    }

    fn remove(&self, index: usize) -> ChildMap<T> {
        let mut entries: Vec<ChildEntry<T>> = self.entries.to_vec();
        entries.remove(index);
        Self {
            entries: Arc::from(entries),
        }
    }
}
