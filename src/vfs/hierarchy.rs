// src/vfs/hierarchy.rs

//! Copy-on-write hierarchy of file-system snapshots.
//!
//! The hierarchy is a path-compressed trie rooted at `/`. Each node is either
//! a complete [`FileSystemSnapshot`] (everything below it is known) or a
//! partial directory that only knows some of its descendants. Every store or
//! invalidation returns a new hierarchy; readers holding an older one keep a
//! consistent view.

use std::sync::Arc;

use tracing::trace;

use crate::types::{AccessType, CaseSensitivity, FileType};
use crate::vfs::path::VfsRelativePath;
use crate::vfs::snapshot::FileSystemSnapshot;
use crate::vfs::trie::{ChildMap, Invalidated, Relation};

#[derive(Debug, Clone)]
pub enum FileSystemNode {
    /// A complete snapshot of the path and everything below it.
    Snapshot(Arc<FileSystemSnapshot>),
    /// A directory of which only some descendants are known.
    Partial(ChildMap<FileSystemNode>),
}

impl FileSystemNode {
    fn store(
        &self,
        relative: VfsRelativePath<'_>,
        snapshot: Arc<FileSystemSnapshot>,
        case_sensitivity: CaseSensitivity,
    ) -> FileSystemNode {
        match self {
            FileSystemNode::Snapshot(existing) => {
                match existing.with_descendant(relative, &snapshot, case_sensitivity) {
                    Some(updated) => FileSystemNode::Snapshot(Arc::new(updated)),
                    None => {
                        let expanded = children_of(existing);
                        FileSystemNode::Partial(store_in(&expanded, relative, snapshot, case_sensitivity))
                    }
                }
            }
            FileSystemNode::Partial(children) => {
                FileSystemNode::Partial(store_in(children, relative, snapshot, case_sensitivity))
            }
        }
    }

    fn invalidate(
        &self,
        relative: VfsRelativePath<'_>,
        case_sensitivity: CaseSensitivity,
    ) -> Invalidated<FileSystemNode> {
        let children = match self {
            FileSystemNode::Snapshot(existing) if existing.file_type() == FileType::Directory => {
                // The listing is no longer complete, even if no known child
                // sits at the invalidated path.
                let expanded = children_of(existing);
                invalidate_in(&expanded, relative, case_sensitivity).unwrap_or(expanded)
            }
            FileSystemNode::Snapshot(_) => return Invalidated::Removed,
            FileSystemNode::Partial(children) => {
                match invalidate_in(children, relative, case_sensitivity) {
                    Some(updated) => updated,
                    None => return Invalidated::Unchanged,
                }
            }
        };

        if children.is_empty() {
            Invalidated::Removed
        } else {
            Invalidated::Replaced(FileSystemNode::Partial(children))
        }
    }

    fn collect_roots(&self, out: &mut Vec<Arc<FileSystemSnapshot>>) {
        match self {
            FileSystemNode::Snapshot(snapshot) => out.push(Arc::clone(snapshot)),
            FileSystemNode::Partial(children) => {
                for child in children.values() {
                    child.collect_roots(out);
                }
            }
        }
    }
}

/// Expand a complete directory into a partial node holding its children.
fn children_of(snapshot: &FileSystemSnapshot) -> ChildMap<FileSystemNode> {
    ChildMap::from_sorted(
        snapshot
            .children()
            .iter()
            .map(|child| (Arc::from(child.name()), FileSystemNode::Snapshot(Arc::clone(child))))
            .collect(),
    )
}

fn store_in(
    children: &ChildMap<FileSystemNode>,
    relative: VfsRelativePath<'_>,
    snapshot: Arc<FileSystemSnapshot>,
    case_sensitivity: CaseSensitivity,
) -> ChildMap<FileSystemNode> {
    children.store(
        relative,
        case_sensitivity,
        |relation| match relation {
            Relation::DescendantOfChild {
                child,
                path_in_child,
            } => child.store(path_in_child, snapshot, case_sensitivity),
            _ => FileSystemNode::Snapshot(snapshot),
        },
        FileSystemNode::Partial,
    )
}

fn invalidate_in(
    children: &ChildMap<FileSystemNode>,
    relative: VfsRelativePath<'_>,
    case_sensitivity: CaseSensitivity,
) -> Option<ChildMap<FileSystemNode>> {
    children.invalidate(relative, case_sensitivity, |child, rest| {
        child.invalidate(rest, case_sensitivity)
    })
}

fn find_in(
    children: &ChildMap<FileSystemNode>,
    relative: VfsRelativePath<'_>,
    case_sensitivity: CaseSensitivity,
) -> Option<Arc<FileSystemSnapshot>> {
    match children.with_node(relative, case_sensitivity) {
        Relation::ExactMatch { child } => match child {
            FileSystemNode::Snapshot(snapshot) => Some(Arc::clone(snapshot)),
            FileSystemNode::Partial(_) => None,
        },
        Relation::DescendantOfChild {
            child,
            path_in_child,
        } => match child {
            FileSystemNode::Snapshot(snapshot) => {
                Some(snapshot.find_descendant(path_in_child, case_sensitivity))
            }
            FileSystemNode::Partial(grandchildren) => {
                find_in(grandchildren, path_in_child, case_sensitivity)
            }
        },
        Relation::AncestorOfChild { .. } | Relation::Unrelated => None,
    }
}

fn roots_in(
    children: &ChildMap<FileSystemNode>,
    relative: VfsRelativePath<'_>,
    case_sensitivity: CaseSensitivity,
    out: &mut Vec<Arc<FileSystemSnapshot>>,
) {
    match children.with_node(relative, case_sensitivity) {
        Relation::ExactMatch { child } | Relation::AncestorOfChild { child, .. } => {
            child.collect_roots(out)
        }
        Relation::DescendantOfChild {
            child,
            path_in_child,
        } => match child {
            FileSystemNode::Snapshot(snapshot) => {
                out.push(snapshot.find_descendant(path_in_child, case_sensitivity))
            }
            FileSystemNode::Partial(grandchildren) => {
                roots_in(grandchildren, path_in_child, case_sensitivity, out)
            }
        },
        Relation::Unrelated => {}
    }
}

/// Immutable root of the snapshot trie.
///
/// The root node stands for `/` itself: a complete snapshot stored at `/`
/// is kept whole, anything else leaves the root partial.
#[derive(Debug, Clone)]
pub struct SnapshotHierarchy {
    root: FileSystemNode,
    case_sensitivity: CaseSensitivity,
}

impl SnapshotHierarchy {
    pub fn empty(case_sensitivity: CaseSensitivity) -> Self {
        Self {
            root: FileSystemNode::Partial(ChildMap::empty()),
            case_sensitivity,
        }
    }

    fn with_root(&self, root: FileSystemNode) -> Self {
        Self {
            root,
            case_sensitivity: self.case_sensitivity,
        }
    }

    pub fn case_sensitivity(&self) -> CaseSensitivity {
        self.case_sensitivity
    }

    pub fn is_empty(&self) -> bool {
        matches!(&self.root, FileSystemNode::Partial(children) if children.is_empty())
    }

    /// True when both hierarchies share the same root allocation.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        let same_root = match (&self.root, &other.root) {
            (FileSystemNode::Snapshot(a), FileSystemNode::Snapshot(b)) => Arc::ptr_eq(a, b),
            (FileSystemNode::Partial(a), FileSystemNode::Partial(b)) => a.ptr_eq(b),
            _ => false,
        };
        same_root && self.case_sensitivity == other.case_sensitivity
    }

    /// Record `snapshot` at `path`, replacing whatever was known at and below
    /// it. Storing a snapshot equal to the current one returns `self`.
    pub fn store(&self, path: &str, snapshot: Arc<FileSystemSnapshot>) -> SnapshotHierarchy {
        if let Some(existing) = self.snapshot_at(path) {
            if Arc::ptr_eq(&existing, &snapshot) || *existing == *snapshot {
                trace!(path, "snapshot unchanged; keeping hierarchy");
                return self.clone();
            }
        }

        let relative = VfsRelativePath::of(path);
        if relative.is_empty() {
            return self.with_root(FileSystemNode::Snapshot(snapshot));
        }
        self.with_root(self.root.store(relative, snapshot, self.case_sensitivity))
    }

    /// Forget everything known at and below `path`. Ancestors that were
    /// complete directories become partial.
    pub fn invalidate(&self, path: &str) -> SnapshotHierarchy {
        let relative = VfsRelativePath::of(path);
        if relative.is_empty() {
            if self.is_empty() {
                return self.clone();
            }
            return Self::empty(self.case_sensitivity);
        }

        match self.root.invalidate(relative, self.case_sensitivity) {
            Invalidated::Unchanged => self.clone(),
            Invalidated::Removed => Self::empty(self.case_sensitivity),
            Invalidated::Replaced(root) => self.with_root(root),
        }
    }

    /// The snapshot at `path`, if the hierarchy positively knows it.
    ///
    /// Paths below a complete snapshot that it does not contain are known to
    /// be missing and yield a `Missing` snapshot. Paths that were never
    /// scanned yield `None`.
    pub fn snapshot_at(&self, path: &str) -> Option<Arc<FileSystemSnapshot>> {
        let relative = VfsRelativePath::of(path);
        match &self.root {
            FileSystemNode::Snapshot(root) if relative.is_empty() => Some(Arc::clone(root)),
            FileSystemNode::Snapshot(root) => {
                Some(root.find_descendant(relative, self.case_sensitivity))
            }
            FileSystemNode::Partial(_) if relative.is_empty() => None,
            FileSystemNode::Partial(children) => find_in(children, relative, self.case_sensitivity),
        }
    }

    /// Every stored root snapshot at or below `path`, in canonical order.
    ///
    /// When nothing is known about `path`, a single synthetic `Missing`
    /// snapshot for it is returned, so callers always have something to
    /// fingerprint.
    pub fn root_snapshots_under(&self, path: &str) -> Vec<Arc<FileSystemSnapshot>> {
        let relative = VfsRelativePath::of(path);
        let mut out = Vec::new();

        match &self.root {
            _ if relative.is_empty() => self.root.collect_roots(&mut out),
            FileSystemNode::Snapshot(root) => {
                out.push(root.find_descendant(relative, self.case_sensitivity))
            }
            FileSystemNode::Partial(children) => {
                roots_in(children, relative, self.case_sensitivity, &mut out)
            }
        }

        if out.is_empty() {
            out.push(Arc::new(FileSystemSnapshot::missing(path, AccessType::Direct)));
        }
        out
    }

    /// All stored root snapshots, in canonical order.
    pub fn all_root_snapshots(&self) -> Vec<Arc<FileSystemSnapshot>> {
        let mut out = Vec::new();
        self.root.collect_roots(&mut out);
        out
    }
}
