// src/vfs/version.rs

//! Per-path modification versions.
//!
//! Each node carries the highest version recorded anywhere at or below it,
//! plus the version at which paths not covered by any child were last
//! touched. Querying a path therefore answers "has anything at or below this
//! path changed since version N" without walking the subtree.

use crate::types::CaseSensitivity;
use crate::vfs::path::VfsRelativePath;
use crate::vfs::trie::{ChildMap, Relation};

#[derive(Debug, Clone)]
pub struct VersionHierarchy {
    children: ChildMap<VersionHierarchy>,
    max_version: u64,
    /// Version for paths that are not below any child.
    unrelated_version: u64,
}

impl VersionHierarchy {
    pub fn empty(version: u64) -> Self {
        Self {
            children: ChildMap::empty(),
            max_version: version,
            unrelated_version: version,
        }
    }

    /// Highest version at or below this node.
    pub fn max_version(&self) -> u64 {
        self.max_version
    }

    /// Highest version recorded at `path` or anywhere below it.
    pub fn version_at(&self, path: &str, case_sensitivity: CaseSensitivity) -> u64 {
        self.version_of(VfsRelativePath::of(path), case_sensitivity)
    }

    fn version_of(&self, relative: VfsRelativePath<'_>, case_sensitivity: CaseSensitivity) -> u64 {
        if relative.is_empty() {
            return self.max_version;
        }
        match self.children.with_node(relative, case_sensitivity) {
            Relation::DescendantOfChild {
                child,
                path_in_child,
            } => child.version_of(path_in_child, case_sensitivity),
            Relation::ExactMatch { child } | Relation::AncestorOfChild { child, .. } => {
                child.max_version
            }
            Relation::Unrelated => self.unrelated_version,
        }
    }

    /// Record a change at `path` with `new_version`.
    ///
    /// Every query whose path is a prefix of `path`, or lies below it, will
    /// answer at least `new_version` afterwards. Versions of unrelated
    /// siblings are untouched. `new_version` must be greater than every
    /// version recorded so far.
    pub fn update_version(
        &self,
        path: &str,
        new_version: u64,
        case_sensitivity: CaseSensitivity,
    ) -> VersionHierarchy {
        self.updated(VfsRelativePath::of(path), new_version, case_sensitivity)
    }

    fn updated(
        &self,
        relative: VfsRelativePath<'_>,
        new_version: u64,
        case_sensitivity: CaseSensitivity,
    ) -> VersionHierarchy {
        if relative.is_empty() {
            return VersionHierarchy::empty(new_version);
        }

        let unrelated_version = self.unrelated_version;
        let children = self.children.store(
            relative,
            case_sensitivity,
            |relation| match relation {
                Relation::DescendantOfChild {
                    child,
                    path_in_child,
                } => child.updated(path_in_child, new_version, case_sensitivity),
                _ => VersionHierarchy::empty(new_version),
            },
            |children| VersionHierarchy {
                children,
                max_version: new_version,
                unrelated_version,
            },
        );

        VersionHierarchy {
            children,
            max_version: new_version,
            unrelated_version,
        }
    }
}
