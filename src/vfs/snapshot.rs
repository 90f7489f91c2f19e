// src/vfs/snapshot.rs

//! Immutable file-system snapshots.
//!
//! A [`FileSystemSnapshot`] describes what a scan found at one absolute path:
//! a regular file with its content hash, a directory with its complete child
//! listing, or nothing at all. Directory children are sorted by name under the
//! hierarchy's case sensitivity so that every traversal is deterministic.

use std::sync::Arc;

use crate::hash::ContentHash;
use crate::types::{AccessType, CaseSensitivity, FileType};
use crate::vfs::path::{compare_names, compare_segments, file_name, join, VfsRelativePath};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SnapshotContent {
    RegularFile { content_hash: ContentHash },
    Directory { children: Vec<Arc<FileSystemSnapshot>> },
    Missing,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileSystemSnapshot {
    path: Arc<str>,
    name: Arc<str>,
    access: AccessType,
    content: SnapshotContent,
}

/// Depth-first traversal over a snapshot tree.
pub trait SnapshotVisitor {
    /// Return `false` to skip the directory's children.
    fn pre_visit_directory(&mut self, directory: &FileSystemSnapshot) -> bool;
    /// Called for regular files and missing entries.
    fn visit_file(&mut self, file: &FileSystemSnapshot);
    fn post_visit_directory(&mut self, directory: &FileSystemSnapshot);
}

impl FileSystemSnapshot {
    pub fn regular_file(path: &str, content_hash: ContentHash, access: AccessType) -> Self {
        Self::new(path, access, SnapshotContent::RegularFile { content_hash })
    }

    pub fn missing(path: &str, access: AccessType) -> Self {
        Self::new(path, access, SnapshotContent::Missing)
    }

    /// A complete directory. Children are sorted into canonical order.
    pub fn directory(
        path: &str,
        access: AccessType,
        mut children: Vec<Arc<FileSystemSnapshot>>,
        case_sensitivity: CaseSensitivity,
    ) -> Self {
        children.sort_by(|a, b| compare_names(&a.name, &b.name, case_sensitivity));
        Self::new(path, access, SnapshotContent::Directory { children })
    }

    fn new(path: &str, access: AccessType, content: SnapshotContent) -> Self {
        Self {
            path: Arc::from(path),
            name: Arc::from(file_name(path)),
            access,
            content,
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn access_type(&self) -> AccessType {
        self.access
    }

    pub fn content(&self) -> &SnapshotContent {
        &self.content
    }

    pub fn file_type(&self) -> FileType {
        match self.content {
            SnapshotContent::RegularFile { .. } => FileType::RegularFile,
            SnapshotContent::Directory { .. } => FileType::Directory,
            SnapshotContent::Missing => FileType::Missing,
        }
    }

    pub fn content_hash(&self) -> Option<ContentHash> {
        match self.content {
            SnapshotContent::RegularFile { content_hash } => Some(content_hash),
            _ => None,
        }
    }

    /// Children of a directory; empty for anything else.
    pub fn children(&self) -> &[Arc<FileSystemSnapshot>] {
        match &self.content {
            SnapshotContent::Directory { children } => children,
            _ => &[],
        }
    }

    fn child_index(&self, name: &str, case_sensitivity: CaseSensitivity) -> Result<usize, usize> {
        self.children()
            .binary_search_by(|child| compare_segments(&child.name, name, case_sensitivity))
    }

    pub fn child(&self, name: &str, case_sensitivity: CaseSensitivity) -> Option<&Arc<FileSystemSnapshot>> {
        self.child_index(name, case_sensitivity)
            .ok()
            .map(|idx| &self.children()[idx])
    }

    /// The snapshot at `relative` below this one.
    ///
    /// The tree is complete, so a path it does not contain is known to be
    /// missing and a `Missing` snapshot is synthesized for it.
    pub fn find_descendant(
        self: &Arc<Self>,
        relative: VfsRelativePath<'_>,
        case_sensitivity: CaseSensitivity,
    ) -> Arc<FileSystemSnapshot> {
        let mut current = Arc::clone(self);
        let mut rest = relative;
        while !rest.is_empty() {
            let name = rest.first_segment();
            let next = match current.child(name, case_sensitivity) {
                Some(child) => Arc::clone(child),
                None => {
                    let path = join(current.path(), rest.as_str());
                    return Arc::new(FileSystemSnapshot::missing(&path, AccessType::Direct));
                }
            };
            current = next;
            rest = rest.suffix_after(name.len());
        }
        current
    }

    /// A copy of this snapshot with `snapshot` placed at `relative`.
    ///
    /// Returns `None` when the result could not stay a complete tree: the
    /// target's parent is not a directory that this snapshot lists. Storing a
    /// `Missing` snapshot removes the entry from its parent's listing.
    pub fn with_descendant(
        &self,
        relative: VfsRelativePath<'_>,
        snapshot: &Arc<FileSystemSnapshot>,
        case_sensitivity: CaseSensitivity,
    ) -> Option<FileSystemSnapshot> {
        let SnapshotContent::Directory { children } = &self.content else {
            return None;
        };

        let name = relative.first_segment();
        let remainder = relative.suffix_after(name.len());
        let mut updated = children.clone();

        match self.child_index(name, case_sensitivity) {
            Ok(idx) if remainder.is_empty() => {
                if snapshot.file_type() == FileType::Missing {
                    updated.remove(idx);
                } else {
                    updated[idx] = Arc::clone(snapshot);
                }
            }
            Ok(idx) => {
                let child = children[idx].with_descendant(remainder, snapshot, case_sensitivity)?;
                updated[idx] = Arc::new(child);
            }
            Err(pos) if remainder.is_empty() => {
                if snapshot.file_type() != FileType::Missing {
                    updated.insert(pos, Arc::clone(snapshot));
                }
            }
            Err(_) => return None,
        }

        Some(Self {
            path: Arc::clone(&self.path),
            name: Arc::clone(&self.name),
            access: self.access,
            content: SnapshotContent::Directory { children: updated },
        })
    }

    pub fn accept(&self, visitor: &mut dyn SnapshotVisitor) {
        match &self.content {
            SnapshotContent::Directory { children } => {
                if visitor.pre_visit_directory(self) {
                    for child in children {
                        child.accept(visitor);
                    }
                }
                visitor.post_visit_directory(self);
            }
            _ => visitor.visit_file(self),
        }
    }
}
