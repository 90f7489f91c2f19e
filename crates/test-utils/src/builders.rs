#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::Arc;

use snapcheck::hash::hash_bytes;
use snapcheck::task::{FilePropertySpec, ImplementationSnapshot, TaskSpec, ValueSnapshot};
use snapcheck::types::{AccessType, CaseSensitivity, PathSensitivity};
use snapcheck::vfs::path::join;
use snapcheck::vfs::FileSystemSnapshot;

/// Snapshot of a regular file whose content hash is the blake3 of `content`.
pub fn file_snapshot(path: &str, content: &str) -> Arc<FileSystemSnapshot> {
    Arc::new(FileSystemSnapshot::regular_file(
        path,
        hash_bytes(content.as_bytes()),
        AccessType::Direct,
    ))
}

pub fn missing_snapshot(path: &str) -> Arc<FileSystemSnapshot> {
    Arc::new(FileSystemSnapshot::missing(path, AccessType::Direct))
}

#[derive(Debug, Default)]
struct DirSpec {
    files: BTreeMap<String, String>,
    dirs: BTreeMap<String, DirSpec>,
}

impl DirSpec {
    fn dir_mut(&mut self, segments: &[&str]) -> &mut DirSpec {
        match segments.split_first() {
            None => self,
            Some((first, rest)) => self
                .dirs
                .entry(first.to_string())
                .or_default()
                .dir_mut(rest),
        }
    }

    fn build(&self, path: &str, cs: CaseSensitivity) -> FileSystemSnapshot {
        let mut children: Vec<Arc<FileSystemSnapshot>> = Vec::new();
        for (name, content) in &self.files {
            children.push(file_snapshot(&join(path, name), content));
        }
        for (name, dir) in &self.dirs {
            children.push(Arc::new(dir.build(&join(path, name), cs)));
        }
        FileSystemSnapshot::directory(path, AccessType::Direct, children, cs)
    }
}

/// Builder for complete directory snapshots.
///
/// ```ignore
/// let src = SnapshotTreeBuilder::new("/project/src")
///     .file("a.txt", "A")
///     .file("nested/b.txt", "B")
///     .build();
/// ```
pub struct SnapshotTreeBuilder {
    root: String,
    case_sensitivity: CaseSensitivity,
    tree: DirSpec,
}

impl SnapshotTreeBuilder {
    pub fn new(root: &str) -> Self {
        Self {
            root: root.to_string(),
            case_sensitivity: CaseSensitivity::CaseSensitive,
            tree: DirSpec::default(),
        }
    }

    pub fn case_sensitivity(mut self, cs: CaseSensitivity) -> Self {
        self.case_sensitivity = cs;
        self
    }

    /// Add a file at `relative` (`/`-separated) below the root.
    pub fn file(mut self, relative: &str, content: &str) -> Self {
        let segments: Vec<&str> = relative.split('/').filter(|s| !s.is_empty()).collect();
        if let Some((name, parents)) = segments.split_last() {
            self.tree
                .dir_mut(parents)
                .files
                .insert(name.to_string(), content.to_string());
        }
        self
    }

    /// Add an (possibly empty) directory at `relative` below the root.
    pub fn dir(mut self, relative: &str) -> Self {
        let segments: Vec<&str> = relative.split('/').filter(|s| !s.is_empty()).collect();
        self.tree.dir_mut(&segments);
        self
    }

    pub fn build(self) -> Arc<FileSystemSnapshot> {
        Arc::new(self.tree.build(&self.root, self.case_sensitivity))
    }
}

/// Builder for `TaskSpec`.
pub struct TaskSpecBuilder {
    spec: TaskSpec,
}

impl TaskSpecBuilder {
    /// A task with a known implementation (`"<name> v1"`).
    pub fn new(name: &str) -> Self {
        let implementation = ImplementationSnapshot::from_identity(name, &format!("{name} v1"));
        Self {
            spec: TaskSpec::new(name, implementation),
        }
    }

    pub fn implementation(mut self, identity: &str) -> Self {
        self.spec.implementation =
            ImplementationSnapshot::from_identity(self.spec.name.clone(), identity);
        self
    }

    pub fn unknown_implementation(mut self) -> Self {
        self.spec.implementation = ImplementationSnapshot::unknown(self.spec.name.clone());
        self
    }

    pub fn input(mut self, name: &str, roots: &[&str], sensitivity: PathSensitivity) -> Self {
        self.spec.input_files.push(FilePropertySpec::new(
            name,
            roots.iter().map(|r| r.to_string()).collect(),
            sensitivity,
        ));
        self
    }

    pub fn output(mut self, name: &str, roots: &[&str]) -> Self {
        self.spec.output_files.push(FilePropertySpec::new(
            name,
            roots.iter().map(|r| r.to_string()).collect(),
            PathSensitivity::Absolute,
        ));
        self
    }

    pub fn property(mut self, key: &str, value: &str) -> Self {
        self.spec
            .input_properties
            .insert(key.to_string(), ValueSnapshot::of_str(value));
        self
    }

    pub fn incremental(mut self, val: bool) -> Self {
        self.spec.incremental = val;
        self
    }

    pub fn cacheable(mut self, val: bool) -> Self {
        self.spec.cacheable = val;
        self
    }

    pub fn after(mut self, dep: &str) -> Self {
        self.spec.depends_on.push(dep.to_string());
        self
    }

    pub fn build(self) -> TaskSpec {
        self.spec
    }
}
