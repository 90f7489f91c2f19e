// src/vfs/mod.rs

//! Virtual file system: an in-memory, copy-on-write mirror of the parts of
//! the disk a build cares about.
//!
//! - [`path`]: segment-wise path handling.
//! - [`trie`]: the persistent child map every hierarchy is built from.
//! - [`snapshot`]: immutable snapshots of files and directory trees.
//! - [`hierarchy`]: the snapshot trie with store/invalidate/query.
//! - [`version`]: per-path modification versions.
//! - [`service`]: the shared, thread-safe VFS.
//! - [`scan`]: turning the disk into snapshots.

pub mod hierarchy;
pub mod path;
pub mod scan;
pub mod service;
pub mod snapshot;
pub mod trie;
pub mod version;

pub use hierarchy::{FileSystemNode, SnapshotHierarchy};
pub use scan::Scanner;
pub use service::VirtualFileSystem;
pub use snapshot::{FileSystemSnapshot, SnapshotContent, SnapshotVisitor};
pub use version::VersionHierarchy;
