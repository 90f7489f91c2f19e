// tests/version_hierarchy.rs

mod common;
use crate::common::builders::{file_snapshot, SnapshotTreeBuilder};
use crate::common::init_tracing;

use snapcheck::types::CaseSensitivity;
use snapcheck::vfs::{VersionHierarchy, VirtualFileSystem};
use snapcheck::watch::WatchEvent;

const CS: CaseSensitivity = CaseSensitivity::CaseSensitive;

#[test]
fn update_is_visible_at_the_path_its_ancestors_and_descendants() {
    let versions = VersionHierarchy::empty(0).update_version("/p/src/a.txt", 1, CS);

    assert_eq!(versions.version_at("/p/src/a.txt", CS), 1);
    assert_eq!(versions.version_at("/p/src", CS), 1);
    assert_eq!(versions.version_at("/", CS), 1);
    assert_eq!(versions.version_at("/p/src/a.txt/inner", CS), 1);
}

#[test]
fn unrelated_siblings_keep_their_version() {
    let versions = VersionHierarchy::empty(0)
        .update_version("/p/src/a.txt", 1, CS)
        .update_version("/p/docs", 2, CS);

    assert_eq!(versions.version_at("/p/src", CS), 1);
    assert_eq!(versions.version_at("/p/src/b.txt", CS), 0);
    assert_eq!(versions.version_at("/p/docs/readme.md", CS), 2);
    assert_eq!(versions.version_at("/p", CS), 2);
    assert_eq!(versions.version_at("/other", CS), 0);
    assert_eq!(versions.max_version(), 2);
}

#[test]
fn updating_an_ancestor_covers_every_descendant() {
    let versions = VersionHierarchy::empty(0)
        .update_version("/p/src/a.txt", 1, CS)
        .update_version("/p", 5, CS);

    assert_eq!(versions.version_at("/p/src/a.txt", CS), 5);
    assert_eq!(versions.version_at("/p/anything", CS), 5);
    assert_eq!(versions.version_at("/q", CS), 0);
}

#[test]
fn vfs_bumps_versions_only_on_effective_writes() {
    init_tracing();
    let vfs = VirtualFileSystem::new(CS);
    let src = SnapshotTreeBuilder::new("/p/src").file("a.txt", "A").build();

    assert!(vfs.store(src));
    let after_store = vfs.current_version();
    assert_eq!(after_store, 1);

    // Same content again: nothing to publish.
    let again = SnapshotTreeBuilder::new("/p/src").file("a.txt", "A").build();
    assert!(!vfs.store(again));
    assert_eq!(vfs.current_version(), after_store);

    // Invalidating something unknown is a no-op as well.
    assert!(!vfs.invalidate("/q/unknown.txt"));
    assert_eq!(vfs.current_version(), after_store);

    assert!(vfs.store(file_snapshot("/p/src/a.txt", "A2")));
    assert!(vfs.changed_since("/p/src", after_store));
    assert!(vfs.changed_since("/p/src/a.txt", after_store));
    assert!(!vfs.changed_since("/p/docs", after_store));
}

#[test]
fn watch_overflow_invalidates_watched_roots_only() {
    let vfs = VirtualFileSystem::new(CS);
    vfs.store(file_snapshot("/watched/a.txt", "A"));
    vfs.store(file_snapshot("/other/b.txt", "B"));
    vfs.add_watched_root("/watched");

    let before = vfs.current_version();
    vfs.apply_watch_event(&WatchEvent::overflow());

    assert!(vfs.snapshot_at("/watched/a.txt").is_none());
    assert!(vfs.snapshot_at("/other/b.txt").is_some());
    assert!(vfs.changed_since("/watched", before));
    assert!(!vfs.changed_since("/other", before));
}

#[test]
fn watch_overflow_without_roots_forgets_everything() {
    let vfs = VirtualFileSystem::new(CS);
    vfs.store(file_snapshot("/a/a.txt", "A"));

    vfs.apply_watch_event(&WatchEvent::overflow());

    assert!(vfs.root().is_empty());
    assert!(vfs.changed_since("/a", 1));
}

#[test]
fn modification_event_invalidates_the_path() {
    let vfs = VirtualFileSystem::new(CS);
    vfs.store(
        SnapshotTreeBuilder::new("/p/src")
            .file("a.txt", "A")
            .file("b.txt", "B")
            .build(),
    );

    vfs.apply_watch_event(&WatchEvent::modified("/p/src/a.txt"));

    assert!(vfs.snapshot_at("/p/src/a.txt").is_none());
    assert!(vfs.snapshot_at("/p/src/b.txt").is_some());
    assert!(vfs.snapshot_at("/p/src").is_none());
}

#[test]
fn readers_keep_a_consistent_hierarchy_across_writes() {
    let vfs = VirtualFileSystem::new(CS);
    vfs.store(file_snapshot("/p/a.txt", "A"));

    let snapshot = vfs.root();
    vfs.invalidate("/p/a.txt");

    assert!(snapshot.snapshot_at("/p/a.txt").is_some());
    assert!(vfs.root().snapshot_at("/p/a.txt").is_none());
}
