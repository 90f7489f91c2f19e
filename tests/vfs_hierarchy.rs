// tests/vfs_hierarchy.rs

mod common;
use crate::common::builders::{file_snapshot, missing_snapshot, SnapshotTreeBuilder};
use crate::common::init_tracing;

use std::sync::Arc;

use snapcheck::types::{CaseSensitivity, FileType};
use snapcheck::vfs::{FileSystemSnapshot, SnapshotHierarchy};

fn paths(snapshots: &[Arc<FileSystemSnapshot>]) -> Vec<String> {
    snapshots.iter().map(|s| s.path().to_string()).collect()
}

#[test]
fn store_then_root_snapshots_under_returns_the_snapshot() {
    init_tracing();
    let hierarchy = SnapshotHierarchy::empty(CaseSensitivity::CaseSensitive);
    let src = SnapshotTreeBuilder::new("/project/src")
        .file("a.txt", "A")
        .file("nested/b.txt", "B")
        .build();

    let hierarchy = hierarchy.store("/project/src", Arc::clone(&src));

    let roots = hierarchy.root_snapshots_under("/project/src");
    assert_eq!(roots.len(), 1);
    assert!(Arc::ptr_eq(&roots[0], &src));
}

#[test]
fn snapshot_stored_at_the_root_is_kept_whole() {
    let root = SnapshotTreeBuilder::new("/").file("a.txt", "A").build();

    let hierarchy =
        SnapshotHierarchy::empty(CaseSensitivity::CaseSensitive).store("/", Arc::clone(&root));

    let roots = hierarchy.root_snapshots_under("/");
    assert_eq!(roots.len(), 1);
    assert!(Arc::ptr_eq(&roots[0], &root));
    assert!(Arc::ptr_eq(&hierarchy.snapshot_at("/").unwrap(), &root));
    assert_eq!(
        hierarchy.snapshot_at("/a.txt").unwrap().file_type(),
        FileType::RegularFile
    );
    assert_eq!(
        hierarchy.snapshot_at("/b.txt").unwrap().file_type(),
        FileType::Missing
    );
    assert!(hierarchy.store("/", root).ptr_eq(&hierarchy));
}

#[test]
fn file_or_missing_snapshot_at_the_root_is_remembered() {
    let missing = missing_snapshot("/");

    let hierarchy =
        SnapshotHierarchy::empty(CaseSensitivity::CaseSensitive).store("/", Arc::clone(&missing));

    assert!(!hierarchy.is_empty());
    assert!(Arc::ptr_eq(&hierarchy.snapshot_at("/").unwrap(), &missing));
    assert_eq!(paths(&hierarchy.all_root_snapshots()), vec!["/".to_string()]);

    let hierarchy = hierarchy.store("/", file_snapshot("/", "F"));
    assert_eq!(
        hierarchy.snapshot_at("/").unwrap().file_type(),
        FileType::RegularFile
    );
}

#[test]
fn storing_below_a_root_snapshot_updates_it() {
    let hierarchy = SnapshotHierarchy::empty(CaseSensitivity::CaseSensitive)
        .store("/", SnapshotTreeBuilder::new("/").file("a.txt", "A").build());

    let hierarchy = hierarchy.store("/b.txt", file_snapshot("/b.txt", "B"));

    let root = hierarchy.snapshot_at("/").unwrap();
    assert_eq!(root.file_type(), FileType::Directory);
    assert_eq!(root.children().len(), 2);
    assert!(hierarchy.snapshot_at("/b.txt").is_some());
}

#[test]
fn invalidated_path_yields_missing_snapshot() {
    let hierarchy = SnapshotHierarchy::empty(CaseSensitivity::CaseSensitive)
        .store("/project/src/a.txt", file_snapshot("/project/src/a.txt", "A"));

    let hierarchy = hierarchy.invalidate("/project/src/a.txt");

    let roots = hierarchy.root_snapshots_under("/project/src/a.txt");
    assert_eq!(roots.len(), 1);
    assert_eq!(roots[0].file_type(), FileType::Missing);
    assert_eq!(roots[0].path(), "/project/src/a.txt");
    assert!(hierarchy.snapshot_at("/project/src/a.txt").is_none());
}

#[test]
fn unknown_path_is_none_but_known_absence_is_missing() {
    let hierarchy = SnapshotHierarchy::empty(CaseSensitivity::CaseSensitive).store(
        "/project/src",
        SnapshotTreeBuilder::new("/project/src").file("a.txt", "A").build(),
    );

    // Never scanned.
    assert!(hierarchy.snapshot_at("/elsewhere/x.txt").is_none());

    // Below a complete directory: known not to exist.
    let absent = hierarchy
        .snapshot_at("/project/src/nope.txt")
        .expect("absence below a complete directory is known");
    assert_eq!(absent.file_type(), FileType::Missing);
}

#[test]
fn storing_identical_snapshot_keeps_the_hierarchy() {
    let src = SnapshotTreeBuilder::new("/p/src").file("a.txt", "A").build();
    let first = SnapshotHierarchy::empty(CaseSensitivity::CaseSensitive).store("/p/src", src);

    let again = SnapshotTreeBuilder::new("/p/src").file("a.txt", "A").build();
    let second = first.store("/p/src", again);

    assert!(first.ptr_eq(&second));
}

#[test]
fn older_hierarchies_are_unaffected_by_later_writes() {
    let before = SnapshotHierarchy::empty(CaseSensitivity::CaseSensitive)
        .store("/p/a.txt", file_snapshot("/p/a.txt", "A"));

    let after = before
        .store("/p/b.txt", file_snapshot("/p/b.txt", "B"))
        .invalidate("/p/a.txt");

    assert!(before.snapshot_at("/p/a.txt").is_some());
    assert!(before.snapshot_at("/p/b.txt").is_none());
    assert!(after.snapshot_at("/p/a.txt").is_none());
    assert!(after.snapshot_at("/p/b.txt").is_some());
}

#[test]
fn storing_an_ancestor_absorbs_existing_descendants() {
    let hierarchy = SnapshotHierarchy::empty(CaseSensitivity::CaseSensitive)
        .store("/p/src/a.txt", file_snapshot("/p/src/a.txt", "old"))
        .store("/p/src/b.txt", file_snapshot("/p/src/b.txt", "B"));

    let src = SnapshotTreeBuilder::new("/p/src").file("a.txt", "new").build();
    let hierarchy = hierarchy.store("/p/src", Arc::clone(&src));

    assert_eq!(paths(&hierarchy.all_root_snapshots()), vec!["/p/src"]);
    let b = hierarchy.snapshot_at("/p/src/b.txt").expect("known");
    assert_eq!(b.file_type(), FileType::Missing);
}

#[test]
fn storing_below_a_complete_directory_updates_it_in_place() {
    let hierarchy = SnapshotHierarchy::empty(CaseSensitivity::CaseSensitive).store(
        "/p/src",
        SnapshotTreeBuilder::new("/p/src")
            .file("a.txt", "A")
            .file("b.txt", "B")
            .build(),
    );

    let updated = file_snapshot("/p/src/a.txt", "A2");
    let hierarchy = hierarchy.store("/p/src/a.txt", Arc::clone(&updated));

    let src = hierarchy.snapshot_at("/p/src").expect("still complete");
    assert_eq!(src.children().len(), 2);
    let a = hierarchy.snapshot_at("/p/src/a.txt").expect("known");
    assert_eq!(a.content_hash(), updated.content_hash());

    // Storing a missing child removes it from the listing.
    let hierarchy = hierarchy.store("/p/src/b.txt", missing_snapshot("/p/src/b.txt"));
    let src = hierarchy.snapshot_at("/p/src").expect("still complete");
    assert_eq!(src.children().len(), 1);
}

#[test]
fn invalidating_inside_a_directory_makes_it_partial() {
    let hierarchy = SnapshotHierarchy::empty(CaseSensitivity::CaseSensitive).store(
        "/p/src",
        SnapshotTreeBuilder::new("/p/src")
            .file("a.txt", "A")
            .file("b.txt", "B")
            .build(),
    );

    let hierarchy = hierarchy.invalidate("/p/src/a.txt");

    assert!(hierarchy.snapshot_at("/p/src").is_none());
    assert!(hierarchy.snapshot_at("/p/src/a.txt").is_none());
    assert!(hierarchy.snapshot_at("/p/src/b.txt").is_some());
    assert_eq!(
        paths(&hierarchy.root_snapshots_under("/p/src")),
        vec!["/p/src/b.txt"]
    );
}

#[test]
fn invalidating_the_root_forgets_everything() {
    let hierarchy = SnapshotHierarchy::empty(CaseSensitivity::CaseSensitive)
        .store("/a/x.txt", file_snapshot("/a/x.txt", "X"))
        .store("/b/y.txt", file_snapshot("/b/y.txt", "Y"));

    let hierarchy = hierarchy.invalidate("/");
    assert!(hierarchy.is_empty());
}

#[test]
fn sibling_paths_sharing_a_prefix_stay_separate() {
    let hierarchy = SnapshotHierarchy::empty(CaseSensitivity::CaseSensitive)
        .store("/p/src/main/a.txt", file_snapshot("/p/src/main/a.txt", "A"))
        .store("/p/src/test/b.txt", file_snapshot("/p/src/test/b.txt", "B"));

    assert_eq!(
        paths(&hierarchy.root_snapshots_under("/p/src")),
        vec!["/p/src/main/a.txt", "/p/src/test/b.txt"]
    );
    assert_eq!(
        paths(&hierarchy.root_snapshots_under("/p/src/test")),
        vec!["/p/src/test/b.txt"]
    );
    let hierarchy = hierarchy.invalidate("/p/src/main");
    assert_eq!(paths(&hierarchy.all_root_snapshots()), vec!["/p/src/test/b.txt"]);
}

#[test]
fn case_insensitive_lookup_resolves_to_the_same_entry() {
    let stored = file_snapshot("/A/b.txt", "content");
    let hierarchy = SnapshotHierarchy::empty(CaseSensitivity::CaseInsensitive)
        .store("/A/b.txt", Arc::clone(&stored));

    let found = hierarchy.snapshot_at("/a/B.TXT").expect("same entry");
    assert!(Arc::ptr_eq(&found, &stored));
}

#[test]
fn case_sensitive_lookup_keeps_entries_distinct() {
    let hierarchy = SnapshotHierarchy::empty(CaseSensitivity::CaseSensitive)
        .store("/A/b.txt", file_snapshot("/A/b.txt", "upper"));

    assert!(hierarchy.snapshot_at("/a/B.TXT").is_none());

    let hierarchy = hierarchy.store("/a/B.TXT", file_snapshot("/a/B.TXT", "lower"));
    assert_eq!(hierarchy.all_root_snapshots().len(), 2);
}
