// tests/fingerprinting.rs

mod common;
use crate::common::builders::{file_snapshot, missing_snapshot, SnapshotTreeBuilder};
use crate::common::init_tracing;

use std::sync::Arc;

use snapcheck::change::{CollectingVisitor, PropertyDirection};
use snapcheck::fingerprint::{
    CompareOptions, FileCollectionFingerprint, FingerprintCompareStrategy, FingerprintingStrategy,
};
use snapcheck::fs::mock::MockFileSystem;
use snapcheck::fs::FileSystem;
use snapcheck::hash::{dir_signature, hash_bytes, missing_file_signature};
use snapcheck::types::{AccessType, CaseSensitivity, FileType};
use snapcheck::vfs::Scanner;

fn normalized(fp: &impl FileCollectionFingerprint) -> Vec<String> {
    fp.entries()
        .iter()
        .map(|e| e.fingerprint.normalized_path.clone())
        .collect()
}

fn tree() -> Arc<snapcheck::vfs::FileSystemSnapshot> {
    SnapshotTreeBuilder::new("/p/src")
        .file("a.txt", "A")
        .file("sub/b.txt", "B")
        .build()
}

#[test]
fn absolute_strategy_keys_by_full_path() {
    let fp = FingerprintingStrategy::Absolute.fingerprint(&[tree()]);
    assert_eq!(
        normalized(&fp),
        vec!["/p/src", "/p/src/a.txt", "/p/src/sub", "/p/src/sub/b.txt"]
    );
    assert_eq!(fp.compare_strategy(), FingerprintCompareStrategy::Unordered);
}

#[test]
fn relative_strategy_keys_below_the_root() {
    let fp = FingerprintingStrategy::Relative.fingerprint(&[tree()]);
    assert_eq!(normalized(&fp), vec!["", "a.txt", "sub", "sub/b.txt"]);
    assert_eq!(fp.compare_strategy(), FingerprintCompareStrategy::Ordered);

    // A root that is a file is keyed by its name.
    let fp = FingerprintingStrategy::Relative.fingerprint(&[file_snapshot("/p/x.txt", "X")]);
    assert_eq!(normalized(&fp), vec!["x.txt"]);
}

#[test]
fn relative_strategy_ignores_where_the_tree_lives() {
    let here = SnapshotTreeBuilder::new("/p/one").file("a.txt", "A").build();
    let there = SnapshotTreeBuilder::new("/q/two").file("a.txt", "A").build();

    let a = FingerprintingStrategy::Relative.fingerprint(&[here]);
    let b = FingerprintingStrategy::Relative.fingerprint(&[there]);
    assert_eq!(a.combined_hash(), b.combined_hash());
}

#[test]
fn name_only_strategy_skips_nested_directories() {
    let fp = FingerprintingStrategy::NameOnly.fingerprint(&[tree()]);
    assert_eq!(normalized(&fp), vec!["", "a.txt", "b.txt"]);
}

#[test]
fn name_only_treats_files_in_different_folders_as_equal() {
    let flat = SnapshotTreeBuilder::new("/p/one").file("a.txt", "X").build();
    let nested = SnapshotTreeBuilder::new("/p/two").file("sub/a.txt", "X").build();

    let previous = FingerprintingStrategy::NameOnly.fingerprint(&[flat]);
    let current = FingerprintingStrategy::NameOnly.fingerprint(&[nested]);

    let mut visitor = CollectingVisitor::new();
    current.visit_changes_since(
        &previous.archive(),
        "files",
        PropertyDirection::Input,
        CompareOptions::ALL,
        &mut visitor,
    );
    assert!(visitor.changes.is_empty(), "{:?}", visitor.changes);
    assert_eq!(previous.combined_hash(), current.combined_hash());
}

#[test]
fn ignored_strategy_suppresses_paths_but_keeps_content() {
    let fp = FingerprintingStrategy::Ignored.fingerprint(&[tree()]);
    assert_eq!(normalized(&fp), vec!["", "", ""]);

    let hashes: Vec<_> = fp.entries().iter().map(|e| e.fingerprint.content_hash).collect();
    assert_eq!(hashes, vec![dir_signature(), hash_bytes(b"A"), hash_bytes(b"B")]);
    assert!(!FingerprintingStrategy::Ignored.is_addressable());
}

#[test]
fn missing_roots_and_empty_directories_are_distinguishable() {
    let empty_dir = SnapshotTreeBuilder::new("/p/out").build();
    let absent = missing_snapshot("/p/out");

    let a = FingerprintingStrategy::Absolute.fingerprint(&[empty_dir]);
    let b = FingerprintingStrategy::Absolute.fingerprint(&[absent]);

    assert_eq!(a.entries()[0].fingerprint.content_hash, dir_signature());
    assert_eq!(b.entries()[0].fingerprint.content_hash, missing_file_signature());
    assert_eq!(b.entries()[0].fingerprint.file_type, FileType::Missing);
    assert_ne!(a.combined_hash(), b.combined_hash());
}

#[test]
fn overlapping_roots_record_each_file_once() {
    let src = tree();
    let nested = Arc::clone(&src.children()[1]);

    let fp = FingerprintingStrategy::Absolute.fingerprint(&[src, nested]);
    assert_eq!(fp.entries().len(), 4);
}

#[test]
fn name_only_records_same_named_files_from_every_root() {
    let first = SnapshotTreeBuilder::new("/p/one").file("a.txt", "first").build();
    let second = SnapshotTreeBuilder::new("/p/two").file("a.txt", "second").build();

    let fp = FingerprintingStrategy::NameOnly.fingerprint(&[first, second]);
    let files: Vec<_> = fp
        .entries()
        .iter()
        .filter(|e| e.fingerprint.file_type == FileType::RegularFile)
        .collect();
    assert_eq!(files.len(), 2);
    assert_eq!(files[0].absolute_path, "/p/one/a.txt");
    assert_eq!(files[0].fingerprint.content_hash, hash_bytes(b"first"));
}

#[test]
fn scanner_builds_snapshots_from_the_file_system() {
    init_tracing();
    let fs = MockFileSystem::new();
    fs.add_file("/p/src/a.txt", "A");
    fs.add_file("/p/src/sub/b.txt", "B");
    fs.add_file("/p/src/skip.tmp", "tmp");

    let scanner = Scanner::new(Arc::new(fs.clone()), CaseSensitivity::CaseSensitive)
        .with_excludes(&["*.tmp".to_string()])
        .unwrap();
    let snapshot = Arc::new(scanner.snapshot("/p/src").unwrap());

    let fp = FingerprintingStrategy::Absolute.fingerprint(&[snapshot]);
    assert_eq!(
        normalized(&fp),
        vec!["/p/src", "/p/src/a.txt", "/p/src/sub", "/p/src/sub/b.txt"]
    );
    assert_eq!(fp.entries()[1].fingerprint.content_hash, hash_bytes(b"A"));
}

#[test]
fn scanner_marks_symlinked_entries() {
    let fs = MockFileSystem::new();
    fs.add_file("/p/real/a.txt", "A");
    fs.add_symlink("/p/link", "/p/real");
    fs.add_symlink("/p/dangling", "/p/nowhere");

    let scanner = Scanner::new(Arc::new(fs.clone()), CaseSensitivity::CaseSensitive);

    let linked = scanner.snapshot("/p/link").unwrap();
    assert_eq!(linked.file_type(), FileType::Directory);
    assert_eq!(linked.access_type(), AccessType::ViaSymlink);
    assert_eq!(linked.children()[0].path(), "/p/link/a.txt");

    let dangling = scanner.snapshot("/p/dangling").unwrap();
    assert_eq!(dangling.file_type(), FileType::Missing);
    assert_eq!(dangling.access_type(), AccessType::ViaSymlink);

    let absent = scanner.snapshot("/p/absent").unwrap();
    assert_eq!(absent.file_type(), FileType::Missing);
    assert_eq!(absent.access_type(), AccessType::Direct);
    assert!(!fs.exists(std::path::Path::new("/p/absent")));
}
