// tests/history_store.rs

mod common;
use crate::common::builders::SnapshotTreeBuilder;

use std::collections::BTreeMap;
use std::fs;
use std::sync::Arc;

use snapcheck::errors::SnapcheckError;
use snapcheck::fingerprint::FingerprintingStrategy;
use snapcheck::fs::RealFileSystem;
use snapcheck::history::{
    FileHistoryStore, HistoryStore, MemoryHistoryStore, TaskExecutionRecord, HISTORY_DIR,
};
use snapcheck::task::overlap::OverlappingOutputs;
use snapcheck::task::{CacheKey, ImplementationSnapshot, ValueSnapshot};
use snapcheck::hash::hash_bytes;
use tempfile::tempdir;

fn record(task: &str) -> TaskExecutionRecord {
    let sources = SnapshotTreeBuilder::new("/p/src")
        .file("a.txt", "A")
        .file("sub/b.txt", "B")
        .build();
    let outputs = SnapshotTreeBuilder::new("/p/out").file("a.o", "obj").build();

    let mut input_properties = BTreeMap::new();
    input_properties.insert("target".to_string(), ValueSnapshot::of_str("x86_64"));

    TaskExecutionRecord {
        task: task.to_string(),
        build_invocation_id: "build-7".to_string(),
        execution_time_ms: 1_700_000_000_000,
        successful: true,
        implementation: ImplementationSnapshot::from_identity(task, "cc -O2"),
        input_properties,
        input_files: vec![(
            "sources".to_string(),
            FingerprintingStrategy::Relative.fingerprint(&[sources]).archive(),
        )],
        output_files: vec![(
            "objects".to_string(),
            FingerprintingStrategy::Absolute.fingerprint(&[outputs]).archive(),
        )],
        cache_key: Some(CacheKey::from_hash(hash_bytes(b"key"))),
        overlapping_outputs: Some(OverlappingOutputs {
            property: "objects".to_string(),
            path: "/p/out/stray".to_string(),
            other_task: None,
        }),
    }
}

#[test]
fn file_store_persists_records_across_instances() {
    let dir = tempdir().unwrap();
    let original = record("compile");

    let mut store = FileHistoryStore::new(dir.path(), Arc::new(RealFileSystem));
    assert!(store.load("compile").unwrap().is_none());
    store.save("compile", &original).unwrap();

    let reopened = FileHistoryStore::new(dir.path(), Arc::new(RealFileSystem));
    assert_eq!(reopened.load("compile").unwrap(), Some(original));
    assert!(dir.path().join(HISTORY_DIR).is_dir());
}

#[test]
fn file_store_reports_garbage_as_corrupt() {
    let dir = tempdir().unwrap();
    let mut store = FileHistoryStore::new(dir.path(), Arc::new(RealFileSystem));
    store.save("compile", &record("compile")).unwrap();

    let entry = fs::read_dir(dir.path().join(HISTORY_DIR))
        .unwrap()
        .next()
        .unwrap()
        .unwrap();
    fs::write(entry.path(), b"\x01\x02garbage").unwrap();

    match store.load("compile") {
        Err(SnapcheckError::HistoryCorrupt { task, .. }) => assert_eq!(task, "compile"),
        other => panic!("expected corrupt history, got {other:?}"),
    }
}

#[test]
fn file_store_reports_unreadable_record_as_corrupt() {
    let dir = tempdir().unwrap();
    let name = hash_bytes(b"compile").to_hex();
    fs::create_dir_all(dir.path().join(HISTORY_DIR).join(format!("{}.bin", &name[..32]))).unwrap();

    let store = FileHistoryStore::new(dir.path(), Arc::new(RealFileSystem));

    match store.load("compile") {
        Err(SnapcheckError::HistoryCorrupt { task, reason }) => {
            assert_eq!(task, "compile");
            assert!(reason.contains("cannot read"), "{reason}");
        }
        other => panic!("expected corrupt history, got {other:?}"),
    }
}

#[test]
fn file_store_rejects_records_of_another_task() {
    let dir = tempdir().unwrap();
    let mut store = FileHistoryStore::new(dir.path(), Arc::new(RealFileSystem));
    store.save("a", &record("a")).unwrap();
    store.save("b", &record("b")).unwrap();

    let paths: Vec<_> = fs::read_dir(dir.path().join(HISTORY_DIR))
        .unwrap()
        .map(|e| e.unwrap().path())
        .collect();
    assert_eq!(paths.len(), 2);
    let first = fs::read(&paths[0]).unwrap();
    let second = fs::read(&paths[1]).unwrap();
    fs::write(&paths[0], second).unwrap();
    fs::write(&paths[1], first).unwrap();

    assert!(matches!(
        store.load("a"),
        Err(SnapcheckError::HistoryCorrupt { .. })
    ));
}

#[test]
fn file_store_prunes_inactive_and_unreadable_records() {
    let dir = tempdir().unwrap();
    let mut store = FileHistoryStore::new(dir.path(), Arc::new(RealFileSystem));
    store.save("keep", &record("keep")).unwrap();
    store.save("drop", &record("drop")).unwrap();
    fs::write(dir.path().join(HISTORY_DIR).join("junk.bin"), b"junk").unwrap();
    fs::write(dir.path().join(HISTORY_DIR).join("notes.txt"), b"left alone").unwrap();

    store.prune(&["keep"]).unwrap();

    assert!(store.load("keep").unwrap().is_some());
    assert!(store.load("drop").unwrap().is_none());
    assert!(!dir.path().join(HISTORY_DIR).join("junk.bin").exists());
    assert!(dir.path().join(HISTORY_DIR).join("notes.txt").exists());
}

#[test]
fn file_store_prune_without_directory_is_a_no_op() {
    let dir = tempdir().unwrap();
    let mut store = FileHistoryStore::new(dir.path().join("never-created"), Arc::new(RealFileSystem));
    store.prune(&[]).unwrap();
}

#[test]
fn file_store_remove_forgets_a_task() {
    let dir = tempdir().unwrap();
    let mut store = FileHistoryStore::new(dir.path(), Arc::new(RealFileSystem));
    store.save("compile", &record("compile")).unwrap();
    store.remove("compile").unwrap();
    assert!(store.load("compile").unwrap().is_none());
    // Removing twice is fine.
    store.remove("compile").unwrap();
}

#[test]
fn memory_store_round_trips_through_the_codec() {
    let mut store = MemoryHistoryStore::new();
    let original = record("compile");
    store.save("compile", &original).unwrap();
    assert_eq!(store.load("compile").unwrap(), Some(original));

    store.prune(&["other"]).unwrap();
    assert!(store.load("compile").unwrap().is_none());
}

#[test]
fn memory_store_reports_corruption() {
    let mut store = MemoryHistoryStore::new();
    store.insert_raw("compile", vec![0xff; 3]);
    assert!(matches!(
        store.load("compile"),
        Err(SnapcheckError::HistoryCorrupt { .. })
    ));
}

#[test]
fn records_from_another_format_version_are_corrupt() {
    let mut bytes = snapcheck::history::codec::encode(&record("compile")).unwrap();
    // The version is the leading little-endian u32.
    bytes[0] = bytes[0].wrapping_add(1);

    match snapcheck::history::codec::decode("compile", &bytes) {
        Err(SnapcheckError::HistoryCorrupt { reason, .. }) => {
            assert!(reason.contains("format version"), "{reason}")
        }
        other => panic!("expected corrupt history, got {other:?}"),
    }
}
