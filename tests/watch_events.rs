// tests/watch_events.rs

mod common;
use crate::common::builders::SnapshotTreeBuilder;

use std::path::PathBuf;

use notify::event::{AccessKind, CreateKind, EventKind, Flag, ModifyKind, RemoveKind, RenameMode};
use notify::Event;
use snapcheck::types::CaseSensitivity;
use snapcheck::vfs::VirtualFileSystem;
use snapcheck::watch::{from_notify, WatchEvent, WatchEventKind};

fn event(kind: EventKind, paths: &[&str]) -> Event {
    paths
        .iter()
        .fold(Event::new(kind), |ev, p| ev.add_path(PathBuf::from(p)))
}

#[test]
fn creations_and_modifications_map_per_path() {
    let created = from_notify(&event(
        EventKind::Create(CreateKind::File),
        &["/p/src/a.txt", "/p/src/b.txt/"],
    ));
    assert_eq!(
        created,
        vec![WatchEvent::created("/p/src/a.txt"), WatchEvent::created("/p/src/b.txt")]
    );

    let modified = from_notify(&event(EventKind::Modify(ModifyKind::Any), &["/p/src/a.txt"]));
    assert_eq!(modified, vec![WatchEvent::modified("/p/src/a.txt")]);
}

#[test]
fn removals_and_renames_become_removals() {
    let removed = from_notify(&event(EventKind::Remove(RemoveKind::File), &["/p/a"]));
    assert_eq!(removed[0].kind, WatchEventKind::Removed);

    let renamed = from_notify(&event(
        EventKind::Modify(ModifyKind::Name(RenameMode::Both)),
        &["/p/old", "/p/new"],
    ));
    assert_eq!(
        renamed,
        vec![WatchEvent::removed("/p/old"), WatchEvent::removed("/p/new")]
    );
}

#[test]
fn access_events_are_dropped() {
    assert!(from_notify(&event(EventKind::Access(AccessKind::Any), &["/p/a"])).is_empty());
}

#[test]
fn rescan_requests_become_a_single_overflow() {
    let ev = event(EventKind::Other, &["/p/a", "/p/b"]).set_flag(Flag::Rescan);
    assert_eq!(from_notify(&ev), vec![WatchEvent::overflow()]);
}

#[test]
fn change_events_invalidate_the_affected_path() {
    let vfs = VirtualFileSystem::new(CaseSensitivity::CaseSensitive);
    vfs.store(SnapshotTreeBuilder::new("/p/src").file("a.txt", "A").file("b.txt", "B").build());
    vfs.store(SnapshotTreeBuilder::new("/p/docs").file("x.md", "X").build());

    vfs.apply_watch_event(&WatchEvent::modified("/p/src/a.txt"));
    assert!(vfs.snapshot_at("/p/src").is_none());
    assert!(vfs.snapshot_at("/p/src/b.txt").is_some());
    assert!(vfs.snapshot_at("/p/docs").is_some());
}

#[test]
fn overflow_invalidates_only_watched_roots() {
    let vfs = VirtualFileSystem::new(CaseSensitivity::CaseSensitive);
    vfs.store(SnapshotTreeBuilder::new("/p/src").file("a.txt", "A").build());
    vfs.store(SnapshotTreeBuilder::new("/p/docs").file("x.md", "X").build());
    vfs.add_watched_root("/p/src");
    vfs.add_watched_root("/p/src/");

    assert_eq!(vfs.watched_roots(), vec!["/p/src".to_string()]);
    assert!(vfs.is_watched("/p/src/deep/file"));
    assert!(!vfs.is_watched("/p/docs/x.md"));

    vfs.apply_watch_event(&WatchEvent::overflow());
    assert!(vfs.snapshot_at("/p/src").is_none());
    assert!(vfs.snapshot_at("/p/docs").is_some());
}
