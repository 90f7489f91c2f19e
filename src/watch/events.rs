// src/watch/events.rs

//! File-system change notifications, independent of the watcher backend.

use notify::event::{EventKind, ModifyKind};
use notify::Event;

use crate::vfs::path::normalize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchEventKind {
    Created,
    Modified,
    Removed,
    /// The backend lost events; nothing below the watched roots can be
    /// trusted anymore.
    Overflow,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchEvent {
    /// Absolute, normalized path. Empty for `Overflow`.
    pub path: String,
    pub kind: WatchEventKind,
}

impl WatchEvent {
    pub fn created(path: &str) -> Self {
        Self::new(path, WatchEventKind::Created)
    }

    pub fn modified(path: &str) -> Self {
        Self::new(path, WatchEventKind::Modified)
    }

    pub fn removed(path: &str) -> Self {
        Self::new(path, WatchEventKind::Removed)
    }

    pub fn overflow() -> Self {
        Self {
            path: String::new(),
            kind: WatchEventKind::Overflow,
        }
    }

    fn new(path: &str, kind: WatchEventKind) -> Self {
        Self {
            path: normalize(path),
            kind,
        }
    }
}

/// Translate one `notify` event into our events (one per affected path).
///
/// Access events carry no change and are dropped. A rescan request becomes a
/// single `Overflow`.
pub fn from_notify(event: &Event) -> Vec<WatchEvent> {
    if event.need_rescan() {
        return vec![WatchEvent::overflow()];
    }

    let kind = match event.kind {
        EventKind::Create(_) => WatchEventKind::Created,
        EventKind::Remove(_) => WatchEventKind::Removed,
        EventKind::Modify(ModifyKind::Name(_)) => WatchEventKind::Removed,
        EventKind::Modify(_) | EventKind::Any | EventKind::Other => WatchEventKind::Modified,
        EventKind::Access(_) => return Vec::new(),
    };

    event
        .paths
        .iter()
        .filter_map(|p| p.to_str())
        .map(|p| WatchEvent::new(p, kind))
        .collect()
}
