// src/watch/mod.rs

//! File watching.
//!
//! Turns OS notifications (`notify`) into backend-independent
//! [`WatchEvent`]s that the virtual file system applies as invalidations. It
//! knows nothing about tasks.

pub mod events;
pub mod watcher;

pub use events::{from_notify, WatchEvent, WatchEventKind};
pub use watcher::{spawn_watcher, WatcherHandle};
