// src/engine/mod.rs

//! Orchestration for the `check` and `watch` commands.
//!
//! The synchronous core lives in [`session`]: it evaluates tasks in
//! dependency order against one shared checker. The async shell in
//! [`runtime`] reacts to:
//!   - file-watch events (applied to the VFS as invalidations)
//!   - shutdown signals
//!
//! and re-evaluates only tasks whose roots changed.

pub mod report;
pub mod runtime;
pub mod session;

pub use report::{print_reports, TaskReport};
pub use runtime::Runtime;
pub use session::Session;

use crate::watch::WatchEvent;

/// Events consumed by the [`Runtime`] loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuntimeEvent {
    FileChanged(WatchEvent),
    ShutdownRequested,
}
