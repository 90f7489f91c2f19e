// src/engine/runtime.rs

use std::fmt;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::errors::Result;

use super::report::print_reports;
use super::session::Session;
use super::RuntimeEvent;

/// Keeps a [`Session`] current while files change.
///
/// This is the async IO shell: it drains `RuntimeEvent`s, feeds watch events
/// into the VFS and asks the session to re-evaluate the tasks whose roots
/// were written since the last round.
pub struct Runtime {
    session: Session,
    event_rx: mpsc::UnboundedReceiver<RuntimeEvent>,
    record: bool,
    seen_version: u64,
}

impl fmt::Debug for Runtime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("session", &self.session)
            .field("seen_version", &self.seen_version)
            .finish_non_exhaustive()
    }
}

impl Runtime {
    pub fn new(
        session: Session,
        event_rx: mpsc::UnboundedReceiver<RuntimeEvent>,
        record: bool,
    ) -> Self {
        let seen_version = session.vfs().current_version();
        Self {
            session,
            event_rx,
            record,
            seen_version,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Main event loop. Returns when shutdown is requested or every sender
    /// is gone.
    pub async fn run(mut self) -> Result<()> {
        info!("snapcheck watch runtime started");

        while let Some(event) = self.event_rx.recv().await {
            if !self.handle(event) {
                info!("shutdown requested; stopping runtime");
                return Ok(());
            }
            // Coalesce a burst of notifications into one evaluation round.
            while let Ok(event) = self.event_rx.try_recv() {
                if !self.handle(event) {
                    info!("shutdown requested; stopping runtime");
                    return Ok(());
                }
            }
            self.step()?;
        }

        info!("runtime event channel closed; exiting");
        Ok(())
    }

    /// Apply one event. Returns `false` on shutdown.
    fn handle(&mut self, event: RuntimeEvent) -> bool {
        debug!(?event, "runtime received event");
        match event {
            RuntimeEvent::FileChanged(watch_event) => {
                self.session.vfs().apply_watch_event(&watch_event);
                true
            }
            RuntimeEvent::ShutdownRequested => false,
        }
    }

    /// Re-evaluate what changed since the previous round. Returns the number
    /// of tasks evaluated.
    pub fn step(&mut self) -> Result<usize> {
        let since = self.seen_version;
        let reports = match self.session.recheck_changed(since, self.record) {
            Ok(reports) => reports,
            Err(e) => {
                warn!(error = %e, "re-evaluation failed; will retry on the next change");
                return Ok(0);
            }
        };
        // Scans done while evaluating bump versions too; skip past them.
        self.seen_version = self.session.vfs().current_version();
        if !reports.is_empty() {
            print_reports(&reports);
        }
        Ok(reports.len())
    }
}
