// src/watch/watcher.rs

use std::path::Path;

use anyhow::{Context, Result};
use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::watch::events::{from_notify, WatchEvent};

/// Handle for the filesystem watcher.
///
/// This exists mainly so the underlying `RecommendedWatcher` is kept alive for
/// as long as needed. Dropping this handle will stop file watching.
pub struct WatcherHandle {
    _inner: RecommendedWatcher,
    watched: Vec<String>,
}

impl WatcherHandle {
    /// Paths actually registered with the backend.
    pub fn watched(&self) -> &[String] {
        &self.watched
    }
}

impl std::fmt::Debug for WatcherHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatcherHandle")
            .field("watched", &self.watched)
            .finish()
    }
}

/// Watch every root recursively and forward changes as [`WatchEvent`]s.
///
/// A root that does not exist yet (typically an output directory) is watched
/// through its nearest existing ancestor. Backend errors are forwarded as an
/// overflow, since events may have been lost.
pub fn spawn_watcher(
    roots: &[String],
    events_tx: mpsc::UnboundedSender<WatchEvent>,
) -> Result<WatcherHandle> {
    // Closure called synchronously by notify whenever an event arrives.
    let mut watcher = RecommendedWatcher::new(
        move |res: notify::Result<Event>| {
            let events = match res {
                Ok(event) => {
                    debug!(?event, "received notify event");
                    from_notify(&event)
                }
                Err(err) => {
                    warn!(error = %err, "file watch error; treating as overflow");
                    vec![WatchEvent::overflow()]
                }
            };
            for event in events {
                if events_tx.send(event).is_err() {
                    debug!("watch receiver dropped; discarding event");
                    return;
                }
            }
        },
        Config::default(),
    )
    .context("creating file watcher")?;

    let mut watched: Vec<String> = Vec::new();
    for root in roots {
        let Some(target) = nearest_existing(Path::new(root)) else {
            warn!(root = %root, "no existing ancestor to watch; skipping");
            continue;
        };
        let target = target.to_string_lossy().into_owned();
        if watched.contains(&target) {
            continue;
        }
        watcher
            .watch(Path::new(&target), RecursiveMode::Recursive)
            .with_context(|| format!("watching {target}"))?;
        watched.push(target);
    }

    info!(roots = ?watched, "file watcher started");

    Ok(WatcherHandle {
        _inner: watcher,
        watched,
    })
}

fn nearest_existing(path: &Path) -> Option<&Path> {
    path.ancestors().find(|p| p.exists())
}
