// src/history/store.rs

use std::collections::HashMap;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::errors::{Result, SnapcheckError};
use crate::fs::FileSystem;
use crate::hash::hash_bytes;
use crate::history::codec::{decode, decode_task_name, encode};
use crate::history::TaskExecutionRecord;

/// Directory (below the configured history dir) holding one file per task.
pub const HISTORY_DIR: &str = "history";

/// Abstract storage for task execution records.
pub trait HistoryStore: Send + Sync {
    /// `Err(HistoryCorrupt)` when a record exists but cannot be read or
    /// decoded.
    fn load(&self, task: &str) -> Result<Option<TaskExecutionRecord>>;
    fn save(&mut self, task: &str, record: &TaskExecutionRecord) -> Result<()>;
    fn remove(&mut self, task: &str) -> Result<()>;
    /// Remove records for tasks that are not in the `active_tasks` list.
    fn prune(&mut self, active_tasks: &[&str]) -> Result<()>;
}

/// Stores records under `<root>/history/<hash of task name>.bin`.
#[derive(Debug)]
pub struct FileHistoryStore {
    dir: PathBuf,
    fs: Arc<dyn FileSystem>,
}

impl FileHistoryStore {
    pub fn new(root: impl AsRef<Path>, fs: Arc<dyn FileSystem>) -> Self {
        Self {
            dir: root.as_ref().join(HISTORY_DIR),
            fs,
        }
    }

    fn record_path(&self, task: &str) -> PathBuf {
        let name = hash_bytes(task.as_bytes()).to_hex();
        self.dir.join(format!("{}.bin", &name[..32]))
    }

    fn read_bytes(&self, path: &Path) -> Result<Vec<u8>> {
        let mut reader = self.fs.open_read(path)?;
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes)?;
        Ok(bytes)
    }
}

impl HistoryStore for FileHistoryStore {
    fn load(&self, task: &str) -> Result<Option<TaskExecutionRecord>> {
        let path = self.record_path(task);
        if !self.fs.exists(&path) {
            return Ok(None);
        }
        let bytes = self
            .read_bytes(&path)
            .map_err(|e| SnapcheckError::HistoryCorrupt {
                task: task.to_string(),
                reason: format!("cannot read {}: {e}", path.display()),
            })?;
        let record = decode(task, &bytes)?;
        if record.task != task {
            return Err(SnapcheckError::HistoryCorrupt {
                task: task.to_string(),
                reason: format!("record belongs to task '{}'", record.task),
            });
        }
        Ok(Some(record))
    }

    fn save(&mut self, task: &str, record: &TaskExecutionRecord) -> Result<()> {
        let bytes = encode(record)?;
        self.fs.write(&self.record_path(task), &bytes)?;
        debug!(task = %task, bytes = bytes.len(), "stored execution record (file)");
        Ok(())
    }

    fn remove(&mut self, task: &str) -> Result<()> {
        self.fs.remove_file(&self.record_path(task))?;
        Ok(())
    }

    fn prune(&mut self, active_tasks: &[&str]) -> Result<()> {
        if !self.fs.exists(&self.dir) {
            return Ok(());
        }

        let mut removed = 0usize;
        for path in self.fs.read_dir(&self.dir)? {
            if path.extension().and_then(|e| e.to_str()) != Some("bin") {
                continue;
            }
            let stale = match self.read_bytes(&path).ok().as_deref().and_then(decode_task_name) {
                Some(task) => !active_tasks.contains(&task.as_str()),
                None => {
                    warn!(?path, "removing unreadable execution record");
                    true
                }
            };
            if stale {
                self.fs.remove_file(&path)?;
                removed += 1;
            }
        }

        if removed > 0 {
            info!(removed, "pruned stale execution records (file)");
        }
        Ok(())
    }
}

/// Stores encoded records in memory only.
///
/// Records still go through the codec so behaviour matches the file store.
#[derive(Debug, Default)]
pub struct MemoryHistoryStore {
    map: HashMap<String, Vec<u8>>,
}

impl MemoryHistoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the stored bytes for `task`, e.g. to simulate corruption.
    pub fn insert_raw(&mut self, task: &str, bytes: Vec<u8>) {
        self.map.insert(task.to_string(), bytes);
    }
}

impl HistoryStore for MemoryHistoryStore {
    fn load(&self, task: &str) -> Result<Option<TaskExecutionRecord>> {
        self.map
            .get(task)
            .map(|bytes| decode(task, bytes))
            .transpose()
    }

    fn save(&mut self, task: &str, record: &TaskExecutionRecord) -> Result<()> {
        self.map.insert(task.to_string(), encode(record)?);
        debug!(task = %task, "stored execution record (memory)");
        Ok(())
    }

    fn remove(&mut self, task: &str) -> Result<()> {
        self.map.remove(task);
        Ok(())
    }

    fn prune(&mut self, active_tasks: &[&str]) -> Result<()> {
        let initial_len = self.map.len();
        self.map.retain(|k, _| active_tasks.contains(&k.as_str()));
        if self.map.len() < initial_len {
            info!(
                removed = initial_len - self.map.len(),
                "pruned stale execution records (memory)"
            );
        }
        Ok(())
    }
}
