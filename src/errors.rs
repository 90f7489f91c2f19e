// src/errors.rs

//! Crate-wide error aliases and helpers.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SnapcheckError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Task dependency cycle: {0}")]
    DependencyCycle(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    /// A persisted execution record could not be decoded. Callers discard
    /// the record and treat the task as never executed.
    #[error("Corrupt execution history for task '{task}': {reason}")]
    HistoryCorrupt { task: String, reason: String },

    /// A recorded output can no longer be found where it is expected.
    #[error("Stale file-system state: {path} no longer exists")]
    StaleState { path: String },

    /// An operation was called in the wrong evaluation state.
    #[error("Invalid evaluation state: {0}")]
    InvalidState(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, SnapcheckError>;
