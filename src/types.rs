// src/types.rs

//! Small shared enums used across the VFS, fingerprinting and config layers.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// How path segments are compared.
///
/// This drives both lookups in the path trie and the canonical ordering of
/// siblings, so one hierarchy must never mix the two modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CaseSensitivity {
    CaseSensitive,
    CaseInsensitive,
}

impl CaseSensitivity {
    pub fn from_flag(case_sensitive: bool) -> Self {
        if case_sensitive {
            CaseSensitivity::CaseSensitive
        } else {
            CaseSensitivity::CaseInsensitive
        }
    }

    pub fn is_case_sensitive(self) -> bool {
        matches!(self, CaseSensitivity::CaseSensitive)
    }
}

impl Default for CaseSensitivity {
    fn default() -> Self {
        CaseSensitivity::CaseSensitive
    }
}

/// Type of a file-system entry as observed by a scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum FileType {
    RegularFile,
    Directory,
    Missing,
}

impl FileType {
    /// Stable one-byte tag used by the history wire format.
    pub fn tag(self) -> u8 {
        match self {
            FileType::RegularFile => 0,
            FileType::Directory => 1,
            FileType::Missing => 2,
        }
    }

    pub fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            0 => Some(FileType::RegularFile),
            1 => Some(FileType::Directory),
            2 => Some(FileType::Missing),
            _ => None,
        }
    }
}

impl fmt::Display for FileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FileType::RegularFile => "file",
            FileType::Directory => "directory",
            FileType::Missing => "missing",
        };
        f.write_str(s)
    }
}

/// Whether an entry was reached directly or through a symbolic link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AccessType {
    Direct,
    ViaSymlink,
}

impl Default for AccessType {
    fn default() -> Self {
        AccessType::Direct
    }
}

/// Path-sensitivity policy declared for a file property.
///
/// Selects the fingerprinting strategy used to normalize the property's
/// snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PathSensitivity {
    Absolute,
    Relative,
    NameOnly,
    Ignored,
}

impl Default for PathSensitivity {
    fn default() -> Self {
        PathSensitivity::Absolute
    }
}

impl FromStr for PathSensitivity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "absolute" => Ok(PathSensitivity::Absolute),
            "relative" => Ok(PathSensitivity::Relative),
            "name_only" | "name-only" | "nameonly" => Ok(PathSensitivity::NameOnly),
            "ignored" | "none" => Ok(PathSensitivity::Ignored),
            other => Err(format!(
                "invalid path sensitivity: {other} (expected \"absolute\", \"relative\", \"name_only\" or \"ignored\")"
            )),
        }
    }
}

/// Where task execution history is persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HistoryStorageMode {
    /// One record file per task under `<history_dir>/history/`.
    File,
    /// Kept in memory only (lost on restart).
    Memory,
}

impl Default for HistoryStorageMode {
    fn default() -> Self {
        HistoryStorageMode::File
    }
}
