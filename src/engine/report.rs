// src/engine/report.rs

use std::fmt;

use crate::task::{CacheKey, Verdict};

/// What the CLI prints for one evaluated task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskReport {
    pub task: String,
    pub verdict: Verdict,
    pub cache_key: Option<CacheKey>,
    /// Human-readable reasons, capped, with a summary line for the rest.
    pub reasons: Vec<String>,
    /// Number of changed input files handed to an incremental execution.
    pub input_changes: usize,
    /// Build that produced the outputs currently on disk.
    pub origin_build: Option<String>,
    /// Output files recorded, when the task was recorded.
    pub recorded_outputs: Option<usize>,
}

impl fmt::Display for TaskReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.task, self.verdict)?;
        match &self.cache_key {
            Some(key) => write!(f, " (cache key {})", &key.to_string()[..16])?,
            None => write!(f, " (not cacheable)")?,
        }
        if self.verdict == Verdict::UpToDate {
            if let Some(origin) = &self.origin_build {
                write!(f, " [outputs from build {origin}]")?;
            }
        }
        if let Some(count) = self.recorded_outputs {
            write!(f, " [recorded {count} output file(s)]")?;
        }
        for reason in &self.reasons {
            write!(f, "\n    - {reason}")?;
        }
        Ok(())
    }
}

pub fn print_reports(reports: &[TaskReport]) {
    for report in reports {
        println!("{report}");
    }
}
