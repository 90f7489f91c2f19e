// src/task/mod.rs

//! The task decision engine.
//!
//! Given a [`TaskSpec`] and its previous [`TaskExecutionRecord`], decide
//! whether the task is up to date, can run incrementally, or must be rebuilt,
//! and record the outcome afterwards.
//!
//! [`TaskExecutionRecord`]: crate::history::TaskExecutionRecord

pub mod cache_key;
pub mod changes;
pub mod checker;
pub mod overlap;
pub mod spec;
pub mod state;

pub use cache_key::CacheKey;
pub use checker::UpToDateChecker;
pub use overlap::{OutputRegistry, OverlappingOutputs};
pub use spec::{FilePropertySpec, ImplementationSnapshot, TaskSpec, ValueSnapshot};
pub use state::{
    Decision, EvaluationStatus, ExecutionOutcome, RecordOutcome, TaskArtifactState, Verdict,
};
