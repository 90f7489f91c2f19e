// src/history/codec.rs

//! Binary encoding of [`TaskExecutionRecord`]s.
//!
//! Records go through plain wire structs so that the in-memory types stay
//! free of serialization concerns. Enumerations are written as one-byte tags;
//! an unknown tag or a different format version makes the record corrupt.

use serde::{Deserialize, Serialize};

use crate::errors::{Result, SnapcheckError};
use crate::fingerprint::{
    FingerprintCompareStrategy, FingerprintEntry, FingerprintingStrategy,
    HistoricalFileCollectionFingerprint, NormalizedFingerprint,
};
use crate::hash::ContentHash;
use crate::history::TaskExecutionRecord;
use crate::task::cache_key::CacheKey;
use crate::task::overlap::OverlappingOutputs;
use crate::task::spec::{ImplementationSnapshot, ValueSnapshot};
use crate::types::FileType;

pub const FORMAT_VERSION: u32 = 1;

#[derive(Serialize, Deserialize)]
struct WireRecord {
    version: u32,
    task: String,
    build_invocation_id: String,
    execution_time_ms: u64,
    successful: bool,
    implementation_type: String,
    implementation_hash: Option<ContentHash>,
    input_properties: Vec<(String, ContentHash)>,
    input_files: Vec<WireFingerprint>,
    output_files: Vec<WireFingerprint>,
    cache_key: Option<ContentHash>,
    overlapping_outputs: Option<OverlappingOutputs>,
}

#[derive(Serialize, Deserialize)]
struct WireFingerprint {
    property: String,
    strategy: Option<u8>,
    compare_strategy: u8,
    hash: Option<ContentHash>,
    entries: Vec<WireEntry>,
}

#[derive(Serialize, Deserialize)]
struct WireEntry {
    absolute_path: String,
    normalized_path: String,
    file_type: u8,
    content_hash: ContentHash,
}

pub fn encode(record: &TaskExecutionRecord) -> Result<Vec<u8>> {
    let wire = WireRecord {
        version: FORMAT_VERSION,
        task: record.task.clone(),
        build_invocation_id: record.build_invocation_id.clone(),
        execution_time_ms: record.execution_time_ms,
        successful: record.successful,
        implementation_type: record.implementation.type_name.clone(),
        implementation_hash: record.implementation.implementation_hash,
        input_properties: record
            .input_properties
            .iter()
            .map(|(name, value)| (name.clone(), value.hash()))
            .collect(),
        input_files: record.input_files.iter().map(|(n, fp)| to_wire(n, fp)).collect(),
        output_files: record.output_files.iter().map(|(n, fp)| to_wire(n, fp)).collect(),
        cache_key: record.cache_key.map(|k| k.hash()),
        overlapping_outputs: record.overlapping_outputs.clone(),
    };
    bincode::serialize(&wire)
        .map_err(|e| SnapcheckError::Other(anyhow::anyhow!("encoding history for '{}': {e}", record.task)))
}

pub fn decode(task: &str, bytes: &[u8]) -> Result<TaskExecutionRecord> {
    let corrupt = |reason: String| SnapcheckError::HistoryCorrupt {
        task: task.to_string(),
        reason,
    };

    let wire: WireRecord = bincode::deserialize(bytes).map_err(|e| corrupt(e.to_string()))?;
    if wire.version != FORMAT_VERSION {
        return Err(corrupt(format!(
            "unsupported format version {} (expected {FORMAT_VERSION})",
            wire.version
        )));
    }

    let input_files = wire
        .input_files
        .into_iter()
        .map(from_wire)
        .collect::<std::result::Result<Vec<_>, String>>()
        .map_err(corrupt)?;
    let output_files = wire
        .output_files
        .into_iter()
        .map(from_wire)
        .collect::<std::result::Result<Vec<_>, String>>()
        .map_err(corrupt)?;

    Ok(TaskExecutionRecord {
        task: wire.task,
        build_invocation_id: wire.build_invocation_id,
        execution_time_ms: wire.execution_time_ms,
        successful: wire.successful,
        implementation: ImplementationSnapshot {
            type_name: wire.implementation_type,
            implementation_hash: wire.implementation_hash,
        },
        input_properties: wire
            .input_properties
            .into_iter()
            .map(|(name, hash)| (name, ValueSnapshot::from_hash(hash)))
            .collect(),
        input_files,
        output_files,
        cache_key: wire.cache_key.map(CacheKey::from_hash),
        overlapping_outputs: wire.overlapping_outputs,
    })
}

/// Task name stored in an encoded record.
pub fn decode_task_name(bytes: &[u8]) -> Option<String> {
    bincode::deserialize::<WireRecord>(bytes).ok().map(|w| w.task)
}

fn to_wire(property: &str, fp: &HistoricalFileCollectionFingerprint) -> WireFingerprint {
    WireFingerprint {
        property: property.to_string(),
        strategy: fp.strategy.map(FingerprintingStrategy::tag),
        compare_strategy: fp.compare_strategy.tag(),
        hash: fp.hash,
        entries: fp
            .entries
            .iter()
            .map(|e| WireEntry {
                absolute_path: e.absolute_path.clone(),
                normalized_path: e.fingerprint.normalized_path.clone(),
                file_type: e.fingerprint.file_type.tag(),
                content_hash: e.fingerprint.content_hash,
            })
            .collect(),
    }
}

fn from_wire(
    wire: WireFingerprint,
) -> std::result::Result<(String, HistoricalFileCollectionFingerprint), String> {
    let compare_strategy = FingerprintCompareStrategy::from_tag(wire.compare_strategy)
        .ok_or_else(|| format!("unknown compare strategy tag {}", wire.compare_strategy))?;
    let strategy = match wire.strategy {
        Some(tag) => Some(
            FingerprintingStrategy::from_tag(tag)
                .ok_or_else(|| format!("unknown fingerprinting strategy tag {tag}"))?,
        ),
        None => None,
    };

    let mut entries = Vec::with_capacity(wire.entries.len());
    for entry in wire.entries {
        let file_type = FileType::from_tag(entry.file_type)
            .ok_or_else(|| format!("unknown file type tag {}", entry.file_type))?;
        entries.push(FingerprintEntry {
            absolute_path: entry.absolute_path,
            fingerprint: NormalizedFingerprint {
                normalized_path: entry.normalized_path,
                content_hash: entry.content_hash,
                file_type,
            },
        });
    }

    Ok((
        wire.property,
        HistoricalFileCollectionFingerprint {
            strategy,
            compare_strategy,
            hash: wire.hash,
            entries,
        },
    ))
}
