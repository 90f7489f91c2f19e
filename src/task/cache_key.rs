// src/task/cache_key.rs

//! Build-cache keys.
//!
//! The key covers the task implementation, the combined hash of every input
//! file property (in declared order, together with its name and
//! normalization), every non-file input value (sorted by name), and the names
//! of the output properties. Equal keys mean interchangeable outputs.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::fingerprint::CurrentFileCollectionFingerprint;
use crate::hash::{ContentHash, Hasher};
use crate::task::spec::{TaskSpec, ValueSnapshot};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CacheKey(ContentHash);

impl CacheKey {
    pub fn from_hash(hash: ContentHash) -> Self {
        Self(hash)
    }

    pub fn hash(&self) -> ContentHash {
        self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Compute the cache key, or `None` for an implementation without a known
/// hash.
pub fn compute_cache_key(
    spec: &TaskSpec,
    input_files: &[(String, CurrentFileCollectionFingerprint)],
    input_properties: &BTreeMap<String, ValueSnapshot>,
) -> Option<CacheKey> {
    let implementation_hash = spec.implementation.implementation_hash?;

    let mut hasher = Hasher::new();
    hasher
        .put_str(&spec.implementation.type_name)
        .put_hash(&implementation_hash);

    hasher.put_u64(input_files.len() as u64);
    for (name, fingerprint) in input_files {
        hasher
            .put_str(name)
            .put_str(fingerprint.strategy().identifier())
            .put_hash(&fingerprint.combined_hash());
    }

    hasher.put_u64(input_properties.len() as u64);
    for (name, value) in input_properties {
        hasher.put_str(name).put_hash(&value.hash());
    }

    hasher.put_u64(spec.output_files.len() as u64);
    for output in &spec.output_files {
        hasher.put_str(&output.name);
    }

    Some(CacheKey(hasher.finish()))
}
