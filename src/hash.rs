// src/hash.rs

//! Content hashes and the streaming hasher used for combined fingerprints
//! and cache keys.

use std::fmt;
use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::fs::FileSystem;

/// A 32-byte BLAKE3 digest.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ContentHash([u8; 32]);

impl ContentHash {
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        blake3::Hash::from(self.0).to_hex().to_string()
    }

    /// Fixed hash standing in for the content of something that has no bytes
    /// of its own (directories, missing files).
    pub fn signature(name: &str) -> Self {
        hash_bytes(format!("SIGNATURE\u{1f}{name}").as_bytes())
    }
}

impl fmt::Debug for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentHash({})", &self.to_hex()[..16])
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl From<blake3::Hash> for ContentHash {
    fn from(hash: blake3::Hash) -> Self {
        Self(*hash.as_bytes())
    }
}

/// Signature recorded for directories in fingerprints.
pub fn dir_signature() -> ContentHash {
    ContentHash::signature("DIR")
}

/// Signature recorded for paths that do not exist.
pub fn missing_file_signature() -> ContentHash {
    ContentHash::signature("MISSING")
}

pub fn hash_bytes(data: &[u8]) -> ContentHash {
    blake3::hash(data).into()
}

/// Hash everything readable from `reader`.
pub fn hash_reader(mut reader: impl Read) -> std::io::Result<ContentHash> {
    let mut hasher = blake3::Hasher::new();
    let mut buf = [0u8; 8192];
    loop {
        let n = reader.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hasher.finalize().into())
}

/// Compute the hash of a single file.
pub fn compute_file_hash(fs: &dyn FileSystem, path: &Path) -> Result<ContentHash> {
    let reader = fs.open_read(path)?;
    hash_reader(reader).with_context(|| format!("hashing file {:?}", path))
}

/// Streaming hasher for composite values.
///
/// Strings are length-prefixed so that `("ab", "c")` and `("a", "bc")` never
/// collide.
#[derive(Debug, Default, Clone)]
pub struct Hasher {
    inner: blake3::Hasher,
}

impl Hasher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put_str(&mut self, value: &str) -> &mut Self {
        self.put_u64(value.len() as u64);
        self.inner.update(value.as_bytes());
        self
    }

    pub fn put_hash(&mut self, hash: &ContentHash) -> &mut Self {
        self.inner.update(hash.as_bytes());
        self
    }

    pub fn put_u8(&mut self, value: u8) -> &mut Self {
        self.inner.update(&[value]);
        self
    }

    pub fn put_bool(&mut self, value: bool) -> &mut Self {
        self.put_u8(u8::from(value))
    }

    pub fn put_u64(&mut self, value: u64) -> &mut Self {
        self.inner.update(&value.to_le_bytes());
        self
    }

    pub fn finish(&self) -> ContentHash {
        self.inner.finalize().into()
    }
}
