//! Optimistic-concurrency tokens for snapshots.
//!
//! A snapshot is serialized canonically (every collection in it is ordered)
//! and hashed twice: a base64 SHA-256 digest and a 64-bit FNV-1a fold. The
//! pair only detects concurrent writes; it is not an integrity guarantee.

use std::hash::Hasher;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::model::Snapshot;

const FNV_OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

/// Checksum and structural hash of one snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HashToken {
    pub checksum: String,
    pub structural_hash: i64,
}

/// Canonical serialization the hashes are computed over.
pub fn canonical_bytes(snapshot: &Snapshot) -> Result<Vec<u8>, serde_json::Error> {
    serde_json::to_vec(snapshot)
}

/// Hash a snapshot.
pub fn hash_snapshot(snapshot: &Snapshot) -> Result<HashToken, serde_json::Error> {
    let bytes = canonical_bytes(snapshot)?;
    Ok(hash_bytes(&bytes))
}

#[must_use]
pub fn hash_bytes(bytes: &[u8]) -> HashToken {
    let checksum = STANDARD.encode(Sha256::digest(bytes));

    let mut fnv = Fnv1a::default();
    fnv.write(bytes);
    HashToken {
        checksum,
        structural_hash: i64::from_ne_bytes(fnv.finish().to_ne_bytes()),
    }
}

/// 64-bit FNV-1a, stable across platforms and compiler versions.
#[derive(Debug, Clone, Copy)]
struct Fnv1a(u64);

impl Default for Fnv1a {
    fn default() -> Self {
        Self(FNV_OFFSET_BASIS)
    }
}

impl Hasher for Fnv1a {
    fn finish(&self) -> u64 {
        self.0
    }

    fn write(&mut self, bytes: &[u8]) {
        for byte in bytes {
            self.0 ^= u64::from(*byte);
            self.0 = self.0.wrapping_mul(FNV_PRIME);
        }
    }
}
