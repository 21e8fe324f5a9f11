//! Stable content hashing over canonical JSON.

use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::errors::RbError;
use crate::serde::to_canonical_json_bytes;

/// Computes a lowercase hexadecimal SHA-256 hash for the provided payload.
///
/// Two values whose canonical JSON encodings are equal hash identically; this
/// is the digest recorded in `config_hash` and run summaries.
pub fn stable_hash_string<T: Serialize>(value: &T) -> Result<String, RbError> {
    let bytes = to_canonical_json_bytes(value)?;
    Ok(hash_bytes(&bytes))
}

/// Computes a lowercase hexadecimal SHA-256 hash over raw bytes.
pub fn hash_bytes(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    format!("{:x}", digest)
}
