//! Canonical JSON and SHA-256 checksums.
//!
//! Serializing through `serde_json::Value` sorts object keys (the default
//! `Map` is a `BTreeMap`), which makes every hash below independent of
//! struct field order.

use serde::Serialize;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

use crate::error::GncResult;

/// Deterministic JSON bytes for any serializable value.
pub fn canonical_json<T: Serialize + ?Sized>(value: &T) -> GncResult<Vec<u8>> {
    let tree = serde_json::to_value(value)?;
    Ok(serde_json::to_vec(&tree)?)
}

pub fn sha256(data: &[u8]) -> [u8; 32] {
    Sha256::digest(data).into()
}

/// SHA-256 of the canonical JSON encoding.
pub fn canonical_hash<T: Serialize + ?Sized>(value: &T) -> GncResult<[u8; 32]> {
    Ok(sha256(&canonical_json(value)?))
}

/// Hex SHA-256 checksum used for whole-dataset integrity checks.
pub fn checksum<T: Serialize + ?Sized>(value: &T) -> GncResult<String> {
    Ok(hex::encode(canonical_hash(value)?))
}

/// Recompute the checksum of `value` and compare it to `expected` in constant time.
pub fn verify_integrity<T: Serialize + ?Sized>(value: &T, expected: &str) -> bool {
    match checksum(value) {
        Ok(actual) => actual.as_bytes().ct_eq(expected.as_bytes()).into(),
        Err(_) => false,
    }
}
