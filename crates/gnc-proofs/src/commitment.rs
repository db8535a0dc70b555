//! Hash commitments: `SHA-256(SHA-256(canonical(value)) ‖ nonce)`
//!
//! Binding as long as nonces are never reused. Not hiding in any
//! zero-knowledge sense: revealing the value and the nonce together
//! discloses the value, so a commitment only shows the value was known at
//! commit time.

use gnc_core::canonical::{canonical_hash, canonical_json, sha256};
use gnc_core::GncResult;
use rand::RngCore;
use serde::Serialize;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

pub const NONCE_SIZE: usize = 32;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Commitment {
    pub hash: [u8; 32],
    pub nonce: [u8; NONCE_SIZE],
    /// `SHA-256(canonical(value))`
    pub data_hash: [u8; 32],
}

pub fn generate_nonce() -> [u8; NONCE_SIZE] {
    let mut nonce = [0u8; NONCE_SIZE];
    rand::thread_rng().fill_bytes(&mut nonce);
    nonce
}

/// Commit to `value`, drawing a fresh nonce unless one is supplied.
pub fn commit<T: Serialize + ?Sized>(value: &T, nonce: Option<[u8; NONCE_SIZE]>) -> GncResult<Commitment> {
    let nonce = nonce.unwrap_or_else(generate_nonce);
    let data_hash = canonical_hash(value)?;
    Ok(Commitment {
        hash: commitment_hash(&data_hash, &nonce),
        nonce,
        data_hash,
    })
}

fn commitment_hash(data_hash: &[u8; 32], nonce: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(data_hash);
    hasher.update(nonce);
    hasher.finalize().into()
}

/// Recompute the commitment for `value` and `nonce`; compare in constant time.
pub fn verify_commitment<T: Serialize + ?Sized>(expected: &[u8], value: &T, nonce: &[u8]) -> bool {
    match canonical_hash(value) {
        Ok(data_hash) => constant_time_eq(&commitment_hash(&data_hash, nonce), expected),
        Err(_) => false,
    }
}

/// Length-checked constant-time equality.
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.ct_eq(b).into()
}

/// Merkle root over canonical leaf hashes. An odd node is paired with
/// itself; the empty set hashes to `SHA-256("")`.
pub fn merkle_root<T: Serialize>(items: &[T]) -> GncResult<[u8; 32]> {
    if items.is_empty() {
        return Ok(sha256(b""));
    }

    let mut level = items
        .iter()
        .map(|item| Ok(sha256(&canonical_json(item)?)))
        .collect::<GncResult<Vec<[u8; 32]>>>()?;

    while level.len() > 1 {
        level = level
            .chunks(2)
            .map(|pair| {
                let right = pair.get(1).unwrap_or(&pair[0]);
                let mut hasher = Sha256::new();
                hasher.update(pair[0]);
                hasher.update(right);
                hasher.finalize().into()
            })
            .collect();
    }
    Ok(level[0])
}

/// Shannon entropy of the byte histogram, in bits per byte (0..=8).
pub fn shannon_entropy(bytes: &[u8]) -> f64 {
    if bytes.is_empty() {
        return 0.0;
    }
    let mut counts = [0u32; 256];
    for &b in bytes {
        counts[b as usize] += 1;
    }
    let total = bytes.len() as f64;
    counts
        .iter()
        .filter(|&&c| c > 0)
        .map(|&c| {
            let p = f64::from(c) / total;
            -p * p.log2()
        })
        .sum()
}
