//! Key derivation: PBKDF2-HMAC-SHA512 password → master key → tier keys

use gnc_core::{GncError, GncResult};
use pbkdf2::pbkdf2_hmac;
use rand::RngCore;
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha512;
use zeroize::{Zeroize, Zeroizing};

use crate::KEY_SIZE;

/// A 256-bit master key derived from the package password.
///
/// Zeroized on drop to prevent secrets lingering in memory.
#[derive(Clone)]
pub struct MasterKey {
    bytes: [u8; KEY_SIZE],
}

impl MasterKey {
    pub fn from_bytes(bytes: [u8; KEY_SIZE]) -> Self {
        Self { bytes }
    }

    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.bytes
    }

    /// Lowercase hex form, used as the password input for second-level derivations.
    pub fn to_hex(&self) -> Zeroizing<String> {
        Zeroizing::new(hex::encode(self.bytes))
    }
}

impl Drop for MasterKey {
    fn drop(&mut self) {
        self.bytes.zeroize();
    }
}

impl std::fmt::Debug for MasterKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MasterKey")
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}

/// Variable-length derived key (tier keys are 16, 24 or 32 bytes). Zeroized on drop.
#[derive(Clone)]
pub struct DerivedKey {
    bytes: Vec<u8>,
}

impl DerivedKey {
    pub fn from_vec(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl Drop for DerivedKey {
    fn drop(&mut self) {
        self.bytes.zeroize();
    }
}

impl std::fmt::Debug for DerivedKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DerivedKey")
            .field("len", &self.bytes.len())
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}

/// PBKDF2 parameters
#[derive(Debug, Clone, Copy)]
pub struct KdfParams {
    /// Iteration count (default: 100000; tests use far fewer)
    pub iterations: u32,
}

impl Default for KdfParams {
    fn default() -> Self {
        Self {
            iterations: gnc_core::config::PRODUCTION_MIN_ITERATIONS,
        }
    }
}

/// PBKDF2-HMAC-SHA512 over arbitrary password bytes.
///
/// Deterministic: decryption re-derives every key from the stored salts.
pub fn derive_key(
    password: &[u8],
    salt: &[u8],
    iterations: u32,
    output_len: usize,
) -> GncResult<DerivedKey> {
    if output_len == 0 {
        return Err(GncError::InvalidParameter(
            "key output length must be positive".into(),
        ));
    }
    if salt.is_empty() {
        return Err(GncError::InvalidParameter("salt must not be empty".into()));
    }
    if iterations == 0 {
        return Err(GncError::InvalidParameter(
            "iteration count must be positive".into(),
        ));
    }

    let mut out = vec![0u8; output_len];
    pbkdf2_hmac::<Sha512>(password, salt, iterations, &mut out);
    Ok(DerivedKey::from_vec(out))
}

/// Derive the 256-bit master key from the package password and master salt.
pub fn derive_master_key(
    password: &SecretString,
    salt: &[u8],
    params: &KdfParams,
) -> GncResult<MasterKey> {
    let derived = derive_key(
        password.expose_secret().as_bytes(),
        salt,
        params.iterations,
        KEY_SIZE,
    )?;
    let mut bytes = [0u8; KEY_SIZE];
    bytes.copy_from_slice(derived.as_bytes());
    Ok(MasterKey::from_bytes(bytes))
}

/// Tier key: PBKDF2 over hex(master) with the tier's own salt.
pub fn derive_tier_key(
    master: &MasterKey,
    tier_salt: &[u8],
    params: &KdfParams,
    key_size: usize,
) -> GncResult<DerivedKey> {
    derive_key(
        master.to_hex().as_bytes(),
        tier_salt,
        params.iterations,
        key_size,
    )
}

/// Metadata key: PBKDF2 over hex(master) with the master salt.
pub fn derive_metadata_key(
    master: &MasterKey,
    master_salt: &[u8],
    params: &KdfParams,
) -> GncResult<DerivedKey> {
    derive_key(
        master.to_hex().as_bytes(),
        master_salt,
        params.iterations,
        KEY_SIZE,
    )
}

/// Fresh random salt from the thread-local CSPRNG.
pub fn generate_salt(len: usize) -> Vec<u8> {
    let mut salt = vec![0u8; len];
    rand::thread_rng().fill_bytes(&mut salt);
    salt
}
