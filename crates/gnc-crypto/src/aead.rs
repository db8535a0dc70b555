//! AES-GCM blobs bound to their role in the package
//!
//! Stored form (JSON, bytes base64):
//! ```text
//! { ciphertext, iv: 12 random bytes, authTag: 16 bytes, algorithm: "aes-<n>-gcm" }
//! AAD = role string ("gnc:metadata", "gnc:tier:<n>", "gnc:access-key:<n>", "gnc:access-token:<n>")
//! ```
//!
//! The AAD binds each blob to its slot, so a tier blob moved into another
//! tier's slot, or a wrapped key presented as metadata, fails authentication.

use aes_gcm::aead::{AeadInPlace, KeyInit};
use aes_gcm::aead::consts::U12;
use aes_gcm::aes::Aes192;
use aes_gcm::{Aes128Gcm, Aes256Gcm, AesGcm};
use gnc_core::codec::base64_bytes;
use gnc_core::{AccessTier, AeadAlgorithm, GncError, GncResult};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use crate::{NONCE_SIZE, TAG_SIZE};

type Aes192Gcm = AesGcm<Aes192, U12>;

/// Where a blob lives in a package; determines its AAD.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlobRole {
    Metadata,
    Tier(AccessTier),
    AccessKey(AccessTier),
    AccessToken(AccessTier),
}

impl BlobRole {
    pub fn aad(&self) -> Vec<u8> {
        match self {
            BlobRole::Metadata => b"gnc:metadata".to_vec(),
            BlobRole::Tier(t) => format!("gnc:tier:{t}").into_bytes(),
            BlobRole::AccessKey(t) => format!("gnc:access-key:{t}").into_bytes(),
            BlobRole::AccessToken(t) => format!("gnc:access-token:{t}").into_bytes(),
        }
    }
}

/// One AEAD-sealed payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncryptedBlob {
    #[serde(with = "base64_bytes")]
    pub ciphertext: Vec<u8>,
    #[serde(with = "base64_bytes")]
    pub iv: Vec<u8>,
    #[serde(with = "base64_bytes")]
    pub auth_tag: Vec<u8>,
    pub algorithm: AeadAlgorithm,
}

/// Encrypt `plaintext` under `key` with a fresh random nonce.
pub fn seal(
    algorithm: AeadAlgorithm,
    key: &[u8],
    role: BlobRole,
    plaintext: &[u8],
) -> GncResult<EncryptedBlob> {
    check_key(algorithm, key)?;

    let mut iv = [0u8; NONCE_SIZE];
    rand::thread_rng().fill_bytes(&mut iv);

    let aad = role.aad();
    let mut buffer = plaintext.to_vec();
    let auth_tag = match algorithm {
        AeadAlgorithm::Aes128Gcm => seal_in_place::<Aes128Gcm>(key, &iv, &aad, &mut buffer)?,
        AeadAlgorithm::Aes192Gcm => seal_in_place::<Aes192Gcm>(key, &iv, &aad, &mut buffer)?,
        AeadAlgorithm::Aes256Gcm => seal_in_place::<Aes256Gcm>(key, &iv, &aad, &mut buffer)?,
    };

    Ok(EncryptedBlob {
        ciphertext: buffer,
        iv: iv.to_vec(),
        auth_tag,
        algorithm,
    })
}

/// Decrypt and authenticate a blob. Any tag failure is `GncError::Authentication`.
pub fn open(blob: &EncryptedBlob, key: &[u8], role: BlobRole) -> GncResult<Zeroizing<Vec<u8>>> {
    check_key(blob.algorithm, key)?;
    if blob.iv.len() != NONCE_SIZE {
        return Err(GncError::InvalidParameter(format!(
            "iv must be {NONCE_SIZE} bytes, got {}",
            blob.iv.len()
        )));
    }
    if blob.auth_tag.len() != TAG_SIZE {
        return Err(GncError::InvalidParameter(format!(
            "auth tag must be {TAG_SIZE} bytes, got {}",
            blob.auth_tag.len()
        )));
    }

    let aad = role.aad();
    let mut buffer = Zeroizing::new(blob.ciphertext.clone());
    match blob.algorithm {
        AeadAlgorithm::Aes128Gcm => open_in_place::<Aes128Gcm>(key, blob, &aad, &mut buffer)?,
        AeadAlgorithm::Aes192Gcm => open_in_place::<Aes192Gcm>(key, blob, &aad, &mut buffer)?,
        AeadAlgorithm::Aes256Gcm => open_in_place::<Aes256Gcm>(key, blob, &aad, &mut buffer)?,
    }
    Ok(buffer)
}

fn check_key(algorithm: AeadAlgorithm, key: &[u8]) -> GncResult<()> {
    if key.len() != algorithm.key_size() {
        return Err(GncError::InvalidParameter(format!(
            "{algorithm} needs a {}-byte key, got {}",
            algorithm.key_size(),
            key.len()
        )));
    }
    Ok(())
}

fn seal_in_place<C: KeyInit + AeadInPlace>(
    key: &[u8],
    iv: &[u8],
    aad: &[u8],
    buffer: &mut [u8],
) -> GncResult<Vec<u8>> {
    let cipher = C::new_from_slice(key)
        .map_err(|_| GncError::InvalidParameter("invalid AEAD key length".into()))?;
    let tag = cipher
        .encrypt_in_place_detached(aes_gcm::aead::Nonce::<C>::from_slice(iv), aad, buffer)
        .map_err(|e| GncError::encryption(format!("AEAD seal failed: {e}")))?;
    Ok(tag.to_vec())
}

fn open_in_place<C: KeyInit + AeadInPlace>(
    key: &[u8],
    blob: &EncryptedBlob,
    aad: &[u8],
    buffer: &mut [u8],
) -> GncResult<()> {
    let cipher = C::new_from_slice(key)
        .map_err(|_| GncError::InvalidParameter("invalid AEAD key length".into()))?;
    cipher
        .decrypt_in_place_detached(
            aes_gcm::aead::Nonce::<C>::from_slice(&blob.iv),
            aad,
            buffer,
            aes_gcm::aead::Tag::<C>::from_slice(&blob.auth_tag),
        )
        .map_err(|_| GncError::Authentication)
}
