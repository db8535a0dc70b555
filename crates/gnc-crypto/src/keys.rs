//! Tier key wrapping and HKDF-derived side keys

use gnc_core::{AccessTier, AeadAlgorithm, GncError, GncResult};
use hkdf::Hkdf;
use sha2::Sha256;

use crate::aead::{open, seal, BlobRole, EncryptedBlob};
use crate::kdf::{DerivedKey, MasterKey};
use crate::KEY_SIZE;

/// Key that seals self-addressed access tokens for `tier`.
pub fn derive_self_token_key(
    master: &MasterKey,
    master_salt: &[u8],
    tier: AccessTier,
) -> GncResult<DerivedKey> {
    let info = format!("gnc-access-token:{tier}");
    hkdf_derive(master.as_bytes(), master_salt, info.as_bytes())
}

/// HKDF-SHA256 key derivation with a domain-specific info string.
fn hkdf_derive(ikm: &[u8; KEY_SIZE], salt: &[u8], info: &[u8]) -> GncResult<DerivedKey> {
    let hkdf = Hkdf::<Sha256>::new(Some(salt), ikm);
    let mut okm = vec![0u8; KEY_SIZE];
    hkdf.expand(info, &mut okm)
        .map_err(|e| GncError::InvalidParameter(format!("HKDF expand failed: {e}")))?;
    Ok(DerivedKey::from_vec(okm))
}

/// Wrap (encrypt) a tier key under the master key with AES-256-GCM.
pub fn wrap_key(master: &MasterKey, tier: AccessTier, tier_key: &DerivedKey) -> GncResult<EncryptedBlob> {
    seal(
        AeadAlgorithm::Aes256Gcm,
        master.as_bytes(),
        BlobRole::AccessKey(tier),
        tier_key.as_bytes(),
    )
}

/// Unwrap a tier key sealed by [`wrap_key`].
pub fn unwrap_key(master: &MasterKey, tier: AccessTier, wrapped: &EncryptedBlob) -> GncResult<DerivedKey> {
    let plain = open(wrapped, master.as_bytes(), BlobRole::AccessKey(tier))?;
    if AeadAlgorithm::for_key_size(plain.len()).is_none() {
        return Err(GncError::InvalidParameter(format!(
            "unwrapped key has unsupported size: {} bytes",
            plain.len()
        )));
    }
    Ok(DerivedKey::from_vec(plain.to_vec()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_master_key() -> MasterKey {
        MasterKey::from_bytes([42u8; KEY_SIZE])
    }

    #[test]
    fn test_key_wrap_unwrap_roundtrip() {
        let master = test_master_key();
        let tier_key = DerivedKey::from_vec(vec![7u8; 24]);

        let wrapped = wrap_key(&master, AccessTier::Detailed, &tier_key).unwrap();
        let unwrapped = unwrap_key(&master, AccessTier::Detailed, &wrapped).unwrap();

        assert_eq!(tier_key.as_bytes(), unwrapped.as_bytes());
    }

    #[test]
    fn test_key_unwrap_wrong_master() {
        let master1 = MasterKey::from_bytes([1u8; KEY_SIZE]);
        let master2 = MasterKey::from_bytes([2u8; KEY_SIZE]);
        let tier_key = DerivedKey::from_vec(vec![7u8; 16]);

        let wrapped = wrap_key(&master1, AccessTier::Basic, &tier_key).unwrap();
        let result = unwrap_key(&master2, AccessTier::Basic, &wrapped);

        assert!(matches!(result, Err(GncError::Authentication)));
    }

    #[test]
    fn test_key_unwrap_wrong_tier_slot() {
        let master = test_master_key();
        let tier_key = DerivedKey::from_vec(vec![7u8; 32]);
        let wrapped = wrap_key(&master, AccessTier::Full, &tier_key).unwrap();

        assert!(unwrap_key(&master, AccessTier::Basic, &wrapped).is_err());
    }

    #[test]
    fn test_self_token_keys_are_per_tier() {
        let master = test_master_key();
        let salt = [9u8; 32];
        let k1 = derive_self_token_key(&master, &salt, AccessTier::Basic).unwrap();
        let k3 = derive_self_token_key(&master, &salt, AccessTier::Full).unwrap();

        assert_ne!(k1.as_bytes(), k3.as_bytes());
        assert_eq!(k1.len(), KEY_SIZE);
    }
}
