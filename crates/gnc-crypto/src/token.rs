//! Short-lived access grants for a single tier
//!
//! A grant carries one tier's key sealed either under a key only the
//! password holder can re-derive (self grant) or under a key derived from a
//! recipient secret. Redeeming it opens exactly that tier. There is no
//! signature: possession of the sealing key is the only binding.

use gnc_core::codec::{base64_bytes, hex_bytes};
use gnc_core::{clock, AccessTier, AeadAlgorithm, GncError, GncResult};
use rand::RngCore;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use zeroize::Zeroize;

use crate::aead::{open, seal, BlobRole, EncryptedBlob};
use crate::kdf::{derive_key, derive_master_key, DerivedKey};
use crate::keys::{derive_self_token_key, unwrap_key};
use crate::package::{
    open_tier_blob, package_params, tier_slot, wrap_unexpected_decrypt, DecryptedTier,
    EncryptedPackage, EncryptionManager,
};
use crate::KEY_SIZE;

/// Grant lifetime: 24 hours
pub const TOKEN_VALIDITY_MS: u64 = 24 * 60 * 60 * 1000;

const TOKEN_NONCE_SIZE: usize = 16;

/// Sealed token payload. The tier key is zeroized on drop.
#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessToken {
    pub access_level: AccessTier,
    #[serde(with = "base64_bytes")]
    pub tier_salt: Vec<u8>,
    pub algorithm: AeadAlgorithm,
    #[serde(with = "base64_bytes")]
    pub tier_key: Vec<u8>,
    /// Unix ms
    pub valid_until: u64,
    #[serde(with = "hex_bytes")]
    pub nonce: Vec<u8>,
}

impl Drop for AccessToken {
    fn drop(&mut self) {
        self.tier_key.zeroize();
    }
}

impl std::fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessToken")
            .field("access_level", &self.access_level)
            .field("algorithm", &self.algorithm)
            .field("valid_until", &self.valid_until)
            .field("tier_key", &"[REDACTED]")
            .finish()
    }
}

/// What the grant holder receives. Never contains the recipient key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessGrant {
    pub access_level: AccessTier,
    pub encrypted_token: EncryptedBlob,
    /// Unix ms; informational, the sealed copy is authoritative
    pub valid_until: u64,
    pub recipient_bound: bool,
}

/// Secret used to open a grant.
#[derive(Clone, Copy)]
pub enum TokenSecret<'a> {
    /// Package password, for self grants
    Password(&'a SecretString),
    /// Recipient key, for recipient-bound grants
    RecipientKey(&'a SecretString),
}

impl EncryptionManager {
    /// Issue a 24h grant for one tier.
    pub fn generate_access_key(
        &self,
        package: &EncryptedPackage,
        password: &SecretString,
        access_level: u8,
        recipient_key: Option<&SecretString>,
    ) -> GncResult<AccessGrant> {
        self.generate_access_key_at(package, password, access_level, recipient_key, clock::now_millis())
    }

    /// [`generate_access_key`](Self::generate_access_key) with an explicit issue time.
    pub fn generate_access_key_at(
        &self,
        package: &EncryptedPackage,
        password: &SecretString,
        access_level: u8,
        recipient_key: Option<&SecretString>,
        now_ms: u64,
    ) -> GncResult<AccessGrant> {
        let tier = AccessTier::try_from(access_level)?;
        let (blob, entry) = tier_slot(package, tier)?;
        let params = package_params(package);

        let master = derive_master_key(password, &package.master_salt, &params)?;
        let tier_key = unwrap_key(&master, tier, &entry.wrapped_key)?;

        let mut nonce = vec![0u8; TOKEN_NONCE_SIZE];
        rand::thread_rng().fill_bytes(&mut nonce);

        let valid_until = now_ms.saturating_add(TOKEN_VALIDITY_MS);
        let token = AccessToken {
            access_level: tier,
            tier_salt: entry.salt.clone(),
            algorithm: blob.algorithm,
            tier_key: tier_key.as_bytes().to_vec(),
            valid_until,
            nonce,
        };
        let payload = zeroize::Zeroizing::new(serde_json::to_vec(&token)?);

        let sealing_key = match recipient_key {
            Some(recipient) => recipient_token_key(recipient, &package.master_salt, params.iterations)?,
            None => derive_self_token_key(&master, &package.master_salt, tier)?,
        };
        let encrypted_token = seal(
            AeadAlgorithm::Aes256Gcm,
            sealing_key.as_bytes(),
            BlobRole::AccessToken(tier),
            &payload,
        )?;

        tracing::info!(
            tier = tier.level(),
            recipient_bound = recipient_key.is_some(),
            valid_until,
            "access grant issued"
        );
        Ok(AccessGrant {
            access_level: tier,
            encrypted_token,
            valid_until,
            recipient_bound: recipient_key.is_some(),
        })
    }

    /// Open a grant and decrypt the tier it covers.
    pub fn redeem_access_token(
        &self,
        package: &EncryptedPackage,
        grant: &AccessGrant,
        secret: TokenSecret<'_>,
    ) -> GncResult<DecryptedTier> {
        self.redeem_access_token_at(package, grant, secret, clock::now_millis())
    }

    /// [`redeem_access_token`](Self::redeem_access_token) at an explicit time.
    pub fn redeem_access_token_at(
        &self,
        package: &EncryptedPackage,
        grant: &AccessGrant,
        secret: TokenSecret<'_>,
        now_ms: u64,
    ) -> GncResult<DecryptedTier> {
        let token = open_token(package, grant, secret)?;

        if now_ms > token.valid_until {
            return Err(GncError::TokenExpired {
                valid_until: token.valid_until,
                now: now_ms,
            });
        }
        if token.access_level != grant.access_level {
            return Err(GncError::InvalidData(format!(
                "token is for level {}, grant claims level {}",
                token.access_level, grant.access_level
            )));
        }

        let tier = token.access_level;
        let (blob, entry) = tier_slot(package, tier)?;
        if entry.salt != token.tier_salt {
            return Err(GncError::InvalidData(
                "token does not belong to this package".into(),
            ));
        }

        let tier_key = DerivedKey::from_vec(token.tier_key.clone());
        let data = open_tier_blob(blob, &tier_key, tier).map_err(wrap_unexpected_decrypt)?;

        tracing::debug!(tier = tier.level(), "access grant redeemed");
        Ok(DecryptedTier {
            data,
            access_level: tier,
            metadata: None,
            decrypted_at: now_ms,
        })
    }
}

fn recipient_token_key(recipient: &SecretString, master_salt: &[u8], iterations: u32) -> GncResult<DerivedKey> {
    derive_key(recipient.expose_secret().as_bytes(), master_salt, iterations, KEY_SIZE)
}

fn open_token(
    package: &EncryptedPackage,
    grant: &AccessGrant,
    secret: TokenSecret<'_>,
) -> GncResult<AccessToken> {
    let tier = grant.access_level;
    let params = package_params(package);

    let sealing_key = match (secret, grant.recipient_bound) {
        (TokenSecret::RecipientKey(key), true) => {
            recipient_token_key(key, &package.master_salt, params.iterations)?
        }
        (TokenSecret::Password(password), false) => {
            let master = derive_master_key(password, &package.master_salt, &params)?;
            derive_self_token_key(&master, &package.master_salt, tier)?
        }
        (_, true) => {
            return Err(GncError::InvalidParameter(
                "grant is recipient-bound; a recipient key is required".into(),
            ))
        }
        (_, false) => {
            return Err(GncError::InvalidParameter(
                "self grant; the package password is required".into(),
            ))
        }
    };

    let plaintext = open(&grant.encrypted_token, sealing_key.as_bytes(), BlobRole::AccessToken(tier))?;
    Ok(serde_json::from_slice(&plaintext)?)
}
