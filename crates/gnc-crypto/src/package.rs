//! EncryptionManager: dataset → EncryptedPackage → tier view

use gnc_core::codec::base64_bytes;
use gnc_core::config::EncryptionConfig;
use gnc_core::types::GeneticDataset;
use gnc_core::{canonical, clock, AccessTier, AeadAlgorithm, GncError, GncResult};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};

use crate::aead::{open, seal, BlobRole, EncryptedBlob};
use crate::kdf::{
    derive_master_key, derive_metadata_key, derive_tier_key, generate_salt, DerivedKey,
    KdfParams, MasterKey,
};
use crate::keys::{unwrap_key, wrap_key};
use crate::tiers::TierPartitioner;
use crate::PACKAGE_VERSION;

/// Which tiers to build, and optional wholesale replacements.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TierConfig {
    /// `None` builds all three tiers
    #[serde(default)]
    pub tiers: Option<BTreeSet<AccessTier>>,
    /// Replaces the computed view for a tier; only checked for being JSON
    #[serde(default)]
    pub custom_tiers: BTreeMap<AccessTier, Value>,
}

impl TierConfig {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn only(tiers: impl IntoIterator<Item = AccessTier>) -> Self {
        Self {
            tiers: Some(tiers.into_iter().collect()),
            custom_tiers: BTreeMap::new(),
        }
    }

    /// Selected tiers plus every tier with a custom view.
    pub fn selected(&self) -> BTreeSet<AccessTier> {
        let mut selected = match &self.tiers {
            Some(tiers) => tiers.clone(),
            None => AccessTier::ALL.into_iter().collect(),
        };
        selected.extend(self.custom_tiers.keys().copied());
        selected
    }
}

/// Tier salt plus the tier key sealed under the master key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessKeyEntry {
    #[serde(with = "base64_bytes")]
    pub salt: Vec<u8>,
    pub wrapped_key: EncryptedBlob,
}

/// The unit handed to the storage collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncryptedPackage {
    pub version: String,
    #[serde(with = "base64_bytes")]
    pub master_salt: Vec<u8>,
    pub key_derivation_iterations: u32,
    pub encrypted_tiers: BTreeMap<AccessTier, EncryptedBlob>,
    pub access_keys: BTreeMap<AccessTier, AccessKeyEntry>,
    pub metadata: EncryptedBlob,
    /// Hex SHA-256 of the canonical, unpartitioned dataset
    pub checksum: String,
}

/// Sealed under the metadata key; opening it is the password check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageMetadata {
    pub version: String,
    /// Package creation time, unix ms
    pub timestamp: u64,
    pub access_levels: Vec<AccessTier>,
    pub algorithm: AeadAlgorithm,
    pub tier_algorithms: BTreeMap<AccessTier, AeadAlgorithm>,
    pub key_derivation: String,
    pub iterations: u32,
}

/// Result of opening one tier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecryptedTier {
    pub data: Value,
    pub access_level: AccessTier,
    /// Present when the tier was opened with the package password
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<PackageMetadata>,
    /// Unix ms
    pub decrypted_at: u64,
}

impl DecryptedTier {
    /// Parse the tier payload as one of the built-in views.
    pub fn view(&self) -> GncResult<crate::tiers::TierView> {
        Ok(serde_json::from_value(self.data.clone())?)
    }
}

/// Builds and opens encrypted packages. Holds configuration only.
#[derive(Debug, Clone)]
pub struct EncryptionManager {
    config: EncryptionConfig,
}

impl EncryptionManager {
    pub fn new(config: EncryptionConfig) -> GncResult<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &EncryptionConfig {
        &self.config
    }

    fn kdf_params(&self) -> KdfParams {
        KdfParams {
            iterations: self.config.key_derivation_iterations,
        }
    }

    /// Partition, derive, seal. Never returns a partially built package.
    pub fn encrypt(
        &self,
        dataset: &GeneticDataset,
        password: &SecretString,
        tier_config: &TierConfig,
    ) -> GncResult<EncryptedPackage> {
        if dataset.is_empty() {
            return Err(GncError::InvalidData(
                "dataset must be a non-empty record".into(),
            ));
        }

        let package = self
            .build_package(dataset, password, tier_config)
            .map_err(GncError::encryption)?;

        tracing::info!(
            tiers = ?package.encrypted_tiers.keys().collect::<Vec<_>>(),
            iterations = package.key_derivation_iterations,
            "encrypted package created"
        );
        Ok(package)
    }

    fn build_package(
        &self,
        dataset: &GeneticDataset,
        password: &SecretString,
        tier_config: &TierConfig,
    ) -> GncResult<EncryptedPackage> {
        let params = self.kdf_params();
        let timestamp = clock::now_millis();

        let master_salt = generate_salt(self.config.salt_length);
        let master = derive_master_key(password, &master_salt, &params)?;

        let mut encrypted_tiers = BTreeMap::new();
        let mut access_keys = BTreeMap::new();
        let mut tier_algorithms = BTreeMap::new();

        for tier in tier_config.selected() {
            let level = self.config.level(tier)?;
            let payload = match tier_config.custom_tiers.get(&tier) {
                Some(custom) => custom.clone(),
                None => serde_json::to_value(TierPartitioner::project(dataset, tier, timestamp))?,
            };
            let plaintext = zeroize::Zeroizing::new(serde_json::to_vec(&payload)?);

            let tier_salt = generate_salt(self.config.salt_length);
            let tier_key = derive_tier_key(&master, &tier_salt, &params, level.key_size)?;

            let blob = seal(level.algorithm, tier_key.as_bytes(), BlobRole::Tier(tier), &plaintext)?;
            let wrapped_key = wrap_key(&master, tier, &tier_key)?;

            tracing::debug!(tier = tier.level(), algorithm = %level.algorithm, "sealed tier");
            encrypted_tiers.insert(tier, blob);
            access_keys.insert(
                tier,
                AccessKeyEntry {
                    salt: tier_salt,
                    wrapped_key,
                },
            );
            tier_algorithms.insert(tier, level.algorithm);
        }

        let metadata = PackageMetadata {
            version: PACKAGE_VERSION.into(),
            timestamp,
            access_levels: encrypted_tiers.keys().copied().collect(),
            algorithm: self.config.algorithm,
            tier_algorithms,
            key_derivation: "pbkdf2-sha512".into(),
            iterations: params.iterations,
        };
        let metadata_key = derive_metadata_key(&master, &master_salt, &params)?;
        let metadata = seal(
            self.config.algorithm,
            metadata_key.as_bytes(),
            BlobRole::Metadata,
            &serde_json::to_vec(&metadata)?,
        )?;

        Ok(EncryptedPackage {
            version: PACKAGE_VERSION.into(),
            master_salt,
            key_derivation_iterations: params.iterations,
            encrypted_tiers,
            access_keys,
            metadata,
            checksum: canonical::checksum(dataset)?,
        })
    }

    /// Open one tier with the package password.
    pub fn decrypt(
        &self,
        package: &EncryptedPackage,
        password: &SecretString,
        access_level: u8,
    ) -> GncResult<DecryptedTier> {
        let tier = AccessTier::try_from(access_level)?;
        self.open_tier(package, password, tier)
            .map_err(wrap_unexpected_decrypt)
    }

    fn open_tier(
        &self,
        package: &EncryptedPackage,
        password: &SecretString,
        tier: AccessTier,
    ) -> GncResult<DecryptedTier> {
        let params = package_params(package);
        let master = derive_master_key(password, &package.master_salt, &params)?;
        let metadata = open_metadata(package, &master, &params)?;

        if !metadata.access_levels.contains(&tier) {
            return Err(GncError::AccessLevelUnavailable(tier.level()));
        }
        let (blob, entry) = tier_slot(package, tier)?;

        let tier_key = derive_tier_key(&master, &entry.salt, &params, blob.algorithm.key_size())?;
        let data = open_tier_blob(blob, &tier_key, tier)?;

        tracing::debug!(tier = tier.level(), "decrypted tier");
        Ok(DecryptedTier {
            data,
            access_level: tier,
            metadata: Some(metadata),
            decrypted_at: clock::now_millis(),
        })
    }

    /// Recover a tier key from its wrapped form in `accessKeys`.
    pub fn unwrap_access_key(
        &self,
        package: &EncryptedPackage,
        password: &SecretString,
        access_level: u8,
    ) -> GncResult<DerivedKey> {
        let tier = AccessTier::try_from(access_level)?;
        let entry = package
            .access_keys
            .get(&tier)
            .ok_or(GncError::AccessLevelUnavailable(tier.level()))?;
        let master = derive_master_key(password, &package.master_salt, &package_params(package))?;
        unwrap_key(&master, tier, &entry.wrapped_key)
    }

    /// Decrypt and parse the metadata record (password check only).
    pub fn read_metadata(
        &self,
        package: &EncryptedPackage,
        password: &SecretString,
    ) -> GncResult<PackageMetadata> {
        let params = package_params(package);
        let master = derive_master_key(password, &package.master_salt, &params)?;
        open_metadata(package, &master, &params).map_err(wrap_unexpected_decrypt)
    }
}

/// Whole-dataset integrity check against the package checksum.
pub fn verify_integrity(dataset: &GeneticDataset, package: &EncryptedPackage) -> bool {
    canonical::verify_integrity(dataset, &package.checksum)
}

/// KDF parameters recorded in the package, independent of current config.
pub(crate) fn package_params(package: &EncryptedPackage) -> KdfParams {
    KdfParams {
        iterations: package.key_derivation_iterations,
    }
}

pub(crate) fn tier_slot(
    package: &EncryptedPackage,
    tier: AccessTier,
) -> GncResult<(&EncryptedBlob, &AccessKeyEntry)> {
    match (package.encrypted_tiers.get(&tier), package.access_keys.get(&tier)) {
        (Some(blob), Some(entry)) => Ok((blob, entry)),
        _ => Err(GncError::AccessLevelUnavailable(tier.level())),
    }
}

pub(crate) fn open_tier_blob(
    blob: &EncryptedBlob,
    tier_key: &DerivedKey,
    tier: AccessTier,
) -> GncResult<Value> {
    let plaintext = open(blob, tier_key.as_bytes(), BlobRole::Tier(tier))?;
    Ok(serde_json::from_slice(&plaintext)?)
}

fn open_metadata(
    package: &EncryptedPackage,
    master: &MasterKey,
    params: &KdfParams,
) -> GncResult<PackageMetadata> {
    let metadata_key = derive_metadata_key(master, &package.master_salt, params)?;
    let plaintext = open(&package.metadata, metadata_key.as_bytes(), BlobRole::Metadata)?;
    Ok(serde_json::from_slice(&plaintext)?)
}

/// Expected decrypt outcomes pass through; anything else is wrapped.
pub(crate) fn wrap_unexpected_decrypt(err: GncError) -> GncError {
    match err {
        GncError::Authentication
        | GncError::InvalidAccessLevel(_)
        | GncError::AccessLevelUnavailable(_)
        | GncError::InvalidParameter(_)
        | GncError::TokenExpired { .. } => err,
        other => GncError::decryption(other),
    }
}
