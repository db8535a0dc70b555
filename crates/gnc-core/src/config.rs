use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use crate::access::{tier_map, AccessTier, AeadAlgorithm};
use crate::error::{GncError, GncResult};

/// Fixed size of the on-ledger proof parameter block.
pub const PARAMETER_BLOCK_SIZE: usize = 256;

/// IV length supported by the AES-GCM suites.
pub const GCM_IV_LENGTH: usize = 12;

/// Tag length produced by the AES-GCM suites.
pub const GCM_TAG_LENGTH: usize = 16;

/// Production floor for PBKDF2 iterations.
pub const PRODUCTION_MIN_ITERATIONS: u32 = 100_000;

/// Top-level configuration (loaded from gnc.toml)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GncConfig {
    pub environment: Environment,
    pub logging: LoggingConfig,
    pub encryption: EncryptionConfig,
    pub proofs: ProofConfig,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Testing,
    Staging,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (default: info)
    pub level: String,
    /// Log format: "json" or "text"
    pub format: String,
}

/// Per-tier cipher selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessLevelConfig {
    pub key_size: usize,
    pub algorithm: AeadAlgorithm,
}

/// Multi-tier encryption tunables
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EncryptionConfig {
    /// AEAD used for metadata, key wrapping and access tokens (must be 256-bit)
    pub algorithm: AeadAlgorithm,
    /// PBKDF2-SHA512 iterations (default: 100000)
    pub key_derivation_iterations: u32,
    /// Master and tier salt length in bytes (default: 32)
    pub salt_length: usize,
    /// AEAD nonce length in bytes (AES-GCM: 12)
    pub iv_length: usize,
    /// AEAD tag length in bytes (AES-GCM: 16)
    pub tag_length: usize,
    #[serde(with = "tier_map")]
    pub access_levels: BTreeMap<AccessTier, AccessLevelConfig>,
    pub password_policy: PasswordPolicyConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PasswordPolicyConfig {
    pub min_length: usize,
    pub require_uppercase: bool,
    pub require_lowercase: bool,
    pub require_numbers: bool,
    pub require_special_chars: bool,
    pub forbidden_patterns: Vec<String>,
}

/// Proof generation and verification tunables
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProofConfig {
    /// Version string embedded in proof metadata
    pub version: String,
    /// Parameter block size; fixed by the ledger contract
    pub max_parameter_size: usize,
    /// Items per batch (default: 10)
    pub batch_size: usize,
    /// Collaborator timeout for proof submission in ms
    pub timeout_ms: u64,
    /// Collaborator retry count
    pub retries: u32,
    /// Maximum proof age accepted in strict mode (default: 3600)
    pub strict_max_age_secs: u64,
    /// Minimum Shannon entropy (bits/byte) of a commitment hash in strict mode
    pub min_entropy: f64,
    /// Privacy level recorded in parameter blocks (default: high)
    pub default_privacy_level: String,
    /// Variant proof confidence threshold recorded in parameters (default: 0.8)
    pub confidence_threshold: f64,
    /// Aggregate proof confidence level recorded in parameters (default: 0.95)
    pub confidence_level: f64,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: "text".into(),
        }
    }
}

impl Default for EncryptionConfig {
    fn default() -> Self {
        let mut access_levels = BTreeMap::new();
        access_levels.insert(
            AccessTier::Basic,
            AccessLevelConfig {
                key_size: 16,
                algorithm: AeadAlgorithm::Aes128Gcm,
            },
        );
        access_levels.insert(
            AccessTier::Detailed,
            AccessLevelConfig {
                key_size: 24,
                algorithm: AeadAlgorithm::Aes192Gcm,
            },
        );
        access_levels.insert(
            AccessTier::Full,
            AccessLevelConfig {
                key_size: 32,
                algorithm: AeadAlgorithm::Aes256Gcm,
            },
        );

        Self {
            algorithm: AeadAlgorithm::Aes256Gcm,
            key_derivation_iterations: PRODUCTION_MIN_ITERATIONS,
            salt_length: 32,
            iv_length: GCM_IV_LENGTH,
            tag_length: GCM_TAG_LENGTH,
            access_levels,
            password_policy: PasswordPolicyConfig::default(),
        }
    }
}

impl EncryptionConfig {
    /// Defaults with the iteration count lowered for test suites.
    pub fn for_tests() -> Self {
        Self {
            key_derivation_iterations: 1000,
            ..Self::default()
        }
    }

    pub fn level(&self, tier: AccessTier) -> GncResult<AccessLevelConfig> {
        self.access_levels
            .get(&tier)
            .copied()
            .ok_or(GncError::InvalidAccessLevel(tier.level()))
    }

    /// Hard errors only; environment-dependent warnings live in [`GncConfig::validate`].
    pub fn validate(&self) -> GncResult<()> {
        if self.key_derivation_iterations == 0 {
            return Err(GncError::Config(
                "encryption.key_derivation_iterations must be positive".into(),
            ));
        }
        if self.algorithm.key_size() != 32 {
            return Err(GncError::Config(format!(
                "encryption.algorithm must be a 256-bit suite, got {}",
                self.algorithm
            )));
        }
        if self.salt_length < 16 {
            return Err(GncError::Config(format!(
                "encryption.salt_length must be at least 16 bytes, got {}",
                self.salt_length
            )));
        }
        if self.iv_length != GCM_IV_LENGTH {
            return Err(GncError::Config(format!(
                "encryption.iv_length must be {GCM_IV_LENGTH} for AES-GCM, got {}",
                self.iv_length
            )));
        }
        if self.tag_length != GCM_TAG_LENGTH {
            return Err(GncError::Config(format!(
                "encryption.tag_length must be {GCM_TAG_LENGTH} for AES-GCM, got {}",
                self.tag_length
            )));
        }
        for tier in AccessTier::ALL {
            let level = self
                .access_levels
                .get(&tier)
                .ok_or_else(|| GncError::Config(format!("encryption.access_levels.{tier} missing")))?;
            if level.algorithm.key_size() != level.key_size {
                return Err(GncError::Config(format!(
                    "encryption.access_levels.{tier}: key_size {} does not match {}",
                    level.key_size, level.algorithm
                )));
            }
        }
        Ok(())
    }
}

impl Default for PasswordPolicyConfig {
    fn default() -> Self {
        Self {
            min_length: 12,
            require_uppercase: true,
            require_lowercase: true,
            require_numbers: true,
            require_special_chars: true,
            forbidden_patterns: vec!["123456".into(), "password".into(), "qwerty".into()],
        }
    }
}

impl Default for ProofConfig {
    fn default() -> Self {
        Self {
            version: "1.0.0".into(),
            max_parameter_size: PARAMETER_BLOCK_SIZE,
            batch_size: 10,
            timeout_ms: 30_000,
            retries: 3,
            strict_max_age_secs: 3600,
            min_entropy: 4.0,
            default_privacy_level: "high".into(),
            confidence_threshold: 0.8,
            confidence_level: 0.95,
        }
    }
}

impl GncConfig {
    /// Defaults with the per-environment overrides applied.
    pub fn for_environment(environment: Environment) -> Self {
        let mut config = GncConfig {
            environment,
            ..Default::default()
        };
        match environment {
            Environment::Development => {
                config.proofs.timeout_ms = 60_000;
                config.encryption.password_policy.min_length = 8;
                config.logging.level = "debug".into();
            }
            Environment::Testing => {
                config.proofs.timeout_ms = 10_000;
                config.encryption.key_derivation_iterations = 1000;
                config.logging.level = "warn".into();
            }
            Environment::Staging => {}
            Environment::Production => {
                config.logging.format = "json".into();
            }
        }
        config
    }

    /// Load from a TOML file, or defaults when the file does not exist.
    ///
    /// The file's `environment` selects the [`for_environment`](Self::for_environment)
    /// overrides; values set in the file win over them.
    pub fn load(path: &Path) -> GncResult<Self> {
        if !path.exists() {
            tracing::warn!("config file not found: {}  (using defaults)", path.display());
            return Ok(GncConfig::default());
        }
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
            .map_err(|e| GncError::Config(format!("parsing config {}: {e}", path.display())))
    }

    /// Parse a TOML document, layering it over its environment's overrides.
    pub fn from_toml(content: &str) -> Result<Self, toml::de::Error> {
        let file: toml::Table = toml::from_str(content)?;
        let environment = match file.get("environment") {
            Some(value) => value.clone().try_into()?,
            None => Environment::default(),
        };

        let mut merged = match toml::Value::try_from(Self::for_environment(environment)) {
            Ok(toml::Value::Table(table)) => table,
            _ => toml::Table::new(),
        };
        merge_tables(&mut merged, file);
        toml::Value::Table(merged).try_into()
    }

    /// Reject unusable tunables; return advisory warnings for the rest.
    pub fn validate(&self) -> GncResult<Vec<String>> {
        self.encryption.validate()?;

        if self.proofs.max_parameter_size != PARAMETER_BLOCK_SIZE {
            return Err(GncError::Config(format!(
                "proofs.max_parameter_size is fixed at {PARAMETER_BLOCK_SIZE} bytes"
            )));
        }
        if !(0.0..=8.0).contains(&self.proofs.min_entropy) {
            return Err(GncError::Config(format!(
                "proofs.min_entropy must be within 0..=8 bits, got {}",
                self.proofs.min_entropy
            )));
        }

        let mut warnings = Vec::new();
        if self.environment == Environment::Production
            && self.encryption.key_derivation_iterations < PRODUCTION_MIN_ITERATIONS
        {
            warnings.push(format!(
                "key derivation iterations ({}) below the production floor of {PRODUCTION_MIN_ITERATIONS}",
                self.encryption.key_derivation_iterations
            ));
        }
        if self.proofs.min_entropy > 5.0 {
            warnings.push(
                "proofs.min_entropy above 5 bits rejects every 32-byte commitment hash".into(),
            );
        }
        if self.encryption.password_policy.min_length < 8 {
            warnings.push("password policy min_length below 8".into());
        }

        for warning in &warnings {
            tracing::warn!("{warning}");
        }
        Ok(warnings)
    }
}

/// Recursively overlay `overlay` onto `base`; non-table values replace.
fn merge_tables(base: &mut toml::Table, overlay: toml::Table) {
    for (key, value) in overlay {
        match (base.get_mut(&key), value) {
            (Some(toml::Value::Table(existing)), toml::Value::Table(incoming)) => {
                merge_tables(existing, incoming)
            }
            (_, value) => {
                base.insert(key, value);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_config() {
        let toml_str = r#"
environment = "production"

[logging]
level = "debug"
format = "json"

[encryption]
algorithm = "aes-256-gcm"
key_derivation_iterations = 210000
salt_length = 32

[encryption.access_levels.1]
key_size = 16
algorithm = "aes-128-gcm"

[encryption.access_levels.2]
key_size = 32
algorithm = "aes-256-gcm"

[encryption.access_levels.3]
key_size = 32
algorithm = "aes-256-gcm"

[encryption.password_policy]
min_length = 16

[proofs]
strict_max_age_secs = 600
min_entropy = 4.5
"#;
        let config: GncConfig = toml::from_str(toml_str).unwrap();

        assert_eq!(config.environment, Environment::Production);
        assert_eq!(config.logging.format, "json");
        assert_eq!(config.encryption.key_derivation_iterations, 210_000);
        assert_eq!(
            config.encryption.level(AccessTier::Detailed).unwrap().algorithm,
            AeadAlgorithm::Aes256Gcm
        );
        assert_eq!(config.encryption.password_policy.min_length, 16);
        assert!(config.encryption.password_policy.require_numbers);
        assert_eq!(config.proofs.strict_max_age_secs, 600);
        assert_eq!(config.proofs.batch_size, 10);
        assert!(config.validate().unwrap().is_empty());
    }

    #[test]
    fn test_parse_defaults() {
        let config: GncConfig = toml::from_str("").unwrap();

        assert_eq!(config.environment, Environment::Development);
        assert_eq!(config.encryption.key_derivation_iterations, 100_000);
        assert_eq!(config.encryption.salt_length, 32);
        assert_eq!(config.encryption.iv_length, 12);
        assert_eq!(config.encryption.access_levels.len(), 3);
        assert_eq!(config.encryption.level(AccessTier::Basic).unwrap().key_size, 16);
        assert_eq!(config.encryption.level(AccessTier::Detailed).unwrap().key_size, 24);
        assert_eq!(config.encryption.level(AccessTier::Full).unwrap().key_size, 32);
        assert_eq!(config.proofs.max_parameter_size, 256);
        assert_eq!(config.proofs.min_entropy, 4.0);
    }

    #[test]
    fn test_serialize_roundtrip() {
        let config = GncConfig::default();
        let toml_str = toml::to_string(&config).unwrap();
        let parsed: GncConfig = toml::from_str(&toml_str).unwrap();

        assert_eq!(
            config.encryption.access_levels,
            parsed.encryption.access_levels
        );
        assert_eq!(config.proofs.version, parsed.proofs.version);
    }

    #[test]
    fn test_environment_overrides() {
        let testing = GncConfig::for_environment(Environment::Testing);
        assert_eq!(testing.encryption.key_derivation_iterations, 1000);
        assert_eq!(testing.logging.level, "warn");

        let dev = GncConfig::for_environment(Environment::Development);
        assert_eq!(dev.encryption.password_policy.min_length, 8);
    }

    #[test]
    fn test_validate_rejects_mismatched_key_size() {
        let mut config = GncConfig::default();
        config.encryption.access_levels.insert(
            AccessTier::Basic,
            AccessLevelConfig {
                key_size: 24,
                algorithm: AeadAlgorithm::Aes128Gcm,
            },
        );
        assert!(matches!(config.validate(), Err(GncError::Config(_))));
    }

    #[test]
    fn test_validate_rejects_non_gcm_iv() {
        let mut config = GncConfig::default();
        config.encryption.iv_length = 16;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_production_warns_on_low_iterations() {
        let mut config = GncConfig::for_environment(Environment::Production);
        config.encryption.key_derivation_iterations = 5000;
        let warnings = config.validate().unwrap();
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("production floor"));
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = GncConfig::load(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.encryption.key_derivation_iterations, 100_000);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gnc.toml");
        std::fs::write(&path, "environment = \"testing\"\n[encryption]\nkey_derivation_iterations = 2000\n")
            .unwrap();

        let config = GncConfig::load(&path).unwrap();
        assert_eq!(config.environment, Environment::Testing);
        assert_eq!(config.encryption.key_derivation_iterations, 2000);
    }

    #[test]
    fn test_load_applies_environment_under_file_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gnc.toml");
        std::fs::write(&path, "environment = \"testing\"\n[logging]\nformat = \"json\"\n").unwrap();

        let config = GncConfig::load(&path).unwrap();
        assert_eq!(config.encryption.key_derivation_iterations, 1000);
        assert_eq!(config.proofs.timeout_ms, 10_000);
        assert_eq!(config.logging.level, "warn");
        assert_eq!(config.logging.format, "json");
        assert_eq!(config.encryption.access_levels.len(), 3);

        // An explicit file value still wins over the environment override.
        let config = GncConfig::from_toml(
            "environment = \"development\"\n[encryption.password_policy]\nmin_length = 14\n",
        )
        .unwrap();
        assert_eq!(config.encryption.password_policy.min_length, 14);
        assert_eq!(config.logging.level, "debug");
        assert!(config.encryption.password_policy.require_numbers);
    }

    #[test]
    fn test_load_rejects_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gnc.toml");
        std::fs::write(&path, "[encryption\n").unwrap();
        assert!(matches!(GncConfig::load(&path), Err(GncError::Config(_))));
    }
}
