//! gnc-crypto: Multi-tier encryption for GenomicChain genetic datasets
//!
//! Pipeline: dataset → tier projections → per-tier AES-GCM → EncryptedPackage
//!
//! Key hierarchy:
//! ```text
//! Master Key (256-bit, PBKDF2-SHA512 from password + masterSalt)
//!   ├── Metadata Key   PBKDF2(hex(master), masterSalt)           AES-256-GCM, AAD="gnc:metadata"
//!   ├── Tier n Key     PBKDF2(hex(master), tierSalt[n], 16/24/32) AES-n-GCM,  AAD="gnc:tier:<n>"
//!   │   └── wrapped under the master key                         AES-256-GCM, AAD="gnc:access-key:<n>"
//!   └── Access Token Key
//!         self:      HKDF-SHA256(master, masterSalt, "gnc-access-token:<n>")
//!         recipient: PBKDF2(recipientKey, masterSalt)             AAD="gnc:access-token:<n>"
//! ```
//!
//! Tier keys are siblings, not a chain: holding the tier 1 key and its salt
//! gives no path to the tier 2 or tier 3 key without the master password.

pub mod aead;
pub mod kdf;
pub mod keys;
pub mod package;
pub mod password;
pub mod tiers;
pub mod token;

pub use aead::{open, seal, BlobRole, EncryptedBlob};
pub use kdf::{derive_key, derive_master_key, DerivedKey, KdfParams, MasterKey};
pub use package::{
    verify_integrity, AccessKeyEntry, DecryptedTier, EncryptedPackage, EncryptionManager,
    PackageMetadata, TierConfig,
};
pub use password::{analyze_strength, generate_secure_password, PasswordPolicy, PasswordStrength};
pub use tiers::{TierPartitioner, TierView};
pub use token::{AccessGrant, AccessToken, TokenSecret};

/// Size of the master key in bytes (256-bit)
pub const KEY_SIZE: usize = 32;

/// Size of an AES-GCM nonce (96-bit)
pub const NONCE_SIZE: usize = 12;

/// Size of a GCM authentication tag
pub const TAG_SIZE: usize = 16;

/// Package format version stored in clear and inside the metadata record
pub const PACKAGE_VERSION: &str = "1.0.0";
