//! End-to-end package tests: encrypt → serialize → deserialize → decrypt.

use gnc_core::config::EncryptionConfig;
use gnc_core::types::GeneticDataset;
use gnc_core::{AccessTier, GncError};
use gnc_crypto::kdf::{derive_tier_key, KdfParams, MasterKey};
use gnc_crypto::tiers::TierView;
use gnc_crypto::{EncryptedPackage, EncryptionManager, TierConfig, TierPartitioner};
use secrecy::SecretString;
use serde_json::{json, Value};

fn manager() -> EncryptionManager {
    EncryptionManager::new(EncryptionConfig::for_tests()).unwrap()
}

fn password() -> SecretString {
    SecretString::from("SecurePassword123!")
}

fn scenario_json() -> Value {
    json!({
        "variants": [{
            "chromosome": "1", "position": 123456, "reference": "A",
            "alternate": "G", "gene": "BRCA1", "type": "SNP"
        }],
        "genes": [{"symbol": "BRCA1", "name": "BRCA1 DNA Repair Associated", "chromosome": "17"}]
    })
}

fn scenario() -> GeneticDataset {
    serde_json::from_value(scenario_json()).unwrap()
}

/// Storage collaborator boundary: packages travel as JSON bytes.
fn through_storage(package: &EncryptedPackage) -> EncryptedPackage {
    let bytes = serde_json::to_vec(package).unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[test]
fn basic_tier_hides_record_fields() {
    let m = manager();
    let package = through_storage(&m.encrypt(&scenario(), &password(), &TierConfig::all()).unwrap());

    let tier = m.decrypt(&package, &password(), 1).unwrap();
    assert_eq!(tier.data["type"], "basic");
    assert_eq!(tier.data["totalVariants"], 1);
    assert_eq!(tier.data["totalGenes"], 1);

    let object = tier.data.as_object().unwrap();
    assert!(!object.contains_key("chromosome"));
    assert!(!object.contains_key("position"));
    assert!(!object.contains_key("variants"));
    assert!(!tier.data.to_string().contains("123456"));
}

#[test]
fn full_tier_returns_original_dataset() {
    let m = manager();
    let package = through_storage(&m.encrypt(&scenario(), &password(), &TierConfig::all()).unwrap());

    let tier = m.decrypt(&package, &password(), 3).unwrap();
    assert_eq!(tier.data["accessLevel"], 3);

    let TierView::Full(full) = tier.view().unwrap() else {
        panic!("tier 3 must decode as the full view");
    };
    assert_eq!(full.dataset, scenario());
    assert_eq!(serde_json::to_value(&full.dataset).unwrap(), scenario_json());
}

#[test]
fn full_tier_keeps_integer_numbers_and_unknown_fields() {
    let input = json!({
        "variants": [{
            "gene": "BRCA1", "type": "SNP", "quality": 30, "position": 7,
            "callerScore": 12, "filters": ["PASS"]
        }],
        "cohort": {"size": 4}
    });
    let dataset: GeneticDataset = serde_json::from_value(input.clone()).unwrap();

    let m = manager();
    let package = through_storage(&m.encrypt(&dataset, &password(), &TierConfig::all()).unwrap());
    let TierView::Full(full) = m.decrypt(&package, &password(), 3).unwrap().view().unwrap() else {
        panic!("tier 3 must decode as the full view");
    };
    assert_eq!(serde_json::to_value(&full.dataset).unwrap(), input);
}

#[test]
fn partition_builds_all_three_views() {
    let views = TierPartitioner::partition(&scenario());
    assert_eq!(views.keys().copied().collect::<Vec<_>>(), AccessTier::ALL.to_vec());
    for (tier, view) in &views {
        assert_eq!(view.tier(), *tier);
    }
    let TierView::Full(full) = &views[&AccessTier::Full] else {
        panic!("tier 3 must be the full view");
    };
    assert_eq!(full.dataset, scenario());
}

#[test]
fn metadata_lists_sealed_tiers() {
    let m = manager();
    let tiers = TierConfig {
        tiers: Some([AccessTier::Basic, AccessTier::Full].into_iter().collect()),
        ..TierConfig::all()
    };
    let package = through_storage(&m.encrypt(&scenario(), &password(), &tiers).unwrap());

    let metadata = m.read_metadata(&package, &password()).unwrap();
    assert_eq!(metadata.access_levels, vec![AccessTier::Basic, AccessTier::Full]);
    assert_eq!(metadata.iterations, EncryptionConfig::for_tests().key_derivation_iterations);
    assert_eq!(metadata.key_derivation, "pbkdf2-sha512");

    assert!(m.read_metadata(&package, &SecretString::from("WrongPassword456!")).is_err());
}

#[test]
fn every_tier_matches_its_projection() {
    let m = manager();
    let dataset = scenario();
    let package = m.encrypt(&dataset, &password(), &TierConfig::all()).unwrap();

    for tier in AccessTier::ALL {
        let decrypted = m.decrypt(&package, &password(), tier.level()).unwrap();
        let view = decrypted.view().unwrap();
        let timestamp = match &view {
            TierView::Basic(b) => b.timestamp,
            TierView::Detailed(d) => d.summary.timestamp,
            TierView::Full(_) => 0,
        };
        assert_eq!(view, TierPartitioner::project(&dataset, tier, timestamp));
    }
}

#[test]
fn wrong_password_fails_closed_on_every_tier() {
    let m = manager();
    let package = m.encrypt(&scenario(), &password(), &TierConfig::all()).unwrap();
    let wrong = SecretString::from("SecurePassword123?");

    for level in 1..=3u8 {
        let result = m.decrypt(&package, &wrong, level);
        assert!(matches!(result, Err(GncError::Authentication)), "level {level}");
    }
    assert!(matches!(
        m.unwrap_access_key(&package, &wrong, 2),
        Err(GncError::Authentication)
    ));
}

#[test]
fn tampered_tier_fails_closed() {
    let m = manager();
    let mut package = m.encrypt(&scenario(), &password(), &TierConfig::all()).unwrap();
    if let Some(blob) = package.encrypted_tiers.get_mut(&AccessTier::Full) {
        let last = blob.ciphertext.len() - 1;
        blob.ciphertext[last] ^= 0x01;
    }

    assert!(matches!(
        m.decrypt(&package, &password(), 3),
        Err(GncError::Authentication)
    ));
    // Other tiers are unaffected.
    assert!(m.decrypt(&package, &password(), 2).is_ok());
}

#[test]
fn tier_one_key_does_not_open_higher_tiers() {
    let m = manager();
    let package = m.encrypt(&scenario(), &password(), &TierConfig::all()).unwrap();
    let tier1_key = m.unwrap_access_key(&package, &password(), 1).unwrap();
    let params = KdfParams { iterations: package.key_derivation_iterations };

    // Treat the tier 1 key as if it were a master key: still cannot reach tier 2.
    let mut fake_master = [0u8; 32];
    fake_master[..tier1_key.len()].copy_from_slice(tier1_key.as_bytes());
    let fake_master = MasterKey::from_bytes(fake_master);

    let entry = &package.access_keys[&AccessTier::Detailed];
    let guessed = derive_tier_key(&fake_master, &entry.salt, &params, 24).unwrap();
    let real = m.unwrap_access_key(&package, &password(), 2).unwrap();

    assert_ne!(guessed.as_bytes(), real.as_bytes());
    assert_ne!(&real.as_bytes()[..16], tier1_key.as_bytes());
}

#[test]
fn packages_never_repeat_salts_or_ivs() {
    let m = manager();
    let a = m.encrypt(&scenario(), &password(), &TierConfig::all()).unwrap();
    let b = m.encrypt(&scenario(), &password(), &TierConfig::all()).unwrap();

    assert_ne!(a.master_salt, b.master_salt);
    assert_ne!(a.metadata.iv, b.metadata.iv);
    assert_eq!(a.checksum, b.checksum);
}
