use gnc_core::config::EncryptionConfig;
use gnc_core::types::{GeneticDataset, Variant, VariantType};
use gnc_core::{AccessTier, AeadAlgorithm};
use gnc_crypto::{derive_key, open, seal, BlobRole, EncryptionManager, TierConfig};
use secrecy::SecretString;

fn make_dataset(variants: usize) -> GeneticDataset {
    GeneticDataset {
        variants: (0..variants)
            .map(|i| Variant {
                chromosome: Some(((i % 22) + 1).to_string()),
                position: Some(100_000 + i as u64),
                reference: Some("A".into()),
                alternate: Some("G".into()),
                gene: Some(format!("GENE{}", i % 50)),
                variant_type: Some(VariantType::Snp),
                ..Default::default()
            })
            .collect(),
        ..Default::default()
    }
}

#[divan::bench(args = [1000, 10_000, 100_000])]
fn bench_pbkdf2(bencher: divan::Bencher, iterations: u32) {
    bencher.bench(|| {
        derive_key(
            divan::black_box(b"SecurePassword123!"),
            divan::black_box(&[7u8; 32]),
            iterations,
            32,
        )
        .unwrap()
    });
}

#[divan::bench(args = [1024, 65536, 1048576])]
fn bench_seal_tier(bencher: divan::Bencher, size: usize) {
    let key = [0x42u8; 32];
    let data = vec![0xA5u8; size];
    bencher
        .counter(divan::counter::BytesCount::new(size))
        .bench(|| {
            seal(
                AeadAlgorithm::Aes256Gcm,
                divan::black_box(&key),
                BlobRole::Tier(AccessTier::Full),
                divan::black_box(&data),
            )
            .unwrap()
        });
}

#[divan::bench(args = [1024, 65536, 1048576])]
fn bench_open_tier(bencher: divan::Bencher, size: usize) {
    let key = [0x42u8; 32];
    let data = vec![0xA5u8; size];
    let blob = seal(AeadAlgorithm::Aes256Gcm, &key, BlobRole::Tier(AccessTier::Full), &data).unwrap();
    bencher
        .counter(divan::counter::BytesCount::new(size))
        .bench(|| open(divan::black_box(&blob), &key, BlobRole::Tier(AccessTier::Full)).unwrap());
}

#[divan::bench(args = [10, 1000])]
fn bench_encrypt_package(bencher: divan::Bencher, variants: usize) {
    let manager = EncryptionManager::new(EncryptionConfig::for_tests()).unwrap();
    let password = SecretString::from("SecurePassword123!");
    let dataset = make_dataset(variants);
    bencher.bench(|| {
        manager
            .encrypt(divan::black_box(&dataset), &password, &TierConfig::all())
            .unwrap()
    });
}

fn main() {
    divan::main();
}
