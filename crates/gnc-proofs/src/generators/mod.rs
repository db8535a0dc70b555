//! Proof generators.
//!
//! Every generator runs the same pipeline: validate the claim, reduce the
//! dataset to a privacy snapshot, search for a witness (refusing with
//! `ClaimNotSatisfied` when there is none), commit to the snapshot, bind
//! the claim hash and pack the 256-byte parameter block.

mod absence;
mod aggregate;
mod presence;
mod variant;

pub use absence::GeneAbsenceGenerator;
pub use aggregate::AggregateGenerator;
pub use presence::GenePresenceGenerator;
pub use variant::GeneVariantGenerator;

use gnc_core::canonical::canonical_hash;
use gnc_core::config::ProofConfig;
use gnc_core::types::GeneticDataset;
use gnc_core::{GncError, GncResult};
use rayon::prelude::*;
use serde::Serialize;
use serde_json::Value;
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use crate::claim::ProofClaim;
use crate::commitment::{commit, NONCE_SIZE};
use crate::kind::ProofKind;
use crate::params::{ParameterBlock, COMMITMENT_PREFIX_LEN};
use crate::record::{ProofMetadata, ProofRecord};
use crate::verifier::{ProofVerifier, VerifyOptions};

const PRIVACY_LEVELS: [&str; 3] = ["high", "medium", "low"];
const DEFAULT_PRECISION: &str = "standard";

/// Per-call overrides. Unset fields fall back to [`ProofConfig`]; a fixed
/// `nonce` and `timestamp_ms` make the whole record deterministic.
#[derive(Debug, Clone, Default)]
pub struct GenerateOptions {
    pub nonce: Option<[u8; NONCE_SIZE]>,
    /// Unix ms
    pub timestamp_ms: Option<u64>,
    pub privacy_level: Option<String>,
    pub include_confidence: Option<bool>,
    pub include_quality: Option<bool>,
    pub confidence_threshold: Option<f64>,
    pub confidence_level: Option<f64>,
    pub precision: Option<String>,
}

/// Options with every default applied.
#[derive(Debug, Clone)]
pub(crate) struct Resolved {
    pub nonce: Option<[u8; NONCE_SIZE]>,
    pub timestamp_ms: u64,
    pub privacy_level: String,
    pub include_confidence: bool,
    pub include_quality: bool,
    pub confidence_threshold: f64,
    pub confidence_level: f64,
    pub precision: String,
}

impl GenerateOptions {
    pub(crate) fn resolve(&self, config: &ProofConfig) -> GncResult<Resolved> {
        let privacy_level = self
            .privacy_level
            .clone()
            .unwrap_or_else(|| config.default_privacy_level.clone());
        if !PRIVACY_LEVELS.contains(&privacy_level.as_str()) {
            return Err(GncError::InvalidParameter(format!(
                "invalid privacy level: {privacy_level}"
            )));
        }
        Ok(Resolved {
            nonce: self.nonce,
            timestamp_ms: self.timestamp_ms.unwrap_or_else(gnc_core::clock::now_millis),
            privacy_level,
            include_confidence: self.include_confidence.unwrap_or(false),
            include_quality: self.include_quality.unwrap_or(false),
            confidence_threshold: self.confidence_threshold.unwrap_or(config.confidence_threshold),
            confidence_level: self.confidence_level.unwrap_or(config.confidence_level),
            precision: self
                .precision
                .clone()
                .unwrap_or_else(|| DEFAULT_PRECISION.to_string()),
        })
    }
}

/// What a kind-specific generator hands to [`assemble`].
pub(crate) struct Evidence<S, W> {
    pub snapshot: S,
    pub witness: W,
    pub body: Value,
    pub confidence: Option<f64>,
}

/// Shared commit/bind/pack tail of every generator.
pub(crate) fn assemble<S: Serialize, W: Serialize>(
    config: &ProofConfig,
    claim: &ProofClaim,
    evidence: Evidence<S, W>,
    opts: &Resolved,
) -> GncResult<ProofRecord> {
    let kind = claim.kind();
    let claim_hash = claim.claim_hash()?;
    let commitment = commit(&evidence.snapshot, opts.nonce)?;
    let witness_hash = canonical_hash(&evidence.witness)?;

    let mut hasher = Sha256::new();
    hasher.update(commitment.hash);
    hasher.update(claim_hash);
    hasher.update([kind.tag()]);
    hasher.update(witness_hash);
    let proof_hash: [u8; 32] = hasher.finalize().into();

    let mut commitment_prefix = [0u8; COMMITMENT_PREFIX_LEN];
    commitment_prefix.copy_from_slice(&commitment.hash[..COMMITMENT_PREFIX_LEN]);

    let parameter_block = ParameterBlock {
        kind_tag: kind.tag(),
        algorithm: kind.algorithm().to_string(),
        claim_hash,
        commitment_prefix,
        timestamp: opts.timestamp_ms / 1000,
        body: evidence.body,
    }
    .encode()?;

    debug!(kind = %kind, claim = %claim.summary(), "proof generated");

    Ok(ProofRecord {
        proof_kind: kind.tag(),
        commitment_hash: proof_hash.to_vec(),
        parameter_block,
        generated_at: opts.timestamp_ms,
        metadata: ProofMetadata {
            version: config.version.clone(),
            confidence: evidence.confidence.filter(|_| opts.include_confidence),
            claim_summary: claim.summary(),
        },
    })
}

/// A generator for one proof kind.
pub trait ClaimGenerator {
    type Claim: Clone;

    const KIND: ProofKind;

    fn config(&self) -> &ProofConfig;

    /// Wrap a kind-specific claim as the public claim a verifier sees.
    fn public_claim(claim: &Self::Claim) -> ProofClaim;

    fn generate(
        &self,
        dataset: &GeneticDataset,
        claim: &Self::Claim,
        opts: &GenerateOptions,
    ) -> GncResult<ProofRecord>;

    /// Non-strict verification of a freshly generated record.
    fn verify_locally(&self, record: &ProofRecord, claim: &Self::Claim) -> bool {
        ProofVerifier::new(self.config().clone())
            .verify(record, &Self::public_claim(claim), &VerifyOptions::default())
            .map(|v| v.valid)
            .unwrap_or(false)
    }
}

/// Dispatches a [`ProofClaim`] to the generator for its kind.
#[derive(Debug, Clone, Default)]
pub struct ProofGenerator {
    config: ProofConfig,
}

impl ProofGenerator {
    pub fn new(config: ProofConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ProofConfig {
        &self.config
    }

    pub fn generate(
        &self,
        dataset: &GeneticDataset,
        claim: &ProofClaim,
        opts: &GenerateOptions,
    ) -> GncResult<ProofRecord> {
        let config = self.config.clone();
        match claim {
            ProofClaim::GenePresence(c) => GenePresenceGenerator::new(config).generate(dataset, c, opts),
            ProofClaim::GeneAbsence(c) => GeneAbsenceGenerator::new(config).generate(dataset, c, opts),
            ProofClaim::GeneVariant(c) => GeneVariantGenerator::new(config).generate(dataset, c, opts),
            ProofClaim::Aggregate(q) => AggregateGenerator::new(config).generate(dataset, q, opts),
        }
    }

    /// Generate one proof per claim in parallel.
    ///
    /// Per-claim failures are returned in place. With `fail_fast` the first
    /// failure aborts the batch instead.
    pub fn generate_batch(
        &self,
        dataset: &GeneticDataset,
        claims: &[ProofClaim],
        opts: &GenerateOptions,
        fail_fast: bool,
    ) -> GncResult<Vec<GncResult<ProofRecord>>> {
        let min_len = self.config.batch_size.max(1);
        if fail_fast {
            let records = claims
                .par_iter()
                .with_min_len(min_len)
                .map(|claim| self.generate(dataset, claim, opts))
                .collect::<GncResult<Vec<_>>>()?;
            return Ok(records.into_iter().map(Ok).collect());
        }

        let results: Vec<GncResult<ProofRecord>> = claims
            .par_iter()
            .with_min_len(min_len)
            .map(|claim| {
                self.generate(dataset, claim, opts).map_err(|e| {
                    warn!(claim = %claim.summary(), error = %e, "proof generation failed");
                    e
                })
            })
            .collect();
        Ok(results)
    }

    pub fn verify_locally(&self, record: &ProofRecord, claim: &ProofClaim) -> bool {
        ProofVerifier::new(self.config.clone())
            .verify(record, claim, &VerifyOptions::default())
            .map(|v| v.valid)
            .unwrap_or(false)
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use serde_json::json;

    pub fn scenario_dataset() -> GeneticDataset {
        serde_json::from_value(json!({
            "variants": [{
                "chromosome": "1", "position": 123456, "reference": "A",
                "alternate": "G", "gene": "BRCA1", "type": "SNP"
            }],
            "genes": [{"symbol": "BRCA1", "name": "BRCA1 DNA Repair Associated", "chromosome": "17"}]
        }))
        .unwrap()
    }

    pub fn fixed_options() -> GenerateOptions {
        GenerateOptions {
            nonce: Some([9u8; NONCE_SIZE]),
            timestamp_ms: Some(1_700_000_000_000),
            ..Default::default()
        }
    }
}
