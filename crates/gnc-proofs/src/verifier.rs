//! Proof verification.
//!
//! The verifier checks that a proof record is consistent with a public
//! claim: same claim hash, same kind, matching algorithm tag and sane
//! kind-specific parameters. It cannot show that the committed snapshot
//! actually satisfies the claim; that still rests on trusting the
//! generator.

use gnc_core::config::ProofConfig;
use gnc_core::{GncError, GncResult};
use rayon::prelude::*;
use serde::Serialize;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::fmt;
use tracing::{debug, warn};

use crate::claim::ProofClaim;
use crate::commitment::{constant_time_eq, shannon_entropy};
use crate::kind::ProofKind;
use crate::params::{AggregateBody, GeneBody, ParameterBlock, VariantBody};
use crate::record::ProofRecord;

#[derive(Debug, Clone, Default)]
pub struct VerifyOptions {
    pub strict: bool,
    /// Maximum proof age; strict mode falls back to the configured limit
    pub max_age_secs: Option<u64>,
    /// Reject variant and aggregate proofs whose recorded confidence is lower
    pub min_confidence: Option<f64>,
    /// Strict-mode entropy floor, bits per byte
    pub min_entropy: Option<f64>,
    /// Clock override, unix seconds
    pub now_secs: Option<u64>,
}

/// Why a well-formed proof was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Rejection {
    KindMismatch,
    AlgorithmMismatch,
    ClaimMismatch,
    VariantTypeMismatch,
    StatisticMismatch,
    InvalidDataSize,
    ConfidenceTooLow,
    ProofTooOld,
    LowEntropy,
}

impl Rejection {
    pub fn code(self) -> &'static str {
        match self {
            Rejection::KindMismatch => "kind_mismatch",
            Rejection::AlgorithmMismatch => "algorithm_mismatch",
            Rejection::ClaimMismatch => "claim_mismatch",
            Rejection::VariantTypeMismatch => "variant_type_mismatch",
            Rejection::StatisticMismatch => "statistic_mismatch",
            Rejection::InvalidDataSize => "invalid_data_size",
            Rejection::ConfidenceTooLow => "confidence_too_low",
            Rejection::ProofTooOld => "proof_too_old",
            Rejection::LowEntropy => "low_entropy",
        }
    }
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Verification {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<Rejection>,
    #[serde(skip_serializing_if = "Value::is_null")]
    pub details: Value,
}

impl Verification {
    fn accept(details: Value) -> Self {
        Self {
            valid: true,
            reason: None,
            details,
        }
    }

    fn reject(reason: Rejection, details: Value) -> Self {
        Self {
            valid: false,
            reason: Some(reason),
            details,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchItem {
    pub index: usize,
    pub valid: bool,
    /// Rejection code, or `malformed` for structural errors
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Value::is_null")]
    pub details: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchStats {
    pub total: usize,
    pub valid: usize,
    pub invalid: usize,
    /// Percent of valid items, 0 for an empty batch
    pub success_rate: f64,
    pub error_types: BTreeMap<String, usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchReport {
    pub results: Vec<BatchItem>,
    pub stats: BatchStats,
}

/// Stateless verifier; verifying a record never changes later outcomes.
#[derive(Debug, Clone, Default)]
pub struct ProofVerifier {
    config: ProofConfig,
}

impl ProofVerifier {
    pub fn new(config: ProofConfig) -> Self {
        Self { config }
    }

    /// Verify `record` against `claim`.
    ///
    /// Expected mismatches come back as `valid: false` with a [`Rejection`].
    /// Structurally broken records are `Err(MalformedProof)`.
    pub fn verify(
        &self,
        record: &ProofRecord,
        claim: &ProofClaim,
        opts: &VerifyOptions,
    ) -> GncResult<Verification> {
        let (kind, block) = parse_structure(record)?;
        let result = self.check(record, kind, &block, claim, opts)?;
        match result.reason {
            Some(reason) => warn!(kind = %kind, reason = %reason, "proof rejected"),
            None => debug!(kind = %kind, "proof verified"),
        }
        Ok(result)
    }

    fn check(
        &self,
        record: &ProofRecord,
        kind: ProofKind,
        block: &ParameterBlock,
        claim: &ProofClaim,
        opts: &VerifyOptions,
    ) -> GncResult<Verification> {
        if kind != claim.kind() {
            return Ok(Verification::reject(
                Rejection::KindMismatch,
                json!({"expected": claim.kind().tag(), "found": kind.tag()}),
            ));
        }

        if block.algorithm != kind.algorithm() {
            return Ok(Verification::reject(
                Rejection::AlgorithmMismatch,
                json!({"expected": kind.algorithm(), "found": block.algorithm}),
            ));
        }

        let expected_hash = claim.claim_hash()?;
        if !constant_time_eq(&expected_hash, &block.claim_hash) {
            return Ok(Verification::reject(
                Rejection::ClaimMismatch,
                json!({"expected": claim.summary(), "found": "hash_mismatch"}),
            ));
        }

        let mut details = json!({
            "algorithm": block.algorithm,
            "version": self.config.version,
            "timestamp": block.timestamp,
        });

        match claim {
            ProofClaim::GenePresence(_) | ProofClaim::GeneAbsence(_) => {
                let body: GeneBody = block.body_as()?;
                details["privacyLevel"] = json!(body.privacy_level);
            }
            ProofClaim::GeneVariant(expected) => {
                let body: VariantBody = block.body_as()?;
                if body.variant_type != expected.variant_type {
                    return Ok(Verification::reject(
                        Rejection::VariantTypeMismatch,
                        json!({"expected": expected.variant_type, "found": body.variant_type}),
                    ));
                }
                if let Some(rejected) = confidence_check(body.confidence_threshold, opts) {
                    return Ok(rejected);
                }
                details["variantType"] = json!(body.variant_type);
                details["confidence"] = json!(body.confidence_threshold);
            }
            ProofClaim::Aggregate(expected) => {
                let body: AggregateBody = block.body_as()?;
                if body.statistic != expected.statistic {
                    return Ok(Verification::reject(
                        Rejection::StatisticMismatch,
                        json!({"expected": expected.statistic, "found": body.statistic}),
                    ));
                }
                if body.data_size == 0 {
                    return Ok(Verification::reject(
                        Rejection::InvalidDataSize,
                        json!({"dataSize": body.data_size}),
                    ));
                }
                if let Some(rejected) = confidence_check(body.confidence_level, opts) {
                    return Ok(rejected);
                }
                details["statisticType"] = json!(body.statistic);
                details["dataSize"] = json!(body.data_size);
                details["result"] = body.result;
                details["confidence"] = json!(body.confidence_level);
            }
        }

        let max_age = match (opts.max_age_secs, opts.strict) {
            (Some(age), _) => Some(age),
            (None, true) => Some(self.config.strict_max_age_secs),
            (None, false) => None,
        };
        if let Some(max_age) = max_age {
            let now = opts.now_secs.unwrap_or_else(gnc_core::clock::now_secs);
            let age = now.saturating_sub(block.timestamp);
            if age > max_age {
                return Ok(Verification::reject(
                    Rejection::ProofTooOld,
                    json!({"age": age, "maxAge": max_age}),
                ));
            }
        }

        if opts.strict {
            let floor = opts.min_entropy.unwrap_or(self.config.min_entropy);
            let entropy = shannon_entropy(&record.commitment_hash);
            if entropy < floor {
                return Ok(Verification::reject(
                    Rejection::LowEntropy,
                    json!({"entropy": entropy, "minRequired": floor}),
                ));
            }
        }

        Ok(Verification::accept(details))
    }

    /// Verify each record against the claim at the same index.
    ///
    /// Items are independent and checked in parallel. Structural errors are
    /// reported per item as `malformed` unless `fail_fast` is set, in which
    /// case the first one is returned.
    pub fn verify_batch(
        &self,
        records: &[ProofRecord],
        claims: &[ProofClaim],
        opts: &VerifyOptions,
        fail_fast: bool,
    ) -> GncResult<BatchReport> {
        if records.len() != claims.len() {
            return Err(GncError::InvalidParameter(format!(
                "{} proofs but {} claims",
                records.len(),
                claims.len()
            )));
        }

        let outcomes: Vec<GncResult<Verification>> = records
            .par_iter()
            .zip(claims.par_iter())
            .map(|(record, claim)| self.verify(record, claim, opts))
            .collect();

        let mut results = Vec::with_capacity(outcomes.len());
        for (index, outcome) in outcomes.into_iter().enumerate() {
            let item = match outcome {
                Ok(v) => BatchItem {
                    index,
                    valid: v.valid,
                    error: v.reason.map(|r| r.code().to_string()),
                    details: v.details,
                },
                Err(e) if fail_fast => return Err(e),
                Err(e) => BatchItem {
                    index,
                    valid: false,
                    error: Some(e.code().to_string()),
                    details: json!({"message": e.to_string()}),
                },
            };
            results.push(item);
        }

        let stats = batch_stats(&results);
        Ok(BatchReport { results, stats })
    }
}

fn parse_structure(record: &ProofRecord) -> GncResult<(ProofKind, ParameterBlock)> {
    let kind = record.kind()?;
    if record.commitment_hash.len() != 32 {
        return Err(GncError::MalformedProof(format!(
            "commitment hash must be 32 bytes, got {}",
            record.commitment_hash.len()
        )));
    }
    let block = record.parameters()?;
    if block.kind_tag != kind.tag() {
        return Err(GncError::MalformedProof(format!(
            "parameter block kind {} does not match record kind {}",
            block.kind_tag,
            kind.tag()
        )));
    }
    Ok((kind, block))
}

fn confidence_check(recorded: f64, opts: &VerifyOptions) -> Option<Verification> {
    let min = opts.min_confidence?;
    (recorded < min).then(|| {
        Verification::reject(
            Rejection::ConfidenceTooLow,
            json!({"confidence": recorded, "minRequired": min}),
        )
    })
}

fn batch_stats(results: &[BatchItem]) -> BatchStats {
    let total = results.len();
    let valid = results.iter().filter(|r| r.valid).count();
    let mut error_types = BTreeMap::new();
    for code in results.iter().filter_map(|r| r.error.as_ref()) {
        *error_types.entry(code.clone()).or_insert(0) += 1;
    }
    BatchStats {
        total,
        valid,
        invalid: total - valid,
        success_rate: if total > 0 {
            valid as f64 / total as f64 * 100.0
        } else {
            0.0
        },
        error_types,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::claim::{AggregateQuery, GeneClaim, QueryType, Statistic, VariantClaim};
    use crate::generators::test_support::*;
    use crate::generators::ProofGenerator;
    use gnc_core::types::VariantType;

    fn presence(gene: &str) -> ProofClaim {
        ProofClaim::GenePresence(GeneClaim::new(gene))
    }

    fn generate(claim: &ProofClaim) -> ProofRecord {
        ProofGenerator::default()
            .generate(&scenario_dataset(), claim, &fixed_options())
            .unwrap()
    }

    fn reason(record: &ProofRecord, claim: &ProofClaim, opts: &VerifyOptions) -> Option<Rejection> {
        ProofVerifier::default().verify(record, claim, opts).unwrap().reason
    }

    #[test]
    fn test_accepts_matching_claim() {
        let claim = presence("BRCA1");
        let v = ProofVerifier::default()
            .verify(&generate(&claim), &claim, &VerifyOptions::default())
            .unwrap();
        assert!(v.valid);
        assert_eq!(v.details["algorithm"], "simplified-zk-snark");
        assert_eq!(v.details["privacyLevel"], "high");
    }

    #[test]
    fn test_rejection_reasons() {
        let record = generate(&presence("BRCA1"));
        let opts = VerifyOptions::default();
        assert_eq!(reason(&record, &presence("BRCA2"), &opts), Some(Rejection::ClaimMismatch));
        assert_eq!(
            reason(&record, &ProofClaim::GeneAbsence(GeneClaim::new("BRCA1")), &opts),
            Some(Rejection::KindMismatch)
        );

        let variant = ProofClaim::GeneVariant(VariantClaim::new("BRCA1", VariantType::Snp));
        let record = generate(&variant);
        let other_type = ProofClaim::GeneVariant(VariantClaim::new("BRCA1", VariantType::Indel));
        assert_eq!(reason(&record, &other_type, &opts), Some(Rejection::ClaimMismatch));

        let min_confidence = VerifyOptions {
            min_confidence: Some(0.9),
            ..Default::default()
        };
        assert_eq!(reason(&record, &variant, &min_confidence), Some(Rejection::ConfidenceTooLow));
    }

    #[test]
    fn test_forged_algorithm_tag_is_rejected() {
        let claim = presence("BRCA1");
        let mut record = generate(&claim);
        let mut block = record.parameters().unwrap();
        block.algorithm = ProofKind::Aggregate.algorithm().into();
        record.parameter_block = block.encode().unwrap();
        assert_eq!(
            reason(&record, &claim, &VerifyOptions::default()),
            Some(Rejection::AlgorithmMismatch)
        );
    }

    #[test]
    fn test_forged_body_fields_are_rejected() {
        let variant = VariantClaim::new("BRCA1", VariantType::Snp);
        let claim = ProofClaim::GeneVariant(variant);
        let mut record = generate(&claim);
        let mut block = record.parameters().unwrap();
        block.body["variantType"] = json!("CNV");
        record.parameter_block = block.encode().unwrap();
        assert_eq!(
            reason(&record, &claim, &VerifyOptions::default()),
            Some(Rejection::VariantTypeMismatch)
        );

        let query = AggregateQuery::new(QueryType::VariantCount, Statistic::Count);
        let claim = ProofClaim::Aggregate(query);
        let record = generate(&claim);
        let mut block = record.parameters().unwrap();
        block.body["statistic"] = json!("ratio");
        let mut stat_forged = record.clone();
        stat_forged.parameter_block = block.encode().unwrap();
        assert_eq!(
            reason(&stat_forged, &claim, &VerifyOptions::default()),
            Some(Rejection::StatisticMismatch)
        );

        let mut block = record.parameters().unwrap();
        block.body["dataSize"] = json!(0);
        let mut size_forged = record.clone();
        size_forged.parameter_block = block.encode().unwrap();
        assert_eq!(
            reason(&size_forged, &claim, &VerifyOptions::default()),
            Some(Rejection::InvalidDataSize)
        );
    }

    #[test]
    fn test_strict_mode_age_and_entropy() {
        let claim = presence("BRCA1");
        let record = generate(&claim);
        let generated = record.generated_at / 1000;

        let fresh = VerifyOptions {
            strict: true,
            now_secs: Some(generated + 60),
            ..Default::default()
        };
        assert_eq!(reason(&record, &claim, &fresh), None);

        let stale = VerifyOptions {
            now_secs: Some(generated + 3601),
            ..fresh.clone()
        };
        assert_eq!(reason(&record, &claim, &stale), Some(Rejection::ProofTooOld));

        let explicit = VerifyOptions {
            max_age_secs: Some(10),
            now_secs: Some(generated + 60),
            ..Default::default()
        };
        assert_eq!(reason(&record, &claim, &explicit), Some(Rejection::ProofTooOld));

        let mut degenerate = record.clone();
        degenerate.commitment_hash = vec![0u8; 32];
        assert_eq!(reason(&degenerate, &claim, &fresh), Some(Rejection::LowEntropy));
        assert_eq!(reason(&degenerate, &claim, &VerifyOptions::default()), None);
    }

    #[test]
    fn test_structural_errors_are_errors() {
        let claim = presence("BRCA1");
        let verifier = ProofVerifier::default();
        let opts = VerifyOptions::default();

        let mut short_hash = generate(&claim);
        short_hash.commitment_hash.pop();
        assert!(matches!(verifier.verify(&short_hash, &claim, &opts), Err(GncError::MalformedProof(_))));

        let mut short_block = generate(&claim);
        short_block.parameter_block.truncate(200);
        assert!(matches!(verifier.verify(&short_block, &claim, &opts), Err(GncError::MalformedProof(_))));

        let mut unknown_kind = generate(&claim);
        unknown_kind.proof_kind = 9;
        assert!(matches!(verifier.verify(&unknown_kind, &claim, &opts), Err(GncError::MalformedProof(_))));
    }

    #[test]
    fn test_batch_report() {
        let good = presence("BRCA1");
        let record = generate(&good);
        let mut broken = record.clone();
        broken.parameter_block.clear();

        let records = vec![record.clone(), record.clone(), broken];
        let claims = vec![good.clone(), presence("BRCA2"), good.clone()];
        let report = ProofVerifier::default()
            .verify_batch(&records, &claims, &VerifyOptions::default(), false)
            .unwrap();

        assert_eq!(report.stats.total, 3);
        assert_eq!(report.stats.valid, 1);
        assert_eq!(report.stats.invalid, 2);
        assert!((report.stats.success_rate - 100.0 / 3.0).abs() < 1e-9);
        assert_eq!(report.stats.error_types["claim_mismatch"], 1);
        assert_eq!(report.stats.error_types["malformed"], 1);
        assert_eq!(report.results[2].index, 2);

        assert!(ProofVerifier::default()
            .verify_batch(&records, &claims, &VerifyOptions::default(), true)
            .is_err());
        assert!(ProofVerifier::default()
            .verify_batch(&records, &claims[..1], &VerifyOptions::default(), false)
            .is_err());
    }
}
