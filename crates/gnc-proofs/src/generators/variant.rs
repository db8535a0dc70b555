use gnc_core::config::ProofConfig;
use gnc_core::types::{GeneticDataset, Variant, VariantType};
use gnc_core::{GncError, GncResult};
use serde::Serialize;
use serde_json::Number;
use tracing::warn;

use super::{assemble, ClaimGenerator, Evidence, GenerateOptions};
use crate::claim::{ProofClaim, VariantClaim};
use crate::kind::ProofKind;
use crate::params::VariantBody;
use crate::record::ProofRecord;
use crate::snapshot::variant_snapshot;

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct VariantHit {
    pub index: usize,
    pub confidence: f64,
}

/// Confidence for one candidate, or `None` when the claim excludes it.
///
/// Candidates must carry the claimed gene and type. A claimed rsId excludes
/// variants with a different rsId; a claimed position + allele excludes
/// variants that differ in either.
fn score(variant: &Variant, claim: &VariantClaim) -> Option<f64> {
    if variant.gene.as_deref() != Some(claim.gene.as_str())
        || !variant.classify().satisfies(claim.variant_type)
    {
        return None;
    }

    if let (Some(want), Some(have)) = (&claim.rs_id, &variant.rs_id) {
        return (want == have).then_some(1.0);
    }

    if let (Some(position), Some(allele)) = (claim.position, &claim.allele) {
        return (variant.position == Some(position) && variant.has_allele(allele)).then_some(0.95);
    }

    if claim.position.is_some() && variant.position == claim.position {
        return Some(0.8);
    }

    if let (Some(chromosome), Some(range)) = (&claim.chromosome, claim.position_range) {
        let in_range = variant.chromosome.as_ref() == Some(chromosome)
            && variant.position.is_some_and(|p| range.contains(p));
        if in_range {
            return Some(0.7);
        }
    }

    Some(0.6)
}

/// Best-scoring candidate across every variant in the dataset; ties go to
/// the earliest.
pub(crate) fn search_variant(dataset: &GeneticDataset, claim: &VariantClaim) -> Option<VariantHit> {
    let mut best: Option<VariantHit> = None;
    for (index, variant) in dataset.all_variants().enumerate() {
        let Some(confidence) = score(variant, claim) else {
            continue;
        };
        if best.map_or(true, |b| confidence > b.confidence) {
            best = Some(VariantHit { index, confidence });
        }
    }
    best
}

/// Public fields of the matched variant.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct MatchedVariant<'a> {
    gene: Option<&'a str>,
    #[serde(rename = "type")]
    variant_type: VariantType,
    position: Option<u64>,
    allele: Option<&'a str>,
    rs_id: Option<&'a str>,
    quality: Option<&'a Number>,
}

#[derive(Serialize)]
struct VariantWitness<'a> {
    present: bool,
    variant: MatchedVariant<'a>,
    index: usize,
    confidence: f64,
}

/// Proves a variant of a given gene and type is present.
#[derive(Debug, Clone, Default)]
pub struct GeneVariantGenerator {
    config: ProofConfig,
}

impl GeneVariantGenerator {
    pub fn new(config: ProofConfig) -> Self {
        Self { config }
    }

    /// One proof per claim. Unsatisfied claims are logged and skipped unless
    /// `strict`, in which case the first failure is returned.
    pub fn generate_many(
        &self,
        dataset: &GeneticDataset,
        claims: &[VariantClaim],
        opts: &GenerateOptions,
        strict: bool,
    ) -> GncResult<Vec<ProofRecord>> {
        let mut records = Vec::with_capacity(claims.len());
        for claim in claims {
            match self.generate(dataset, claim, opts) {
                Ok(record) => records.push(record),
                Err(e) if strict => return Err(e),
                Err(e) => {
                    warn!(gene = %claim.gene, variant_type = %claim.variant_type, error = %e, "skipping variant proof")
                }
            }
        }
        Ok(records)
    }
}

impl ClaimGenerator for GeneVariantGenerator {
    type Claim = VariantClaim;

    const KIND: ProofKind = ProofKind::GeneVariant;

    fn config(&self) -> &ProofConfig {
        &self.config
    }

    fn public_claim(claim: &VariantClaim) -> ProofClaim {
        ProofClaim::GeneVariant(claim.clone())
    }

    fn generate(
        &self,
        dataset: &GeneticDataset,
        claim: &VariantClaim,
        opts: &GenerateOptions,
    ) -> GncResult<ProofRecord> {
        claim.validate()?;
        let opts = opts.resolve(&self.config)?;

        let hit = search_variant(dataset, claim).ok_or_else(|| {
            GncError::ClaimNotSatisfied(format!(
                "target variant not found: {} {}",
                claim.gene, claim.variant_type
            ))
        })?;
        let matched = dataset
            .all_variants()
            .nth(hit.index)
            .ok_or_else(|| GncError::InvalidData("matched variant index out of range".into()))?;

        let body = serde_json::to_value(VariantBody {
            variant_type: claim.variant_type,
            confidence_threshold: opts.confidence_threshold,
            include_quality: opts.include_quality,
            privacy_level: opts.privacy_level.clone(),
        })?;
        let evidence = Evidence {
            snapshot: variant_snapshot(dataset)?,
            witness: VariantWitness {
                present: true,
                variant: MatchedVariant {
                    gene: matched.gene.as_deref(),
                    variant_type: matched.classify(),
                    position: matched.position,
                    allele: matched.allele.as_deref().or(matched.alternate.as_deref()),
                    rs_id: matched.rs_id.as_deref(),
                    quality: matched.quality.as_ref(),
                },
                index: hit.index,
                confidence: hit.confidence,
            },
            body,
            confidence: Some(hit.confidence),
        };
        assemble(&self.config, &Self::public_claim(claim), evidence, &opts)
    }
}
