use gnc_core::config::ProofConfig;
use gnc_core::types::GeneticDataset;
use gnc_core::{GncError, GncResult};
use serde::Serialize;
use serde_json::Value;

use super::{assemble, ClaimGenerator, Evidence, GenerateOptions};
use crate::claim::{GeneClaim, ProofClaim};
use crate::kind::ProofKind;
use crate::params::GeneBody;
use crate::record::ProofRecord;
use crate::snapshot::gene_snapshot;

/// Where a gene was found.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum GeneSource {
    Genes,
    Variants,
    Annotations,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub(crate) struct GeneHit {
    pub source: GeneSource,
    pub position: usize,
    pub confidence: f64,
}

pub(crate) fn require_gene_records(dataset: &GeneticDataset) -> GncResult<()> {
    if dataset.genes.is_empty() && dataset.variants.is_empty() && dataset.sequences.is_empty() {
        return Err(GncError::InvalidData(
            "genetic data must contain sequences, variants, or genes data".into(),
        ));
    }
    Ok(())
}

/// Gene list first, then variant genes, then sequence annotations. The first
/// hit wins.
pub(crate) fn search_gene(dataset: &GeneticDataset, target: &str) -> Option<GeneHit> {
    if let Some(position) = dataset.genes.iter().position(|g| g.matches(target)) {
        return Some(GeneHit {
            source: GeneSource::Genes,
            position,
            confidence: 1.0,
        });
    }

    let variant_names = |v: &gnc_core::types::Variant| {
        v.gene.as_deref() == Some(target) || v.extra.get("symbol").and_then(Value::as_str) == Some(target)
    };
    if let Some(position) = dataset.variants.iter().position(variant_names) {
        return Some(GeneHit {
            source: GeneSource::Variants,
            position,
            confidence: 0.9,
        });
    }

    dataset
        .sequences
        .iter()
        .position(|s| s.annotations.iter().any(|a| a.matches(target)))
        .map(|position| GeneHit {
            source: GeneSource::Annotations,
            position,
            confidence: 0.8,
        })
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PresenceWitness<'a> {
    present: bool,
    gene_id: &'a str,
    #[serde(flatten)]
    hit: GeneHit,
}

/// Proves a gene appears somewhere in the dataset.
#[derive(Debug, Clone, Default)]
pub struct GenePresenceGenerator {
    config: ProofConfig,
}

impl GenePresenceGenerator {
    pub fn new(config: ProofConfig) -> Self {
        Self { config }
    }
}

impl ClaimGenerator for GenePresenceGenerator {
    type Claim = GeneClaim;

    const KIND: ProofKind = ProofKind::GenePresence;

    fn config(&self) -> &ProofConfig {
        &self.config
    }

    fn public_claim(claim: &GeneClaim) -> ProofClaim {
        ProofClaim::GenePresence(claim.clone())
    }

    fn generate(
        &self,
        dataset: &GeneticDataset,
        claim: &GeneClaim,
        opts: &GenerateOptions,
    ) -> GncResult<ProofRecord> {
        claim.validate()?;
        require_gene_records(dataset)?;
        let opts = opts.resolve(&self.config)?;

        let hit = search_gene(dataset, &claim.target_gene).ok_or_else(|| {
            GncError::ClaimNotSatisfied(format!(
                "target gene {} not found in genetic data",
                claim.target_gene
            ))
        })?;

        let body = serde_json::to_value(GeneBody {
            privacy_level: opts.privacy_level.clone(),
            include_confidence: opts.include_confidence,
        })?;
        let evidence = Evidence {
            snapshot: gene_snapshot(dataset)?,
            witness: PresenceWitness {
                present: true,
                gene_id: &claim.target_gene,
                hit,
            },
            body,
            confidence: Some(hit.confidence),
        };
        assemble(&self.config, &Self::public_claim(claim), evidence, &opts)
    }
}
