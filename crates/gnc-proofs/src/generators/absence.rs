use gnc_core::config::ProofConfig;
use gnc_core::types::GeneticDataset;
use gnc_core::{GncError, GncResult};
use serde::Serialize;

use super::presence::{require_gene_records, search_gene};
use super::{assemble, ClaimGenerator, Evidence, GenerateOptions};
use crate::claim::{GeneClaim, ProofClaim};
use crate::kind::ProofKind;
use crate::params::GeneBody;
use crate::record::ProofRecord;
use crate::snapshot::gene_snapshot;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
struct SearchCounts {
    genes: usize,
    variants: usize,
    annotations: usize,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AbsenceWitness<'a> {
    present: bool,
    gene_id: &'a str,
    searched: SearchCounts,
}

/// Proves a gene appears nowhere in the dataset's gene list, variant genes
/// or sequence annotations.
#[derive(Debug, Clone, Default)]
pub struct GeneAbsenceGenerator {
    config: ProofConfig,
}

impl GeneAbsenceGenerator {
    pub fn new(config: ProofConfig) -> Self {
        Self { config }
    }
}

impl ClaimGenerator for GeneAbsenceGenerator {
    type Claim = GeneClaim;

    const KIND: ProofKind = ProofKind::GeneAbsence;

    fn config(&self) -> &ProofConfig {
        &self.config
    }

    fn public_claim(claim: &GeneClaim) -> ProofClaim {
        ProofClaim::GeneAbsence(claim.clone())
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

        if let Some(hit) = search_gene(dataset, &claim.target_gene) {
            return Err(GncError::ClaimNotSatisfied(format!(
                "target gene {} is present ({:?} #{})",
                claim.target_gene, hit.source, hit.position
            )));
        }

        let searched = SearchCounts {
            genes: dataset.genes.len(),
            variants: dataset.variants.len(),
            annotations: dataset.sequences.iter().map(|s| s.annotations.len()).sum(),
        };
        let body = serde_json::to_value(GeneBody {
            privacy_level: opts.privacy_level.clone(),
            include_confidence: opts.include_confidence,
        })?;
        let evidence = Evidence {
            snapshot: gene_snapshot(dataset)?,
            witness: AbsenceWitness {
                present: false,
                gene_id: &claim.target_gene,
                searched,
            },
            body,
            confidence: Some(1.0),
        };
        assemble(&self.config, &Self::public_claim(claim), evidence, &opts)
    }
}
