//! Public claims, one variant per proof kind.
//!
//! A claim is hashed in full (absent options serialize as `null`) and the
//! hash is embedded in the parameter block, binding the proof to exactly
//! that claim.

use gnc_core::canonical::canonical_hash;
use gnc_core::types::VariantType;
use gnc_core::{GncError, GncResult};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::kind::ProofKind;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ProofClaim {
    GenePresence(GeneClaim),
    GeneAbsence(GeneClaim),
    GeneVariant(VariantClaim),
    Aggregate(AggregateQuery),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneClaim {
    pub target_gene: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariantClaim {
    pub gene: String,
    #[serde(rename = "type")]
    pub variant_type: VariantType,
    #[serde(default)]
    pub rs_id: Option<String>,
    #[serde(default)]
    pub position: Option<u64>,
    #[serde(default)]
    pub allele: Option<String>,
    #[serde(default)]
    pub chromosome: Option<String>,
    #[serde(default)]
    pub position_range: Option<PositionRange>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionRange {
    pub start: u64,
    pub end: u64,
}

impl PositionRange {
    pub fn contains(&self, position: u64) -> bool {
        (self.start..=self.end).contains(&position)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryType {
    VariantCount,
    GenePresenceCount,
    DiversityIndex,
    PopulationFrequency,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Statistic {
    Count,
    Percentage,
    Ratio,
    AboveThreshold,
    BelowThreshold,
    Range,
}

impl Statistic {
    pub fn as_str(self) -> &'static str {
        match self {
            Statistic::Count => "count",
            Statistic::Percentage => "percentage",
            Statistic::Ratio => "ratio",
            Statistic::AboveThreshold => "above_threshold",
            Statistic::BelowThreshold => "below_threshold",
            Statistic::Range => "range",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ValueRange {
    pub min: f64,
    pub max: f64,
}

/// Query for the aggregate generator. Filters compare variant fields by
/// JSON equality.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateQuery {
    #[serde(alias = "type")]
    pub query_type: QueryType,
    pub statistic: Statistic,
    #[serde(default)]
    pub threshold: Option<f64>,
    #[serde(default)]
    pub range: Option<ValueRange>,
    #[serde(default)]
    pub filters: Option<Map<String, Value>>,
    #[serde(default)]
    pub target_genes: Option<Vec<String>>,
    #[serde(default)]
    pub target_variant: Option<VariantMatch>,
}

/// Partial variant description; unset fields match anything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariantMatch {
    #[serde(default)]
    pub gene: Option<String>,
    #[serde(rename = "type", default)]
    pub variant_type: Option<VariantType>,
    #[serde(default)]
    pub rs_id: Option<String>,
    #[serde(default)]
    pub chromosome: Option<String>,
}

impl VariantMatch {
    pub fn matches(&self, variant: &gnc_core::types::Variant) -> bool {
        fn field_ok<T: PartialEq>(want: &Option<T>, have: &Option<T>) -> bool {
            want.is_none() || want == have
        }
        field_ok(&self.gene, &variant.gene)
            && self.variant_type.map_or(true, |t| variant.classify().satisfies(t))
            && field_ok(&self.rs_id, &variant.rs_id)
            && field_ok(&self.chromosome, &variant.chromosome)
    }
}

impl GeneClaim {
    pub fn new(target_gene: impl Into<String>) -> Self {
        Self {
            target_gene: target_gene.into(),
        }
    }

    pub fn validate(&self) -> GncResult<()> {
        if self.target_gene.trim().is_empty() {
            return Err(GncError::InvalidData("target gene must be a non-empty string".into()));
        }
        Ok(())
    }
}

impl VariantClaim {
    /// Claim on gene + type only.
    pub fn new(gene: impl Into<String>, variant_type: VariantType) -> Self {
        Self {
            gene: gene.into(),
            variant_type,
            rs_id: None,
            position: None,
            allele: None,
            chromosome: None,
            position_range: None,
        }
    }

    pub fn validate(&self) -> GncResult<()> {
        if self.gene.trim().is_empty() {
            return Err(GncError::InvalidData("target variant missing required field: gene".into()));
        }
        if let Some(range) = self.position_range {
            if range.start > range.end {
                return Err(GncError::InvalidData(format!(
                    "position range start {} is after end {}",
                    range.start, range.end
                )));
            }
        }
        Ok(())
    }
}

impl AggregateQuery {
    pub fn new(query_type: QueryType, statistic: Statistic) -> Self {
        Self {
            query_type,
            statistic,
            threshold: None,
            range: None,
            filters: None,
            target_genes: None,
            target_variant: None,
        }
    }

    pub fn validate(&self) -> GncResult<()> {
        match self.statistic {
            Statistic::AboveThreshold | Statistic::BelowThreshold if self.threshold.is_none() => {
                return Err(GncError::InvalidData(format!(
                    "statistic {} requires a threshold",
                    self.statistic.as_str()
                )));
            }
            Statistic::Range => match self.range {
                None => return Err(GncError::InvalidData("statistic range requires a range".into())),
                Some(r) if r.min > r.max => {
                    return Err(GncError::InvalidData(format!(
                        "range min {} is above max {}",
                        r.min, r.max
                    )))
                }
                Some(_) => {}
            },
            _ => {}
        }

        match self.query_type {
            QueryType::GenePresenceCount => {
                let empty = self
                    .target_genes
                    .as_ref()
                    .map_or(true, |genes| genes.iter().all(|g| g.trim().is_empty()));
                if empty {
                    return Err(GncError::InvalidData(
                        "gene_presence_count requires non-empty targetGenes".into(),
                    ));
                }
            }
            QueryType::PopulationFrequency if self.target_variant.is_none() => {
                return Err(GncError::InvalidData(
                    "population_frequency requires targetVariant".into(),
                ));
            }
            _ => {}
        }
        Ok(())
    }
}

impl ProofClaim {
    pub fn kind(&self) -> ProofKind {
        match self {
            ProofClaim::GenePresence(_) => ProofKind::GenePresence,
            ProofClaim::GeneAbsence(_) => ProofKind::GeneAbsence,
            ProofClaim::GeneVariant(_) => ProofKind::GeneVariant,
            ProofClaim::Aggregate(_) => ProofKind::Aggregate,
        }
    }

    pub fn validate(&self) -> GncResult<()> {
        match self {
            ProofClaim::GenePresence(c) | ProofClaim::GeneAbsence(c) => c.validate(),
            ProofClaim::GeneVariant(c) => c.validate(),
            ProofClaim::Aggregate(q) => q.validate(),
        }
    }

    /// SHA-256 of the canonical claim, kind tag included.
    pub fn claim_hash(&self) -> GncResult<[u8; 32]> {
        canonical_hash(self)
    }

    /// Short human-readable description stored in proof metadata.
    pub fn summary(&self) -> String {
        match self {
            ProofClaim::GenePresence(c) => format!("gene_presence:{}", c.target_gene),
            ProofClaim::GeneAbsence(c) => format!("gene_absence:{}", c.target_gene),
            ProofClaim::GeneVariant(c) => format!("gene_variant:{}:{}", c.gene, c.variant_type),
            ProofClaim::Aggregate(q) => format!(
                "aggregate:{}:{}",
                serde_json::to_value(q.query_type)
                    .ok()
                    .and_then(|v| v.as_str().map(str::to_owned))
                    .unwrap_or_default(),
                q.statistic.as_str()
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_claim_json_shapes() {
        let claim: ProofClaim =
            serde_json::from_value(json!({"kind": "gene_presence", "targetGene": "BRCA1"})).unwrap();
        assert_eq!(claim, ProofClaim::GenePresence(GeneClaim::new("BRCA1")));

        let claim: ProofClaim = serde_json::from_value(json!({
            "kind": "gene_variant", "gene": "BRCA1", "type": "SNP", "rsId": "rs80357906"
        }))
        .unwrap();
        let ProofClaim::GeneVariant(v) = &claim else {
            panic!("expected variant claim");
        };
        assert_eq!(v.rs_id.as_deref(), Some("rs80357906"));

        let claim: ProofClaim = serde_json::from_value(json!({
            "kind": "aggregate", "queryType": "variant_count", "statistic": "percentage"
        }))
        .unwrap();
        assert_eq!(claim.kind(), ProofKind::Aggregate);
        assert_eq!(claim.summary(), "aggregate:variant_count:percentage");
    }

    #[test]
    fn test_aggregate_accepts_type_alias() {
        let q: AggregateQuery =
            serde_json::from_value(json!({"type": "diversity_index", "statistic": "count"})).unwrap();
        assert_eq!(q.query_type, QueryType::DiversityIndex);
    }

    #[test]
    fn test_claim_hash_covers_every_field() {
        let base = VariantClaim::new("BRCA1", VariantType::Snp);
        let mut with_range = base.clone();
        with_range.chromosome = Some("17".into());
        with_range.position_range = Some(PositionRange { start: 1, end: 10 });

        let h1 = ProofClaim::GeneVariant(base).claim_hash().unwrap();
        let h2 = ProofClaim::GeneVariant(with_range).claim_hash().unwrap();
        assert_ne!(h1, h2);
    }

    #[test]
    fn test_presence_and_absence_hash_differently() {
        let presence = ProofClaim::GenePresence(GeneClaim::new("TP53")).claim_hash().unwrap();
        let absence = ProofClaim::GeneAbsence(GeneClaim::new("TP53")).claim_hash().unwrap();
        assert_ne!(presence, absence);
    }

    #[test]
    fn test_variant_claim_validation() {
        assert!(VariantClaim::new("", VariantType::Snp).validate().is_err());
        assert!(VariantClaim::new("BRCA1", VariantType::Deletion).validate().is_ok());

        let mut claim = VariantClaim::new("BRCA1", VariantType::Snp);
        claim.position_range = Some(PositionRange { start: 10, end: 1 });
        assert!(matches!(claim.validate(), Err(GncError::InvalidData(_))));
    }

    #[test]
    fn test_aggregate_validation_requires_parameters() {
        assert!(AggregateQuery::new(QueryType::VariantCount, Statistic::AboveThreshold)
            .validate()
            .is_err());
        assert!(AggregateQuery::new(QueryType::VariantCount, Statistic::Range)
            .validate()
            .is_err());
        assert!(AggregateQuery::new(QueryType::GenePresenceCount, Statistic::Count)
            .validate()
            .is_err());
        assert!(AggregateQuery::new(QueryType::PopulationFrequency, Statistic::Count)
            .validate()
            .is_err());

        let mut q = AggregateQuery::new(QueryType::VariantCount, Statistic::Range);
        q.range = Some(ValueRange { min: 5.0, max: 1.0 });
        assert!(q.validate().is_err());
        q.range = Some(ValueRange { min: 0.0, max: 1.0 });
        assert!(q.validate().is_ok());
    }
}
