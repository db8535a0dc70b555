//! Tier projections of a genetic dataset
//!
//! Tier 1 (basic): aggregate counts and histograms only.
//! Tier 2 (detailed): tier 1 plus medium-filtered variants, a reduced gene
//! list and raw phenotypes.
//! Tier 3 (full): the whole dataset plus access markers.
//!
//! Every projection is built from the dataset alone; no tier ever contains
//! a value the original did not.

use gnc_core::types::{GeneticDataset, Phenotype, Variant};
use gnc_core::AccessTier;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A decrypted tier payload, tagged by `type`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum TierView {
    Basic(BasicView),
    Detailed(DetailedView),
    Full(FullView),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BasicView {
    pub total_variants: u64,
    pub total_genes: u64,
    pub data_types: Vec<String>,
    pub general_stats: GeneralStats,
    /// Projection time, unix ms
    pub timestamp: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneralStats {
    pub variant_types: BTreeMap<String, u64>,
    pub chromosome_distribution: BTreeMap<String, u64>,
    pub quality_metrics: QualityMetrics,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QualityMetrics {
    pub count: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mean: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetailedView {
    #[serde(flatten)]
    pub summary: BasicView,
    pub filtered_variants: Vec<Variant>,
    pub gene_list: Vec<GeneSummary>,
    pub phenotypes: Vec<Phenotype>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneSummary {
    pub symbol: Option<String>,
    pub name: Option<String>,
    pub chromosome: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FullView {
    #[serde(flatten)]
    pub dataset: GeneticDataset,
    pub access_level: u8,
    pub encryption_level: String,
}

impl TierView {
    pub fn tier(&self) -> AccessTier {
        match self {
            TierView::Basic(_) => AccessTier::Basic,
            TierView::Detailed(_) => AccessTier::Detailed,
            TierView::Full(_) => AccessTier::Full,
        }
    }
}

/// Builds tier projections.
#[derive(Debug, Clone, Copy, Default)]
pub struct TierPartitioner;

impl TierPartitioner {
    /// Project the dataset into all three tiers.
    pub fn partition(dataset: &GeneticDataset) -> BTreeMap<AccessTier, TierView> {
        Self::partition_with_timestamp(dataset, gnc_core::clock::now_millis())
    }

    /// [`partition`](Self::partition) with a fixed projection timestamp.
    pub fn partition_with_timestamp(
        dataset: &GeneticDataset,
        timestamp: u64,
    ) -> BTreeMap<AccessTier, TierView> {
        AccessTier::ALL
            .into_iter()
            .map(|tier| (tier, Self::project(dataset, tier, timestamp)))
            .collect()
    }

    /// A single tier's projection.
    pub fn project(dataset: &GeneticDataset, tier: AccessTier, timestamp: u64) -> TierView {
        match tier {
            AccessTier::Basic => TierView::Basic(basic_view(dataset, timestamp)),
            AccessTier::Detailed => TierView::Detailed(DetailedView {
                summary: basic_view(dataset, timestamp),
                filtered_variants: dataset.variants.iter().map(Variant::medium_filtered).collect(),
                gene_list: dataset
                    .genes
                    .iter()
                    .map(|g| GeneSummary {
                        symbol: g.symbol.clone(),
                        name: g.name.clone(),
                        chromosome: g.chromosome.clone(),
                    })
                    .collect(),
                phenotypes: dataset.phenotypes.clone(),
            }),
            AccessTier::Full => TierView::Full(FullView {
                dataset: dataset.clone(),
                access_level: AccessTier::Full.level(),
                encryption_level: "maximum".into(),
            }),
        }
    }
}

fn basic_view(dataset: &GeneticDataset, timestamp: u64) -> BasicView {
    BasicView {
        total_variants: dataset.variants.len() as u64,
        total_genes: dataset.genes.len() as u64,
        data_types: dataset.data_types(),
        general_stats: general_stats(&dataset.variants),
        timestamp,
    }
}

fn general_stats(variants: &[Variant]) -> GeneralStats {
    let mut stats = GeneralStats::default();
    let mut qualities = Vec::new();

    for variant in variants {
        if let Some(t) = variant.variant_type {
            *stats.variant_types.entry(t.to_string()).or_insert(0) += 1;
        }
        if let Some(chromosome) = &variant.chromosome {
            *stats
                .chromosome_distribution
                .entry(chromosome.clone())
                .or_insert(0) += 1;
        }
        if let Some(q) = variant.quality_score() {
            qualities.push(q);
        }
    }

    stats.quality_metrics.count = qualities.len() as u64;
    if !qualities.is_empty() {
        let sum: f64 = qualities.iter().sum();
        stats.quality_metrics.mean = Some(sum / qualities.len() as f64);
        stats.quality_metrics.min = qualities.iter().copied().reduce(f64::min);
        stats.quality_metrics.max = qualities.iter().copied().reduce(f64::max);
    }
    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> GeneticDataset {
        serde_json::from_value(json!({
            "variants": [
                {"chromosome": "1", "position": 123456, "reference": "A", "alternate": "G",
                 "gene": "BRCA1", "type": "SNP", "quality": 40.0,
                 "sequence": "ACGTACGT", "exactPosition": 123456, "individualId": "P-001"},
                {"chromosome": "17", "position": 7577120, "reference": "C", "alternate": "T",
                 "gene": "TP53", "type": "SNP", "quality": 20.0}
            ],
            "genes": [
                {"symbol": "BRCA1", "name": "BRCA1 DNA Repair Associated", "chromosome": "17",
                 "start": 43044295, "end": 43125483}
            ],
            "phenotypes": [{"name": "eye_color", "value": "brown"}]
        }))
        .unwrap()
    }

    #[test]
    fn test_basic_tier_has_counts_only() {
        let view = TierPartitioner::project(&sample(), AccessTier::Basic, 1000);
        let json = serde_json::to_value(&view).unwrap();

        assert_eq!(json["type"], "basic");
        assert_eq!(json["totalVariants"], 2);
        assert_eq!(json["totalGenes"], 1);
        assert_eq!(json["generalStats"]["variantTypes"]["SNP"], 2);
        assert_eq!(json["generalStats"]["chromosomeDistribution"]["17"], 1);
        assert_eq!(json["generalStats"]["qualityMetrics"]["mean"], 30.0);

        let text = json.to_string();
        assert!(!text.contains("position"));
        assert!(!text.contains("BRCA1"));
    }

    #[test]
    fn test_detailed_tier_applies_medium_filter() {
        let view = TierPartitioner::project(&sample(), AccessTier::Detailed, 1000);
        let TierView::Detailed(detailed) = view else {
            panic!("expected detailed view");
        };

        let first = &detailed.filtered_variants[0];
        assert_eq!(first.gene.as_deref(), Some("BRCA1"));
        assert_eq!(first.position, Some(123456));
        assert!(first.sequence.is_none());
        assert!(first.exact_position.is_none());
        assert!(first.individual_id.is_none());

        let json = serde_json::to_value(&detailed.gene_list).unwrap();
        assert_eq!(
            json,
            json!([{"symbol": "BRCA1", "name": "BRCA1 DNA Repair Associated", "chromosome": "17"}])
        );
        assert_eq!(detailed.phenotypes.len(), 1);
        assert_eq!(detailed.summary.total_variants, 2);
    }

    #[test]
    fn test_full_tier_carries_original_dataset() {
        let dataset = sample();
        let view = TierPartitioner::project(&dataset, AccessTier::Full, 1000);
        let json = serde_json::to_value(&view).unwrap();

        assert_eq!(json["type"], "full");
        assert_eq!(json["accessLevel"], 3);
        assert_eq!(json["variants"][0]["individualId"], "P-001");

        let back: TierView = serde_json::from_value(json).unwrap();
        let TierView::Full(full) = back else {
            panic!("expected full view");
        };
        assert_eq!(full.dataset, dataset);
    }

    #[test]
    fn test_views_roundtrip_through_tag() {
        let views = TierPartitioner::partition_with_timestamp(&sample(), 42);
        assert_eq!(views.len(), 3);
        for (tier, view) in views {
            assert_eq!(view.tier(), tier);
            let json = serde_json::to_string(&view).unwrap();
            let back: TierView = serde_json::from_str(&json).unwrap();
            assert_eq!(back, view);
        }
    }

    #[test]
    fn test_projection_never_enriches() {
        let dataset = GeneticDataset {
            genes: vec![gnc_core::types::Gene {
                symbol: Some("TP53".into()),
                ..Default::default()
            }],
            ..Default::default()
        };
        let TierView::Detailed(detailed) =
            TierPartitioner::project(&dataset, AccessTier::Detailed, 0)
        else {
            panic!("expected detailed view");
        };
        assert!(detailed.filtered_variants.is_empty());
        assert!(detailed.phenotypes.is_empty());
        assert_eq!(detailed.gene_list[0].name, None);
    }
}
