//! Genetic dataset model shared by the encryption and proof halves.
//!
//! Every record keeps unknown keys in a flattened `extra` map so values that
//! arrive as free-form JSON survive a full round trip unchanged.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Variant classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum VariantType {
    Snp,
    Indel,
    Deletion,
    Insertion,
    Cnv,
    Sv,
    Str,
    Complex,
}

impl VariantType {
    pub fn as_str(&self) -> &'static str {
        match self {
            VariantType::Snp => "SNP",
            VariantType::Indel => "INDEL",
            VariantType::Deletion => "DELETION",
            VariantType::Insertion => "INSERTION",
            VariantType::Cnv => "CNV",
            VariantType::Sv => "SV",
            VariantType::Str => "STR",
            VariantType::Complex => "COMPLEX",
        }
    }

    /// True when a variant of this type satisfies a claim naming `claimed`.
    /// INDEL covers deletions and insertions; every other type matches itself.
    pub fn satisfies(self, claimed: VariantType) -> bool {
        self == claimed
            || (claimed == VariantType::Indel
                && matches!(self, VariantType::Deletion | VariantType::Insertion))
    }
}

impl fmt::Display for VariantType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VariantType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "SNP" => Ok(VariantType::Snp),
            "INDEL" => Ok(VariantType::Indel),
            "DELETION" => Ok(VariantType::Deletion),
            "INSERTION" => Ok(VariantType::Insertion),
            "CNV" => Ok(VariantType::Cnv),
            "SV" => Ok(VariantType::Sv),
            "STR" => Ok(VariantType::Str),
            "COMPLEX" => Ok(VariantType::Complex),
            other => Err(format!("unknown variant type: {other}")),
        }
    }
}

/// A single called variant.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Variant {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chromosome: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alternate: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allele: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub variant_type: Option<VariantType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gene: Option<String>,
    /// Kept as a JSON number so `30` and `30.5` both round-trip as written
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quality: Option<Number>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rs_id: Option<String>,
    /// Raw read sequence around the call
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sequence: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exact_position: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub individual_id: Option<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl Variant {
    /// Declared type, or a classification from the reference/alternate
    /// allele lengths when the type is unset.
    pub fn classify(&self) -> VariantType {
        if let Some(t) = self.variant_type {
            return t;
        }

        let reference = self.reference.as_deref().unwrap_or("");
        let alternate = self.alternate.as_deref().unwrap_or("");

        if reference.len() == 1 && alternate.len() == 1 {
            VariantType::Snp
        } else if reference.len() > alternate.len() {
            VariantType::Deletion
        } else if reference.len() < alternate.len() {
            VariantType::Insertion
        } else {
            VariantType::Complex
        }
    }

    pub fn quality_score(&self) -> Option<f64> {
        self.quality.as_ref().and_then(Number::as_f64)
    }

    /// Copy with the raw sequence, exact position and individual id dropped.
    pub fn medium_filtered(&self) -> Variant {
        Variant {
            sequence: None,
            exact_position: None,
            individual_id: None,
            ..self.clone()
        }
    }

    /// True when `allele` equals the explicit `allele` field or the alternate allele.
    pub fn has_allele(&self, allele: &str) -> bool {
        self.allele.as_deref() == Some(allele) || self.alternate.as_deref() == Some(allele)
    }
}

/// A gene locus.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Gene {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub symbol: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chromosome: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<u64>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl Gene {
    pub fn matches(&self, target: &str) -> bool {
        self.symbol.as_deref() == Some(target) || self.name.as_deref() == Some(target)
    }
}

/// Gene annotation attached to a sequence record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gene: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub symbol: Option<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl Annotation {
    pub fn matches(&self, target: &str) -> bool {
        self.gene.as_deref() == Some(target) || self.symbol.as_deref() == Some(target)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SequenceRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sequence: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub annotations: Vec<Annotation>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub variants: Vec<Variant>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Phenotype {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// The unit every operation reads. Never mutated by the core: each
/// component produces new derived structures from it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GeneticDataset {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub variants: Vec<Variant>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub genes: Vec<Gene>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sequences: Vec<SequenceRecord>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub phenotypes: Vec<Phenotype>,
    /// VCF-style call list kept apart from `variants`
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub vcf: Vec<Variant>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub metadata: Map<String, Value>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// Outcome of [`GeneticDataset::validate`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

impl GeneticDataset {
    /// True when the dataset carries no records and no metadata at all.
    pub fn is_empty(&self) -> bool {
        self.variants.is_empty()
            && self.genes.is_empty()
            && self.sequences.is_empty()
            && self.phenotypes.is_empty()
            && self.vcf.is_empty()
            && self.metadata.is_empty()
            && self.extra.is_empty()
    }

    /// Top-level keys present in the serialized form, sorted.
    pub fn data_types(&self) -> Vec<String> {
        let mut keys = Vec::new();
        if !self.variants.is_empty() {
            keys.push("variants".to_string());
        }
        if !self.genes.is_empty() {
            keys.push("genes".to_string());
        }
        if !self.sequences.is_empty() {
            keys.push("sequences".to_string());
        }
        if !self.phenotypes.is_empty() {
            keys.push("phenotypes".to_string());
        }
        if !self.vcf.is_empty() {
            keys.push("vcf".to_string());
        }
        if !self.metadata.is_empty() {
            keys.push("metadata".to_string());
        }
        keys.extend(self.extra.keys().cloned());
        keys.sort();
        keys
    }

    /// Every variant reachable from the dataset: the variant list, VCF calls,
    /// then per-sequence calls, in that order.
    pub fn all_variants(&self) -> impl Iterator<Item = &Variant> {
        self.variants
            .iter()
            .chain(self.vcf.iter())
            .chain(self.sequences.iter().flat_map(|s| s.variants.iter()))
    }

    /// Number of individual records (variants + genes + sequences).
    pub fn data_points(&self) -> u64 {
        (self.variants.len() + self.genes.len() + self.sequences.len()) as u64
    }

    /// Structural validation with advisory warnings.
    pub fn validate(&self) -> ValidationReport {
        let mut report = ValidationReport::default();

        let has_records = !self.variants.is_empty()
            || !self.genes.is_empty()
            || !self.sequences.is_empty()
            || !self.phenotypes.is_empty();
        if !has_records {
            report.errors.push(
                "genetic data must contain at least one of: variants, genes, sequences, or phenotypes"
                    .to_string(),
            );
        }

        for (index, variant) in self.variants.iter().enumerate() {
            if variant.variant_type.is_none() {
                report
                    .warnings
                    .push(format!("variant at index {index} missing type field"));
            }
            if variant.gene.is_none() && variant.chromosome.is_none() {
                report.warnings.push(format!(
                    "variant at index {index} missing gene or chromosome reference"
                ));
            }
        }

        for (index, gene) in self.genes.iter().enumerate() {
            if gene.symbol.is_none() && gene.name.is_none() {
                report
                    .warnings
                    .push(format!("gene at index {index} missing symbol or name"));
            }
        }

        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_classify_falls_back_to_allele_lengths() {
        let mut v = Variant {
            reference: Some("A".into()),
            alternate: Some("G".into()),
            ..Default::default()
        };
        assert_eq!(v.classify(), VariantType::Snp);

        v.reference = Some("ATG".into());
        assert_eq!(v.classify(), VariantType::Deletion);

        v.alternate = Some("ATGCC".into());
        assert_eq!(v.classify(), VariantType::Insertion);

        v.alternate = Some("CCC".into());
        assert_eq!(v.classify(), VariantType::Complex);

        v.variant_type = Some(VariantType::Cnv);
        assert_eq!(v.classify(), VariantType::Cnv, "declared type wins");
    }

    #[test]
    fn test_indel_covers_deletions_and_insertions() {
        for t in [VariantType::Indel, VariantType::Deletion, VariantType::Insertion] {
            assert!(t.satisfies(VariantType::Indel), "{t} should satisfy INDEL");
        }
        assert!(VariantType::Deletion.satisfies(VariantType::Deletion));
        assert!(!VariantType::Indel.satisfies(VariantType::Deletion));
        assert!(!VariantType::Insertion.satisfies(VariantType::Deletion));
        assert!(!VariantType::Snp.satisfies(VariantType::Indel));
        assert!(!VariantType::Complex.satisfies(VariantType::Indel));
    }

    #[test]
    fn test_integral_quality_round_trips_as_integer() {
        let input = json!({"gene": "BRCA1", "type": "SNP", "quality": 30});
        let variant: Variant = serde_json::from_value(input.clone()).unwrap();
        assert_eq!(variant.quality_score(), Some(30.0));
        assert_eq!(serde_json::to_value(&variant).unwrap(), input);

        let fractional = json!({"quality": 30.5});
        let variant: Variant = serde_json::from_value(fractional.clone()).unwrap();
        assert_eq!(serde_json::to_value(&variant).unwrap(), fractional);
    }

    #[test]
    fn test_unknown_variant_type_is_rejected() {
        let result: Result<Variant, _> = serde_json::from_value(json!({"type": "BOGUS"}));
        assert!(result.is_err());
    }

    #[test]
    fn test_dataset_json_shape_preserved() {
        let input = json!({
            "variants": [{
                "chromosome": "1", "position": 123456, "reference": "A",
                "alternate": "G", "gene": "BRCA1", "type": "SNP",
                "callerNote": "kept"
            }],
            "genes": [{"symbol": "BRCA1", "name": "BRCA1 DNA Repair Associated", "chromosome": "17"}],
            "lab": "north"
        });

        let dataset: GeneticDataset = serde_json::from_value(input.clone()).unwrap();
        assert_eq!(dataset.variants[0].extra["callerNote"], json!("kept"));
        assert_eq!(dataset.extra["lab"], json!("north"));

        let back = serde_json::to_value(&dataset).unwrap();
        assert_eq!(back, input);
    }

    #[test]
    fn test_data_types_sorted() {
        let dataset: GeneticDataset = serde_json::from_value(json!({
            "variants": [{"type": "SNP"}],
            "genes": [{"symbol": "TP53"}]
        }))
        .unwrap();
        assert_eq!(dataset.data_types(), vec!["genes", "variants"]);
    }

    #[test]
    fn test_validate_reports_errors_and_warnings() {
        let empty = GeneticDataset::default();
        assert!(!empty.validate().is_valid());
        assert!(empty.is_empty());

        let dataset = GeneticDataset {
            variants: vec![Variant::default()],
            genes: vec![Gene::default()],
            ..Default::default()
        };
        let report = dataset.validate();
        assert!(report.is_valid());
        assert_eq!(report.warnings.len(), 3);
    }

    #[test]
    fn test_all_variants_includes_sequence_calls() {
        let dataset = GeneticDataset {
            variants: vec![Variant {
                gene: Some("A".into()),
                ..Default::default()
            }],
            sequences: vec![SequenceRecord {
                variants: vec![Variant {
                    gene: Some("B".into()),
                    ..Default::default()
                }],
                ..Default::default()
            }],
            ..Default::default()
        };
        let genes: Vec<_> = dataset
            .all_variants()
            .filter_map(|v| v.gene.as_deref())
            .collect();
        assert_eq!(genes, vec!["A", "B"]);
    }
}
