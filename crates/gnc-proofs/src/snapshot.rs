//! Privacy-reduced dataset snapshots. A generator commits to one of these,
//! never to the literal dataset.

use gnc_core::types::GeneticDataset;
use gnc_core::GncResult;
use serde::Serialize;
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;

use crate::commitment::merkle_root;

const MAX_DEPTH: usize = 3;
const REDACTED: &str = "<REDACTED>";

const SENSITIVE_FIELDS: [&str; 14] = [
    "sequence",
    "allele",
    "genotype",
    "phenotype",
    "patient_id",
    "sample_id",
    "individual_id",
    "dna",
    "rna",
    "protein",
    "mutation",
    "variant_call",
    "snp_data",
    "indel_data",
];

/// Lowercase with `_` and `-` removed, so `sampleId`, `sample_id` and
/// `Sample-ID` compare equal.
fn normalize_key(name: &str) -> String {
    name.chars()
        .filter(|c| !matches!(c, '_' | '-'))
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

/// Case- and separator-insensitive substring match against the sensitive
/// field list.
pub fn is_sensitive_field(name: &str) -> bool {
    let key = normalize_key(name);
    SENSITIVE_FIELDS
        .iter()
        .any(|field| key.contains(&normalize_key(field)))
}

/// Shape of `value` with every leaf replaced by its type name and
/// sensitive keys redacted. Arrays keep their length and the shape of
/// their first element.
pub fn structure(value: &Value) -> Value {
    structure_at(value, 0)
}

fn structure_at(value: &Value, depth: usize) -> Value {
    if depth > MAX_DEPTH {
        return Value::String(type_name(value).into());
    }
    match value {
        Value::Array(items) => json!({
            "type": "array",
            "length": items.len(),
            "sampleStructure": items.first().map(|first| structure_at(first, depth + 1)),
        }),
        Value::Object(map) => {
            let mut out = Map::new();
            for (key, child) in map {
                let shape = if is_sensitive_field(key) {
                    Value::String(REDACTED.into())
                } else {
                    structure_at(child, depth + 1)
                };
                out.insert(key.clone(), shape);
            }
            Value::Object(out)
        }
        leaf => Value::String(type_name(leaf).into()),
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null | Value::Array(_) | Value::Object(_) => "object",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
    }
}

/// Snapshot for gene presence and absence proofs.
pub fn gene_snapshot(dataset: &GeneticDataset) -> GncResult<Value> {
    Ok(structure(&serde_json::to_value(dataset)?))
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VariantSnapshot {
    /// Hex Merkle root over medium-filtered variants
    pub merkle_root: String,
    pub variant_count: u64,
}

pub fn variant_snapshot(dataset: &GeneticDataset) -> GncResult<VariantSnapshot> {
    let filtered: Vec<_> = dataset.all_variants().map(|v| v.medium_filtered()).collect();
    Ok(VariantSnapshot {
        merkle_root: hex::encode(merkle_root(&filtered)?),
        variant_count: filtered.len() as u64,
    })
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateSnapshot {
    pub total_variants: u64,
    pub total_genes: u64,
    pub variant_types: BTreeMap<String, u64>,
    pub chromosome_distribution: BTreeMap<String, u64>,
    pub total_data_points: u64,
}

pub fn aggregate_snapshot(dataset: &GeneticDataset) -> AggregateSnapshot {
    let mut snapshot = AggregateSnapshot {
        total_variants: dataset.variants.len() as u64,
        total_genes: dataset.genes.len() as u64,
        total_data_points: dataset.data_points(),
        ..Default::default()
    };
    for variant in &dataset.variants {
        if let Some(t) = variant.variant_type {
            *snapshot.variant_types.entry(t.to_string()).or_insert(0) += 1;
        }
        if let Some(chromosome) = &variant.chromosome {
            *snapshot
                .chromosome_distribution
                .entry(chromosome.clone())
                .or_insert(0) += 1;
        }
    }
    snapshot
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dataset() -> GeneticDataset {
        serde_json::from_value(json!({
            "variants": [
                {"chromosome": "1", "position": 123456, "gene": "BRCA1", "type": "SNP",
                 "allele": "G", "sequence": "ACGT", "individualId": "P-1"},
                {"chromosome": "1", "gene": "TP53", "type": "INDEL"}
            ],
            "genes": [{"symbol": "BRCA1", "chromosome": "17"}],
            "sequences": [{"id": "s1", "sequence": "ACGT"}]
        }))
        .unwrap()
    }

    #[test]
    fn test_sensitive_fields_match_substrings() {
        assert!(is_sensitive_field("Sequence"));
        assert!(is_sensitive_field("rawDNA"));
        assert!(is_sensitive_field("patient_id_hash"));
        assert!(is_sensitive_field("individualId"));
        assert!(is_sensitive_field("sampleId"));
        assert!(is_sensitive_field("Patient-ID"));
        assert!(is_sensitive_field("variantCalls"));
        assert!(!is_sensitive_field("gene"));
        assert!(!is_sensitive_field("chromosome"));
    }

    #[test]
    fn test_structure_redacts_and_hides_values() {
        let shape = gene_snapshot(&dataset()).unwrap();
        let sample = &shape["variants"]["sampleStructure"];
        assert_eq!(shape["variants"]["length"], json!(2));
        assert_eq!(sample["gene"], json!("string"));
        assert_eq!(sample["position"], json!("number"));
        assert_eq!(sample["allele"], json!(REDACTED));
        assert_eq!(sample["sequence"], json!(REDACTED));
        assert_eq!(sample["individualId"], json!(REDACTED));

        let text = serde_json::to_string(&shape).unwrap();
        assert!(!text.contains("BRCA1"));
        assert!(!text.contains("123456"));
    }

    #[test]
    fn test_structure_depth_limit() {
        let deep = json!({"a": {"b": {"c": {"d": {"e": 1}}}}});
        assert_eq!(structure(&deep), json!({"a": {"b": {"c": {"d": "object"}}}}));
        assert_eq!(structure(&Value::Null), json!("object"));
        assert_eq!(structure(&json!([])), json!({"type": "array", "length": 0, "sampleStructure": null}));
    }

    #[test]
    fn test_variant_snapshot_ignores_filtered_fields() {
        let mut other = dataset();
        other.variants[0].sequence = Some("TTTT".into());
        other.variants[0].individual_id = None;
        assert_eq!(variant_snapshot(&dataset()).unwrap(), variant_snapshot(&other).unwrap());

        other.variants[0].position = Some(1);
        assert_ne!(variant_snapshot(&dataset()).unwrap(), variant_snapshot(&other).unwrap());
    }

    #[test]
    fn test_aggregate_snapshot_counts() {
        let snapshot = aggregate_snapshot(&dataset());
        assert_eq!(snapshot.total_variants, 2);
        assert_eq!(snapshot.total_genes, 1);
        assert_eq!(snapshot.total_data_points, 4);
        assert_eq!(snapshot.variant_types["SNP"], 1);
        assert_eq!(snapshot.chromosome_distribution["1"], 2);
    }
}
