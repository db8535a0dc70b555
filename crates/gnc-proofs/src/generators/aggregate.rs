use gnc_core::config::ProofConfig;
use gnc_core::types::{GeneticDataset, Variant};
use gnc_core::{GncError, GncResult};
use serde::Serialize;
use serde_json::{Map, Number, Value};
use std::collections::BTreeMap;

use super::{assemble, ClaimGenerator, Evidence, GenerateOptions};
use crate::claim::{AggregateQuery, ProofClaim, QueryType, Statistic, ValueRange};
use crate::kind::ProofKind;
use crate::params::AggregateBody;
use crate::record::ProofRecord;
use crate::snapshot::aggregate_snapshot;

/// Frequency reported for a matched target variant until a population
/// reference is wired in.
const PLACEHOLDER_FREQUENCY: f64 = 0.1;

/// Raw aggregate and the denominator used by percentage and ratio.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Aggregate {
    value: f64,
    total: Option<f64>,
}

/// Numbers compare by value, so a filter of `30` matches a stored `30.0`.
fn filter_value_eq(want: &Value, have: &Value) -> bool {
    match (want, have) {
        (Value::Number(a), Value::Number(b)) => a.as_f64() == b.as_f64(),
        _ => want == have,
    }
}

fn matches_filters(variant: &Variant, filters: &Map<String, Value>) -> bool {
    let Ok(Value::Object(fields)) = serde_json::to_value(variant) else {
        return false;
    };
    filters
        .iter()
        .all(|(key, want)| fields.get(key).is_some_and(|have| filter_value_eq(want, have)))
}

fn compute(dataset: &GeneticDataset, query: &AggregateQuery) -> Aggregate {
    match query.query_type {
        QueryType::VariantCount => {
            let total = dataset.variants.len();
            let count = match &query.filters {
                Some(filters) => dataset
                    .variants
                    .iter()
                    .filter(|v| matches_filters(v, filters))
                    .count(),
                None => total,
            };
            Aggregate {
                value: count as f64,
                total: Some(total as f64),
            }
        }
        QueryType::GenePresenceCount => {
            let targets = query.target_genes.as_deref().unwrap_or_default();
            let present = targets
                .iter()
                .filter(|gene| {
                    dataset.genes.iter().any(|g| g.matches(gene))
                        || dataset.variants.iter().any(|v| v.gene.as_deref() == Some(gene.as_str()))
                })
                .count();
            Aggregate {
                value: present as f64,
                total: Some(targets.len() as f64),
            }
        }
        QueryType::DiversityIndex => {
            let mut counts: BTreeMap<_, u64> = BTreeMap::new();
            for t in dataset.variants.iter().filter_map(|v| v.variant_type) {
                *counts.entry(t).or_insert(0) += 1;
            }
            let total: u64 = counts.values().sum();
            let diversity = if total == 0 {
                0.0
            } else {
                counts
                    .values()
                    .map(|&c| {
                        let p = c as f64 / total as f64;
                        -p * p.log2()
                    })
                    .sum()
            };
            Aggregate {
                value: diversity,
                total: None,
            }
        }
        QueryType::PopulationFrequency => {
            let found = query.target_variant.as_ref().is_some_and(|target| {
                dataset.variants.iter().any(|v| target.matches(v))
            });
            Aggregate {
                value: if found { PLACEHOLDER_FREQUENCY } else { 0.0 },
                total: Some(1.0),
            }
        }
    }
}

/// Reduce a raw aggregate through the requested statistic.
fn reduce(aggregate: Aggregate, query: &AggregateQuery) -> f64 {
    let Aggregate { value, total } = aggregate;
    let flag = |b: bool| if b { 1.0 } else { 0.0 };
    match query.statistic {
        Statistic::Count => value.floor(),
        Statistic::Percentage => match total {
            Some(t) if t > 0.0 => (value / t * 100.0).round(),
            _ => 0.0,
        },
        Statistic::Ratio => match total {
            Some(t) if t > 0.0 => value / t,
            _ => 0.0,
        },
        Statistic::AboveThreshold => query.threshold.map_or(0.0, |t| flag(value > t)),
        Statistic::BelowThreshold => query.threshold.map_or(0.0, |t| flag(value < t)),
        Statistic::Range => query
            .range
            .map_or(0.0, |ValueRange { min, max }| flag(value >= min && value <= max)),
    }
}

/// Integral values become JSON integers so a count of one reads as `1`.
fn to_json_number(value: f64) -> Value {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        Value::Number(Number::from(value as i64))
    } else {
        Number::from_f64(value).map_or(Value::Null, Value::Number)
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AggregateWitness<'a> {
    query_type: QueryType,
    statistic_type: Statistic,
    result: &'a Value,
    threshold: Option<f64>,
    range: Option<ValueRange>,
    filters: Option<&'a Map<String, Value>>,
    computation_method: &'static str,
}

/// Proves a reduced statistic over the dataset. Only the reduced value is
/// asserted, never the raw aggregate.
#[derive(Debug, Clone, Default)]
pub struct AggregateGenerator {
    config: ProofConfig,
}

impl AggregateGenerator {
    pub fn new(config: ProofConfig) -> Self {
        Self { config }
    }

    /// The reduced value a proof for `query` would embed.
    pub fn evaluate(dataset: &GeneticDataset, query: &AggregateQuery) -> Value {
        to_json_number(reduce(compute(dataset, query), query))
    }
}

impl ClaimGenerator for AggregateGenerator {
    type Claim = AggregateQuery;

    const KIND: ProofKind = ProofKind::Aggregate;

    fn config(&self) -> &ProofConfig {
        &self.config
    }

    fn public_claim(claim: &AggregateQuery) -> ProofClaim {
        ProofClaim::Aggregate(claim.clone())
    }

    fn generate(
        &self,
        dataset: &GeneticDataset,
        query: &AggregateQuery,
        opts: &GenerateOptions,
    ) -> GncResult<ProofRecord> {
        query.validate()?;
        let opts = opts.resolve(&self.config)?;

        let snapshot = aggregate_snapshot(dataset);
        if snapshot.total_data_points == 0 {
            return Err(GncError::InvalidData(
                "aggregate proofs need at least one variant, gene or sequence".into(),
            ));
        }

        let result = Self::evaluate(dataset, query);
        let body = serde_json::to_value(AggregateBody {
            statistic: query.statistic,
            data_size: snapshot.total_data_points,
            result: result.clone(),
            confidence_level: opts.confidence_level,
            precision: opts.precision.clone(),
            privacy_level: opts.privacy_level.clone(),
        })?;
        let evidence = Evidence {
            witness: AggregateWitness {
                query_type: query.query_type,
                statistic_type: query.statistic,
                result: &result,
                threshold: query.threshold,
                range: query.range,
                filters: query.filters.as_ref(),
                computation_method: "direct",
            },
            snapshot,
            body,
            confidence: None,
        };
        assemble(&self.config, &Self::public_claim(query), evidence, &opts)
    }
}
