//! Batch evaluation of predicted annotation documents against gold ones.

use std::collections::BTreeMap;
use std::sync::Arc;

use leasex_scoring::feedback::PASS_THRESHOLD;
use leasex_scoring::{FieldMetric, FieldsConfig, Judge, MatcherRegistry, ScoreStats, ScoringError};
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::json_ref::{JsonRef, JsonRefError};

#[derive(Debug, Error)]
pub enum EvaluateError {
    #[error(transparent)]
    Scoring(#[from] ScoringError),
    #[error("field '{field}': {source}")]
    JsonRef {
        field: String,
        #[source]
        source: JsonRefError,
    },
    #[error("{0}")]
    Documents(String),
}

/// Documents keyed by name, in name order.
pub type Documents = BTreeMap<String, Value>;

/// Parse a JSON object mapping document names to annotation documents.
pub fn parse_documents(input: &str) -> Result<Documents, EvaluateError> {
    let value: Value =
        serde_json::from_str(input).map_err(|e| EvaluateError::Documents(e.to_string()))?;
    match value {
        Value::Object(map) => Ok(map.into_iter().collect()),
        other => Err(EvaluateError::Documents(format!(
            "expected an object of documents, got {}",
            leasex_scoring::feedback::type_name(&other)
        ))),
    }
}

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldOutcome {
    pub score: f64,
    pub feedback: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct FieldStats {
    pub field_name: String,
    pub json_ref: String,
    pub matcher: String,
    pub total: usize,
    pub correct: usize,
    pub scores: Vec<f64>,
}

impl FieldStats {
    pub fn accuracy(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.correct as f64 / self.total as f64
        }
    }

    pub fn mean_score(&self) -> f64 {
        ScoreStats::from_scores(&self.scores).mean
    }

    fn record(&mut self, score: f64) {
        self.total += 1;
        if score >= PASS_THRESHOLD {
            self.correct += 1;
        }
        self.scores.push(score);
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Evaluation {
    pub processed: usize,
    pub skipped: usize,
    /// Gold documents with no prediction.
    pub skipped_documents: Vec<String>,
    pub fields: BTreeMap<String, FieldStats>,
    pub documents: BTreeMap<String, BTreeMap<String, FieldOutcome>>,
}

impl Evaluation {
    pub fn total_evaluations(&self) -> usize {
        self.fields.values().map(|f| f.total).sum()
    }

    pub fn total_correct(&self) -> usize {
        self.fields.values().map(|f| f.correct).sum()
    }

    pub fn overall_accuracy(&self) -> f64 {
        match self.total_evaluations() {
            0 => 0.0,
            n => self.total_correct() as f64 / n as f64,
        }
    }

    /// Statistics over every (document, field) score.
    pub fn score_stats(&self) -> ScoreStats {
        let all: Vec<f64> = self
            .fields
            .values()
            .flat_map(|f| f.scores.iter().copied())
            .collect();
        ScoreStats::from_scores(&all)
    }

    /// Fields by accuracy, best first. Ties keep name order.
    pub fn ranked_fields(&self) -> Vec<&FieldStats> {
        let mut ranked: Vec<&FieldStats> = self.fields.values().collect();
        ranked.sort_by(|a, b| b.accuracy().total_cmp(&a.accuracy()));
        ranked
    }
}

// ---------------------------------------------------------------------------
// Evaluator
// ---------------------------------------------------------------------------

struct FieldPlan {
    metric: FieldMetric,
    json_ref: JsonRef,
}

pub struct Evaluator {
    plans: BTreeMap<String, FieldPlan>,
}

impl Evaluator {
    pub fn new(
        config: &FieldsConfig,
        registry: &MatcherRegistry,
        judge: Option<Arc<dyn Judge>>,
    ) -> Result<Self, EvaluateError> {
        let mut plans = BTreeMap::new();
        for (name, field) in &config.fields {
            let json_ref = field
                .json_ref
                .as_deref()
                .unwrap_or_default()
                .parse::<JsonRef>()
                .map_err(|source| EvaluateError::JsonRef {
                    field: name.clone(),
                    source,
                })?;
            if json_ref == JsonRef::Missing {
                log::debug!("{name}: no json_ref, both sides resolve to null");
            }
            let metric = FieldMetric::new(field, registry, judge.clone())?;
            plans.insert(name.clone(), FieldPlan { metric, json_ref });
        }
        log::info!("evaluator ready with {} field(s)", plans.len());
        Ok(Self { plans })
    }

    /// Score every configured field of one document pair.
    pub fn evaluate_document(
        &self,
        gold: &Value,
        pred: &Value,
    ) -> Result<BTreeMap<String, FieldOutcome>, EvaluateError> {
        let mut outcomes = BTreeMap::new();
        for (name, plan) in &self.plans {
            let g = plan.json_ref.resolve(gold);
            let p = plan.json_ref.resolve(pred);
            let result = plan.metric.evaluate_values(&g, &p)?;
            log::debug!("{name}: {:.3}", result.score);
            outcomes.insert(
                name.clone(),
                FieldOutcome {
                    score: result.score,
                    feedback: result.feedback,
                },
            );
        }
        Ok(outcomes)
    }

    /// Evaluate every gold document that has a prediction. Predictions with
    /// no gold counterpart are ignored.
    pub fn evaluate_all(&self, gold: &Documents, pred: &Documents) -> Result<Evaluation, EvaluateError> {
        let mut fields: BTreeMap<String, FieldStats> = self
            .plans
            .iter()
            .map(|(name, plan)| {
                (
                    name.clone(),
                    FieldStats {
                        field_name: name.clone(),
                        json_ref: plan.json_ref.to_string(),
                        matcher: plan.metric.matcher().type_name().to_string(),
                        total: 0,
                        correct: 0,
                        scores: Vec::new(),
                    },
                )
            })
            .collect();

        let mut documents = BTreeMap::new();
        let mut skipped_documents = Vec::new();
        for (name, gold_doc) in gold {
            let Some(pred_doc) = pred.get(name) else {
                log::warn!("no prediction for '{name}', skipping");
                skipped_documents.push(name.clone());
                continue;
            };

            let outcomes = self.evaluate_document(gold_doc, pred_doc)?;
            for (field, outcome) in &outcomes {
                if let Some(stats) = fields.get_mut(field) {
                    stats.record(outcome.score);
                }
            }
            log::info!("evaluated {}/{}: {name}", documents.len() + 1, gold.len());
            documents.insert(name.clone(), outcomes);
        }

        Ok(Evaluation {
            processed: documents.len(),
            skipped: skipped_documents.len(),
            skipped_documents,
            fields,
            documents,
        })
    }
}
