use std::fmt;
use std::sync::Arc;

use serde::Deserialize;
use serde_json::{Map, Value};

use super::{parse_params, MatchResult, Params};
use crate::error::ScoringError;
use crate::feedback::json_list_feedback;
use crate::hybrid::{HybridScorer, HybridWeights, Judge};
use crate::records::{reconcile, FieldSchema};
use crate::registry::MatcherRegistry;

#[derive(Debug, Deserialize)]
#[serde(default)]
struct JsonParams {
    programmatic_weight: f64,
    llm_weight: f64,
    rubric: Option<String>,
    field_schema: Option<Map<String, Value>>,
}

impl Default for JsonParams {
    fn default() -> Self {
        let w = HybridWeights::default();
        Self {
            programmatic_weight: w.programmatic(),
            llm_weight: w.llm(),
            rubric: None,
            field_schema: None,
        }
    }
}

/// Lists of records, scored by reconciliation and, when a judge is
/// attached, blended with the judge's verdict.
#[derive(Clone, Default)]
pub struct JsonMatcher {
    weights: HybridWeights,
    rubric: Option<String>,
    schema: Option<FieldSchema>,
    judge: Option<Arc<dyn Judge>>,
}

impl fmt::Debug for JsonMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JsonMatcher")
            .field("weights", &self.weights)
            .field("rubric", &self.rubric.as_ref().map(|_| "<custom>"))
            .field("schema", &self.schema)
            .field("judge", &self.judge.as_ref().map(|_| "<judge>"))
            .finish()
    }
}

impl JsonMatcher {
    /// Sub-field matchers in `field_schema` are built through `registry`, so
    /// they may use any registered type, including nested `json`.
    pub fn from_params(
        field: &str,
        params: &Params,
        registry: &MatcherRegistry,
    ) -> Result<Self, ScoringError> {
        let p: JsonParams = parse_params(field, "json", params)?;
        let weights = HybridWeights::new(p.programmatic_weight, p.llm_weight)?;

        let schema = match p.field_schema {
            None => None,
            Some(entries) => {
                let mut schema = FieldSchema::new();
                for (sub_field, entry) in entries {
                    let (sub_type, sub_params) = schema_entry(field, &sub_field, entry)?;
                    let matcher = registry.create(&sub_field, &sub_type, &sub_params)?;
                    schema.insert(sub_field, matcher);
                }
                Some(schema)
            }
        };

        Ok(Self {
            weights,
            rubric: p.rubric,
            schema,
            judge: None,
        })
    }

    pub fn schema(&self) -> Option<&FieldSchema> {
        self.schema.as_ref()
    }

    pub fn weights(&self) -> HybridWeights {
        self.weights
    }

    pub fn has_judge(&self) -> bool {
        self.judge.is_some()
    }

    pub(crate) fn set_judge(&mut self, judge: Arc<dyn Judge>) {
        // Sub-fields that are themselves JSON lists get the judge too.
        if let Some(schema) = self.schema.take() {
            self.schema = Some(
                schema
                    .into_iter()
                    .map(|(k, m)| (k, m.with_judge(Arc::clone(&judge))))
                    .collect(),
            );
        }
        self.judge = Some(judge);
    }

    /// Without a judge the programmatic score is used alone.
    pub fn compare(
        &self,
        field: &str,
        gold: &Value,
        pred: &Value,
    ) -> Result<MatchResult, ScoringError> {
        let schema = self.schema.as_ref();
        match &self.judge {
            Some(judge) => {
                let mut scorer = HybridScorer::new(self.weights, Some(judge.as_ref()));
                if let Some(rubric) = &self.rubric {
                    scorer = scorer.with_rubric(rubric);
                }
                let report = scorer.score(field, gold, pred, schema)?;
                let feedback = json_list_feedback(
                    field,
                    report.score,
                    &report.programmatic,
                    pred,
                    Some(&report.llm_reasoning),
                );
                Ok(MatchResult::new(report.score, feedback))
            }
            None => {
                let report = reconcile(field, gold, pred, schema)?;
                let feedback = json_list_feedback(field, report.score, &report, pred, None);
                Ok(MatchResult::new(report.score, feedback))
            }
        }
    }
}

/// Split a schema entry into its type and matcher params. Params may sit
/// beside `type` or under a nested `params` table.
fn schema_entry(field: &str, sub_field: &str, entry: Value) -> Result<(String, Params), ScoringError> {
    let Value::Object(mut map) = entry else {
        return Err(ScoringError::ConfigValidation(format!(
            "field '{field}': field_schema entry '{sub_field}' must be a table"
        )));
    };
    let sub_type = match map.remove("type") {
        Some(Value::String(t)) => t,
        _ => {
            return Err(ScoringError::ConfigValidation(format!(
                "field '{field}': field_schema entry '{sub_field}' needs a string 'type'"
            )))
        }
    };
    if let Some(Value::Object(nested)) = map.remove("params") {
        map.extend(nested);
    }
    Ok((sub_type, map))
}
