//! Record-list reconciliation.
//!
//! A JSON field holds a list of records (e.g. one per rent step). Gold and
//! predicted lists are parsed, paired by optimal assignment on per-record
//! similarity, and scored on two axes:
//!
//! - count score: `(min(n_gold, n_pred) / max(n_gold, n_pred))²`
//! - quality score: mean similarity of the matched pairs
//!
//! The final score is `count · quality`, so a right count with wrong values
//! fails, and so do right values with a wrong count. Unmatched records are
//! reported as counts and not scored individually.
//!
//! The assignment step is O(n³) in the larger list; fine for the tens of
//! records a lease holds, not for thousands.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::assignment::max_weight_assignment;
use crate::error::ScoringError;
use crate::literal::parse_python_literal;
use crate::matchers::Matcher;
use crate::normalize::normalize_value;

pub type Record = Map<String, Value>;

/// Sub-field matchers for the keys of a record.
pub type FieldSchema = BTreeMap<String, Matcher>;

/// A field at or above this score counts as perfect in a record comparison.
const PERFECT_FIELD: f64 = 0.99;

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

/// Why a value could not be read as a record list.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecordParseError {
    pub message: String,
    /// 1-based position from the JSON parser, when the text was JSON-shaped.
    pub line: Option<usize>,
    pub column: Option<usize>,
}

impl fmt::Display for RecordParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.line, self.column) {
            (Some(line), Some(col)) => write!(f, "{} (line {line}, column {col})", self.message),
            _ => f.write_str(&self.message),
        }
    }
}

impl RecordParseError {
    fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            line: None,
            column: None,
        }
    }
}

/// Read a value as a list of records.
///
/// Accepts a list of objects, a single object (wrapped into a one-element
/// list), or a string holding either as JSON or as a Python literal.
pub fn parse_records_detailed(value: &Value) -> Result<Vec<Record>, RecordParseError> {
    match value {
        Value::Array(items) => items
            .iter()
            .map(|item| match item {
                Value::Object(map) => Ok(map.clone()),
                other => Err(RecordParseError::new(format!(
                    "list element is {}, not an object",
                    crate::feedback::type_name(other)
                ))),
            })
            .collect(),
        Value::Object(map) => Ok(vec![map.clone()]),
        Value::String(s) => {
            let trimmed = s.trim();
            let parsed = match serde_json::from_str::<Value>(trimmed) {
                Ok(v) => v,
                Err(json_err) => match parse_python_literal(trimmed) {
                    Some(v) => v,
                    None => {
                        return Err(RecordParseError {
                            message: json_err.to_string(),
                            line: Some(json_err.line()),
                            column: Some(json_err.column()),
                        })
                    }
                },
            };
            if parsed.is_string() {
                return Err(RecordParseError::new("text is a quoted string, not records"));
            }
            parse_records_detailed(&parsed)
        }
        Value::Null => Err(RecordParseError::new("value is null")),
        other => Err(RecordParseError::new(format!(
            "expected a list of records, got {}",
            crate::feedback::type_name(other)
        ))),
    }
}

/// Like [`parse_records_detailed`], discarding the reason.
pub fn parse_records(value: &Value) -> Option<Vec<Record>> {
    parse_records_detailed(value).ok()
}

// ---------------------------------------------------------------------------
// Per-record comparison
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecordComparison {
    /// Mean of the field scores; 1.0 when neither record has keys.
    pub score: f64,
    pub field_scores: BTreeMap<String, f64>,
    pub perfect_fields: usize,
    pub failed_fields: usize,
    pub total_fields: usize,
}

/// Compare two records over the union of their keys.
///
/// With a schema, each key is scored by its sub-field matcher (and a key
/// missing from the schema is an error). Without one, values must be equal
/// after trimming and lower-casing, and a key absent on one side scores 0.
pub fn compare_records(
    field: &str,
    gold: &Record,
    pred: &Record,
    schema: Option<&FieldSchema>,
) -> Result<RecordComparison, ScoringError> {
    let keys: BTreeSet<&String> = gold.keys().chain(pred.keys()).collect();
    if let Some(schema) = schema {
        check_schema_covers(field, schema, keys.iter().copied())?;
    }

    let mut field_scores = BTreeMap::new();
    for key in &keys {
        let g = gold.get(*key).unwrap_or(&Value::Null);
        let p = pred.get(*key).unwrap_or(&Value::Null);
        let score = match schema.and_then(|s| s.get(*key)) {
            Some(matcher) => matcher.score(g, p)?.score,
            None => simple_field_match(g, p),
        };
        field_scores.insert((*key).clone(), score);
    }

    let total_fields = field_scores.len();
    let score = if total_fields == 0 {
        1.0
    } else {
        field_scores.values().sum::<f64>() / total_fields as f64
    };
    Ok(RecordComparison {
        score,
        perfect_fields: field_scores.values().filter(|s| **s >= PERFECT_FIELD).count(),
        failed_fields: field_scores.values().filter(|s| **s == 0.0).count(),
        total_fields,
        field_scores,
    })
}

fn simple_field_match(gold: &Value, pred: &Value) -> f64 {
    match (gold.is_null(), pred.is_null()) {
        (true, true) => 1.0,
        (true, false) | (false, true) => 0.0,
        (false, false) if normalize_value(gold) == normalize_value(pred) => 1.0,
        (false, false) => 0.0,
    }
}

fn check_schema_covers<'a>(
    field: &str,
    schema: &FieldSchema,
    keys: impl IntoIterator<Item = &'a String>,
) -> Result<(), ScoringError> {
    for key in keys {
        if !schema.contains_key(key) {
            return Err(ScoringError::IncompleteSchema {
                field: field.into(),
                key: key.clone(),
                available: schema.keys().cloned().collect(),
            });
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Reconciliation
// ---------------------------------------------------------------------------

/// Why reconciliation short-circuited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReconcileFlag {
    /// Neither side parsed. Scored 1.0 since the sides agree.
    BothUnparseable,
    GoldUnparseable,
    PredUnparseable,
    EmptyPrediction,
    HallucinatedRecords,
}

impl fmt::Display for ReconcileFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::BothUnparseable => "neither side parsed as records",
            Self::GoldUnparseable => "gold failed to parse as records",
            Self::PredUnparseable => "prediction failed to parse as records",
            Self::EmptyPrediction => "empty prediction",
            Self::HallucinatedRecords => "records predicted where gold has none",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchedRecord {
    pub gold_index: usize,
    pub pred_index: usize,
    pub comparison: RecordComparison,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReconcileReport {
    pub score: f64,
    pub count_score: f64,
    pub quality_score: f64,
    pub n_gold: usize,
    pub n_pred: usize,
    pub n_matched: usize,
    pub n_unmatched_gold: usize,
    pub n_unmatched_pred: usize,
    pub flag: Option<ReconcileFlag>,
    /// Matched pairs sorted by gold index.
    pub pairs: Vec<MatchedRecord>,
}

impl ReconcileReport {
    fn flagged(score: f64, flag: ReconcileFlag, n_gold: usize, n_pred: usize) -> Self {
        Self {
            score,
            count_score: score,
            quality_score: score,
            n_gold,
            n_pred,
            n_matched: 0,
            n_unmatched_gold: n_gold,
            n_unmatched_pred: n_pred,
            flag: Some(flag),
            pairs: Vec::new(),
        }
    }

    /// Per-field mean score across matched pairs.
    pub fn field_means(&self) -> BTreeMap<String, f64> {
        let mut sums: BTreeMap<String, (f64, usize)> = BTreeMap::new();
        for pair in &self.pairs {
            for (key, score) in &pair.comparison.field_scores {
                let entry = sums.entry(key.clone()).or_insert((0.0, 0));
                entry.0 += score;
                entry.1 += 1;
            }
        }
        sums.into_iter()
            .map(|(k, (sum, n))| (k, sum / n as f64))
            .collect()
    }
}

/// Parse both sides and reconcile them. Parse failures are scored, not
/// raised; the only error is a schema that does not cover a record key.
pub fn reconcile(
    field: &str,
    gold: &Value,
    pred: &Value,
    schema: Option<&FieldSchema>,
) -> Result<ReconcileReport, ScoringError> {
    match (parse_records(gold), parse_records(pred)) {
        (None, None) => Ok(ReconcileReport::flagged(1.0, ReconcileFlag::BothUnparseable, 0, 0)),
        (None, Some(p)) => Ok(ReconcileReport::flagged(
            0.0,
            ReconcileFlag::GoldUnparseable,
            0,
            p.len(),
        )),
        (Some(g), None) => Ok(ReconcileReport::flagged(
            0.0,
            ReconcileFlag::PredUnparseable,
            g.len(),
            0,
        )),
        (Some(g), Some(p)) => reconcile_records(field, &g, &p, schema),
    }
}

/// Reconcile two parsed record lists.
pub fn reconcile_records(
    field: &str,
    gold: &[Record],
    pred: &[Record],
    schema: Option<&FieldSchema>,
) -> Result<ReconcileReport, ScoringError> {
    let (n_gold, n_pred) = (gold.len(), pred.len());
    match (n_gold, n_pred) {
        (0, 0) => {
            return Ok(ReconcileReport {
                flag: None,
                ..ReconcileReport::flagged(1.0, ReconcileFlag::EmptyPrediction, 0, 0)
            })
        }
        (_, 0) => {
            return Ok(ReconcileReport::flagged(
                0.0,
                ReconcileFlag::EmptyPrediction,
                n_gold,
                0,
            ))
        }
        (0, _) => {
            return Ok(ReconcileReport::flagged(
                0.0,
                ReconcileFlag::HallucinatedRecords,
                0,
                n_pred,
            ))
        }
        _ => {}
    }

    if let Some(schema) = schema {
        let keys: BTreeSet<&String> = gold.iter().chain(pred).flat_map(|r| r.keys()).collect();
        check_schema_covers(field, schema, keys)?;
    }

    let mut comparisons: Vec<Vec<RecordComparison>> = Vec::with_capacity(n_gold);
    for g in gold {
        let row = pred
            .iter()
            .map(|p| compare_records(field, g, p, schema))
            .collect::<Result<Vec<_>, _>>()?;
        comparisons.push(row);
    }
    let weights: Vec<Vec<f64>> = comparisons
        .iter()
        .map(|row| row.iter().map(|c| c.score).collect())
        .collect();

    let pairs: Vec<MatchedRecord> = max_weight_assignment(&weights)
        .into_iter()
        .map(|(gi, pi)| MatchedRecord {
            gold_index: gi,
            pred_index: pi,
            comparison: comparisons[gi][pi].clone(),
        })
        .collect();

    let ratio = n_gold.min(n_pred) as f64 / n_gold.max(n_pred) as f64;
    let count_score = ratio * ratio;
    let quality_score = pairs.iter().map(|p| p.comparison.score).sum::<f64>() / pairs.len() as f64;
    let score = count_score * quality_score;

    log::debug!(
        "{field}: reconciled {n_gold} gold / {n_pred} pred records, \
         count={count_score:.3} quality={quality_score:.3}"
    );

    Ok(ReconcileReport {
        score,
        count_score,
        quality_score,
        n_gold,
        n_pred,
        n_matched: pairs.len(),
        n_unmatched_gold: n_gold - pairs.len(),
        n_unmatched_pred: n_pred - pairs.len(),
        flag: None,
        pairs,
    })
}
