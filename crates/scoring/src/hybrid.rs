//! Hybrid scoring: programmatic reconciliation blended with an external
//! LLM judge.

use serde::Serialize;
use serde_json::Value;

use crate::error::{JudgeError, ScoringError};
use crate::records::{reconcile, FieldSchema, ReconcileReport};

/// Rubric sent to the judge when the field config does not supply one.
pub const DEFAULT_RUBRIC: &str = "\
Score the predicted JSON records against the gold records.

1. Record count (40%):
   exact count 1.0; off by one 0.6; off by two 0.3; off by three or more 0.1;
   empty prediction when gold has records 0.0.

2. Record matching (60%):
   pair every gold record with its closest predicted record and score it:
   all fields correct 1.0; one or two wrong 0.7; three or four wrong 0.4;
   five or more wrong 0.1; no counterpart 0.0. Average over gold records.

Final score = count score x matching score.

Field rules:
- null must match null; a value where gold is null is wrong, and so is null
  where gold has a value.
- \"1\" and 1 are equivalent; true and 1 are not.
- Date formatting differences are fine when the date is the same.
- Small typos cost something but are not a total failure.

Reply with a score from 0.0 to 1.0 and explain what is wrong.
";

/// What the judge returned.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JudgeVerdict {
    pub score: f64,
    pub reasoning: String,
}

impl JudgeVerdict {
    pub fn new(score: f64, reasoning: impl Into<String>) -> Self {
        Self {
            score,
            reasoning: reasoning.into(),
        }
    }
}

/// An external scorer for a (gold, predicted) JSON pair. Implementations may
/// block; the core neither retries nor times out the call.
pub trait Judge: Send + Sync {
    fn judge(&self, rubric: &str, gold_json: &str, pred_json: &str)
        -> Result<JudgeVerdict, JudgeError>;
}

impl<F> Judge for F
where
    F: Fn(&str, &str, &str) -> Result<JudgeVerdict, JudgeError> + Send + Sync,
{
    fn judge(
        &self,
        rubric: &str,
        gold_json: &str,
        pred_json: &str,
    ) -> Result<JudgeVerdict, JudgeError> {
        self(rubric, gold_json, pred_json)
    }
}

// ---------------------------------------------------------------------------
// Weights
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct HybridWeights {
    programmatic: f64,
    llm: f64,
}

impl Default for HybridWeights {
    fn default() -> Self {
        Self {
            programmatic: 0.3,
            llm: 0.7,
        }
    }
}

impl HybridWeights {
    /// Weights must be finite, non-negative, and not both zero. They are
    /// normalized to sum to 1.
    pub fn new(programmatic: f64, llm: f64) -> Result<Self, ScoringError> {
        let valid = |w: f64| w.is_finite() && w >= 0.0;
        let total = programmatic + llm;
        if !valid(programmatic) || !valid(llm) || total <= 0.0 {
            return Err(ScoringError::InvalidWeights { programmatic, llm });
        }
        Ok(Self {
            programmatic: programmatic / total,
            llm: llm / total,
        })
    }

    pub fn programmatic(&self) -> f64 {
        self.programmatic
    }

    pub fn llm(&self) -> f64 {
        self.llm
    }
}

// ---------------------------------------------------------------------------
// Scorer
// ---------------------------------------------------------------------------

/// How the judge leg went.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum JudgeOutcome {
    Scored,
    NotConfigured,
    /// The judge failed; its leg scored 0.0.
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HybridReport {
    pub score: f64,
    pub programmatic_score: f64,
    pub llm_score: f64,
    pub llm_reasoning: String,
    pub weights: HybridWeights,
    pub judge: JudgeOutcome,
    pub programmatic: ReconcileReport,
}

pub struct HybridScorer<'a> {
    pub weights: HybridWeights,
    pub rubric: &'a str,
    pub judge: Option<&'a dyn Judge>,
}

impl<'a> HybridScorer<'a> {
    pub fn new(weights: HybridWeights, judge: Option<&'a dyn Judge>) -> Self {
        Self {
            weights,
            rubric: DEFAULT_RUBRIC,
            judge,
        }
    }

    pub fn with_rubric(mut self, rubric: &'a str) -> Self {
        self.rubric = rubric;
        self
    }

    /// `weights.programmatic · reconcile + weights.llm · judge`.
    ///
    /// Without a judge the LLM leg is 0.0, which caps the score at the
    /// programmatic weight. A judge error is soft and is recorded in
    /// [`HybridReport::judge`].
    pub fn score(
        &self,
        field: &str,
        gold: &Value,
        pred: &Value,
        schema: Option<&FieldSchema>,
    ) -> Result<HybridReport, ScoringError> {
        let programmatic = reconcile(field, gold, pred, schema)?;

        let (llm_score, llm_reasoning, judge) = match self.judge {
            None => (0.0, "No LLM judge provided".to_string(), JudgeOutcome::NotConfigured),
            Some(j) => match j.judge(self.rubric, &judge_text(gold), &judge_text(pred)) {
                Ok(verdict) => {
                    if !verdict.score.is_finite() {
                        log::warn!("{field}: judge returned non-finite score {}", verdict.score);
                    }
                    (clamp_unit(verdict.score), verdict.reasoning, JudgeOutcome::Scored)
                }
                Err(e) => {
                    log::warn!("{field}: {e}; scoring without the judge");
                    (0.0, format!("Judge failed: {e}"), JudgeOutcome::Failed(e.to_string()))
                }
            },
        };

        let score = clamp_unit(
            self.weights.programmatic * programmatic.score + self.weights.llm * llm_score,
        );
        Ok(HybridReport {
            score,
            programmatic_score: programmatic.score,
            llm_score,
            llm_reasoning,
            weights: self.weights,
            judge,
            programmatic,
        })
    }
}

fn clamp_unit(x: f64) -> f64 {
    if x.is_finite() {
        x.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

/// Strings are sent as-is; parsed values are pretty-printed.
fn judge_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => serde_json::to_string_pretty(other).unwrap_or_else(|_| other.to_string()),
    }
}
