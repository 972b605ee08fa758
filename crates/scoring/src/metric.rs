//! Per-field metric for an optimization loop, plus summary statistics over
//! many scores.

use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;

use crate::config::FieldConfig;
use crate::error::ScoringError;
use crate::hybrid::Judge;
use crate::matchers::{MatchResult, Matcher};
use crate::normalize::{extract_field, FieldSource};
use crate::registry::MatcherRegistry;

/// The scoring callable for one field: pulls the field out of an example
/// and a prediction and scores the pair.
#[derive(Debug, Clone)]
pub struct FieldMetric {
    field_name: String,
    matcher: Matcher,
}

impl FieldMetric {
    pub fn new(
        config: &FieldConfig,
        registry: &MatcherRegistry,
        judge: Option<Arc<dyn Judge>>,
    ) -> Result<Self, ScoringError> {
        let mut matcher = config.build_matcher(registry)?;
        if let Some(judge) = judge {
            matcher = matcher.with_judge(judge);
        }
        Ok(Self {
            field_name: config.field_name.clone(),
            matcher,
        })
    }

    pub fn field_name(&self) -> &str {
        &self.field_name
    }

    pub fn matcher(&self) -> &Matcher {
        &self.matcher
    }

    pub fn evaluate(
        &self,
        example: FieldSource<'_>,
        prediction: FieldSource<'_>,
    ) -> Result<MatchResult, ScoringError> {
        let gold = extract_field(example, &self.field_name);
        let pred = extract_field(prediction, &self.field_name);
        self.matcher.score(&gold, &pred)
    }

    pub fn evaluate_values(&self, gold: &Value, pred: &Value) -> Result<MatchResult, ScoringError> {
        self.matcher.score(gold, pred)
    }
}

// ---------------------------------------------------------------------------
// Score statistics
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ScoreDistribution {
    /// ≥ 0.99
    pub perfect: usize,
    /// [0.80, 0.99)
    pub good: usize,
    /// [0.50, 0.80)
    pub moderate: usize,
    /// < 0.50
    pub poor: usize,
    pub total: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct ScoreStats {
    pub mean: f64,
    pub median: f64,
    /// Population standard deviation.
    pub std: f64,
    pub min: f64,
    pub max: f64,
    pub distribution: ScoreDistribution,
}

impl ScoreStats {
    /// All zeros for empty input.
    pub fn from_scores(scores: &[f64]) -> Self {
        if scores.is_empty() {
            return Self::default();
        }

        let n = scores.len() as f64;
        let mean = scores.iter().sum::<f64>() / n;
        let variance = scores.iter().map(|s| (s - mean).powi(2)).sum::<f64>() / n;

        let mut sorted = scores.to_vec();
        sorted.sort_by(f64::total_cmp);
        let mid = sorted.len() / 2;
        let median = if sorted.len() % 2 == 0 {
            (sorted[mid - 1] + sorted[mid]) / 2.0
        } else {
            sorted[mid]
        };

        let mut distribution = ScoreDistribution {
            total: scores.len(),
            ..ScoreDistribution::default()
        };
        for &s in scores {
            match s {
                s if s >= 0.99 => distribution.perfect += 1,
                s if s >= 0.80 => distribution.good += 1,
                s if s >= 0.50 => distribution.moderate += 1,
                _ => distribution.poor += 1,
            }
        }

        Self {
            mean,
            median,
            std: variance.sqrt(),
            min: sorted[0],
            max: sorted[sorted.len() - 1],
            distribution,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::RecordLike;
    use serde_json::json;

    struct Prediction {
        start: &'static str,
    }

    impl RecordLike for Prediction {
        fn field(&self, name: &str) -> Option<Value> {
            (name == "lease_start_date").then(|| json!(self.start))
        }
    }

    fn date_config() -> FieldConfig {
        FieldConfig::new("lease_start_date", "date", Default::default())
    }

    #[test]
    fn evaluates_across_source_kinds() {
        let metric = FieldMetric::new(&date_config(), &MatcherRegistry::builtin(), None).unwrap();
        let example = json!({"lease_start_date": "2024-01-15"});
        let pred = Prediction { start: "01/16/2024" };

        let r = metric
            .evaluate(
                FieldSource::Mapping(example.as_object().unwrap()),
                FieldSource::Record(&pred),
            )
            .unwrap();
        assert_eq!(r.score, 0.9);
    }

    #[test]
    fn absent_on_both_sides_is_a_match() {
        let metric = FieldMetric::new(&date_config(), &MatcherRegistry::builtin(), None).unwrap();
        let empty = json!({});
        let source = || FieldSource::Mapping(empty.as_object().unwrap());
        assert_eq!(metric.evaluate(source(), source()).unwrap().score, 1.0);
    }

    #[test]
    fn stats_on_known_scores() {
        let stats = ScoreStats::from_scores(&[1.0, 0.9, 0.6, 0.2]);
        assert!((stats.mean - 0.675).abs() < 1e-12);
        assert!((stats.median - 0.75).abs() < 1e-12);
        assert_eq!(stats.min, 0.2);
        assert_eq!(stats.max, 1.0);
        assert_eq!(
            stats.distribution,
            ScoreDistribution {
                perfect: 1,
                good: 1,
                moderate: 1,
                poor: 1,
                total: 4
            }
        );
        // Population variance: (0.325² + 0.225² + 0.075² + 0.475²) / 4
        let expected = ((0.105625 + 0.050625 + 0.005625 + 0.225625) / 4.0f64).sqrt();
        assert!((stats.std - expected).abs() < 1e-12);
    }

    #[test]
    fn stats_on_empty_input() {
        assert_eq!(ScoreStats::from_scores(&[]), ScoreStats::default());
    }
}
