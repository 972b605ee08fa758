use serde::Deserialize;
use serde_json::Value;

use super::{check_unit_interval, parse_params, MatchResult, Params};
use crate::error::ScoringError;
use crate::normalize::{normalize_value, preview, similarity, value_text};

/// Case-insensitive exact match, then partial credit by similarity ratio.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct StringMatcher {
    /// Minimum similarity to earn partial credit.
    pub threshold: f64,
}

impl Default for StringMatcher {
    fn default() -> Self {
        Self { threshold: 0.6 }
    }
}

impl StringMatcher {
    pub fn from_params(field: &str, params: &Params) -> Result<Self, ScoringError> {
        let m: Self = parse_params(field, "string", params)?;
        check_unit_interval(field, "string", "threshold", m.threshold)?;
        Ok(m)
    }

    pub fn compare(&self, field: &str, gold: &Value, pred: &Value) -> MatchResult {
        let g = normalize_value(gold);
        let p = normalize_value(pred);
        if g == p {
            return MatchResult::pass(format!("✓ {field}: exact match"));
        }

        let sim = similarity(&g, &p);
        let shown = format!(
            "'{}' → '{}'",
            preview(&value_text(gold), 40),
            preview(&value_text(pred), 40)
        );
        if sim >= self.threshold {
            MatchResult::new(sim, format!("~ {field}: partial match ({sim:.2}): {shown}"))
        } else {
            MatchResult::fail(format!("✗ {field}: mismatch ({sim:.2}): {shown}"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn m() -> StringMatcher {
        StringMatcher::default()
    }

    #[test]
    fn exact_ignores_case_and_padding() {
        let r = m().compare("tenant", &json!("ACME Corp "), &json!("acme corp"));
        assert_eq!(r.score, 1.0);
        assert!(r.feedback.contains("exact"));
    }

    #[test]
    fn partial_credit_above_threshold() {
        let r = m().compare("tenant", &json!("John Doe"), &json!("John Do"));
        assert!((r.score - 14.0 / 15.0).abs() < 1e-9);
        assert!(r.feedback.starts_with("~"));
    }

    #[test]
    fn below_threshold_is_zero() {
        let r = m().compare("tenant", &json!("Acme"), &json!("Globex"));
        assert_eq!(r.score, 0.0);
        assert!(r.feedback.starts_with("✗"));
    }

    #[test]
    fn numbers_compare_as_text() {
        assert_eq!(m().compare("suite", &json!(100), &json!("100")).score, 1.0);
    }

    #[test]
    fn threshold_param_is_validated() {
        let params = json!({"threshold": 1.5});
        assert!(StringMatcher::from_params("f", params.as_object().unwrap()).is_err());
        let params = json!({"threshold": 0.9, "unrelated": true});
        let m = StringMatcher::from_params("f", params.as_object().unwrap()).unwrap();
        assert_eq!(m.threshold, 0.9);
    }
}
