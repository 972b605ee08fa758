use serde::Deserialize;
use serde_json::Value;

use super::{check_unit_interval, parse_params, MatchResult, Params};
use crate::error::ScoringError;
use crate::normalize::{similarity, value_text, NullPolicy};

/// Similarity at which a near-miss counts as a spelling variant.
const VARIANT_SIMILARITY: f64 = 0.95;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
struct EnumParams {
    valid_values: Option<Vec<Value>>,
    preset: Option<String>,
    case_sensitive: bool,
    fuzzy_threshold: f64,
    treat_null_as_none: bool,
}

impl Default for EnumParams {
    fn default() -> Self {
        Self {
            valid_values: None,
            preset: None,
            case_sensitive: false,
            fuzzy_threshold: 0.85,
            treat_null_as_none: true,
        }
    }
}

/// Categorical values drawn from a fixed set.
#[derive(Debug, Clone, PartialEq)]
pub struct EnumMatcher {
    valid_values: Vec<String>,
    case_sensitive: bool,
    fuzzy_threshold: f64,
    treat_null_as_none: bool,
}

/// Named value sets usable in place of `valid_values`.
pub fn preset_values(name: &str) -> Option<&'static [&'static str]> {
    match name {
        "yes_no" => Some(&["yes", "no"]),
        "yes_no_na" => Some(&["yes", "no", "n/a"]),
        "boolean" => Some(&["true", "false"]),
        _ => None,
    }
}

impl EnumMatcher {
    /// `preset` wins over `valid_values` when both are given.
    pub fn from_params(field: &str, params: &Params) -> Result<Self, ScoringError> {
        let p: EnumParams = parse_params(field, "enum", params)?;
        check_unit_interval(field, "enum", "fuzzy_threshold", p.fuzzy_threshold)?;

        let valid_values: Vec<String> = match (&p.preset, &p.valid_values) {
            (Some(preset), _) => preset_values(preset)
                .ok_or_else(|| ScoringError::UnknownPreset {
                    field: field.into(),
                    preset: preset.clone(),
                })?
                .iter()
                .map(|s| s.to_string())
                .collect(),
            (None, Some(values)) if !values.is_empty() => values.iter().map(value_text).collect(),
            _ => {
                return Err(ScoringError::MissingEnumValues {
                    field: field.into(),
                })
            }
        };

        Ok(Self {
            valid_values,
            case_sensitive: p.case_sensitive,
            fuzzy_threshold: p.fuzzy_threshold,
            treat_null_as_none: p.treat_null_as_none,
        })
    }

    pub fn valid_values(&self) -> &[String] {
        &self.valid_values
    }

    pub(crate) fn null_policy(&self) -> NullPolicy {
        if self.treat_null_as_none {
            NullPolicy::Sentinels
        } else {
            NullPolicy::Strict
        }
    }

    fn canon(&self, s: &str) -> String {
        let s = s.trim();
        if self.case_sensitive {
            s.to_string()
        } else {
            s.to_lowercase()
        }
    }

    pub fn compare(&self, field: &str, gold: &Value, pred: &Value) -> MatchResult {
        let gold_text = value_text(gold);
        let pred_text = value_text(pred);
        let g = self.canon(&gold_text);
        let p = self.canon(&pred_text);

        if g == p {
            return MatchResult::pass(format!("✓ {field}: {}", gold_text.trim()));
        }

        let valid: Vec<String> = self.valid_values.iter().map(|v| self.canon(v)).collect();
        if valid.contains(&p) {
            return MatchResult::fail(format!(
                "✗ {field}: expected '{}', got '{}'",
                gold_text.trim(),
                pred_text.trim()
            ));
        }

        let best = valid
            .iter()
            .zip(&self.valid_values)
            .map(|(canon, original)| (similarity(&p, canon), canon, original))
            .max_by(|a, b| a.0.total_cmp(&b.0));

        // Spelling credit only for variants of the gold value itself.
        match best {
            Some((sim, canon, closest)) if sim >= self.fuzzy_threshold && *canon != g => {
                MatchResult::fail(format!(
                    "✗ {field}: expected '{}', got '{}' (reads as '{closest}')",
                    gold_text.trim(),
                    pred_text.trim()
                ))
            }
            Some((sim, _, closest)) if sim >= VARIANT_SIMILARITY => MatchResult::new(
                0.9,
                format!("~ {field}: '{}' is a variant of '{closest}'", pred_text.trim()),
            ),
            Some((sim, _, closest)) if sim >= self.fuzzy_threshold => MatchResult::new(
                0.7,
                format!(
                    "~ {field}: '{}' is close to '{closest}' ({sim:.2})",
                    pred_text.trim()
                ),
            ),
            _ => MatchResult::fail(format!(
                "✗ {field}: Invalid value '{}' (valid: {})",
                pred_text.trim(),
                self.valid_values
                    .iter()
                    .map(|v| format!("'{v}'"))
                    .collect::<Vec<_>>()
                    .join(", ")
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn matcher(params: Value) -> EnumMatcher {
        EnumMatcher::from_params("lease_type", params.as_object().unwrap()).unwrap()
    }

    fn gross_net() -> EnumMatcher {
        matcher(json!({"valid_values": ["Gross", "Net", "Modified Gross"]}))
    }

    #[test]
    fn exact_is_case_insensitive_by_default() {
        assert_eq!(gross_net().compare("f", &json!("Gross"), &json!(" gross")).score, 1.0);
    }

    #[test]
    fn both_valid_but_different() {
        let r = gross_net().compare("f", &json!("Gross"), &json!("Net"));
        assert_eq!(r.score, 0.0);
        let lower = r.feedback.to_lowercase();
        assert!(lower.contains("gross") && lower.contains("net"));
    }

    #[test]
    fn fuzzy_tiers() {
        let m = matcher(json!({"valid_values": ["Modified Gross", "Triple Net"]}));
        // One dropped character out of fourteen: variant tier.
        let r = m.compare("f", &json!("Modified Gross"), &json!("Modified Gros"));
        assert_eq!(r.score, 0.9);
        // 16/18 similarity: fuzzy tier.
        let r = m.compare("f", &json!("Triple Net"), &json!("Tripl Nt"));
        assert_eq!(r.score, 0.7);
    }

    #[test]
    fn misspelled_wrong_value_gets_no_credit() {
        let m = gross_net();
        for pred in ["Net", "Nett", "net ", "Modified Gros"] {
            let r = m.compare("f", &json!("Gross"), &json!(pred));
            assert_eq!(r.score, 0.0, "{pred}: {}", r.feedback);
        }
        // The same typo is still credited when it is a variant of gold.
        assert_eq!(m.compare("f", &json!("Modified Gross"), &json!("Modified Gros")).score, 0.9);
        assert_eq!(m.compare("f", &json!("Net"), &json!("Nett")).score, 0.7);
    }

    #[test]
    fn invalid_value() {
        let r = gross_net().compare("f", &json!("Gross"), &json!("Percentage"));
        assert_eq!(r.score, 0.0);
        assert!(r.feedback.to_lowercase().contains("invalid"));
    }

    #[test]
    fn case_sensitive_disables_case_folding() {
        let m = matcher(json!({"valid_values": ["LLC", "Inc"], "case_sensitive": true}));
        assert_eq!(m.compare("f", &json!("LLC"), &json!("llc")).score, 0.0);
        assert_eq!(m.compare("f", &json!("LLC"), &json!("LLC")).score, 1.0);
    }

    #[test]
    fn presets() {
        let m = matcher(json!({"preset": "yes_no_na"}));
        assert_eq!(m.valid_values(), ["yes", "no", "n/a"]);
        let err = EnumMatcher::from_params("f", json!({"preset": "colors"}).as_object().unwrap());
        assert!(matches!(err, Err(ScoringError::UnknownPreset { .. })));
    }

    #[test]
    fn missing_values_is_a_config_error() {
        for params in [json!({}), json!({"valid_values": []})] {
            let err = EnumMatcher::from_params("f", params.as_object().unwrap());
            assert!(matches!(err, Err(ScoringError::MissingEnumValues { .. })));
        }
    }

    #[test]
    fn strict_nulls_when_sentinels_are_values() {
        let m = matcher(json!({"preset": "yes_no_na", "treat_null_as_none": false}));
        assert_eq!(m.null_policy(), NullPolicy::Strict);
        assert_eq!(m.compare("f", &json!("N/A"), &json!("n/a")).score, 1.0);
    }
}
