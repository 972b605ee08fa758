use serde_json::Value;

use super::MatchResult;
use crate::feedback::format_parse_error_feedback;
use crate::normalize::{is_json_string, preview, value_text};

const TRUE_WORDS: &[&str] = &["yes", "true", "t", "y", "1"];
const FALSE_WORDS: &[&str] = &["no", "false", "f", "n", "0"];

/// Yes/no values in their many spellings.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BooleanMatcher;

impl BooleanMatcher {
    pub fn compare(&self, field: &str, gold: &Value, pred: &Value) -> MatchResult {
        if is_json_string(pred) {
            return MatchResult::fail(format_parse_error_feedback(
                field,
                "boolean",
                pred,
                Some("expected a boolean, got JSON"),
            ));
        }

        match (to_bool(gold), to_bool(pred)) {
            (Some(g), Some(p)) if g == p => MatchResult::pass(format!("✓ {field}: {g}")),
            (Some(g), Some(p)) => MatchResult::fail(format!("✗ {field}: {g} → {p}")),
            _ => MatchResult::fail(format!(
                "✗ {field}: cannot read as yes/no ('{}' → '{}')",
                preview(&value_text(gold), 40),
                preview(&value_text(pred), 40)
            )),
        }
    }
}

pub fn to_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => match n.as_f64() {
            Some(f) if f == 1.0 => Some(true),
            Some(f) if f == 0.0 => Some(false),
            _ => None,
        },
        Value::String(s) => {
            let s = s.trim().to_lowercase();
            if TRUE_WORDS.contains(&s.as_str()) {
                Some(true)
            } else if FALSE_WORDS.contains(&s.as_str()) {
                Some(false)
            } else {
                None
            }
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn spellings() {
        for (g, p) in [
            (json!("Yes"), json!(true)),
            (json!("Y"), json!("true")),
            (json!("no"), json!("F")),
            (json!(false), json!("n")),
        ] {
            assert_eq!(BooleanMatcher.compare("f", &g, &p).score, 1.0, "{g} vs {p}");
        }
    }

    #[test]
    fn opposite_values() {
        let r = BooleanMatcher.compare("renewal_option", &json!("yes"), &json!("no"));
        assert_eq!(r.score, 0.0);
        assert!(r.feedback.contains("true → false"));
    }

    #[test]
    fn unrecognized_word() {
        assert_eq!(BooleanMatcher.compare("f", &json!("yes"), &json!("maybe")).score, 0.0);
        assert_eq!(to_bool(&json!(2)), None);
    }

    #[test]
    fn json_pred_gets_parse_feedback() {
        let r = BooleanMatcher.compare("f", &json!("yes"), &json!(r#"{"value": "yes"}"#));
        assert_eq!(r.score, 0.0);
        assert!(r.feedback.contains("Type mismatch"));
    }
}
