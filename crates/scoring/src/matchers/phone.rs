use serde_json::Value;

use super::MatchResult;
use crate::normalize::{is_null_text, preview, value_text};

/// Trailing digits that identify a subscriber line.
const LINE_DIGITS: usize = 7;

/// Phone numbers compared on their digits. A missing country or area code
/// still matches when the rest agrees.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PhoneMatcher;

impl PhoneMatcher {
    pub fn compare(&self, field: &str, gold: &Value, pred: &Value) -> MatchResult {
        match (normalize_phone(gold), normalize_phone(pred)) {
            (None, None) => MatchResult::pass(format!("✓ {field}: no valid number on either side")),
            (Some(g), Some(p)) => {
                if g == p {
                    return MatchResult::pass(format!("✓ {field}: {g}"));
                }
                let same_line = line_part(&g) == line_part(&p);
                if same_line && (g.contains(&p) || p.contains(&g)) {
                    MatchResult::pass(format!("✓ {field}: {g} ≈ {p} (prefix differs)"))
                } else if same_line {
                    MatchResult::new(0.7, format!("~ {field}: {g} → {p} (same line number)"))
                } else {
                    MatchResult::fail(format!("✗ {field}: {g} → {p}"))
                }
            }
            _ => MatchResult::fail(format!(
                "✗ {field}: invalid phone number ('{}' → '{}')",
                preview(&value_text(gold), 30),
                preview(&value_text(pred), 30)
            )),
        }
    }
}

/// Digits only. `None` for placeholders: sentinel text, fewer than 7 or more
/// than 15 digits, or a single repeated digit.
pub fn normalize_phone(value: &Value) -> Option<String> {
    let text = value_text(value);
    if is_null_text(&text) {
        return None;
    }
    let digits: String = text.chars().filter(|c| c.is_ascii_digit()).collect();
    if !(LINE_DIGITS..=15).contains(&digits.len()) {
        return None;
    }
    let first = digits.chars().next()?;
    if digits.chars().all(|c| c == first) {
        return None;
    }
    Some(digits)
}

fn line_part(digits: &str) -> &str {
    &digits[digits.len() - LINE_DIGITS..]
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn score(gold: &str, pred: &str) -> f64 {
        PhoneMatcher.compare("phone", &json!(gold), &json!(pred)).score
    }

    #[test]
    fn formatting_is_ignored() {
        assert_eq!(score("(555) 123-4567", "555.123.4567"), 1.0);
    }

    #[test]
    fn country_code_prefix() {
        assert_eq!(score("+1 555 123 4567", "555-123-4567"), 1.0);
    }

    #[test]
    fn same_line_different_area_code() {
        assert_eq!(score("(555) 123-4567", "(212) 123-4567"), 0.7);
    }

    #[test]
    fn different_numbers() {
        assert_eq!(score("555-123-4567", "555-987-6543"), 0.0);
    }

    #[test]
    fn placeholders() {
        assert_eq!(normalize_phone(&json!("000-000-0000")), None);
        assert_eq!(normalize_phone(&json!("12345")), None);
        assert_eq!(normalize_phone(&json!("1234567890123456")), None);
        assert_eq!(score("555-123-4567", "000-000-0000"), 0.0);
        assert_eq!(score("999-999-9999", "000-000-0000"), 1.0);
    }
}
