use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use super::MatchResult;
use crate::normalize::{preview, value_text};

const CURRENCY: &str = r"USD|EUR|GBP|CAD|AUD|JPY|CNY|CHF|\$|€|£|¥";

static CURRENCY_PREFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(&format!(r"^(?:{CURRENCY})\s*")).expect("static regex"));
static CURRENCY_SUFFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s*(?:USD|EUR|GBP|CAD|AUD|JPY|CNY|CHF)$").expect("static regex"));

/// Absolute difference below which two amounts are identical.
const ABS_EPSILON: f64 = 1e-6;
/// Relative error tolerated as rounding.
const REL_TOLERANCE: f64 = 0.005;

/// Monetary / numeric amounts. Exact after normalization, or within 0.5%
/// relative error; anything else scores 0.0.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct NumberMatcher;

impl NumberMatcher {
    pub fn compare(&self, field: &str, gold: &Value, pred: &Value) -> MatchResult {
        let (Some(g), Some(p)) = (parse_number(gold), parse_number(pred)) else {
            return MatchResult::fail(format!(
                "✗ {field}: parse error ('{}' → '{}')",
                preview(&value_text(gold), 40),
                preview(&value_text(pred), 40)
            ));
        };

        if (g - p).abs() < ABS_EPSILON {
            return MatchResult::pass(format!("✓ {field}: {g}"));
        }
        let rel = (g - p).abs() / g.abs().max(1e-9);
        if rel <= REL_TOLERANCE {
            MatchResult::pass(format!("✓ {field}: {g} ≈ {p} (rel error {rel:.4})"))
        } else {
            MatchResult::fail(format!("✗ {field}: {g} → {p} (rel error {rel:.4})"))
        }
    }
}

/// Parse a JSON number or a textual amount. Booleans are not numbers.
pub fn parse_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64().filter(|f| f.is_finite()),
        Value::String(s) => parse_amount_text(s),
        _ => None,
    }
}

/// Parse an amount such as `$1,234.50`, `(500)`, `2.5M`, `EUR 40k`, or
/// `3 million`.
///
/// Currency symbols and ISO codes are stripped, thousands separators removed,
/// a trailing K/M/B/T or scale word applies its multiplier, and a value
/// wrapped in parentheses is negative.
pub(crate) fn parse_amount_text(text: &str) -> Option<f64> {
    let mut s = text.trim().to_uppercase();

    let mut negative = false;
    if s.starts_with('(') && s.ends_with(')') && s.len() > 2 {
        negative = true;
        s = s[1..s.len() - 1].trim().to_string();
    }
    if let Some(rest) = s.strip_prefix('-') {
        negative = !negative;
        s = rest.trim_start().to_string();
    }

    s = CURRENCY_PREFIX.replace(&s, "").into_owned();
    s = CURRENCY_SUFFIX.replace(&s, "").into_owned();
    s.retain(|c| c != ',' && c != ' ');

    let mut multiplier = 1.0;
    for (word, factor) in [
        ("THOUSAND", 1e3),
        ("MILLION", 1e6),
        ("BILLION", 1e9),
        ("TRILLION", 1e12),
    ] {
        if let Some(rest) = s.strip_suffix(word) {
            multiplier = factor;
            s = rest.to_string();
            break;
        }
    }
    if multiplier == 1.0 {
        let factor = match s.chars().last() {
            Some('K') => Some(1e3),
            Some('M') => Some(1e6),
            Some('B') => Some(1e9),
            Some('T') => Some(1e12),
            _ => None,
        };
        if let Some(factor) = factor {
            multiplier = factor;
            s.pop();
        }
    }

    // f64::from_str accepts "inf" and "nan"; amounts must be plain digits.
    if !s.chars().any(|c| c.is_ascii_digit()) {
        return None;
    }
    let value: f64 = s.parse().ok()?;
    let value = value * multiplier;
    if !value.is_finite() {
        return None;
    }
    Some(if negative { -value } else { value })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn score(gold: Value, pred: Value) -> f64 {
        NumberMatcher.compare("rent", &gold, &pred).score
    }

    #[test]
    fn currency_and_separators() {
        assert_eq!(parse_amount_text("$1,234.50"), Some(1234.5));
        assert_eq!(parse_amount_text("USD 5000"), Some(5000.0));
        assert_eq!(parse_amount_text("5000 EUR"), Some(5000.0));
        assert_eq!(parse_amount_text("£ 12"), Some(12.0));
    }

    #[test]
    fn multipliers() {
        assert_eq!(parse_amount_text("2.5M"), Some(2_500_000.0));
        assert_eq!(parse_amount_text("$40k"), Some(40_000.0));
        assert_eq!(parse_amount_text("1.2 billion"), Some(1_200_000_000.0));
        assert_eq!(parse_amount_text("3 Million"), Some(3_000_000.0));
    }

    #[test]
    fn negatives() {
        assert_eq!(parse_amount_text("(500)"), Some(-500.0));
        assert_eq!(parse_amount_text("-$75"), Some(-75.0));
    }

    #[test]
    fn rejects_non_numeric() {
        assert_eq!(parse_amount_text("abc"), None);
        assert_eq!(parse_amount_text("inf"), None);
        assert_eq!(parse_amount_text("$"), None);
        assert_eq!(parse_number(&json!(true)), None);
    }

    #[test]
    fn within_half_percent_is_a_match() {
        assert_eq!(score(json!("$1,000.00"), json!("1000")), 1.0);
        assert_eq!(score(json!(1000), json!(1004)), 1.0);
        assert_eq!(score(json!(1000), json!(1006)), 0.0);
        assert_eq!(score(json!("2.5M"), json!(2_500_000)), 1.0);
    }

    #[test]
    fn parse_error_scores_zero_with_feedback() {
        let r = NumberMatcher.compare("rent", &json!("1000"), &json!("about a grand"));
        assert_eq!(r.score, 0.0);
        assert!(r.feedback.contains("parse error"));
    }
}
