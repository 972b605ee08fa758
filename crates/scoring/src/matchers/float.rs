use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use serde_json::Value;

use super::number::parse_amount_text;
use super::{parse_params, MatchResult, Params};
use crate::error::ScoringError;
use crate::normalize::{preview, value_text};

static MIXED_FRACTION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(-?\d+)\s+(\d+)\s*/\s*(\d+)$").expect("static regex"));
static FRACTION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(-?\d+(?:\.\d+)?)\s*/\s*(\d+(?:\.\d+)?)$").expect("static regex")
});

/// Real-valued quantities (areas, ratios, percentages) compared within an
/// absolute tolerance.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct FloatMatcher {
    pub tolerance: f64,
}

impl Default for FloatMatcher {
    fn default() -> Self {
        Self { tolerance: 5e-4 }
    }
}

/// A parsed float. `literal` is the number as written, before a trailing
/// percent sign divided it by 100.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParsedFloat {
    pub value: f64,
    pub literal: f64,
    pub percent: bool,
}

impl FloatMatcher {
    pub fn from_params(field: &str, params: &Params) -> Result<Self, ScoringError> {
        let m: Self = parse_params(field, "float", params)?;
        if !m.tolerance.is_finite() || m.tolerance < 0.0 {
            return Err(ScoringError::InvalidParams {
                field: field.into(),
                matcher: "float".into(),
                message: format!("tolerance must be a non-negative number, got {}", m.tolerance),
            });
        }
        Ok(m)
    }

    pub fn compare(&self, field: &str, gold: &Value, pred: &Value) -> MatchResult {
        let (Some(g), Some(p)) = (parse_float(gold), parse_float(pred)) else {
            return MatchResult::fail(format!(
                "✗ {field}: parse error ('{}' → '{}')",
                preview(&value_text(gold), 40),
                preview(&value_text(pred), 40)
            ));
        };

        let diff = (g.value - p.value).abs();
        if diff < self.tolerance {
            return MatchResult::pass(format!("✓ {field}: {} ≈ {}", g.value, p.value));
        }

        // "25%" against "25": the percent was written on one side only.
        if g.percent != p.percent {
            let literal_diff = (g.literal - p.literal).abs();
            if literal_diff < self.tolerance {
                return MatchResult::pass(format!(
                    "✓ {field}: {} ≈ {} (percent notation)",
                    g.literal, p.literal
                ));
            }
        }

        MatchResult::fail(format!(
            "✗ {field}: {} → {} (diff {diff:.6}, tolerance {})",
            g.value, p.value, self.tolerance
        ))
    }
}

/// Parse numbers, percentages, fractions (`3/4`, `1 1/2`), currency
/// amounts, and number words (`twenty-five`).
pub fn parse_float(value: &Value) -> Option<ParsedFloat> {
    let text = match value {
        Value::Number(n) => {
            let v = n.as_f64().filter(|f| f.is_finite())?;
            return Some(ParsedFloat {
                value: v,
                literal: v,
                percent: false,
            });
        }
        Value::String(s) => s.trim().to_lowercase(),
        _ => return None,
    };

    let (body, percent) = if let Some(rest) = text.strip_suffix('%') {
        (rest.trim(), true)
    } else if let Some(rest) = text.strip_suffix("percent") {
        (rest.trim(), true)
    } else {
        (text.as_str(), false)
    };

    let literal = parse_fraction(body)
        .or_else(|| parse_amount_text(body))
        .or_else(|| parse_number_words(body))?;
    let value = if percent { literal / 100.0 } else { literal };
    Some(ParsedFloat {
        value,
        literal,
        percent,
    })
}

fn parse_fraction(s: &str) -> Option<f64> {
    if let Some(caps) = MIXED_FRACTION.captures(s) {
        let whole: f64 = caps[1].parse().ok()?;
        let num: f64 = caps[2].parse().ok()?;
        let den: f64 = caps[3].parse().ok()?;
        if den == 0.0 {
            return None;
        }
        let frac = num / den;
        return Some(if whole < 0.0 { whole - frac } else { whole + frac });
    }
    let caps = FRACTION.captures(s)?;
    let num: f64 = caps[1].parse().ok()?;
    let den: f64 = caps[2].parse().ok()?;
    (den != 0.0).then(|| num / den)
}

/// English cardinal words up to the billions: "one hundred twenty-five",
/// "three thousand and ten". Returns `None` if any word is unrecognized.
pub(crate) fn parse_number_words(s: &str) -> Option<f64> {
    let mut total = 0.0;
    let mut current = 0.0;
    let mut seen = false;

    for word in s
        .split(|c: char| c.is_whitespace() || c == '-')
        .filter(|w| !w.is_empty())
    {
        if word == "and" {
            continue;
        }
        if let Some(n) = small_number(word) {
            current += n;
        } else if word == "hundred" {
            current = current.max(1.0) * 100.0;
        } else if let Some(scale) = scale_word(word) {
            total += current.max(1.0) * scale;
            current = 0.0;
        } else {
            return None;
        }
        seen = true;
    }

    seen.then_some(total + current)
}

fn small_number(word: &str) -> Option<f64> {
    const UNITS: [&str; 20] = [
        "zero", "one", "two", "three", "four", "five", "six", "seven", "eight", "nine", "ten",
        "eleven", "twelve", "thirteen", "fourteen", "fifteen", "sixteen", "seventeen",
        "eighteen", "nineteen",
    ];
    const TENS: [&str; 8] = [
        "twenty", "thirty", "forty", "fifty", "sixty", "seventy", "eighty", "ninety",
    ];
    if let Some(i) = UNITS.iter().position(|u| *u == word) {
        return Some(i as f64);
    }
    TENS.iter()
        .position(|t| *t == word)
        .map(|i| (i as f64 + 2.0) * 10.0)
}

fn scale_word(word: &str) -> Option<f64> {
    match word {
        "thousand" => Some(1e3),
        "million" => Some(1e6),
        "billion" => Some(1e9),
        _ => None,
    }
}
