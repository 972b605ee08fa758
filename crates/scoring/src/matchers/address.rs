use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use serde_json::Value;

use super::{check_unit_interval, parse_params, MatchResult, Params};
use crate::error::ScoringError;
use crate::normalize::{preview, similarity, value_text};

const ZIP_WEIGHT: f64 = 0.3;
const STATE_WEIGHT: f64 = 0.2;
const TEXT_WEIGHT: f64 = 0.5;
/// Score when the gold address appears verbatim inside a longer prediction.
const CONTAINED_SCORE: f64 = 0.8;

static ABBREVIATIONS: Lazy<Vec<(Regex, &'static str)>> = Lazy::new(|| {
    [
        (r"\bst\b", "street"),
        (r"\bave\b", "avenue"),
        (r"\brd\b", "road"),
        (r"\bdr\b", "drive"),
        (r"\bblvd\b", "boulevard"),
        (r"\bln\b", "lane"),
        (r"\bpkwy\b", "parkway"),
        (r"\bpky\b", "parkway"),
        (r"\bct\b", "court"),
        (r"\bterr\b", "terrace"),
        (r"\bhwy\b", "highway"),
        (r"\bste\b", "suite"),
    ]
    .into_iter()
    .map(|(pattern, full)| (Regex::new(pattern).expect("static regex"), full))
    .collect()
});

static PUNCTUATION: Lazy<Regex> = Lazy::new(|| Regex::new(r#"[.,#'"()\-]"#).expect("static regex"));
static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("static regex"));

static CARE_OF: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bc/o\b[^,]*(?:,|$)").expect("static regex"));
static ATTENTION: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\battn:.*").expect("static regex"));
static COMPANY_SUFFIX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:llc|inc|company|corp|corporation|ltd|limited)\b\.?")
        .expect("static regex")
});

static ZIP: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b\d{5}\b").expect("static regex"));
static STATE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b[A-Z]{2}\b").expect("static regex"));

/// Postal addresses: abbreviation-expanded text, then weighted ZIP / state /
/// text similarity.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct AddressMatcher {
    /// Minimum weighted score to keep; below it the pair scores 0.0.
    pub threshold: f64,
    /// Remove "c/o", "Attn:" and company suffixes from the prediction before
    /// the containment check.
    pub strip_company: bool,
}

impl Default for AddressMatcher {
    fn default() -> Self {
        Self {
            threshold: 0.6,
            strip_company: true,
        }
    }
}

impl AddressMatcher {
    pub fn from_params(field: &str, params: &Params) -> Result<Self, ScoringError> {
        let m: Self = parse_params(field, "address", params)?;
        check_unit_interval(field, "address", "threshold", m.threshold)?;
        Ok(m)
    }

    pub fn compare(&self, field: &str, gold: &Value, pred: &Value) -> MatchResult {
        let gold_raw = value_text(gold);
        let pred_raw = value_text(pred);
        let g = normalize_address(&gold_raw);
        let p = normalize_address(&pred_raw);

        if g == p {
            return MatchResult::pass(format!("✓ {field}: exact match"));
        }

        if !g.is_empty() {
            let stripped = if self.strip_company {
                normalize_address(&strip_company_info(&pred_raw))
            } else {
                p.clone()
            };
            if stripped.contains(&g) || p.contains(&g) {
                return MatchResult::new(
                    CONTAINED_SCORE,
                    format!("~ {field}: gold address found inside prediction"),
                );
            }
        }

        let zip_match = match (first_match(&ZIP, &gold_raw), first_match(&ZIP, &pred_raw)) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        };
        let state_match = match (first_match(&STATE, &gold_raw), first_match(&STATE, &pred_raw)) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        };
        let sim = similarity(&g, &p);

        let mut score = TEXT_WEIGHT * sim;
        if zip_match {
            score += ZIP_WEIGHT;
        }
        if state_match {
            score += STATE_WEIGHT;
        }

        let detail = format!(
            "zip {}, state {}, text {sim:.2}: '{}' → '{}'",
            if zip_match { "✓" } else { "✗" },
            if state_match { "✓" } else { "✗" },
            preview(&gold_raw, 40),
            preview(&pred_raw, 40)
        );
        if score >= self.threshold {
            MatchResult::new(score, format!("~ {field}: partial ({score:.2}); {detail}"))
        } else {
            MatchResult::fail(format!("✗ {field}: mismatch ({score:.2}); {detail}"))
        }
    }
}

/// Lower-case, expand street abbreviations, drop punctuation, collapse
/// whitespace.
pub fn normalize_address(text: &str) -> String {
    let mut s = text.to_lowercase();
    for (re, full) in ABBREVIATIONS.iter() {
        s = re.replace_all(&s, *full).into_owned();
    }
    let s = PUNCTUATION.replace_all(&s, " ");
    WHITESPACE.replace_all(&s, " ").trim().to_string()
}

/// Remove "c/o ..." clauses, "Attn: ..." tails, and company suffixes.
pub fn strip_company_info(text: &str) -> String {
    let s = CARE_OF.replace_all(text, " ");
    let s = ATTENTION.replace_all(&s, "");
    COMPANY_SUFFIX.replace_all(&s, "").into_owned()
}

fn first_match<'a>(re: &Regex, text: &'a str) -> Option<&'a str> {
    re.find(text).map(|m| m.as_str())
}
