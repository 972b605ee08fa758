//! Feedback text for the optimization loop.
//!
//! Nothing in the crate parses these strings back. They are meant to tell a
//! prompt optimizer what went wrong (observed vs. expected type, the parse
//! error, and a concrete fix) and must stay stable and readable.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use serde_json::Value;

use crate::literal::parse_python_literal;
use crate::matchers::number::parse_amount_text;
use crate::normalize::{is_json_string, is_null, preview, value_text};
use crate::records::{parse_records_detailed, ReconcileFlag, ReconcileReport, Record};

/// JSON fields at or above this score are reported as PASS.
pub const PASS_THRESHOLD: f64 = 0.95;
/// Sub-fields below this mean score are listed as failing.
const FAILING_FIELD: f64 = 0.8;
const MAX_FAILING_SHOWN: usize = 8;

static ISO_DATE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").expect("static regex"));

/// Human-readable type of a value. JSON-looking strings report the
/// structure they hold.
pub fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::Object(_) => "JSON object",
        Value::Array(_) => "JSON array",
        Value::String(s) if is_json_string(value) => {
            if s.trim_start().starts_with('{') {
                "JSON object"
            } else {
                "JSON array"
            }
        }
        Value::String(_) => "string",
    }
}

/// For `{"tenant": "Acme"}` or `[{"tenant": "Acme"}]`, the wrapped `Acme`.
pub fn unwrapped_value(value: &Value) -> Option<String> {
    let parsed = match value {
        Value::String(s) => serde_json::from_str(s.trim())
            .ok()
            .or_else(|| parse_python_literal(s.trim()))?,
        other => other.clone(),
    };
    let first = match parsed {
        Value::Array(items) => items.into_iter().next()?,
        other => other,
    };
    let inner = match first {
        Value::Object(map) => map.into_iter().next()?.1,
        other => other,
    };
    (!inner.is_object() && !inner.is_array()).then(|| value_text(&inner))
}

fn recovery_fix(expected_type: &str, actual_type: &str) -> Option<String> {
    let wrapped = matches!(actual_type, "JSON object" | "JSON array");
    let fix = match expected_type {
        "json" if actual_type == "string" => {
            "Return ONLY valid JSON like [{...}], not plain text".to_string()
        }
        "json" => return None,
        "string" if wrapped => format!("Return ONLY the raw string value, not {actual_type}"),
        "number" | "float" if wrapped => format!("Return ONLY the numeric value, not {actual_type}"),
        "boolean" if wrapped => {
            format!("Return ONLY true, false, or null. Do not wrap in {actual_type}")
        }
        "date" if wrapped => format!(
            "Return ONLY the date string in ISO format (YYYY-MM-DD), not {actual_type}"
        ),
        "address" if wrapped => format!("Return ONLY the raw address string, not {actual_type}"),
        _ if wrapped => format!("Return ONLY the raw {expected_type} value, not {actual_type}"),
        _ => return None,
    };
    Some(fix)
}

/// Multi-line feedback for a value that did not have the declared type.
pub fn format_parse_error_feedback(
    field: &str,
    expected_type: &str,
    actual: &Value,
    parse_error: Option<&str>,
) -> String {
    let actual_type = type_name(actual);
    let mut lines = vec![
        format!("✗ {field}: Type mismatch"),
        format!("  Expected: {expected_type}"),
        format!("  Got: {actual_type}"),
    ];
    if let Some(err) = parse_error {
        lines.push(format!("  Error: {err}"));
    }
    if let Some(fix) = recovery_fix(expected_type, actual_type) {
        lines.push(format!("  Fix: {fix}"));
        if expected_type != "json" {
            if let Some(inner) = unwrapped_value(actual) {
                lines.push(format!(
                    "  Example: Instead of {}, return: {inner}",
                    preview(&value_text(actual), 80)
                ));
            }
        }
    }
    lines.join("\n")
}

// ---------------------------------------------------------------------------
// Type validation
// ---------------------------------------------------------------------------

/// Outcome of checking one predicted value against its declared type.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TypeCheck {
    pub score: f64,
    pub feedback_text: String,
    pub expected_type: String,
    pub actual_type: String,
    pub parsing_error: Option<String>,
    pub recovery_suggestion: Option<String>,
    pub is_valid: bool,
}

impl TypeCheck {
    fn valid(field: &str, what: &str, expected: &str, actual: &str) -> Self {
        Self {
            score: 1.0,
            feedback_text: format!("✓ {field}: {what}"),
            expected_type: expected.into(),
            actual_type: actual.into(),
            parsing_error: None,
            recovery_suggestion: None,
            is_valid: true,
        }
    }

    fn invalid(
        feedback_text: String,
        expected: &str,
        actual: &str,
        error: String,
        suggestion: String,
    ) -> Self {
        Self {
            score: 0.0,
            feedback_text,
            expected_type: expected.into(),
            actual_type: actual.into(),
            parsing_error: Some(error),
            recovery_suggestion: Some(suggestion),
            is_valid: false,
        }
    }

    /// The feedback line, followed by the expected/received/error/fix
    /// context when the value was invalid.
    pub fn render(&self) -> String {
        let mut lines = vec![self.feedback_text.clone()];
        if !self.is_valid {
            lines.push(format!("  Expected type: {}", self.expected_type));
            lines.push(format!("  Received type: {}", self.actual_type));
            if let Some(err) = &self.parsing_error {
                lines.push(format!("  Error: {err}"));
            }
            if let Some(fix) = &self.recovery_suggestion {
                lines.push(format!("  Fix: {fix}"));
            }
        }
        lines.join("\n")
    }
}

/// Check that `value` has the shape of `expected_type`. Null-equivalent
/// values are always valid; unknown types are accepted.
pub fn check_value(field: &str, expected_type: &str, value: &Value) -> TypeCheck {
    if is_null(value) {
        return TypeCheck::valid(field, "Correctly null", expected_type, "null");
    }

    let actual = type_name(value);
    let wrapped = matches!(value, Value::Object(_) | Value::Array(_));
    let mismatch = |expected: &str, suggestion: String| {
        TypeCheck::invalid(
            format!("✗ {field}: Type mismatch (got {actual})"),
            expected,
            actual,
            format!("Expected {expected}, got {actual}"),
            suggestion,
        )
    };

    match expected_type {
        "string" => match value {
            Value::String(_) => TypeCheck::valid(field, "Valid string", "string", "string"),
            _ if wrapped => mismatch(
                "raw string",
                format!(
                    "Return ONLY the raw string value, not {actual}. \
                     Examples: \"John Doe\" or null, never {{\"value\": \"John Doe\"}}"
                ),
            ),
            _ => mismatch("string", format!("Return a string value or null, not {actual}")),
        },
        "number" | "float" => match value {
            Value::Number(_) => TypeCheck::valid(field, "Valid number", "number", "number"),
            Value::String(s) if parse_amount_text(s).is_some() => {
                TypeCheck::valid(field, "Valid number (string)", "number", "string")
            }
            Value::String(s) if !is_json_string(value) => TypeCheck::invalid(
                format!("✗ {field}: Not a valid number"),
                "number",
                "string (non-numeric)",
                format!("String '{}' cannot be converted to number", preview(s, 60)),
                format!(
                    "Return ONLY a numeric value like 50000 or null, not '{}'",
                    preview(s, 60)
                ),
            ),
            _ if wrapped || is_json_string(value) => mismatch(
                "number",
                format!(
                    "Return ONLY the numeric value, not {actual}. \
                     Example: 50000 or null, not {{\"value\": 50000}}"
                ),
            ),
            _ => mismatch("number", format!("Return a numeric value or null, not {actual}")),
        },
        "boolean" => match value {
            Value::Bool(_) => TypeCheck::valid(field, "Valid boolean", "boolean", "boolean"),
            _ if wrapped || is_json_string(value) => mismatch(
                "boolean (true/false)",
                format!(
                    "Return ONLY true, false, or null. Do not wrap in {actual}. \
                     Examples: true | false | null"
                ),
            ),
            _ => mismatch("boolean", "Return true, false, or null".into()),
        },
        "date" => match value {
            Value::String(s) if ISO_DATE.is_match(s.trim()) => {
                TypeCheck::valid(field, "Valid date", "ISO date (YYYY-MM-DD)", "string")
            }
            Value::String(s) if !is_json_string(value) => TypeCheck::invalid(
                format!("✗ {field}: Invalid date format"),
                "ISO date (YYYY-MM-DD)",
                "string (invalid format)",
                format!("Date '{}' doesn't match format YYYY-MM-DD", preview(s, 60)),
                format!(
                    "Return date in ISO format YYYY-MM-DD (e.g., 2025-01-15), not '{}'",
                    preview(s, 60)
                ),
            ),
            _ if wrapped || is_json_string(value) => mismatch(
                "ISO date string (YYYY-MM-DD)",
                format!("Return ONLY the date string in ISO format like \"2025-01-15\", not {actual}"),
            ),
            _ => mismatch(
                "ISO date (YYYY-MM-DD)",
                "Return a date string in format YYYY-MM-DD or null".into(),
            ),
        },
        "json" => check_records(field, value).1,
        _ => TypeCheck::valid(field, "Valid value", expected_type, actual),
    }
}

/// Try to read `value` as records, explaining any failure.
pub fn check_records(field: &str, value: &Value) -> (Option<Vec<Record>>, TypeCheck) {
    let python_syntax = matches!(value, Value::String(s)
        if serde_json::from_str::<Value>(s.trim()).is_err());

    match parse_records_detailed(value) {
        Ok(records) => {
            let what = if python_syntax {
                "Valid JSON (Python syntax)"
            } else {
                "Valid JSON"
            };
            let actual = type_name(value);
            (Some(records), TypeCheck::valid(field, what, "json", actual))
        }
        Err(err) => {
            let check = match value {
                Value::String(s) if s.trim().is_empty() => TypeCheck::invalid(
                    format!("✗ {field}: JSON parse failed (empty string)"),
                    "json",
                    "string",
                    "Empty string provided".into(),
                    r#"Return a valid JSON array like [{"field": "value"}] or null"#.into(),
                ),
                Value::String(s) if err.line.is_some() => TypeCheck::invalid(
                    format!("✗ {field}: Invalid JSON - parse failed"),
                    "json array [{...}, {...}]",
                    "string (invalid JSON)",
                    format!("JSON decode error: {err}"),
                    format!(
                        "Got plain text instead of JSON. Ensure output is ONLY valid JSON \
                         like [{{\"key\": \"value\"}}] with no explanations or markdown. \
                         Received: {}",
                        preview(s.trim(), 80)
                    ),
                ),
                _ => TypeCheck::invalid(
                    format!("✗ {field}: JSON parse failed (wrong structure)"),
                    "json (array of objects)",
                    type_name(value),
                    err.to_string(),
                    "Ensure output is a JSON array [...] of objects {...}".into(),
                ),
            };
            (None, check)
        }
    }
}

// ---------------------------------------------------------------------------
// Record-list summary
// ---------------------------------------------------------------------------

/// Concise summary of a reconciled JSON field: status line, judge
/// reasoning, record counts, the worst sub-fields, and suggested actions.
pub fn json_list_feedback(
    field: &str,
    score: f64,
    report: &ReconcileReport,
    pred: &Value,
    llm_reasoning: Option<&str>,
) -> String {
    let status = if score >= PASS_THRESHOLD { "PASS" } else { "FAIL" };
    let mut lines = vec![format!("{status} {field}: {score:.3}")];

    if let Some(reason) = llm_reasoning.filter(|r| !r.is_empty()) {
        lines.push(format!("  LLM: {reason}"));
    }

    match report.flag {
        Some(ReconcileFlag::PredUnparseable) => {
            let (_, check) = check_records(field, pred);
            lines.extend(check.render().lines().map(|l| format!("  {l}")));
            return lines.join("\n");
        }
        Some(flag @ (ReconcileFlag::GoldUnparseable | ReconcileFlag::BothUnparseable)) => {
            lines.push(format!("  ⚠ {flag}"));
            return lines.join("\n");
        }
        _ => {}
    }

    let (n_gold, n_pred, n_matched) = (report.n_gold, report.n_pred, report.n_matched);
    lines.push(format!(
        "  Records: {n_gold} expected, {n_pred} extracted, {n_matched} matched"
    ));
    if n_pred < n_gold {
        lines.push(format!(
            "  Missing {} records - extract all table rows",
            n_gold - n_pred
        ));
    } else if n_pred > n_gold {
        lines.push(format!(
            "  Hallucinated {} extra records - verify table boundaries",
            n_pred - n_gold
        ));
    }

    let means = report.field_means();
    let mut failing: Vec<(&String, f64)> = means
        .iter()
        .filter(|(_, s)| **s < FAILING_FIELD)
        .map(|(k, s)| (k, *s))
        .collect();
    failing.sort_by(|a, b| a.1.total_cmp(&b.1).then_with(|| a.0.cmp(b.0)));
    if !failing.is_empty() {
        lines.push(format!("  Failing fields ({}/{}):", failing.len(), means.len()));
        for (name, s) in failing.iter().take(MAX_FAILING_SHOWN) {
            lines.push(format!("    - {name}: {s:.2}"));
        }
        if failing.len() > MAX_FAILING_SHOWN {
            lines.push(format!("    - and {} more", failing.len() - MAX_FAILING_SHOWN));
        }
    }

    if report.n_unmatched_gold > 0 {
        lines.push(format!("  Unmatched gold records: {}", report.n_unmatched_gold));
    }
    if report.n_unmatched_pred > 0 {
        lines.push(format!(
            "  Unmatched pred records: {} (hallucinations)",
            report.n_unmatched_pred
        ));
    }

    let mut actions = Vec::new();
    if n_pred < n_gold {
        actions.push(format!("Extract all {n_gold} rows (missing {})", n_gold - n_pred));
    } else if n_pred > n_gold {
        actions.push(format!("Remove {} extra rows", n_pred - n_gold));
    }
    if let Some((name, s)) = failing.first() {
        actions.push(format!("Fix '{name}' field (score {s:.2})"));
    }
    if score < FAILING_FIELD {
        actions.push("Verify schema field names match exactly".into());
    }
    if !actions.is_empty() {
        let numbered: Vec<String> = actions
            .iter()
            .enumerate()
            .map(|(i, a)| format!("{}. {a}", i + 1))
            .collect();
        lines.push(format!("  Actions: {}", numbered.join(" | ")));
    }

    lines.join("\n")
}
