//! Null detection, text canonicalization, and similarity primitives shared by
//! every matcher.

use serde_json::{Map, Value};

/// Tokens that mean "absent" when they are the entire trimmed, lower-cased
/// value of a field.
pub const NULL_SENTINELS: &[&str] = &[
    "",
    "null",
    "none",
    "na",
    "n/a",
    "unknown",
    "missing",
    "tbd",
    "tba",
    "unk",
    "pending",
    "to be determined",
    "0",
];

/// How a matcher decides that a value is absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NullPolicy {
    /// Null, empty containers, and every token in [`NULL_SENTINELS`].
    #[default]
    Sentinels,
    /// Only null, empty containers, and blank strings. Used when sentinel
    /// tokens such as "N/A" are legitimate values.
    Strict,
}

impl NullPolicy {
    pub fn is_null(self, value: &Value) -> bool {
        match self {
            Self::Sentinels => is_null(value),
            Self::Strict => match value {
                Value::String(s) => s.trim().is_empty(),
                other => is_null(other),
            },
        }
    }
}

pub fn is_null_text(s: &str) -> bool {
    let lowered = s.trim().to_lowercase();
    NULL_SENTINELS.contains(&lowered.as_str())
}

/// True for null, empty arrays/objects, and sentinel strings.
pub fn is_null(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => is_null_text(s),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
        Value::Bool(_) | Value::Number(_) => false,
    }
}

/// Plain text form of a value. Strings are returned verbatim, structured
/// values as compact JSON.
pub fn value_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Array(_) | Value::Object(_) => value.to_string(),
    }
}

/// Trimmed, lower-cased text form used for exact comparisons.
pub fn normalize_value(value: &Value) -> String {
    value_text(value).trim().to_lowercase()
}

/// Truncate for feedback display without splitting a character.
pub fn preview(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        return s.to_string();
    }
    let cut: String = s.chars().take(max_chars.saturating_sub(3)).collect();
    format!("{cut}...")
}

/// True when a string value looks like a JSON object or array.
pub fn is_json_string(value: &Value) -> bool {
    match value {
        Value::String(s) => {
            let s = s.trim();
            (s.starts_with('{') && s.ends_with('}')) || (s.starts_with('[') && s.ends_with(']'))
        }
        _ => false,
    }
}

/// True for values that are structured rather than scalar: arrays, objects,
/// or strings holding a JSON object/array.
pub fn is_structured(value: &Value) -> bool {
    matches!(value, Value::Array(_) | Value::Object(_)) || is_json_string(value)
}

// ---------------------------------------------------------------------------
// Similarity
// ---------------------------------------------------------------------------

/// Edit-distance similarity ratio in [0, 1].
///
/// Computed as `1 - indel(a, b) / (|a| + |b|)`, i.e. `2·LCS / (|a| + |b|)`
/// over characters, where indel distance counts insertions and deletions.
pub fn similarity(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let total = a.len() + b.len();
    if total == 0 {
        return 1.0;
    }
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }

    // Two-row LCS table.
    let mut prev = vec![0usize; b.len() + 1];
    let mut curr = vec![0usize; b.len() + 1];
    for ca in &a {
        for (j, cb) in b.iter().enumerate() {
            curr[j + 1] = if ca == cb {
                prev[j] + 1
            } else {
                prev[j + 1].max(curr[j])
            };
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    let lcs = prev[b.len()];
    (2 * lcs) as f64 / total as f64
}

// ---------------------------------------------------------------------------
// Field access
// ---------------------------------------------------------------------------

/// Anything that exposes named fields, such as an example or a prediction
/// produced by the extraction pipeline.
pub trait RecordLike {
    fn field(&self, name: &str) -> Option<Value>;
}

/// Where a field value is read from.
pub enum FieldSource<'a> {
    Mapping(&'a Map<String, Value>),
    Record(&'a dyn RecordLike),
}

/// Read `name` from a source. Absent fields come back as `Value::Null`.
pub fn extract_field(source: FieldSource<'_>, name: &str) -> Value {
    match source {
        FieldSource::Mapping(map) => map.get(name).cloned().unwrap_or(Value::Null),
        FieldSource::Record(record) => record.field(name).unwrap_or(Value::Null),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn sentinels_are_case_and_whitespace_insensitive() {
        for token in ["N/A", "  none ", "TBD", "To Be Determined", "0", ""] {
            assert!(is_null(&json!(token)), "{token:?} should be null");
        }
        assert!(!is_null(&json!("00")));
        assert!(!is_null(&json!("nothing")));
    }

    #[test]
    fn empty_containers_are_null() {
        assert!(is_null(&Value::Null));
        assert!(is_null(&json!([])));
        assert!(is_null(&json!({})));
        assert!(!is_null(&json!([1])));
        assert!(!is_null(&json!(0)));
        assert!(!is_null(&json!(false)));
    }

    #[test]
    fn strict_policy_keeps_sentinel_tokens() {
        assert!(!NullPolicy::Strict.is_null(&json!("N/A")));
        assert!(NullPolicy::Strict.is_null(&json!("   ")));
        assert!(NullPolicy::Strict.is_null(&Value::Null));
    }

    #[test]
    fn similarity_bounds() {
        assert_eq!(similarity("", ""), 1.0);
        assert_eq!(similarity("abc", ""), 0.0);
        assert_eq!(similarity("same", "same"), 1.0);
        assert_eq!(similarity("abc", "xyz"), 0.0);
        // LCS("john doe", "john do") = 7 → 14 / 15
        assert!((similarity("john doe", "john do") - 14.0 / 15.0).abs() < 1e-12);
    }

    #[test]
    fn json_string_detection() {
        assert!(is_json_string(&json!(r#"{"a": 1}"#)));
        assert!(is_json_string(&json!(" [1, 2] ")));
        assert!(!is_json_string(&json!("[unterminated")));
        assert!(!is_json_string(&json!({"a": 1})));
        assert!(is_structured(&json!({"a": 1})));
    }

    struct Example {
        name: &'static str,
    }

    impl RecordLike for Example {
        fn field(&self, name: &str) -> Option<Value> {
            (name == "tenant").then(|| json!(self.name))
        }
    }

    #[test]
    fn extract_from_mapping_and_record() {
        let map = json!({"tenant": "Acme"});
        let map = map.as_object().unwrap();
        assert_eq!(extract_field(FieldSource::Mapping(map), "tenant"), json!("Acme"));
        assert_eq!(extract_field(FieldSource::Mapping(map), "landlord"), Value::Null);

        let ex = Example { name: "Globex" };
        assert_eq!(extract_field(FieldSource::Record(&ex), "tenant"), json!("Globex"));
        assert_eq!(extract_field(FieldSource::Record(&ex), "other"), Value::Null);
    }

    #[test]
    fn preview_truncates_on_char_boundary() {
        assert_eq!(preview("short", 10), "short");
        assert_eq!(preview("ééééééééééé", 6), "ééé...");
    }
}
