//! Per-type matchers.
//!
//! Every matcher is reached through [`Matcher::score`], which applies the
//! shared null rules before any type-specific parsing:
//!
//! | gold     | pred     | score | feedback      |
//! |----------|----------|-------|---------------|
//! | null     | null     | 1.0   | both null     |
//! | null     | non-null | 0.0   | hallucination |
//! | non-null | null     | 0.0   | missing       |

pub mod address;
pub mod boolean;
pub mod date;
pub mod enumeration;
pub mod float;
pub mod json;
pub mod number;
pub mod phone;
pub mod string;

use std::fmt;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::ScoringError;
use crate::feedback::format_parse_error_feedback;
use crate::hybrid::Judge;
use crate::normalize::{is_structured, preview, value_text, NullPolicy};

pub use address::AddressMatcher;
pub use boolean::BooleanMatcher;
pub use date::DateMatcher;
pub use enumeration::EnumMatcher;
pub use float::FloatMatcher;
pub use json::JsonMatcher;
pub use number::NumberMatcher;
pub use phone::PhoneMatcher;
pub use string::StringMatcher;

/// Type-specific matcher options, as loaded from configuration.
pub type Params = Map<String, Value>;

// ---------------------------------------------------------------------------
// Match result
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchResult {
    /// Always within [0.0, 1.0].
    pub score: f64,
    pub feedback: String,
}

impl MatchResult {
    pub fn new(score: f64, feedback: impl Into<String>) -> Self {
        let score = if score.is_finite() { score.clamp(0.0, 1.0) } else { 0.0 };
        Self {
            score,
            feedback: feedback.into(),
        }
    }

    pub fn pass(feedback: impl Into<String>) -> Self {
        Self::new(1.0, feedback)
    }

    pub fn fail(feedback: impl Into<String>) -> Self {
        Self::new(0.0, feedback)
    }
}

// ---------------------------------------------------------------------------
// Extension point
// ---------------------------------------------------------------------------

/// A matcher for a type outside the nine built-in kinds. Registered on a
/// [`crate::registry::RegistryBuilder`] before the registry is built.
pub trait CustomMatcher: fmt::Debug + Send + Sync {
    /// Called only when at least one side is non-null.
    fn compare(&self, field_name: &str, gold: &Value, pred: &Value) -> MatchResult;

    fn null_policy(&self) -> NullPolicy {
        NullPolicy::Sentinels
    }
}

// ---------------------------------------------------------------------------
// Matcher
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub enum MatcherKind {
    String(StringMatcher),
    Number(NumberMatcher),
    Float(FloatMatcher),
    Boolean(BooleanMatcher),
    Date(DateMatcher),
    Enum(EnumMatcher),
    Phone(PhoneMatcher),
    Address(AddressMatcher),
    Json(JsonMatcher),
    Custom {
        type_name: String,
        matcher: Arc<dyn CustomMatcher>,
    },
}

impl MatcherKind {
    pub fn type_name(&self) -> &str {
        match self {
            Self::String(_) => "string",
            Self::Number(_) => "number",
            Self::Float(_) => "float",
            Self::Boolean(_) => "boolean",
            Self::Date(_) => "date",
            Self::Enum(_) => "enum",
            Self::Phone(_) => "phone",
            Self::Address(_) => "address",
            Self::Json(_) => "json",
            Self::Custom { type_name, .. } => type_name,
        }
    }

    fn null_policy(&self) -> NullPolicy {
        match self {
            Self::Enum(m) => m.null_policy(),
            Self::Custom { matcher, .. } => matcher.null_policy(),
            _ => NullPolicy::Sentinels,
        }
    }
}

/// A matcher bound to the field it scores.
#[derive(Debug, Clone)]
pub struct Matcher {
    field_name: String,
    kind: MatcherKind,
}

impl Matcher {
    pub fn new(field_name: impl Into<String>, kind: MatcherKind) -> Self {
        Self {
            field_name: field_name.into(),
            kind,
        }
    }

    pub fn field_name(&self) -> &str {
        &self.field_name
    }

    pub fn kind(&self) -> &MatcherKind {
        &self.kind
    }

    pub fn type_name(&self) -> &str {
        self.kind.type_name()
    }

    /// Attach an LLM judge. Only JSON matchers use one; other kinds are
    /// returned unchanged.
    pub fn with_judge(mut self, judge: Arc<dyn Judge>) -> Self {
        if let MatcherKind::Json(ref mut m) = self.kind {
            m.set_judge(judge);
        }
        self
    }

    /// Score a (gold, predicted) pair.
    ///
    /// Malformed data always yields `Ok` with a 0.0 score and feedback. `Err`
    /// is reserved for configuration problems, e.g. a record key missing
    /// from a JSON field schema.
    pub fn score(&self, gold: &Value, pred: &Value) -> Result<MatchResult, ScoringError> {
        let field = self.field_name.as_str();
        let policy = self.kind.null_policy();

        match (policy.is_null(gold), policy.is_null(pred)) {
            (true, true) => return Ok(MatchResult::pass(format!("✓ {field}: both null"))),
            (true, false) => {
                return Ok(MatchResult::fail(format!(
                    "✗ {field}: hallucination (predicted '{}' when gold is null)",
                    preview(&value_text(pred), 50)
                )))
            }
            (false, true) => {
                return Ok(MatchResult::fail(format!(
                    "✗ {field}: missing (expected '{}', got null)",
                    preview(&value_text(gold), 50)
                )))
            }
            (false, false) => {}
        }

        let scalar = !matches!(self.kind, MatcherKind::Json(_) | MatcherKind::Custom { .. });
        if scalar && is_structured(pred) && !is_structured(gold) {
            return Ok(MatchResult::fail(format_parse_error_feedback(
                field,
                self.type_name(),
                pred,
                None,
            )));
        }

        let result = match &self.kind {
            MatcherKind::String(m) => m.compare(field, gold, pred),
            MatcherKind::Number(m) => m.compare(field, gold, pred),
            MatcherKind::Float(m) => m.compare(field, gold, pred),
            MatcherKind::Boolean(m) => m.compare(field, gold, pred),
            MatcherKind::Date(m) => m.compare(field, gold, pred),
            MatcherKind::Enum(m) => m.compare(field, gold, pred),
            MatcherKind::Phone(m) => m.compare(field, gold, pred),
            MatcherKind::Address(m) => m.compare(field, gold, pred),
            MatcherKind::Json(m) => m.compare(field, gold, pred)?,
            MatcherKind::Custom { matcher, .. } => matcher.compare(field, gold, pred),
        };
        Ok(result)
    }
}

/// Deserialize a matcher's typed params. Unknown keys are ignored so one
/// config block can carry options for several matcher types.
pub(crate) fn parse_params<T: DeserializeOwned>(
    field: &str,
    matcher: &str,
    params: &Params,
) -> Result<T, ScoringError> {
    serde_json::from_value(Value::Object(params.clone())).map_err(|e| ScoringError::InvalidParams {
        field: field.into(),
        matcher: matcher.into(),
        message: e.to_string(),
    })
}

pub(crate) fn check_unit_interval(
    field: &str,
    matcher: &str,
    name: &str,
    value: f64,
) -> Result<(), ScoringError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ScoringError::InvalidParams {
            field: field.into(),
            matcher: matcher.into(),
            message: format!("{name} must be within [0, 1], got {value}"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn all_kinds() -> Vec<Matcher> {
        let enum_params = json!({"valid_values": ["Gross", "Net"]});
        vec![
            Matcher::new("f", MatcherKind::String(StringMatcher::default())),
            Matcher::new("f", MatcherKind::Number(NumberMatcher)),
            Matcher::new("f", MatcherKind::Float(FloatMatcher::default())),
            Matcher::new("f", MatcherKind::Boolean(BooleanMatcher)),
            Matcher::new("f", MatcherKind::Date(DateMatcher)),
            Matcher::new(
                "f",
                MatcherKind::Enum(
                    EnumMatcher::from_params("f", enum_params.as_object().unwrap()).unwrap(),
                ),
            ),
            Matcher::new("f", MatcherKind::Phone(PhoneMatcher)),
            Matcher::new("f", MatcherKind::Address(AddressMatcher::default())),
            Matcher::new("f", MatcherKind::Json(JsonMatcher::default())),
        ]
    }

    #[test]
    fn null_rules_apply_to_every_kind() {
        for m in all_kinds() {
            let both = m.score(&json!("N/A"), &Value::Null).unwrap();
            assert_eq!(both.score, 1.0, "{}", m.type_name());
            assert!(both.feedback.contains("both null"));

            let hallucinated = m.score(&json!(""), &json!("something")).unwrap();
            assert_eq!(hallucinated.score, 0.0, "{}", m.type_name());
            assert!(hallucinated.feedback.contains("hallucination"));

            let missing = m.score(&json!("something"), &json!("tbd")).unwrap();
            assert_eq!(missing.score, 0.0, "{}", m.type_name());
            assert!(missing.feedback.contains("missing"));
        }
    }

    #[test]
    fn wrapped_scalar_gets_type_mismatch_feedback() {
        let m = Matcher::new("tenant_name", MatcherKind::String(StringMatcher::default()));
        let r = m
            .score(&json!("Acme LLC"), &json!(r#"{"tenant_name": "Acme LLC"}"#))
            .unwrap();
        assert_eq!(r.score, 0.0);
        assert!(r.feedback.contains("Type mismatch"));
        assert!(r.feedback.contains("return: Acme LLC"));
    }

    #[test]
    fn match_result_clamps() {
        assert_eq!(MatchResult::new(1.5, "").score, 1.0);
        assert_eq!(MatchResult::new(-0.2, "").score, 0.0);
        assert_eq!(MatchResult::new(f64::NAN, "").score, 0.0);
    }

    #[test]
    fn with_judge_is_noop_for_scalars() {
        let judge: Arc<dyn Judge> = Arc::new(
            |_: &str, _: &str, _: &str| -> Result<crate::hybrid::JudgeVerdict, crate::error::JudgeError> {
                Ok(crate::hybrid::JudgeVerdict::new(1.0, "ok"))
            },
        );
        let m = Matcher::new("f", MatcherKind::Phone(PhoneMatcher)).with_judge(judge);
        assert_eq!(m.type_name(), "phone");
    }
}
