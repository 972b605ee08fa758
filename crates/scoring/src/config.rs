use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::ScoringError;
use crate::matchers::{Matcher, Params};
use crate::registry::MatcherRegistry;

// ---------------------------------------------------------------------------
// Field types
// ---------------------------------------------------------------------------

/// Built-in matcher kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    String,
    Number,
    Float,
    Boolean,
    Date,
    Enum,
    Phone,
    Address,
    Json,
}

impl FieldType {
    pub const ALL: [FieldType; 9] = [
        Self::String,
        Self::Number,
        Self::Float,
        Self::Boolean,
        Self::Date,
        Self::Enum,
        Self::Phone,
        Self::Address,
        Self::Json,
    ];

    /// Case-insensitive. `boolean_string` is an alias for `boolean`.
    pub fn parse(name: &str) -> Option<Self> {
        let name = name.trim().to_lowercase();
        if name == "boolean_string" {
            return Some(Self::Boolean);
        }
        Self::ALL.into_iter().find(|t| t.as_str() == name)
    }

    /// Map a matcher class name (`DateMatcher`, `JSONMatcher`, ...) to its
    /// type.
    pub fn from_matcher_name(name: &str) -> Option<Self> {
        let lowered = name.trim().to_lowercase();
        let stem = lowered.strip_suffix("matcher")?;
        Self::parse(stem)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Number => "number",
            Self::Float => "float",
            Self::Boolean => "boolean",
            Self::Date => "date",
            Self::Enum => "enum",
            Self::Phone => "phone",
            Self::Address => "address",
            Self::Json => "json",
        }
    }
}

// ---------------------------------------------------------------------------
// Field configuration
// ---------------------------------------------------------------------------

fn default_type() -> String {
    "string".into()
}

#[derive(Debug, Clone, Deserialize)]
pub struct FieldConfig {
    /// Filled from the table key when loaded through [`FieldsConfig`].
    #[serde(skip)]
    pub field_name: String,
    #[serde(rename = "type", default = "default_type")]
    pub field_type: String,
    /// Matcher class name; overrides `type` when set.
    #[serde(default)]
    pub matcher: Option<String>,
    /// Where the field lives in an annotation document.
    #[serde(default)]
    pub json_ref: Option<String>,
    #[serde(default)]
    pub params: Params,
    #[serde(default)]
    pub description: Option<String>,
}

impl FieldConfig {
    pub fn new(field_name: impl Into<String>, field_type: impl Into<String>, params: Params) -> Self {
        Self {
            field_name: field_name.into(),
            field_type: field_type.into(),
            matcher: None,
            json_ref: None,
            params,
            description: None,
        }
    }

    /// The type name used to build the matcher.
    pub fn resolved_type(&self) -> Result<String, ScoringError> {
        match &self.matcher {
            None => Ok(self.field_type.trim().to_lowercase()),
            Some(name) => FieldType::from_matcher_name(name)
                .map(|t| t.as_str().to_string())
                .ok_or_else(|| {
                    ScoringError::ConfigValidation(format!(
                        "field '{}': unknown matcher '{name}'",
                        self.field_name
                    ))
                }),
        }
    }

    pub fn build_matcher(&self, registry: &MatcherRegistry) -> Result<Matcher, ScoringError> {
        registry.create(&self.field_name, &self.resolved_type()?, &self.params)
    }
}

/// A set of field configurations, keyed by field name.
///
/// ```toml
/// [fields.lease_start_date]
/// type = "date"
/// json_ref = "STATIC::lease_terms::start_date"
///
/// [fields.rent_schedule]
/// type = "json"
/// [fields.rent_schedule.params.field_schema.amount]
/// type = "number"
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FieldsConfig {
    #[serde(default)]
    pub fields: BTreeMap<String, FieldConfig>,
}

impl FieldsConfig {
    pub fn from_toml(input: &str, registry: &MatcherRegistry) -> Result<Self, ScoringError> {
        let config: FieldsConfig =
            toml::from_str(input).map_err(|e| ScoringError::ConfigParse(e.to_string()))?;
        config.finish(registry)
    }

    pub fn from_json(input: &str, registry: &MatcherRegistry) -> Result<Self, ScoringError> {
        let config: FieldsConfig =
            serde_json::from_str(input).map_err(|e| ScoringError::ConfigParse(e.to_string()))?;
        config.finish(registry)
    }

    fn finish(mut self, registry: &MatcherRegistry) -> Result<Self, ScoringError> {
        for (name, field) in &mut self.fields {
            field.field_name = name.clone();
        }
        self.validate(registry)?;
        Ok(self)
    }

    /// Every field must build a matcher: known legacy matcher names, enum
    /// values present, sane weights, complete schema entries.
    pub fn validate(&self, registry: &MatcherRegistry) -> Result<(), ScoringError> {
        if self.fields.is_empty() {
            return Err(ScoringError::ConfigValidation(
                "at least one field is required".into(),
            ));
        }
        for field in self.fields.values() {
            field.build_matcher(registry)?;
        }
        Ok(())
    }

    pub fn field(&self, name: &str) -> Option<&FieldConfig> {
        self.fields.get(name)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Build every field's matcher, keyed by field name.
    pub fn matchers(&self, registry: &MatcherRegistry) -> Result<BTreeMap<String, Matcher>, ScoringError> {
        self.fields
            .iter()
            .map(|(name, field)| Ok((name.clone(), field.build_matcher(registry)?)))
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
