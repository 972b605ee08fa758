//! Type name → matcher construction.
//!
//! The nine built-in kinds are a closed enum. Extra types are added on a
//! [`RegistryBuilder`] before the registry is built; a built registry is
//! immutable. A process-wide registry can be [`install`]ed once at startup
//! and read anywhere through [`global`].

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use once_cell::sync::OnceCell;

use crate::config::FieldType;
use crate::error::ScoringError;
use crate::matchers::{
    AddressMatcher, BooleanMatcher, CustomMatcher, DateMatcher, EnumMatcher, FloatMatcher,
    JsonMatcher, Matcher, MatcherKind, NumberMatcher, Params, PhoneMatcher, StringMatcher,
};

/// Builds a custom matcher for one field from its params.
pub type CustomFactory =
    Arc<dyn Fn(&str, &Params) -> Result<Arc<dyn CustomMatcher>, ScoringError> + Send + Sync>;

#[derive(Clone, Default)]
pub struct MatcherRegistry {
    custom: BTreeMap<String, CustomFactory>,
}

impl fmt::Debug for MatcherRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MatcherRegistry")
            .field("custom", &self.custom.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[derive(Default)]
pub struct RegistryBuilder {
    custom: BTreeMap<String, CustomFactory>,
}

impl fmt::Debug for RegistryBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegistryBuilder")
            .field("custom", &self.custom.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a custom type. Names are case-insensitive and may not
    /// shadow a built-in type or an earlier registration.
    pub fn register<F>(mut self, type_name: &str, factory: F) -> Result<Self, ScoringError>
    where
        F: Fn(&str, &Params) -> Result<Arc<dyn CustomMatcher>, ScoringError> + Send + Sync + 'static,
    {
        let key = type_name.trim().to_lowercase();
        if key.is_empty() || FieldType::parse(&key).is_some() || self.custom.contains_key(&key) {
            return Err(ScoringError::DuplicateRegistration(key));
        }
        self.custom.insert(key, Arc::new(factory));
        Ok(self)
    }

    pub fn build(self) -> MatcherRegistry {
        log::debug!(
            "matcher registry built with {} custom type(s): {:?}",
            self.custom.len(),
            self.custom.keys().collect::<Vec<_>>()
        );
        MatcherRegistry {
            custom: self.custom,
        }
    }
}

impl MatcherRegistry {
    /// A registry with only the built-in types.
    pub fn builtin() -> Self {
        Self::default()
    }

    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::new()
    }

    pub fn is_registered(&self, type_name: &str) -> bool {
        let key = type_name.trim().to_lowercase();
        FieldType::parse(&key).is_some() || self.custom.contains_key(&key)
    }

    /// Built-in type names followed by custom ones.
    pub fn types(&self) -> Vec<String> {
        FieldType::ALL
            .iter()
            .map(|t| t.as_str().to_string())
            .chain(self.custom.keys().cloned())
            .collect()
    }

    /// Build the matcher for `field_name`. Unknown type names fall back to
    /// the string matcher; invalid params are an error.
    pub fn create(
        &self,
        field_name: &str,
        field_type: &str,
        params: &Params,
    ) -> Result<Matcher, ScoringError> {
        let key = field_type.trim().to_lowercase();

        let kind = match FieldType::parse(&key) {
            Some(builtin) => self.builtin_kind(builtin, field_name, params)?,
            None => match self.custom.get(&key) {
                Some(factory) => MatcherKind::Custom {
                    type_name: key,
                    matcher: factory(field_name, params)?,
                },
                None => {
                    log::debug!("{field_name}: unknown type '{field_type}', using string matcher");
                    MatcherKind::String(StringMatcher::from_params(field_name, params)?)
                }
            },
        };
        Ok(Matcher::new(field_name, kind))
    }

    fn builtin_kind(
        &self,
        field_type: FieldType,
        field: &str,
        params: &Params,
    ) -> Result<MatcherKind, ScoringError> {
        Ok(match field_type {
            FieldType::String => MatcherKind::String(StringMatcher::from_params(field, params)?),
            FieldType::Number => MatcherKind::Number(NumberMatcher),
            FieldType::Float => MatcherKind::Float(FloatMatcher::from_params(field, params)?),
            FieldType::Boolean => MatcherKind::Boolean(BooleanMatcher),
            FieldType::Date => MatcherKind::Date(DateMatcher),
            FieldType::Enum => MatcherKind::Enum(EnumMatcher::from_params(field, params)?),
            FieldType::Phone => MatcherKind::Phone(PhoneMatcher),
            FieldType::Address => MatcherKind::Address(AddressMatcher::from_params(field, params)?),
            FieldType::Json => MatcherKind::Json(JsonMatcher::from_params(field, params, self)?),
        })
    }
}

// ---------------------------------------------------------------------------
// Process-wide registry
// ---------------------------------------------------------------------------

static INSTALLED: OnceCell<MatcherRegistry> = OnceCell::new();

/// Install the process-wide registry. Fails if one is already installed,
/// including the built-in default that [`global`] installs on first use.
pub fn install(registry: MatcherRegistry) -> Result<(), ScoringError> {
    INSTALLED
        .set(registry)
        .map_err(|_| ScoringError::RegistryInstalled)
}

/// The installed registry, or the built-in one if nothing was installed.
pub fn global() -> &'static MatcherRegistry {
    INSTALLED.get_or_init(MatcherRegistry::builtin)
}
