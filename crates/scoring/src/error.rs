use thiserror::Error;

/// Configuration errors. Malformed data never produces one of these; it
/// scores 0.0 with feedback instead.
#[derive(Debug, Error)]
pub enum ScoringError {
    /// TOML / JSON parse or deserialization error.
    #[error("config parse error: {0}")]
    ConfigParse(String),
    /// Config validation error (bad weights, schema entry without a type, etc.).
    #[error("config validation error: {0}")]
    ConfigValidation(String),
    /// Enum matcher built with neither `valid_values` nor `preset`.
    #[error("field '{field}': enum matcher needs valid_values or preset")]
    MissingEnumValues { field: String },
    #[error("field '{field}': unknown enum preset '{preset}'")]
    UnknownPreset { field: String, preset: String },
    /// Matcher params present but of the wrong shape.
    #[error("field '{field}': invalid {matcher} params: {message}")]
    InvalidParams {
        field: String,
        matcher: String,
        message: String,
    },
    /// A record key has no entry in the supplied field schema.
    #[error(
        "field '{field}': record key '{key}' is missing from the field schema \
         (schemas must cover every key; available: {available:?})"
    )]
    IncompleteSchema {
        field: String,
        key: String,
        available: Vec<String>,
    },
    #[error("matcher type '{0}' is already registered")]
    DuplicateRegistration(String),
    /// The process-wide registry can only be installed once.
    #[error("matcher registry is already installed")]
    RegistryInstalled,
    #[error("invalid hybrid weights: programmatic={programmatic}, llm={llm}")]
    InvalidWeights { programmatic: f64, llm: f64 },
}

/// Failure reported by an external judge. Soft in the scoring core: the
/// hybrid scorer records it and continues with an LLM score of 0.0.
#[derive(Debug, Clone, Error)]
pub enum JudgeError {
    #[error("judge unavailable: {0}")]
    Unavailable(String),
    #[error("judge returned an invalid response: {0}")]
    InvalidResponse(String),
}
