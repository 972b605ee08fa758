//! `leasex-scoring`: field matchers and record reconciliation for scoring
//! lease extractions against ground truth.
//!
//! Pure engine crate: receives gold and predicted values, returns a score and
//! feedback. No CLI or IO dependencies. The only blocking call is an optional
//! [`hybrid::Judge`] supplied by the caller.

pub mod assignment;
pub mod config;
pub mod error;
pub mod feedback;
pub mod hybrid;
pub mod literal;
pub mod matchers;
pub mod metric;
pub mod normalize;
pub mod records;
pub mod registry;

pub use config::{FieldConfig, FieldType, FieldsConfig};
pub use error::{JudgeError, ScoringError};
pub use hybrid::{HybridScorer, HybridWeights, Judge, JudgeVerdict};
pub use matchers::{CustomMatcher, MatchResult, Matcher, MatcherKind, Params};
pub use metric::{FieldMetric, ScoreStats};
pub use normalize::{extract_field, is_null, FieldSource, RecordLike};
pub use records::{reconcile, FieldSchema, ReconcileFlag, ReconcileReport, Record};
pub use registry::MatcherRegistry;
