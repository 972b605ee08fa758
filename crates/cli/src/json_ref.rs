//! Field locations inside an annotation document.
//!
//! A document is a JSON object of sections, each holding `static_fields`
//! (key → value) and `tables` (name → list of row objects):
//!
//! | Reference                                               | Resolves to                        |
//! |---------------------------------------------------------|------------------------------------|
//! | `STATIC::<section>::<key>`                              | `doc[section].static_fields[key]`  |
//! | `TABLE::<section>::<table>`                             | object rows of the table           |
//! | `TABLE_FILTER::<section>::<table>::<field>::<value>::<column>` | non-null `column` of matching rows |
//! | empty or `MISSING`                                      | null                               |

use std::fmt;
use std::str::FromStr;

use serde_json::Value;
use thiserror::Error;

const SEPARATOR: &str = "::";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum JsonRefError {
    #[error("unknown json_ref kind '{0}' (expected STATIC, TABLE, or TABLE_FILTER)")]
    UnknownKind(String),
    #[error("{kind} json_ref must have the form {form}")]
    Arity {
        kind: &'static str,
        form: &'static str,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JsonRef {
    Missing,
    Static {
        section: String,
        key: String,
    },
    Table {
        section: String,
        table: String,
    },
    TableFilter {
        section: String,
        table: String,
        row_field: String,
        row_value: String,
        column: String,
    },
}

impl FromStr for JsonRef {
    type Err = JsonRefError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() || s == "MISSING" {
            return Ok(Self::Missing);
        }

        let parts: Vec<&str> = s.split(SEPARATOR).collect();
        let owned = |i: usize| parts[i].to_string();
        match parts[0] {
            "STATIC" => {
                if parts.len() != 3 {
                    return Err(JsonRefError::Arity {
                        kind: "STATIC",
                        form: "STATIC::<section>::<key>",
                    });
                }
                Ok(Self::Static {
                    section: owned(1),
                    key: owned(2),
                })
            }
            "TABLE" => {
                if parts.len() != 3 {
                    return Err(JsonRefError::Arity {
                        kind: "TABLE",
                        form: "TABLE::<section>::<table>",
                    });
                }
                Ok(Self::Table {
                    section: owned(1),
                    table: owned(2),
                })
            }
            "TABLE_FILTER" => {
                if parts.len() != 6 {
                    return Err(JsonRefError::Arity {
                        kind: "TABLE_FILTER",
                        form: "TABLE_FILTER::<section>::<table>::<row_field>::<row_value>::<column>",
                    });
                }
                Ok(Self::TableFilter {
                    section: owned(1),
                    table: owned(2),
                    row_field: owned(3),
                    row_value: owned(4),
                    column: owned(5),
                })
            }
            other => Err(JsonRefError::UnknownKind(other.to_string())),
        }
    }
}

impl fmt::Display for JsonRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Missing => f.write_str("MISSING"),
            Self::Static { section, key } => write!(f, "STATIC::{section}::{key}"),
            Self::Table { section, table } => write!(f, "TABLE::{section}::{table}"),
            Self::TableFilter {
                section,
                table,
                row_field,
                row_value,
                column,
            } => write!(
                f,
                "TABLE_FILTER::{section}::{table}::{row_field}::{row_value}::{column}"
            ),
        }
    }
}

impl JsonRef {
    /// Look the reference up in `doc`. Absent sections, keys, and tables
    /// resolve to null or an empty list; they are not errors.
    pub fn resolve(&self, doc: &Value) -> Value {
        match self {
            Self::Missing => Value::Null,
            Self::Static { section, key } => doc
                .get(section)
                .and_then(|s| s.get("static_fields"))
                .and_then(|f| f.get(key))
                .cloned()
                .unwrap_or(Value::Null),
            Self::Table { section, table } => Value::Array(
                table_rows(doc, section, table)
                    .filter(|row| row.is_object())
                    .cloned()
                    .collect(),
            ),
            Self::TableFilter {
                section,
                table,
                row_field,
                row_value,
                column,
            } => Value::Array(
                table_rows(doc, section, table)
                    .filter(|row| row.get(row_field).and_then(Value::as_str) == Some(row_value.as_str()))
                    .filter_map(|row| row.get(column))
                    .filter(|v| !v.is_null())
                    .cloned()
                    .collect(),
            ),
        }
    }
}

fn table_rows<'a>(doc: &'a Value, section: &str, table: &str) -> impl Iterator<Item = &'a Value> {
    doc.get(section)
        .and_then(|s| s.get("tables"))
        .and_then(|t| t.get(table))
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
}

/// Parse `path` and resolve it against `doc`.
pub fn resolve(doc: &Value, path: &str) -> Result<Value, JsonRefError> {
    Ok(path.parse::<JsonRef>()?.resolve(doc))
}
