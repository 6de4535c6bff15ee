//! Result and parameter types for pg-runner.
//!
//! Defines the scalar value type bound into statements and the normalized
//! result shape every execution produces.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A scalar parameter value bound into a SQL statement.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum Value {
    /// NULL value.
    #[default]
    Null,

    /// Boolean value.
    Bool(bool),

    /// Signed integer (up to i64).
    Int(i64),

    /// Floating point number.
    Float(f64),

    /// Text/string value.
    String(String),
}

impl Value {
    /// Returns true if this value is NULL.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Converts a JSON scalar into a bindable value.
    ///
    /// Arrays and objects are bound as their compact JSON text, which is
    /// what the server receives for untyped parameters.
    pub fn from_json(value: &serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(*b),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Value::Int(i)
                } else {
                    Value::Float(n.as_f64().unwrap_or(f64::NAN))
                }
            }
            serde_json::Value::String(s) => Value::String(s.clone()),
            other => Value::String(other.to_string()),
        }
    }

    /// Renders the value for log output.
    pub fn to_display_string(&self) -> String {
        match self {
            Value::Null => "NULL".to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Int(i) => i.to_string(),
            Value::Float(f) => f.to_string(),
            Value::String(s) => s.clone(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_display_string())
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v as i64)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl<T> From<Option<T>> for Value
where
    T: Into<Value>,
{
    fn from(v: Option<T>) -> Self {
        match v {
            Some(val) => val.into(),
            None => Value::Null,
        }
    }
}

/// A single result row, keyed by column name in result order.
pub type Record = serde_json::Map<String, serde_json::Value>;

/// Metadata about a column in a result set.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct FieldInfo {
    /// Column name.
    pub name: String,

    /// Driver-reported type identifier for the column.
    #[serde(rename = "typeId")]
    pub type_id: String,
}

impl FieldInfo {
    /// Creates field metadata with the given name and type.
    pub fn new(name: impl Into<String>, type_id: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_id: type_id.into(),
        }
    }
}

/// Normalized result of executing one statement.
///
/// Produced fresh per execution, never retained across statements.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExecutionResult {
    /// Command tag (e.g. "SELECT", "INSERT") when known.
    pub command: Option<String>,

    /// Returned rows, if the statement produced any.
    pub rows: Vec<Record>,

    /// Number of returned rows, or the affected-row count for statements
    /// that returned none.
    pub row_count: u64,

    /// Column metadata for the result set.
    pub fields: Vec<FieldInfo>,
}

impl ExecutionResult {
    /// Creates a result from returned rows and the driver's affected count.
    pub fn from_rows(rows: Vec<Record>, rows_affected: u64, fields: Vec<FieldInfo>) -> Self {
        let row_count = if rows.is_empty() {
            rows_affected
        } else {
            rows.len() as u64
        };
        Self {
            command: None,
            rows,
            row_count,
            fields,
        }
    }

    /// Sets the command tag.
    pub fn with_command(mut self, command: impl Into<String>) -> Self {
        self.command = Some(command.into());
        self
    }

    /// Returns true if the statement returned no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// The first returned row, if any.
    pub fn first_row(&self) -> Option<&Record> {
        self.rows.first()
    }
}
