//! Statement building for pg-runner.
//!
//! Translates an operation descriptor into a parameterized SQL statement.
//! This module is pure: it never touches the network, and every bad input
//! is rejected with a validation error before any I/O happens.
//!
//! Table names and raw WHERE / ORDER BY / column-list text are interpolated
//! into the SQL verbatim. That trust boundary is part of this operation
//! set's contract: the caller owns those fragments, and only data values go
//! through `$N` placeholders.

use crate::db::Value;
use crate::error::{Result, RunnerError};
use serde::{Deserialize, Serialize};

/// An ordered mapping from column name to JSON value.
///
/// Iteration order is insertion order, which determines placeholder
/// numbering for insert and update statements.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct ColumnValueMap(pub serde_json::Map<String, serde_json::Value>);

impl ColumnValueMap {
    /// Parses a column map from JSON text.
    pub fn from_json_str(text: &str) -> Result<Self> {
        let value: serde_json::Value = serde_json::from_str(text)
            .map_err(|e| RunnerError::validation(format!("Invalid JSON in column map: {e}")))?;
        match value {
            serde_json::Value::Object(map) => Ok(Self(map)),
            other => Err(RunnerError::validation(format!(
                "Column map must be a JSON object, got {}",
                json_type_name(&other)
            ))),
        }
    }

    /// Returns the entries that carry data, in insertion order.
    ///
    /// Entries whose value is JSON null or an empty string are dropped
    /// before statement building.
    pub fn filtered(&self) -> Vec<(&String, &serde_json::Value)> {
        self.0
            .iter()
            .filter(|(_, value)| match value {
                serde_json::Value::Null => false,
                serde_json::Value::String(s) => !s.is_empty(),
                _ => true,
            })
            .collect()
    }

    /// Returns true if the map has no entries at all.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

fn json_type_name(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}

/// Structured description of one data-access operation.
///
/// The variant tag determines which fields are required; update and delete
/// are invalid without a non-empty `where` clause.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "operation", rename_all = "camelCase")]
pub enum OperationDescriptor {
    /// Run caller-supplied SQL text exactly as given.
    #[serde(rename_all = "camelCase")]
    ExecuteQuery {
        query: String,
        /// Comma-separated parameter values; each entry is trimmed.
        #[serde(default)]
        params: String,
    },

    /// SELECT with optional WHERE / ORDER BY / LIMIT.
    #[serde(rename_all = "camelCase")]
    Select {
        table: String,
        /// Column list text; empty means `*`.
        #[serde(default)]
        columns: String,
        #[serde(default, rename = "where")]
        where_clause: String,
        #[serde(default)]
        where_params: String,
        #[serde(default)]
        order_by: String,
        /// When true, no LIMIT clause is emitted.
        #[serde(default)]
        return_all: bool,
        #[serde(default = "default_limit")]
        limit: i64,
    },

    /// INSERT built from a column-value map, with RETURNING.
    #[serde(rename_all = "camelCase")]
    Insert {
        table: String,
        values: ColumnValueMap,
        /// RETURNING list text; empty means `*`.
        #[serde(default)]
        return_fields: String,
    },

    /// UPDATE built from a column-value map; WHERE is mandatory.
    #[serde(rename_all = "camelCase")]
    Update {
        table: String,
        values: ColumnValueMap,
        #[serde(default, rename = "where")]
        where_clause: String,
        #[serde(default)]
        where_params: String,
        #[serde(default)]
        return_fields: String,
    },

    /// DELETE; WHERE is mandatory, no RETURNING is requested.
    #[serde(rename_all = "camelCase")]
    Delete {
        table: String,
        #[serde(default, rename = "where")]
        where_clause: String,
        #[serde(default)]
        where_params: String,
    },
}

fn default_limit() -> i64 {
    50
}

/// The operation kind, used to pick the normalized output shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationKind {
    ExecuteQuery,
    Select,
    Insert,
    Update,
    Delete,
}

impl OperationKind {
    /// Returns the kind as its wire tag.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ExecuteQuery => "executeQuery",
            Self::Select => "select",
            Self::Insert => "insert",
            Self::Update => "update",
            Self::Delete => "delete",
        }
    }
}

/// A parameterized SQL statement: text plus its ordered argument list.
///
/// Every `$N` placeholder in `sql` has exactly one entry in `params`, with
/// numbering contiguous from 1 within this statement.
#[derive(Debug, Clone, PartialEq)]
pub struct BuiltStatement {
    pub sql: String,
    pub params: Vec<Value>,
}

impl OperationDescriptor {
    /// Parses a descriptor from a JSON value, distinguishing an unknown
    /// operation tag (a configuration error) from malformed fields
    /// (a validation error).
    pub fn from_json(value: serde_json::Value) -> Result<Self> {
        if let Some(tag) = value.get("operation").and_then(|t| t.as_str()) {
            const KNOWN: [&str; 5] = ["executeQuery", "select", "insert", "update", "delete"];
            if !KNOWN.contains(&tag) {
                return Err(RunnerError::config(format!("Unknown operation '{tag}'")));
            }
        }
        serde_json::from_value(value)
            .map_err(|e| RunnerError::validation(format!("Invalid operation descriptor: {e}")))
    }

    /// Returns which of the five operations this descriptor performs.
    pub fn kind(&self) -> OperationKind {
        match self {
            Self::ExecuteQuery { .. } => OperationKind::ExecuteQuery,
            Self::Select { .. } => OperationKind::Select,
            Self::Insert { .. } => OperationKind::Insert,
            Self::Update { .. } => OperationKind::Update,
            Self::Delete { .. } => OperationKind::Delete,
        }
    }

    /// Builds the SQL statement and ordered parameter list.
    pub fn build(&self) -> Result<BuiltStatement> {
        match self {
            Self::ExecuteQuery { query, params } => Ok(BuiltStatement {
                sql: query.clone(),
                params: split_csv_params(params),
            }),

            Self::Select {
                table,
                columns,
                where_clause,
                where_params,
                order_by,
                return_all,
                limit,
            } => build_select(
                table,
                columns,
                where_clause,
                where_params,
                order_by,
                *return_all,
                *limit,
            ),

            Self::Insert {
                table,
                values,
                return_fields,
            } => build_insert(table, values, return_fields),

            Self::Update {
                table,
                values,
                where_clause,
                where_params,
                return_fields,
            } => build_update(table, values, where_clause, where_params, return_fields),

            Self::Delete {
                table,
                where_clause,
                where_params,
            } => build_delete(table, where_clause, where_params),
        }
    }
}

fn build_select(
    table: &str,
    columns: &str,
    where_clause: &str,
    where_params: &str,
    order_by: &str,
    return_all: bool,
    limit: i64,
) -> Result<BuiltStatement> {
    let columns = if columns.trim().is_empty() {
        "*"
    } else {
        columns
    };
    let mut sql = format!("SELECT {columns} FROM {table}");
    let mut params = Vec::new();

    if !where_clause.trim().is_empty() {
        sql.push_str(" WHERE ");
        sql.push_str(where_clause);
        params = split_csv_params(where_params);
    }

    if !order_by.trim().is_empty() {
        sql.push_str(" ORDER BY ");
        sql.push_str(order_by);
    }

    if !return_all {
        if limit <= 0 {
            return Err(RunnerError::validation(format!(
                "Limit must be a positive integer, got {limit}"
            )));
        }
        sql.push_str(&format!(" LIMIT {limit}"));
    }

    Ok(BuiltStatement { sql, params })
}

fn build_insert(
    table: &str,
    values: &ColumnValueMap,
    return_fields: &str,
) -> Result<BuiltStatement> {
    let entries = values.filtered();
    if entries.is_empty() {
        return Err(RunnerError::validation("No data provided"));
    }

    let columns = entries
        .iter()
        .map(|(name, _)| quote_ident(name))
        .collect::<Vec<_>>()
        .join(", ");
    let placeholders = (1..=entries.len())
        .map(|n| format!("${n}"))
        .collect::<Vec<_>>()
        .join(", ");
    let params = entries
        .iter()
        .map(|(_, value)| Value::from_json(value))
        .collect();

    let sql = format!(
        "INSERT INTO {table} ({columns}) VALUES ({placeholders}) RETURNING {}",
        returning_list(return_fields)
    );

    Ok(BuiltStatement { sql, params })
}

fn build_update(
    table: &str,
    values: &ColumnValueMap,
    where_clause: &str,
    where_params: &str,
    return_fields: &str,
) -> Result<BuiltStatement> {
    if where_clause.trim().is_empty() {
        return Err(RunnerError::validation(
            "Update requires a WHERE clause to avoid updating every row",
        ));
    }

    let entries = values.filtered();
    if entries.is_empty() {
        return Err(RunnerError::validation("No data provided"));
    }

    let set_clause = entries
        .iter()
        .enumerate()
        .map(|(i, (name, _))| format!("{} = ${}", quote_ident(name), i + 1))
        .collect::<Vec<_>>()
        .join(", ");

    // WHERE params come after SET params. The where text is expected to
    // already reference the correct absolute positions ($N+1, $N+2, ...);
    // that is the caller's responsibility and is not re-validated here.
    let mut params: Vec<Value> = entries
        .iter()
        .map(|(_, value)| Value::from_json(value))
        .collect();
    params.extend(split_csv_params(where_params));

    let sql = format!(
        "UPDATE {table} SET {set_clause} WHERE {where_clause} RETURNING {}",
        returning_list(return_fields)
    );

    Ok(BuiltStatement { sql, params })
}

fn build_delete(table: &str, where_clause: &str, where_params: &str) -> Result<BuiltStatement> {
    if where_clause.trim().is_empty() {
        return Err(RunnerError::validation(
            "Delete requires a WHERE clause to avoid deleting every row",
        ));
    }

    Ok(BuiltStatement {
        sql: format!("DELETE FROM {table} WHERE {where_clause}"),
        params: split_csv_params(where_params),
    })
}

/// Splits a comma-separated parameter string into trimmed string values.
/// An empty (or all-whitespace) input yields no parameters.
fn split_csv_params(csv: &str) -> Vec<Value> {
    if csv.trim().is_empty() {
        return Vec::new();
    }
    csv.split(',')
        .map(|part| Value::String(part.trim().to_string()))
        .collect()
}

/// Double-quotes a column name to preserve case and allow reserved words.
fn quote_ident(name: &str) -> String {
    format!("\"{name}\"")
}

fn returning_list(return_fields: &str) -> &str {
    let trimmed = return_fields.trim();
    if trimmed.is_empty() {
        "*"
    } else {
        return_fields
    }
}
