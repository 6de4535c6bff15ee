//! Operation execution and result normalization.
//!
//! Bridges a built statement to the driver boundary and shapes the raw
//! execution result into the per-operation JSON the caller receives.

use crate::db::{ExecutionResult, QueryRunner};
use crate::error::Result;
use crate::statement::{OperationDescriptor, OperationKind};
use serde_json::json;
use tracing::debug;

/// Builds the statement for one descriptor, executes it, and normalizes
/// the result for the operation kind.
pub async fn run_operation(
    runner: &dyn QueryRunner,
    descriptor: &OperationDescriptor,
) -> Result<serde_json::Value> {
    let statement = descriptor.build()?;
    debug!(
        operation = descriptor.kind().as_str(),
        sql = %statement.sql,
        "executing statement"
    );

    let result = runner.query(&statement.sql, &statement.params).await?;
    Ok(normalize(descriptor.kind(), &statement.sql, result))
}

/// Shapes an execution result into the operation's output JSON.
fn normalize(kind: OperationKind, sql: &str, result: ExecutionResult) -> serde_json::Value {
    match kind {
        OperationKind::ExecuteQuery => {
            let command = result
                .command
                .clone()
                .unwrap_or_else(|| command_tag(sql));
            json!({
                "command": command,
                "rowCount": result.row_count,
                "rows": result.rows,
                "fields": result.fields,
            })
        }
        OperationKind::Select => json!({
            "rows": result.rows,
            "rowCount": result.row_count,
        }),
        OperationKind::Insert => json!({
            "inserted": result.first_row(),
            "rowCount": result.row_count,
        }),
        OperationKind::Update => json!({
            "updated": result.rows,
            "rowCount": result.row_count,
        }),
        OperationKind::Delete => json!({
            "deleted": true,
            "rowCount": result.row_count,
        }),
    }
}

/// Derives the command tag from the statement's leading keyword.
fn command_tag(sql: &str) -> String {
    sql.split_whitespace()
        .next()
        .map(|word| word.to_uppercase())
        .unwrap_or_default()
}
