//! PostgreSQL runner implementation.
//!
//! Implements the `QueryRunner` trait over a sqlx connection pool, maps
//! driver errors to the crate taxonomy, and provides the connectivity
//! self-test with specific human-readable diagnoses.

use crate::config::EffectiveConfig;
use crate::db::{ExecutionResult, FieldInfo, QueryRunner, Record, Value};
use crate::error::{Result, RunnerError};
use async_trait::async_trait;
use futures::TryStreamExt;
use serde::Serialize;
use sqlx::postgres::{PgArguments, PgPool, PgPoolOptions, PgRow};
use sqlx::query::Query;
use sqlx::{Column as SqlxColumn, Either, Postgres, Row as SqlxRow, TypeInfo};
use std::time::Duration;
use tracing::{debug, warn};

/// Timeout for the connectivity self-test.
const TEST_TIMEOUT: Duration = Duration::from_secs(5);

/// PostgreSQL query runner backed by a sqlx pool.
///
/// The pool is owned exclusively by this runner and closed via [`close`];
/// callers must release it exactly once per run.
///
/// [`close`]: QueryRunner::close
#[derive(Debug)]
pub struct PostgresRunner {
    pool: PgPool,
    query_timeout: Duration,
}

impl PostgresRunner {
    /// Opens a connection pool for the given configuration.
    ///
    /// No retry is attempted: a failed connect surfaces immediately and
    /// retry policy, if any, belongs to the caller.
    pub async fn connect(config: &EffectiveConfig) -> Result<Self> {
        debug!("Connecting to {}", config.display_string());

        let pool = PgPoolOptions::new()
            .max_connections(config.pool_max)
            .acquire_timeout(config.connection_timeout)
            .idle_timeout(config.idle_timeout)
            .connect(&config.connection_string())
            .await
            .map_err(|e| RunnerError::query(diagnose_connection_error(&e, config)))?;

        debug!("Connected to {}", config.display_string());
        Ok(Self {
            pool,
            query_timeout: config.connection_timeout,
        })
    }

    /// Creates a runner from an existing pool.
    ///
    /// This is primarily useful for testing.
    #[allow(dead_code)]
    pub fn from_pool(pool: PgPool) -> Self {
        Self {
            pool,
            query_timeout: Duration::from_secs(30),
        }
    }
}

#[async_trait]
impl QueryRunner for PostgresRunner {
    async fn query(&self, sql: &str, params: &[Value]) -> Result<ExecutionResult> {
        let mut query = sqlx::query(sql);
        for param in params {
            query = bind_value(query, param);
        }

        let fetch = async {
            let mut rows: Vec<Record> = Vec::new();
            let mut fields: Vec<FieldInfo> = Vec::new();
            let mut rows_affected: u64 = 0;

            let mut stream = query.fetch_many(&self.pool);
            while let Some(step) = stream.try_next().await? {
                match step {
                    Either::Left(done) => rows_affected += done.rows_affected(),
                    Either::Right(row) => {
                        if fields.is_empty() {
                            fields = extract_fields(&row);
                        }
                        rows.push(convert_row(&row));
                    }
                }
            }

            Ok::<_, sqlx::Error>((rows, rows_affected, fields))
        };

        let (rows, rows_affected, fields) =
            tokio::time::timeout(self.query_timeout, fetch)
                .await
                .map_err(|_| {
                    RunnerError::query(format!(
                        "Query timed out after {} ms",
                        self.query_timeout.as_millis()
                    ))
                })?
                .map_err(map_query_error)?;

        Ok(ExecutionResult::from_rows(rows, rows_affected, fields))
    }

    async fn close(&self) -> Result<()> {
        self.pool.close().await;
        Ok(())
    }
}

/// Binds one scalar parameter onto a query.
fn bind_value<'q>(
    query: Query<'q, Postgres, PgArguments>,
    value: &'q Value,
) -> Query<'q, Postgres, PgArguments> {
    match value {
        Value::Null => query.bind(Option::<String>::None),
        Value::Bool(b) => query.bind(*b),
        Value::Int(i) => query.bind(*i),
        Value::Float(f) => query.bind(*f),
        Value::String(s) => query.bind(s.as_str()),
    }
}

/// Extracts field metadata from a result row.
fn extract_fields(row: &PgRow) -> Vec<FieldInfo> {
    row.columns()
        .iter()
        .map(|col| FieldInfo::new(col.name(), col.type_info().name()))
        .collect()
}

/// Converts a sqlx PgRow into a JSON record, keyed by column name.
fn convert_row(row: &PgRow) -> Record {
    row.columns()
        .iter()
        .enumerate()
        .map(|(i, col)| {
            (
                col.name().to_string(),
                convert_value(row, i, col.type_info().name()),
            )
        })
        .collect()
}

/// Converts a single column value from a PgRow to JSON.
fn convert_value(row: &PgRow, index: usize, type_name: &str) -> serde_json::Value {
    match type_name.to_uppercase().as_str() {
        "BOOL" | "BOOLEAN" => row
            .try_get::<Option<bool>, _>(index)
            .ok()
            .flatten()
            .map(serde_json::Value::Bool)
            .unwrap_or(serde_json::Value::Null),

        "INT2" | "SMALLINT" => json_int(row.try_get::<Option<i16>, _>(index).ok().flatten()),
        "INT4" | "INT" | "INTEGER" => {
            json_int(row.try_get::<Option<i32>, _>(index).ok().flatten())
        }
        "INT8" | "BIGINT" => json_int(row.try_get::<Option<i64>, _>(index).ok().flatten()),

        "FLOAT4" | "REAL" => json_float(
            row.try_get::<Option<f32>, _>(index)
                .ok()
                .flatten()
                .map(f64::from),
        ),
        "FLOAT8" | "DOUBLE PRECISION" => {
            json_float(row.try_get::<Option<f64>, _>(index).ok().flatten())
        }

        "JSON" | "JSONB" => row
            .try_get::<Option<serde_json::Value>, _>(index)
            .ok()
            .flatten()
            .unwrap_or(serde_json::Value::Null),

        // For all other types, try to get as string
        _ => row
            .try_get::<Option<String>, _>(index)
            .ok()
            .flatten()
            .map(serde_json::Value::String)
            .unwrap_or(serde_json::Value::Null),
    }
}

fn json_int<T: Into<i64>>(value: Option<T>) -> serde_json::Value {
    value
        .map(|v| serde_json::Value::from(v.into()))
        .unwrap_or(serde_json::Value::Null)
}

fn json_float(value: Option<f64>) -> serde_json::Value {
    value
        .and_then(serde_json::Number::from_f64)
        .map(serde_json::Value::Number)
        .unwrap_or(serde_json::Value::Null)
}

/// Maps a driver failure during statement execution, keeping the SQLSTATE
/// code when the server reported one.
fn map_query_error(error: sqlx::Error) -> RunnerError {
    if let Some(db_error) = error.as_database_error() {
        let mut message = format!("ERROR: {}", db_error.message());

        if let Some(pg_error) = db_error.try_downcast_ref::<sqlx::postgres::PgDatabaseError>() {
            if let Some(detail) = pg_error.detail() {
                message.push_str("\n  DETAIL: ");
                message.push_str(detail);
            }
            if let Some(hint) = pg_error.hint() {
                message.push_str("\n  HINT: ");
                message.push_str(hint);
            }
        }

        match db_error.code() {
            Some(code) => RunnerError::query_with_code(code.to_string(), message),
            None => RunnerError::query(message),
        }
    } else {
        RunnerError::query(error.to_string())
    }
}

/// Maps a connection-phase failure to a specific, human-readable diagnosis.
fn diagnose_connection_error(error: &sqlx::Error, config: &EffectiveConfig) -> String {
    let host = &config.host;
    let port = config.port;

    if let Some(db_error) = error.as_database_error() {
        match db_error.code().as_deref() {
            Some("28P01") | Some("28000") => {
                return format!(
                    "Authentication failed for user '{}'. Check your credentials.",
                    config.user
                );
            }
            Some("3D000") => {
                return format!("Database '{}' does not exist.", config.database);
            }
            Some("42501") => {
                return format!(
                    "User '{}' is not authorized to connect to database '{}'.",
                    config.user, config.database
                );
            }
            _ => {}
        }
    }

    let error_str = error.to_string().to_lowercase();

    if error_str.contains("connection refused") {
        format!("Connection refused at {host}:{port}. Check that the server is running.")
    } else if error_str.contains("failed to lookup")
        || error_str.contains("name or service not known")
        || error_str.contains("not found")
    {
        format!("Host '{host}' not found. Check the host name.")
    } else if error_str.contains("timed out") || error_str.contains("timeout") {
        format!("Connection to {host}:{port} timed out. The server may be overloaded or unreachable.")
    } else if error_str.contains("password authentication")
        || error_str.contains("authentication failed")
    {
        format!(
            "Authentication failed for user '{}'. Check your credentials.",
            config.user
        )
    } else if error_str.contains("does not exist") && error_str.contains("database") {
        format!("Database '{}' does not exist.", config.database)
    } else {
        format!("Could not connect to {host}:{port}: {error}")
    }
}

/// Outcome of the connectivity self-test.
#[derive(Debug, Clone, Serialize)]
pub struct ConnectionTestReport {
    /// Whether the test query succeeded.
    pub ok: bool,

    /// Diagnosis on failure, confirmation on success.
    pub message: String,

    /// Server version string, when the test succeeded.
    pub server_version: Option<String>,

    /// Server clock reading, when the test succeeded.
    pub server_time: Option<String>,
}

/// Attempts one query against the target with a single connection and a
/// five second timeout, mapping failures to specific diagnoses.
///
/// This is operator-facing and never part of the per-batch path.
pub async fn test_connection(config: &EffectiveConfig) -> ConnectionTestReport {
    let conn_str = config.connection_string();
    let connect = PgPoolOptions::new()
        .max_connections(1)
        .acquire_timeout(TEST_TIMEOUT)
        .connect(&conn_str);

    let pool = match tokio::time::timeout(TEST_TIMEOUT, connect).await {
        Ok(Ok(pool)) => pool,
        Ok(Err(e)) => {
            return ConnectionTestReport {
                ok: false,
                message: diagnose_connection_error(&e, config),
                server_version: None,
                server_time: None,
            };
        }
        Err(_) => {
            return ConnectionTestReport {
                ok: false,
                message: format!(
                    "Connection to {}:{} timed out. The server may be overloaded or unreachable.",
                    config.host, config.port
                ),
                server_version: None,
                server_time: None,
            };
        }
    };

    let probe = sqlx::query_as::<_, (String, String)>(
        "SELECT NOW()::text AS now, version() AS version",
    )
    .fetch_one(&pool);

    let report = match tokio::time::timeout(TEST_TIMEOUT, probe).await {
        Ok(Ok((now, version))) => ConnectionTestReport {
            ok: true,
            message: format!("Connection to {} succeeded.", config.display_string()),
            server_version: Some(version),
            server_time: Some(now),
        },
        Ok(Err(e)) => {
            warn!("Connection self-test query failed: {e}");
            ConnectionTestReport {
                ok: false,
                message: diagnose_connection_error(&e, config),
                server_version: None,
                server_time: None,
            }
        }
        Err(_) => ConnectionTestReport {
            ok: false,
            message: format!(
                "Connection to {}:{} timed out. The server may be overloaded or unreachable.",
                config.host, config.port
            ),
            server_version: None,
            server_time: None,
        },
    };

    pool.close().await;
    report
}
