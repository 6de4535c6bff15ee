//! Live schema discovery for pg-runner.
//!
//! Queries catalog metadata (tables, columns) to drive capability lists in
//! calling tools. Discovery is best-effort: connectivity failures produce an
//! empty result with a diagnostic instead of an error, and nothing is ever
//! cached across invocations.

use crate::config::EffectiveConfig;
use serde::Serialize;
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;
use tracing::warn;

/// Timeout for discovery connections and queries.
const DISCOVERY_TIMEOUT: Duration = Duration::from_secs(5);

/// A table visible in the public schema.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TableRef {
    pub name: String,
}

/// Column metadata for one table.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ColumnMeta {
    pub name: String,
    pub data_type: String,
    pub is_nullable: bool,
    pub default: Option<String>,
    pub max_length: Option<i32>,
    pub precision: Option<i32>,
    pub scale: Option<i32>,
}

/// Best-effort discovery result: items found plus an optional diagnostic
/// when the lookup could not complete.
#[derive(Debug, Clone, Serialize)]
pub struct Discovery<T> {
    pub items: Vec<T>,
    pub diagnostic: Option<String>,
}

impl<T> Discovery<T> {
    fn found(items: Vec<T>) -> Self {
        Self {
            items,
            diagnostic: None,
        }
    }

    fn empty() -> Self {
        Self {
            items: Vec::new(),
            diagnostic: None,
        }
    }

    fn failed(diagnostic: String) -> Self {
        Self {
            items: Vec::new(),
            diagnostic: Some(diagnostic),
        }
    }
}

/// Lists the base tables in the public schema.
pub async fn list_tables(config: &EffectiveConfig) -> Discovery<TableRef> {
    match fetch_tables(config).await {
        Ok(tables) => Discovery::found(tables),
        Err(e) => {
            warn!("Table discovery failed: {e}");
            Discovery::failed(format!("Could not list tables: {e}"))
        }
    }
}

/// Lists the columns of the given table.
///
/// An empty table name returns an empty result without attempting a
/// connection.
pub async fn list_columns(config: &EffectiveConfig, table: &str) -> Discovery<ColumnMeta> {
    if table.trim().is_empty() {
        return Discovery::empty();
    }

    match fetch_columns(config, table).await {
        Ok(columns) => Discovery::found(columns),
        Err(e) => {
            warn!("Column discovery for {table} failed: {e}");
            Discovery::failed(format!("Could not list columns for '{table}': {e}"))
        }
    }
}

/// Opens a short-lived single-connection pool with a tight timeout.
async fn discovery_pool(config: &EffectiveConfig) -> sqlx::Result<PgPool> {
    PgPoolOptions::new()
        .max_connections(1)
        .acquire_timeout(DISCOVERY_TIMEOUT)
        .connect(&config.connection_string())
        .await
}

async fn fetch_tables(config: &EffectiveConfig) -> sqlx::Result<Vec<TableRef>> {
    let pool = discovery_pool(config).await?;

    let result = sqlx::query_scalar::<_, String>(
        r#"
        SELECT table_name::text
        FROM information_schema.tables
        WHERE table_schema = 'public' AND table_type = 'BASE TABLE'
        ORDER BY table_name
        "#,
    )
    .fetch_all(&pool)
    .await;

    pool.close().await;

    Ok(result?
        .into_iter()
        .map(|name| TableRef { name })
        .collect())
}

async fn fetch_columns(config: &EffectiveConfig, table: &str) -> sqlx::Result<Vec<ColumnMeta>> {
    let pool = discovery_pool(config).await?;

    let result = sqlx::query_as::<
        _,
        (
            String,
            String,
            String,
            Option<String>,
            Option<i32>,
            Option<i32>,
            Option<i32>,
        ),
    >(
        r#"
        SELECT
            column_name::text,
            data_type::text,
            is_nullable::text,
            column_default::text,
            character_maximum_length::int4,
            numeric_precision::int4,
            numeric_scale::int4
        FROM information_schema.columns
        WHERE table_schema = 'public' AND table_name = $1
        ORDER BY ordinal_position
        "#,
    )
    .bind(table)
    .fetch_all(&pool)
    .await;

    pool.close().await;

    Ok(result?
        .into_iter()
        .map(
            |(name, data_type, is_nullable, default, max_length, precision, scale)| ColumnMeta {
                name,
                data_type,
                is_nullable: is_nullable == "YES",
                default,
                max_length,
                precision,
                scale,
            },
        )
        .collect())
}
