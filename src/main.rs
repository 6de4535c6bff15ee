//! pg-runner - batch CRUD and raw-query runner for PostgreSQL.

use pg_runner::batch::{self, WorkItem};
use pg_runner::cli::Cli;
use pg_runner::config::{resolve_config, Config, ConnectionConfig, EffectiveConfig};
use pg_runner::db::{self, schema};
use pg_runner::error::{Result, RunnerError};
use pg_runner::statement::OperationDescriptor;
use std::io::Read;
use std::path::PathBuf;
use tracing::{error, info};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    pg_runner::logging::init_stderr_logging();

    if let Err(e) = run().await {
        error!("{}: {}", e.category(), e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse_args();

    // Load configuration file
    let config_path = cli.config_path();
    info!("Loading config from: {}", config_path.display());
    let config = Config::load_from_file(&config_path)?;

    // Build connection config with precedence:
    // 1. CLI arguments (highest)
    // 2. Named connection from config
    // 3. Default connection from config
    // 4. Environment variables
    let credentials = resolve_connection(&cli, &config)?;
    let settings = cli.to_settings(&config.settings);
    let effective = resolve_config(&credentials, &settings)?;
    info!("Connection: {}", effective.display_string());

    if cli.test_connection {
        let report = db::test_connection(&effective).await;
        print_json(&serde_json::to_value(&report).unwrap_or_default(), &cli.output_file)?;
        if !report.ok {
            std::process::exit(1);
        }
        return Ok(());
    }

    if cli.list_tables {
        let discovery = schema::list_tables(&effective).await;
        return print_json(
            &serde_json::to_value(&discovery).unwrap_or_default(),
            &cli.output_file,
        );
    }

    if let Some(table) = &cli.list_columns {
        let discovery = schema::list_columns(&effective, table).await;
        return print_json(
            &serde_json::to_value(&discovery).unwrap_or_default(),
            &cli.output_file,
        );
    }

    run_batch_action(&cli, &effective).await
}

/// Runs the batch action: either a single quick query or an items file.
async fn run_batch_action(cli: &Cli, effective: &EffectiveConfig) -> Result<()> {
    let outcomes = if let Some(query) = &cli.query {
        // A fixed raw query runs once: no input items, one synthesized item.
        let descriptor = OperationDescriptor::ExecuteQuery {
            query: query.clone(),
            params: cli.params.clone(),
        };
        batch::run_batch(effective, Vec::new(), move |_| Ok(descriptor.clone())).await?
    } else if let Some(path) = &cli.items {
        let items = read_items(path)?;
        batch::run_batch(effective, items, |item| {
            OperationDescriptor::from_json(item.payload.clone())
        })
        .await?
    } else {
        return Err(RunnerError::config(
            "Nothing to do: pass --items, --query, --list-tables, --list-columns, or --test-connection",
        ));
    };

    let output: Vec<serde_json::Value> = outcomes.iter().map(|o| o.to_json()).collect();
    print_json(&serde_json::Value::Array(output), &cli.output_file)
}

/// Reads a JSON array of operation descriptors from a file or stdin.
fn read_items(path: &str) -> Result<Vec<WorkItem>> {
    let content = if path == "-" {
        let mut buffer = String::new();
        std::io::stdin()
            .read_to_string(&mut buffer)
            .map_err(|e| RunnerError::config(format!("Failed to read items from stdin: {e}")))?;
        buffer
    } else {
        std::fs::read_to_string(path)
            .map_err(|e| RunnerError::config(format!("Failed to read items file '{path}': {e}")))?
    };

    let value: serde_json::Value = serde_json::from_str(&content)
        .map_err(|e| RunnerError::validation(format!("Invalid JSON in items file: {e}")))?;

    match value {
        serde_json::Value::Array(items) => Ok(items.into_iter().map(WorkItem::new).collect()),
        _ => Err(RunnerError::validation(
            "Items file must contain a JSON array of operation descriptors",
        )),
    }
}

/// Prints pretty JSON to stdout or the output file.
fn print_json(value: &serde_json::Value, output_file: &Option<PathBuf>) -> Result<()> {
    let text = serde_json::to_string_pretty(value)
        .map_err(|e| RunnerError::config(format!("Failed to serialize output: {e}")))?;

    match output_file {
        Some(path) => std::fs::write(path, text)
            .map_err(|e| RunnerError::config(format!("Failed to write output file: {e}"))),
        None => {
            println!("{text}");
            Ok(())
        }
    }
}

/// Resolves the final connection configuration from CLI args, config file,
/// and environment.
fn resolve_connection(cli: &Cli, config: &Config) -> Result<ConnectionConfig> {
    // Start with CLI connection config if provided
    let mut connection = cli.to_connection_config()?;

    // If no CLI connection, try named connection from config
    if connection.is_none() {
        if let Some(name) = cli.connection_name() {
            connection = config.get_connection(Some(name)).cloned();
            if connection.is_none() {
                return Err(RunnerError::config(format!(
                    "Connection '{name}' not found in config file"
                )));
            }
        }
    }

    // If still no connection, try default from config
    if connection.is_none() {
        connection = config.get_connection(None).cloned();
    }

    // Apply environment variable defaults
    let mut connection = connection.unwrap_or_default();
    connection.apply_env_defaults();

    Ok(connection)
}
