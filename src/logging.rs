//! Logging configuration for pg-runner.
//!
//! Logs go to stderr so stdout stays clean for JSON output.

use tracing_subscriber::EnvFilter;

/// Initializes stderr logging with `RUST_LOG`-style filtering.
pub fn init_stderr_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
}
