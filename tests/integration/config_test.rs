//! Config resolution integration tests.

use pg_runner::config::{resolve_config, Config, ConnectionConfig, Settings};
use pg_runner::error::RunnerError;
use std::io::Write;
use std::time::Duration;

#[test]
fn config_file_to_effective_config() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(
        file,
        r#"
[settings]
continue_on_fail = true

[connections.default]
host = "db.internal"
database = "app"
user = "service"
connection_timeout_ms = 15000
"#
    )
    .unwrap();

    let config = Config::load_from_file(file.path()).unwrap();
    let credentials = config.get_connection(None).unwrap();
    let effective = resolve_config(credentials, &config.settings).unwrap();

    assert_eq!(effective.host, "db.internal");
    assert_eq!(effective.database, "app");
    assert_eq!(effective.connection_timeout, Duration::from_millis(15_000));
    assert!(effective.continue_on_fail);
}

#[test]
fn settings_override_credential_defaults() {
    let credentials = ConnectionConfig {
        database: Some("app".to_string()),
        user: Some("service".to_string()),
        ssl: false,
        ..Default::default()
    };
    let settings = Settings {
        continue_on_fail: false,
        connection_timeout_ms: Some(1_000),
        ssl: Some(true),
    };

    let effective = resolve_config(&credentials, &settings).unwrap();
    assert!(effective.ssl);
    assert_eq!(effective.connection_timeout, Duration::from_millis(1_000));
}

#[test]
fn incomplete_credentials_are_a_credential_error() {
    let err = resolve_config(&ConnectionConfig::default(), &Settings::default()).unwrap_err();
    assert!(matches!(err, RunnerError::Credential(_)));
}

#[test]
fn malformed_config_file_is_a_config_error() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, "[connections.default\ndatabase = ").unwrap();

    let err = Config::load_from_file(file.path()).unwrap_err();
    assert!(matches!(err, RunnerError::Config(_)));
}
