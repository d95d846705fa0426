use std::io::Write;

use courier::config::Config;
use courier::domain::keys;
use courier::error::{ConfigError, Error};

fn write_temp_config(contents: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new()
        .prefix("courier-config-test-")
        .suffix(".toml")
        .tempfile()
        .expect("create temp config");
    file.write_all(contents.as_bytes()).expect("write temp config");
    file
}

#[test]
fn config_loads_pool_and_smtp_tables() {
    let file = write_temp_config(
        r#"
[logging]
level = "debug"
format = "json"

[pool]
queue_capacity = 32
worker_count = 2

[smtp]
hostname = "smtp.example.com"
hostport = 465
username = "alerts"
password = "secret"
ssl = true
"#,
    );

    let config = Config::load(file.path()).expect("valid config");

    assert_eq!(config.logging.level, "debug");
    assert_eq!(config.pool.queue_capacity, 32);
    assert_eq!(config.pool.worker_count, 2);

    let smtp = config.smtp_settings();
    assert_eq!(smtp.get(keys::HOSTPORT).map(String::as_str), Some("465"));
    assert_eq!(smtp.get(keys::SSL).map(String::as_str), Some("true"));
}

#[test]
fn config_rejects_zero_workers() {
    let file = write_temp_config("[pool]\nworker_count = 0\n");

    let result = Config::load(file.path());

    match result {
        Err(Error::Config(ConfigError::InvalidValue {
            field: "worker_count",
            ..
        })) => {}
        Err(err) => panic!("Expected invalid worker_count error, got {err}"),
        Ok(config) => panic!(
            "Expected zero workers to be rejected, got {}",
            config.pool.worker_count
        ),
    }
}

#[test]
fn config_reports_missing_file() {
    let result = Config::load("/nonexistent/courier.toml");
    assert!(matches!(result, Err(Error::Config(ConfigError::ReadFile(_)))));
}

#[test]
fn config_reports_malformed_toml() {
    let file = write_temp_config("[pool\nworker_count = 2\n");
    let result = Config::load(file.path());
    assert!(matches!(result, Err(Error::Config(ConfigError::Parse(_)))));
}
