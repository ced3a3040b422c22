//! Config file resolution tests
//!
//! Tests that touch SPKIOSK_CONFIG are marked #[serial] so they do not race
//! on the process environment.

use serial_test::serial;
use spkiosk_common::config::{ConfigResolver, TomlConfig, CONFIG_ENV_VAR};
use spkiosk_common::Error;
use std::env;
use std::io::Write;
use tempfile::NamedTempFile;

fn write_config(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("Should create temp file");
    file.write_all(content.as_bytes()).expect("Should write config");
    file
}

#[test]
#[serial]
fn test_explicit_path_is_loaded() {
    env::remove_var(CONFIG_ENV_VAR);
    let file = write_config(
        r#"
        daemon_url = "http://kiosk-speaker:3678"
        bind_addr = "0.0.0.0:8080"
        "#,
    );

    let config = ConfigResolver::new(Some(file.path().to_path_buf()))
        .load()
        .unwrap();

    assert_eq!(config.daemon_url, "http://kiosk-speaker:3678");
    assert_eq!(config.bind_addr, "0.0.0.0:8080");
    assert_eq!(
        config.resolved_events_url().unwrap(),
        "ws://kiosk-speaker:3678/events"
    );
}

#[test]
#[serial]
fn test_env_var_path_is_used() {
    let file = write_config("[sync]\nwatchdog_interval_ms = 1234\n");
    env::set_var(CONFIG_ENV_VAR, file.path());

    let resolver = ConfigResolver::new(None);
    assert_eq!(resolver.locate().as_deref(), Some(file.path()));
    let config = resolver.load().unwrap();
    assert_eq!(config.sync.watchdog_interval_ms, 1234);

    env::remove_var(CONFIG_ENV_VAR);
}

#[test]
#[serial]
fn test_explicit_path_beats_env_var() {
    let env_file = write_config("bind_addr = \"10.0.0.1:1\"\n");
    let cli_file = write_config("bind_addr = \"10.0.0.2:2\"\n");
    env::set_var(CONFIG_ENV_VAR, env_file.path());

    let config = ConfigResolver::new(Some(cli_file.path().to_path_buf()))
        .load()
        .unwrap();
    assert_eq!(config.bind_addr, "10.0.0.2:2");

    env::remove_var(CONFIG_ENV_VAR);
}

#[test]
#[serial]
fn test_missing_explicit_file_is_an_error() {
    env::remove_var(CONFIG_ENV_VAR);
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("nope.toml");

    let result = ConfigResolver::new(Some(missing)).load();
    assert!(matches!(result, Err(Error::Config(_))));
}

#[test]
#[serial]
fn test_missing_env_var_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    env::set_var(CONFIG_ENV_VAR, dir.path().join("gone.toml"));

    let result = ConfigResolver::new(None).load();
    env::remove_var(CONFIG_ENV_VAR);

    match result {
        Err(Error::Config(message)) => assert!(message.contains("gone.toml")),
        other => panic!("expected config error, got {:?}", other.map(|_| ())),
    }
}

#[test]
fn test_malformed_file_reports_path() {
    let file = write_config("[sync\npoll_timeout_ms = ");
    let err = TomlConfig::from_file(file.path()).unwrap_err();
    let message = err.to_string();
    assert!(message.contains(&file.path().display().to_string()));
}
