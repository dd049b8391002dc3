//! Unit tests for the configuration module

use crate::{
    config::{BackoffSettings, CollectorConfig, StatusConfig, VersionInfo},
    loader::{apply_overrides, parse_json},
    ConfigLoader,
};
use serial_test::serial;
use statusd_core::Error;
use std::collections::HashMap;
use std::io::Write;
use std::time::Duration;

fn lookup_from(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = vars
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    move |key| map.get(key).cloned()
}

#[test]
fn test_defaults_are_valid() {
    let config = StatusConfig::default();
    assert!(config.validate().is_ok());
    assert_eq!(config.collector.interval, Duration::from_secs(5));
    assert_eq!(config.collector.stale_threshold, Duration::from_secs(60));
    assert_eq!(config.k8s_version_check_interval, Duration::from_secs(900));
    assert_eq!(config.kvstore_kind, "Kvstore");
}

#[test]
fn test_partial_json_keeps_defaults() {
    let config = parse_json(
        r#"{
            "collector": { "interval_ms": 250 },
            "kvstore_kind": "Etcd",
            "version": { "version": "1.16.0", "revision": "abc123" }
        }"#,
    )
    .unwrap();

    assert_eq!(config.collector.interval, Duration::from_millis(250));
    assert_eq!(config.collector.stale_threshold, Duration::from_secs(60));
    assert_eq!(config.kvstore_kind, "Etcd");
    assert_eq!(config.version.banner(), "1.16.0 (v1.16.0-abc123)");
}

#[test]
fn test_malformed_json_is_json_error() {
    let err = parse_json("{ not json").unwrap_err();
    assert!(matches!(err, Error::Json { .. }));
}

#[test]
fn test_overrides_apply_in_milliseconds() {
    let mut config = StatusConfig::default();
    apply_overrides(
        &mut config,
        lookup_from(&[
            ("STATUSD_INTERVAL_MS", "100"),
            ("STATUSD_STALE_THRESHOLD_MS", " 2000 "),
            ("STATUSD_FIRST_RUN_TIMEOUT_MS", "30000"),
        ]),
    )
    .unwrap();

    assert_eq!(config.collector.interval, Duration::from_millis(100));
    assert_eq!(config.collector.stale_threshold, Duration::from_secs(2));
    assert_eq!(config.collector.shutdown_grace, Duration::from_secs(5));
    assert_eq!(config.first_run_timeout, Duration::from_secs(30));
}

#[test]
fn test_invalid_override_names_the_variable() {
    let mut config = StatusConfig::default();
    let err = apply_overrides(
        &mut config,
        lookup_from(&[("STATUSD_SHUTDOWN_GRACE_MS", "soon")]),
    )
    .unwrap_err();
    assert!(err.to_string().contains("STATUSD_SHUTDOWN_GRACE_MS"));
}

#[test]
fn test_zero_interval_rejected() {
    let config = CollectorConfig {
        interval: Duration::ZERO,
        ..Default::default()
    };
    assert!(matches!(
        config.validate(),
        Err(Error::Configuration { .. })
    ));
}

#[test]
fn test_backoff_validation() {
    let inverted = BackoffSettings {
        min: Duration::from_secs(10),
        max: Duration::from_secs(1),
        ..Default::default()
    };
    assert!(inverted.validate().is_err());

    let shrinking = BackoffSettings {
        factor: 0.5,
        ..Default::default()
    };
    assert!(shrinking.validate().is_err());

    assert!(BackoffSettings::default().validate().is_ok());
}

#[test]
fn test_version_banner_default_revision() {
    let version = VersionInfo {
        version: "0.1.0".into(),
        revision: "unknown".into(),
    };
    assert_eq!(version.banner(), "0.1.0 (v0.1.0-unknown)");
}

#[test]
#[serial]
fn test_loader_reads_file_then_environment() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(
        file,
        r#"{{ "collector": {{ "interval_ms": 750, "stale_threshold_ms": 9000 }} }}"#
    )
    .unwrap();

    std::env::set_var("STATUSD_STALE_THRESHOLD_MS", "4000");
    let result = ConfigLoader::new().file(file.path()).load();
    std::env::remove_var("STATUSD_STALE_THRESHOLD_MS");

    let config = result.unwrap();
    assert_eq!(config.collector.interval, Duration::from_millis(750));
    assert_eq!(config.collector.stale_threshold, Duration::from_secs(4));
}

#[test]
#[serial]
fn test_loader_rejects_zero_from_environment() {
    std::env::set_var("STATUSD_INTERVAL_MS", "0");
    let result = ConfigLoader::new().load();
    std::env::remove_var("STATUSD_INTERVAL_MS");

    assert!(matches!(result, Err(Error::Configuration { .. })));
}

#[test]
#[serial]
fn test_loader_without_env_overrides() {
    std::env::set_var("STATUSD_INTERVAL_MS", "0");
    let result = ConfigLoader::new().env_overrides(false).load();
    std::env::remove_var("STATUSD_INTERVAL_MS");

    assert_eq!(result.unwrap().collector.interval, Duration::from_secs(5));
}

#[test]
fn test_missing_file_is_file_system_error() {
    let err = ConfigLoader::new()
        .env_overrides(false)
        .file("/nonexistent/statusd.json")
        .load()
        .unwrap_err();
    assert!(matches!(err, Error::FileSystem { .. }));
}
