//! Unit tests for configuration loading and resolution
//!
//! Covers:
//! - Missing TOML files do not cause failure (defaults + warning)
//! - Invalid TOML files are reported as configuration errors
//! - Priority order for API base resolution (CLI → ENV → TOML → default)
//! - Config path resolution
//!
//! Note: Uses serial_test crate to prevent ENV variable race conditions.
//! Tests that manipulate APA_API_BASE or APA_CONFIG are marked with #[serial].

use apa_common::config::{
    load_toml_config, resolve_api_base, resolve_config_path, TomlConfig, API_BASE_ENV,
    CONFIG_PATH_ENV, DEFAULT_API_BASE,
};
use apa_common::Error;
use serial_test::serial;
use std::env;
use std::path::PathBuf;
use tempfile::TempDir;

#[test]
fn test_missing_config_file_uses_defaults() {
    let temp_dir = TempDir::new().unwrap();
    let missing = temp_dir.path().join("does-not-exist.toml");

    let config = load_toml_config(Some(&missing)).unwrap();
    assert_eq!(config, TomlConfig::default());
}

#[test]
fn test_no_config_path_uses_defaults() {
    let config = load_toml_config(None).unwrap();
    assert_eq!(config, TomlConfig::default());
}

#[test]
fn test_full_config_file_loads() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("config.toml");
    std::fs::write(
        &path,
        r#"
api_base = "http://generator.local:8000/api"
steps = ["Parse", "Draft", "Review"]
max_log_entries = 500

[stream]
idle_timeout_secs = 45
channel_capacity = 32

[logging]
level = "debug"
file = "/tmp/apa.log"
"#,
    )
    .unwrap();

    let config = load_toml_config(Some(&path)).unwrap();
    assert_eq!(config.api_base.as_deref(), Some("http://generator.local:8000/api"));
    assert_eq!(config.steps, vec!["Parse", "Draft", "Review"]);
    assert_eq!(config.max_log_entries, Some(500));
    assert_eq!(config.stream.idle_timeout_secs, 45);
    assert_eq!(config.stream.channel_capacity, 32);
    assert_eq!(config.logging.level, "debug");
    assert_eq!(config.logging.file, Some(PathBuf::from("/tmp/apa.log")));
}

#[test]
fn test_unparseable_config_file_is_error() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("config.toml");
    std::fs::write(&path, "api_base = [unclosed").unwrap();

    let err = load_toml_config(Some(&path)).unwrap_err();
    assert!(matches!(err, Error::Config(_)));
}

#[test]
#[serial]
fn test_cli_overrides_env_and_toml() {
    env::set_var(API_BASE_ENV, "http://env:1/api");
    let toml_config = TomlConfig {
        api_base: Some("http://toml:2/api".to_string()),
        ..TomlConfig::default()
    };

    let resolved = resolve_api_base(Some("http://cli:3/api/"), &toml_config);
    assert_eq!(resolved, "http://cli:3/api");

    env::remove_var(API_BASE_ENV);
}

#[test]
#[serial]
fn test_env_overrides_toml() {
    env::set_var(API_BASE_ENV, "http://env:1/api");
    let toml_config = TomlConfig {
        api_base: Some("http://toml:2/api".to_string()),
        ..TomlConfig::default()
    };

    assert_eq!(resolve_api_base(None, &toml_config), "http://env:1/api");

    env::remove_var(API_BASE_ENV);
}

#[test]
#[serial]
fn test_toml_then_default_fallback() {
    env::remove_var(API_BASE_ENV);

    let toml_config = TomlConfig {
        api_base: Some("http://toml:2/api".to_string()),
        ..TomlConfig::default()
    };
    assert_eq!(resolve_api_base(None, &toml_config), "http://toml:2/api");

    assert_eq!(resolve_api_base(None, &TomlConfig::default()), DEFAULT_API_BASE);
}

#[test]
#[serial]
fn test_blank_values_are_ignored() {
    env::set_var(API_BASE_ENV, "   ");
    let toml_config = TomlConfig {
        api_base: Some(String::new()),
        ..TomlConfig::default()
    };

    assert_eq!(resolve_api_base(Some(""), &toml_config), DEFAULT_API_BASE);

    env::remove_var(API_BASE_ENV);
}

#[test]
#[serial]
fn test_config_path_priority() {
    let explicit = PathBuf::from("/explicit/config.toml");
    env::set_var(CONFIG_PATH_ENV, "/from/env.toml");

    assert_eq!(resolve_config_path(Some(&explicit)), Some(explicit.clone()));
    assert_eq!(resolve_config_path(None), Some(PathBuf::from("/from/env.toml")));

    env::remove_var(CONFIG_PATH_ENV);
}
