//! Unit tests for bootstrap configuration and graceful degradation
//!
//! Tests the implementation of:
//! - Missing TOML files do not cause termination
//! - Invalid TOML falls back to defaults
//! - Priority order CLI → ENV → TOML → default
//!
//! Tests that manipulate TDP_* variables are marked with #[serial]
//! so they run sequentially, not in parallel.

use serial_test::serial;
use std::env;
use std::path::{Path, PathBuf};
use tdp_common::config::{
    load_toml_config, CompiledDefaults, ConfigResolver, ConfigSource, TomlConfig, ENV_EXECUTION_DIR,
    ENV_LOG_LEVEL, ENV_PLATFORM_HOST, ENV_PLATFORM_VERSION,
};

fn clear_env() {
    env::remove_var(ENV_EXECUTION_DIR);
    env::remove_var(ENV_PLATFORM_HOST);
    env::remove_var(ENV_PLATFORM_VERSION);
    env::remove_var(ENV_LOG_LEVEL);
}

fn write_toml(dir: &Path, content: &str) -> PathBuf {
    let path = dir.join("config.toml");
    std::fs::write(&path, content).unwrap();
    path
}

#[test]
fn test_compiled_defaults_for_current_platform() {
    let defaults = CompiledDefaults::for_current_platform();
    assert!(!defaults.execution_dir.as_os_str().is_empty());
    assert_eq!(defaults.log_level, "info");
    assert_eq!(defaults.config_resource_name, "DataPopulateConfiguration.Json");
}

#[test]
fn test_load_full_toml() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_toml(
        dir.path(),
        r#"
platform_host = "review.example.com"
workspace_id = 1017
platform_version = "9.5.300.1"
execution_dir = "/opt/tdp"

[logging]
level = "debug"
"#,
    );

    let config = load_toml_config(&path).unwrap();
    assert_eq!(config.platform_host.as_deref(), Some("review.example.com"));
    assert_eq!(config.workspace_id, Some(1017));
    assert_eq!(config.platform_version.as_deref(), Some("9.5.300.1"));
    assert_eq!(config.execution_dir, Some(PathBuf::from("/opt/tdp")));
    assert_eq!(config.logging.level, "debug");
}

#[test]
fn test_invalid_toml_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_toml(dir.path(), "workspace_id = \"not a number\"");
    assert!(load_toml_config(&path).is_err());
}

#[test]
#[serial]
fn test_missing_toml_falls_back_to_defaults() {
    clear_env();
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("absent.toml");

    let (resolver, source) = ConfigResolver::load(Some(missing.as_path()));

    assert!(matches!(source, ConfigSource::Unusable { ref path, .. } if *path == missing));
    assert!(resolver.toml().platform_host.is_none());
    assert_eq!(resolver.log_level(), "info");
    assert_eq!(
        resolver.execution_dir(None),
        CompiledDefaults::for_current_platform().execution_dir
    );
}

#[test]
#[serial]
fn test_invalid_toml_falls_back_to_defaults() {
    clear_env();
    let dir = tempfile::tempdir().unwrap();
    let path = write_toml(dir.path(), "this is = = not toml");

    let (resolver, source) = ConfigResolver::load(Some(path.as_path()));

    match source {
        ConfigSource::Unusable { path: reported, error } => {
            assert_eq!(reported, path);
            assert!(error.contains("TOML parse error"), "{error}");
        }
        other => panic!("Expected Unusable, got {other:?}"),
    }
    assert!(resolver.platform_host(None).is_none());
}

#[test]
#[serial]
fn test_valid_toml_reports_loaded_source() {
    clear_env();
    let dir = tempfile::tempdir().unwrap();
    let path = write_toml(dir.path(), "platform_host = \"review.example.com\"");

    let (resolver, source) = ConfigResolver::load(Some(path.as_path()));

    assert_eq!(source, ConfigSource::Loaded(path));
    assert!(source.is_loaded());
    assert_eq!(resolver.platform_host(None).as_deref(), Some("review.example.com"));
}

#[test]
#[serial]
fn test_execution_dir_priority_order() {
    clear_env();
    let toml = TomlConfig {
        execution_dir: Some(PathBuf::from("/from/toml")),
        ..Default::default()
    };
    let resolver = ConfigResolver::from_toml(toml);

    assert_eq!(resolver.execution_dir(None), PathBuf::from("/from/toml"));

    env::set_var(ENV_EXECUTION_DIR, "/from/env");
    assert_eq!(resolver.execution_dir(None), PathBuf::from("/from/env"));

    assert_eq!(
        resolver.execution_dir(Some(Path::new("/from/cli"))),
        PathBuf::from("/from/cli")
    );

    clear_env();
}

#[test]
#[serial]
fn test_platform_host_and_version_priority_order() {
    clear_env();
    let toml = TomlConfig {
        platform_host: Some("toml-host".to_string()),
        platform_version: Some("9.4.0.0".to_string()),
        ..Default::default()
    };
    let resolver = ConfigResolver::from_toml(toml);

    assert_eq!(resolver.platform_host(None).as_deref(), Some("toml-host"));
    assert_eq!(resolver.platform_version(None).as_deref(), Some("9.4.0.0"));

    env::set_var(ENV_PLATFORM_HOST, "env-host");
    env::set_var(ENV_PLATFORM_VERSION, "9.6.0.0");
    assert_eq!(resolver.platform_host(None).as_deref(), Some("env-host"));
    assert_eq!(resolver.platform_version(None).as_deref(), Some("9.6.0.0"));

    assert_eq!(resolver.platform_host(Some("cli-host")).as_deref(), Some("cli-host"));

    clear_env();
}

#[test]
#[serial]
fn test_blank_env_var_is_ignored() {
    clear_env();
    env::set_var(ENV_LOG_LEVEL, "   ");
    let resolver = ConfigResolver::from_toml(TomlConfig::default());
    assert_eq!(resolver.log_level(), "info");
    clear_env();
}
