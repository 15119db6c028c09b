//! Integration tests for spindle-config

use spindle_config::*;
use spindle_core::{LogFormat, LogLevel};
use std::env;
use std::fs;
use std::path::PathBuf;

fn write_temp(name: &str, content: &str) -> PathBuf {
    let dir = env::temp_dir().join(format!("spindle-config-{}", std::process::id()));
    fs::create_dir_all(&dir).unwrap();
    let path = dir.join(name);
    fs::write(&path, content).unwrap();
    path
}

#[test]
fn test_toml_file_then_env_override() {
    let path = write_temp(
        "layered.toml",
        r#"
        [kernel]
        exit_on_terminate = false
        log_lifecycle = false

        [logging]
        level = "warn"
        format = "pretty"
        "#,
    );

    unsafe {
        env::set_var("SPINDLE_IT_LAYER_KERNEL__LOG_LIFECYCLE", "true");
    }

    let config = ConfigBuilder::new()
        .with_prefix("SPINDLE_IT_LAYER")
        .add_file(&path)
        .load_env()
        .load()
        .unwrap();

    assert!(!config.kernel.exit_on_terminate);
    assert!(config.kernel.log_lifecycle);
    assert_eq!(config.logging.level, LogLevel::Warn);
    assert_eq!(config.logging.format, LogFormat::Pretty);

    unsafe {
        env::remove_var("SPINDLE_IT_LAYER_KERNEL__LOG_LIFECYCLE");
    }
}

#[test]
fn test_json_and_env_files_merge() {
    let json = write_temp("base.json", r#"{"kernel": {"emitter": {"enable_logging": false}}}"#);
    let dotenv = write_temp("overrides.env", "KERNEL__EMITTER__CONSUME_FAILED_ONCE=yes\n");

    let manager = ConfigManager::new();
    manager.load_file(&json).unwrap();
    manager.load_file(&dotenv).unwrap();

    let config = SpindleConfig::from_manager(&manager).unwrap();
    assert!(!config.kernel.emitter.enable_logging);
    assert!(config.kernel.emitter.consume_failed_once);
}

#[test]
fn test_unsupported_file_is_rejected() {
    let path = write_temp("settings.yaml", "kernel: {}");
    let err = ConfigManager::new().load_file(&path).unwrap_err();
    assert!(matches!(err, ConfigError::Load { .. }));
}

#[test]
fn test_missing_file_is_a_load_error() {
    let err = ConfigBuilder::new()
        .add_file("/nonexistent/spindle.toml")
        .build()
        .unwrap_err();
    assert!(err.to_string().contains("/nonexistent/spindle.toml"));
}

#[test]
fn test_env_loader_with_prefix() {
    let loader = EnvLoader::with_prefix("SPINDLE_IT_VARS");

    unsafe {
        env::set_var("SPINDLE_IT_VARS_KERNEL__EXIT_ON_TERMINATE", "false");
    }

    assert_eq!(loader.load_var("kernel.exit_on_terminate").unwrap(), "false");

    unsafe {
        env::remove_var("SPINDLE_IT_VARS_KERNEL__EXIT_ON_TERMINATE");
    }
}

#[test]
fn test_invalid_logging_output() {
    let manager = ConfigManager::new();
    manager
        .merge_value(serde_json::json!({"logging": {"output": {"rolling_file": {"directory": "", "prefix": "spindle", "rotation": "daily"}}}}));

    let err = SpindleConfig::from_manager(&manager).unwrap_err();
    assert_eq!(
        err.to_string(),
        "Invalid configuration for 'logging.output.rolling_file.directory': cannot be empty"
    );
}

#[test]
fn test_config_error_display() {
    let err = ConfigError::KeyNotFound("kernel.emitter".to_string());
    assert_eq!(err.to_string(), "Configuration key not found: kernel.emitter");
}
