// Configuration validation

use crate::{ConfigError, Result};
use serde_json::Value;
use spindle_core::logging::{LogConfig, LogOutput, warn};
use spindle_core::{EmitterConfig, KernelConfig};

/// Trait for validating configuration
pub trait Validate {
    fn validate(&self) -> Result<()>;
}

/// Reusable validation rules
pub struct ConfigValidator;

impl ConfigValidator {
    pub fn not_empty(value: &str, field: &str) -> Result<()> {
        if value.trim().is_empty() {
            return Err(ConfigError::validation(field, "cannot be empty"));
        }
        Ok(())
    }

    /// Reject keys of a table that are not in `allowed`.
    pub fn known_keys(section: &Value, allowed: &[&str], field: &str) -> Result<()> {
        let Some(table) = section.as_object() else {
            return Err(ConfigError::validation(field, "must be a table"));
        };

        let mut unknown: Vec<&str> = table
            .keys()
            .map(String::as_str)
            .filter(|key| !allowed.contains(key))
            .collect();
        if unknown.is_empty() {
            return Ok(());
        }

        unknown.sort_unstable();
        Err(ConfigError::validation(
            field,
            format!("unknown keys {}", unknown.join(", ")),
        ))
    }
}

impl Validate for EmitterConfig {
    fn validate(&self) -> Result<()> {
        if self.consume_failed_once && !self.enable_logging {
            warn!("Emitter drops failed once-observers with logging disabled");
        }
        Ok(())
    }
}

impl Validate for KernelConfig {
    fn validate(&self) -> Result<()> {
        self.emitter.validate()
    }
}

impl Validate for LogConfig {
    fn validate(&self) -> Result<()> {
        match &self.output {
            LogOutput::File(path) => ConfigValidator::not_empty(path, "logging.output.file")?,
            LogOutput::RollingFile { directory, prefix, .. } => {
                ConfigValidator::not_empty(directory, "logging.output.rolling_file.directory")?;
                ConfigValidator::not_empty(prefix, "logging.output.rolling_file.prefix")?;
            }
            LogOutput::Stdout | LogOutput::Stderr => {}
        }

        if let Some(filter) = &self.env_filter {
            ConfigValidator::not_empty(filter, "logging.env_filter")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_not_empty_validation() {
        assert!(ConfigValidator::not_empty("value", "field").is_ok());
        assert!(ConfigValidator::not_empty("  ", "field").is_err());
    }

    #[test]
    fn test_known_keys() {
        let section = json!({"exit_on_terminate": false, "exit_on_terminte": true, "zz": 1});
        let err = ConfigValidator::known_keys(&section, &["exit_on_terminate"], "kernel").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid configuration for 'kernel': unknown keys exit_on_terminte, zz"
        );

        assert!(ConfigValidator::known_keys(&json!(3), &[], "kernel").is_err());
    }

    #[test]
    fn test_silent_failed_once_is_only_a_warning() {
        let emitter = EmitterConfig {
            enable_logging: false,
            consume_failed_once: true,
        };
        assert!(KernelConfig::default().emitter(emitter).validate().is_ok());
    }

    #[test]
    fn test_kernel_config_is_valid_by_default() {
        assert!(KernelConfig::default().validate().is_ok());
    }

    #[test]
    fn test_log_file_output_needs_path() {
        let config = LogConfig::default().output(LogOutput::File(String::new()));
        let err = config.validate().unwrap_err();
        assert!(matches!(err, ConfigError::Validation { ref field, .. } if field == "logging.output.file"));

        let config = LogConfig::default().output(LogOutput::File("spindle.log".into()));
        assert!(config.validate().is_ok());
    }
}
