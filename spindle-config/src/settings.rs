// Kernel and logging settings loaded from files and the environment

use crate::validation::{ConfigValidator, Validate};
use crate::{ConfigManager, FileFormat, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use spindle_core::{KernelConfig, LogConfig};
use spindle_core::logging::{debug, info};
use std::path::PathBuf;

/// Prefix of the environment variables read by [`load_config`].
///
/// `SPINDLE_KERNEL__EXIT_ON_TERMINATE=false` sets `kernel.exit_on_terminate`.
pub const ENV_PREFIX: &str = "SPINDLE";

const KERNEL_KEYS: &[&str] = &["exit_on_terminate", "log_lifecycle", "emitter"];
const EMITTER_KEYS: &[&str] = &["enable_logging", "consume_failed_once"];
const LOGGING_KEYS: &[&str] = &[
    "level",
    "format",
    "output",
    "thread_ids",
    "targets",
    "file_line",
    "spans",
    "colors",
    "env_filter",
];

/// Everything a Spindle process reads from configuration.
///
/// ```toml
/// [kernel]
/// exit_on_terminate = true
///
/// [kernel.emitter]
/// consume_failed_once = false
///
/// [logging]
/// level = "debug"
/// format = "pretty"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpindleConfig {
    pub kernel: KernelConfig,
    pub logging: LogConfig,
}

impl SpindleConfig {
    /// Read the `kernel` and `logging` sections of a manager.
    ///
    /// Missing sections take their defaults. Unknown keys inside a known
    /// section are rejected; other top-level keys are left alone.
    pub fn from_manager(manager: &ConfigManager) -> Result<Self> {
        let document = manager.snapshot();
        check_section(&document, "kernel", KERNEL_KEYS)?;
        check_section(&document, "kernel.emitter", EMITTER_KEYS)?;
        check_section(&document, "logging", LOGGING_KEYS)?;

        let config = Self {
            kernel: manager.section("kernel")?,
            logging: manager.section("logging")?,
        };
        config.validate()?;
        Ok(config)
    }
}

impl Validate for SpindleConfig {
    fn validate(&self) -> Result<()> {
        self.kernel.validate()?;
        self.logging.validate()
    }
}

fn check_section(document: &Value, key: &str, allowed: &[&str]) -> Result<()> {
    let section = key
        .split('.')
        .try_fold(document, |value, segment| value.as_object()?.get(segment));

    match section {
        Some(section) => ConfigValidator::known_keys(section, allowed, key),
        None => Ok(()),
    }
}

/// Assembles a [`ConfigManager`] from several sources.
///
/// Sources are applied in a fixed order whatever the call order: the
/// `.env` file, then configuration files in the order added, then the
/// environment.
pub struct ConfigBuilder {
    prefix: String,
    load_env: bool,
    load_dotenv: bool,
    dotenv_path: Option<PathBuf>,
    files: Vec<(PathBuf, Option<FileFormat>)>,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            prefix: ENV_PREFIX.to_string(),
            load_env: false,
            load_dotenv: false,
            dotenv_path: None,
            files: Vec::new(),
        }
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    pub fn load_env(mut self) -> Self {
        self.load_env = true;
        self
    }

    /// Export a `.env` file into the environment first. Without a path,
    /// `./.env` is used when present.
    pub fn load_dotenv(mut self, path: Option<PathBuf>) -> Self {
        self.load_dotenv = true;
        self.dotenv_path = path;
        self
    }

    /// Add a file whose format is detected from its name.
    pub fn add_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.files.push((path.into(), None));
        self
    }

    pub fn add_file_as(mut self, path: impl Into<PathBuf>, format: FileFormat) -> Self {
        self.files.push((path.into(), Some(format)));
        self
    }

    pub fn build(self) -> Result<ConfigManager> {
        let manager = ConfigManager::with_prefix(self.prefix);

        if self.load_dotenv {
            match &self.dotenv_path {
                Some(path) => {
                    dotenvy::from_path(path).map_err(|e| crate::ConfigError::Load {
                        path: path.display().to_string(),
                        message: e.to_string(),
                    })?;
                }
                None => {
                    dotenvy::dotenv().ok();
                }
            }
        }

        for (path, format) in &self.files {
            match format {
                Some(format) => manager.load_file_as(path, *format)?,
                None => manager.load_file(path)?,
            }
        }

        if self.load_env {
            manager.load_env()?;
        }

        debug!("Built configuration with keys {:?}", manager.keys());
        Ok(manager)
    }

    /// Build and read the Spindle sections.
    pub fn load(self) -> Result<SpindleConfig> {
        SpindleConfig::from_manager(&self.build()?)
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Load [`SpindleConfig`] from `./.env` and `SPINDLE_*` variables.
pub fn load_config() -> Result<SpindleConfig> {
    let config = ConfigBuilder::new().load_dotenv(None).load_env().load()?;
    info!(
        "Loaded configuration (exit_on_terminate={}, level={})",
        config.kernel.exit_on_terminate,
        config.logging.level.as_str()
    );
    Ok(config)
}

/// Load only the kernel section. See [`load_config`].
pub fn load_kernel_config() -> Result<KernelConfig> {
    load_config().map(|config| config.kernel)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ConfigError;
    use serde_json::json;
    use spindle_core::LogLevel;

    #[test]
    fn test_defaults_when_empty() {
        let config = SpindleConfig::from_manager(&ConfigManager::new()).unwrap();
        assert_eq!(config, SpindleConfig::default());
    }

    #[test]
    fn test_sections_are_read() {
        let manager = ConfigManager::new();
        manager.merge_value(json!({
            "kernel": {"exit_on_terminate": false, "emitter": {"consume_failed_once": true}},
            "logging": {"level": "debug"},
            "unrelated": {"anything": 1}
        }));

        let config = SpindleConfig::from_manager(&manager).unwrap();
        assert!(!config.kernel.exit_on_terminate);
        assert!(config.kernel.log_lifecycle);
        assert!(config.kernel.emitter.consume_failed_once);
        assert_eq!(config.logging.level, LogLevel::Debug);
    }

    #[test]
    fn test_misspelt_key_is_rejected() {
        let manager = ConfigManager::new();
        manager.set("kernel.emitter.consume_failed", true).unwrap();

        let err = SpindleConfig::from_manager(&manager).unwrap_err();
        assert!(matches!(err, ConfigError::Validation { ref field, .. } if field == "kernel.emitter"));
    }

    #[test]
    fn test_section_must_be_table() {
        let manager = ConfigManager::new();
        manager.set("kernel", "on").unwrap();
        assert!(SpindleConfig::from_manager(&manager).is_err());
    }
}
