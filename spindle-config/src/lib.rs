// Configuration loading for Spindle kernels

pub mod env;
pub mod error;
pub mod loader;
pub mod settings;
pub mod validation;

pub use env::EnvLoader;
pub use error::{ConfigError, Result};
pub use loader::{ConfigLoader, FileFormat};
pub use settings::{ConfigBuilder, ENV_PREFIX, SpindleConfig, load_config, load_kernel_config};
pub use validation::{ConfigValidator, Validate};

use parking_lot::RwLock;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use spindle_core::logging::debug;
use std::path::Path;
use std::sync::Arc;

/// Layered configuration document.
///
/// Values live in one JSON table addressed by dotted keys
/// (`kernel.emitter.enable_logging`). Every load merges into what is
/// already there, so later sources override earlier ones.
#[derive(Clone)]
pub struct ConfigManager {
    config: Arc<RwLock<Map<String, Value>>>,
    env_prefix: Option<String>,
}

impl ConfigManager {
    pub fn new() -> Self {
        Self {
            config: Arc::new(RwLock::new(Map::new())),
            env_prefix: None,
        }
    }

    /// Manager reading environment variables that start with `prefix_`.
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            config: Arc::new(RwLock::new(Map::new())),
            env_prefix: Some(prefix.into()),
        }
    }

    pub fn env_prefix(&self) -> Option<&str> {
        self.env_prefix.as_deref()
    }

    /// Merge matching environment variables.
    pub fn load_env(&self) -> Result<()> {
        let entries = EnvLoader::new(self.env_prefix.clone()).load();
        debug!("Loading {} configuration values from the environment", entries.len());

        let mut config = self.config.write();
        for (key, value) in entries {
            loader::insert_dotted(&mut config, &key, value)?;
        }
        Ok(())
    }

    /// Export a `.env` file into the process environment, then merge the
    /// environment. Without a path a missing `./.env` is not an error.
    pub fn load_dotenv(&self, path: Option<&Path>) -> Result<()> {
        match path {
            Some(path) => {
                dotenvy::from_path(path).map_err(|e| ConfigError::Load {
                    path: path.display().to_string(),
                    message: e.to_string(),
                })?;
            }
            None => {
                dotenvy::dotenv().ok();
            }
        }
        self.load_env()
    }

    /// Merge a configuration file, detecting its format from the name.
    pub fn load_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let format = ConfigLoader::auto(path)?.format();
        self.load_file_as(path, format)
    }

    pub fn load_file_as(&self, path: impl AsRef<Path>, format: FileFormat) -> Result<()> {
        let path = path.as_ref();
        let document = ConfigLoader::new(format).load_file(path)?;
        debug!("Loaded {} configuration from {}", format.as_str(), path.display());
        self.merge_value(document);
        Ok(())
    }

    /// Merge an in-memory document. Non-table values are ignored.
    pub fn merge_value(&self, document: Value) {
        if let Value::Object(table) = document {
            loader::merge_values(&mut self.config.write(), table);
        }
    }

    /// Merge every value of another manager into this one.
    pub fn merge(&self, other: &ConfigManager) {
        let incoming = other.config.read().clone();
        loader::merge_values(&mut self.config.write(), incoming);
    }

    pub fn set<T: Serialize>(&self, key: &str, value: T) -> Result<()> {
        let value = serde_json::to_value(value)?;
        loader::insert_dotted(&mut self.config.write(), key, value)
    }

    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<T> {
        let value = loader::get_dotted(&self.config.read(), key)
            .cloned()
            .ok_or_else(|| ConfigError::KeyNotFound(key.to_string()))?;

        serde_json::from_value(value).map_err(|source| ConfigError::Deserialize {
            key: key.to_string(),
            source,
        })
    }

    pub fn get_or<T: DeserializeOwned>(&self, key: &str, default: T) -> T {
        self.get(key).unwrap_or(default)
    }

    pub fn get_string(&self, key: &str) -> Result<String> {
        self.get(key)
    }

    pub fn get_int(&self, key: &str) -> Result<i64> {
        self.get(key)
    }

    pub fn get_bool(&self, key: &str) -> Result<bool> {
        self.get(key)
    }

    pub fn get_float(&self, key: &str) -> Result<f64> {
        self.get(key)
    }

    pub fn has(&self, key: &str) -> bool {
        loader::get_dotted(&self.config.read(), key).is_some()
    }

    /// Top-level keys, sorted.
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<_> = self.config.read().keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Copy of the whole document.
    pub fn snapshot(&self) -> Value {
        Value::Object(self.config.read().clone())
    }

    /// Deserialize a section, or its default when the section is absent.
    pub fn section<T: DeserializeOwned + Default>(&self, key: &str) -> Result<T> {
        match self.get(key) {
            Err(ConfigError::KeyNotFound(_)) => Ok(T::default()),
            other => other,
        }
    }

    /// Deserialize the whole document and validate it.
    pub fn load_validated<T: DeserializeOwned + Validate>(&self) -> Result<T> {
        let validated: T = serde_json::from_value(self.snapshot()).map_err(|source| ConfigError::Deserialize {
            key: "<root>".to_string(),
            source,
        })?;
        validated.validate()?;
        Ok(validated)
    }
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ConfigManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigManager")
            .field("env_prefix", &self.env_prefix)
            .field("keys", &self.keys())
            .finish()
    }
}
