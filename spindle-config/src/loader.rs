// Configuration file loaders

use crate::env::{EnvLoader, coerce};
use crate::{ConfigError, Result};
use serde_json::{Map, Value};
use std::fs;
use std::path::Path;

/// Supported configuration file formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    Json,
    Toml,
    Env,
}

impl FileFormat {
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "json" => Some(FileFormat::Json),
            "toml" => Some(FileFormat::Toml),
            "env" => Some(FileFormat::Env),
            _ => None,
        }
    }

    /// Detect the format of `path`. A bare `.env` file counts as `Env`.
    pub fn detect(path: &Path) -> Option<Self> {
        if path.file_name().and_then(|n| n.to_str()) == Some(".env") {
            return Some(FileFormat::Env);
        }
        path.extension().and_then(|e| e.to_str()).and_then(Self::from_extension)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FileFormat::Json => "json",
            FileFormat::Toml => "toml",
            FileFormat::Env => "env",
        }
    }
}

/// Parses configuration documents into a JSON object.
///
/// `.env` documents use the same key mapping as [`EnvLoader`]: names are
/// lowercased and `__` separates sections.
pub struct ConfigLoader {
    format: FileFormat,
}

impl ConfigLoader {
    pub fn new(format: FileFormat) -> Self {
        Self { format }
    }

    /// Loader for the format implied by the file name.
    pub fn auto(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        FileFormat::detect(path).map(Self::new).ok_or_else(|| ConfigError::Load {
            path: path.display().to_string(),
            message: "unsupported or missing file extension".to_string(),
        })
    }

    pub fn format(&self) -> FileFormat {
        self.format
    }

    pub fn load_file(&self, path: impl AsRef<Path>) -> Result<Value> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| ConfigError::Load {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;

        self.parse(&content)
    }

    pub fn parse(&self, content: &str) -> Result<Value> {
        let value = match self.format {
            FileFormat::Json => self.parse_json(content)?,
            FileFormat::Toml => self.parse_toml(content)?,
            FileFormat::Env => self.parse_env(content)?,
        };

        if !value.is_object() {
            return Err(self.parse_error("top level must be a table"));
        }
        Ok(value)
    }

    fn parse_json(&self, content: &str) -> Result<Value> {
        serde_json::from_str(content).map_err(|e| self.parse_error(e))
    }

    fn parse_toml(&self, content: &str) -> Result<Value> {
        let table: toml::Table = toml::from_str(content).map_err(|e| self.parse_error(e))?;
        Ok(serde_json::to_value(table)?)
    }

    fn parse_env(&self, content: &str) -> Result<Value> {
        let keys = EnvLoader::default();
        let mut root = Map::new();

        for item in dotenvy::from_read_iter(content.as_bytes()) {
            let (name, raw) = item.map_err(|e| self.parse_error(e))?;
            if let Some(key) = keys.key_for(&name) {
                insert_dotted(&mut root, &key, coerce(&raw))?;
            }
        }

        Ok(Value::Object(root))
    }

    fn parse_error(&self, message: impl ToString) -> ConfigError {
        ConfigError::Parse {
            format: self.format.as_str(),
            message: message.to_string(),
        }
    }
}

/// Insert `value` under a dotted key, creating intermediate tables.
///
/// Fails when a path segment already holds a non-table value.
pub fn insert_dotted(root: &mut Map<String, Value>, key: &str, value: Value) -> Result<()> {
    let mut segments = key.split('.').peekable();
    let mut table = root;

    while let Some(segment) = segments.next() {
        if segments.peek().is_none() {
            table.insert(segment.to_string(), value);
            return Ok(());
        }

        let entry = table
            .entry(segment.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        table = entry.as_object_mut().ok_or_else(|| {
            ConfigError::validation(key, format!("'{}' is already set to a non-table value", segment))
        })?;
    }

    Ok(())
}

/// Look up a dotted key.
pub fn get_dotted<'a>(root: &'a Map<String, Value>, key: &str) -> Option<&'a Value> {
    let mut segments = key.split('.');
    let first = root.get(segments.next()?)?;
    segments.try_fold(first, |value, segment| value.as_object()?.get(segment))
}

/// Deep-merge `overlay` into `base`. Tables merge key by key; any other
/// value in `overlay` replaces the one in `base`.
pub fn merge_values(base: &mut Map<String, Value>, overlay: Map<String, Value>) {
    for (key, value) in overlay {
        if let Value::Object(incoming) = value {
            if let Some(Value::Object(existing)) = base.get_mut(&key) {
                merge_values(existing, incoming);
                continue;
            }
            base.insert(key, Value::Object(incoming));
        } else {
            base.insert(key, value);
        }
    }
}
