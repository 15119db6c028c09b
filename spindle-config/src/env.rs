// Environment variable loading

use crate::{ConfigError, Result};
use serde_json::Value;
use std::env;

/// Separator between nested sections in a variable name,
/// e.g. `SPINDLE_EMITTER__ENABLE_LOGGING`.
pub const SECTION_SEPARATOR: &str = "__";

/// Reads prefixed environment variables as dotted configuration keys.
///
/// With the prefix `SPINDLE`, `SPINDLE_EXIT_ON_TERMINATE` becomes
/// `exit_on_terminate` and `SPINDLE_KERNEL__EMITTER__CONSUME_FAILED_ONCE`
/// becomes `kernel.emitter.consume_failed_once`.
pub struct EnvLoader {
    prefix: Option<String>,
}

impl EnvLoader {
    pub fn new(prefix: Option<String>) -> Self {
        Self { prefix }
    }

    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self::new(Some(prefix.into()))
    }

    /// Every matching variable as `(dotted key, value)`.
    pub fn load(&self) -> Vec<(String, Value)> {
        self.load_from(env::vars())
    }

    /// Same as [`load`](EnvLoader::load) over an explicit set of variables.
    pub fn load_from<I>(&self, vars: I) -> Vec<(String, Value)>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut entries: Vec<_> = vars
            .into_iter()
            .filter_map(|(name, raw)| self.key_for(&name).map(|key| (key, coerce(&raw))))
            .collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        entries
    }

    /// Dotted key for a variable name, or `None` when the prefix does not
    /// match.
    pub fn key_for(&self, name: &str) -> Option<String> {
        let rest = match &self.prefix {
            Some(prefix) => name.strip_prefix(prefix.as_str())?.strip_prefix('_')?,
            None => name,
        };
        if rest.is_empty() {
            return None;
        }

        let key = rest
            .split(SECTION_SEPARATOR)
            .map(str::to_lowercase)
            .collect::<Vec<_>>()
            .join(".");
        Some(key)
    }

    /// Read one variable by dotted key.
    pub fn load_var(&self, key: &str) -> Result<String> {
        env::var(self.var_name(key)).map_err(ConfigError::Env)
    }

    pub fn load_var_or(&self, key: &str, default: &str) -> String {
        self.load_var(key).unwrap_or_else(|_| default.to_string())
    }

    /// Variable name for a dotted key.
    pub fn var_name(&self, key: &str) -> String {
        let name = key.split('.').map(str::to_uppercase).collect::<Vec<_>>().join(SECTION_SEPARATOR);
        match &self.prefix {
            Some(prefix) => format!("{}_{}", prefix, name),
            None => name,
        }
    }
}

impl Default for EnvLoader {
    fn default() -> Self {
        Self::new(None)
    }
}

/// Interpret a raw variable: booleans and numbers become JSON scalars,
/// anything else stays a string.
pub fn coerce(raw: &str) -> Value {
    let trimmed = raw.trim();
    match trimmed.to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" => return Value::Bool(true),
        "false" | "no" | "off" => return Value::Bool(false),
        _ => {}
    }
    if let Ok(int) = trimmed.parse::<i64>() {
        return Value::from(int);
    }
    if let Ok(float) = trimmed.parse::<f64>() {
        if float.is_finite() {
            return Value::from(float);
        }
    }
    Value::String(raw.to_string())
}
