//! Spindle logging environment
//!
//! Reads the `SPINDLE_*` logging variables once per process. The tracing
//! subscriber in `spindle_core::logging` seeds its level, format and colors
//! from this snapshot, so every Spindle binary honors the same switches.
//!
//! # Environment Variables
//!
//! - `SPINDLE_DEBUG=1` - Lower the level to at least `debug`
//! - `SPINDLE_LOG_LEVEL=trace|debug|info|warn|error|off` - Minimum level
//! - `SPINDLE_LOG_FORMAT=pretty|compact|json` - Output format
//! - `SPINDLE_LOG_COLOR=1|0` - Colors for the human readable formats
//!
//! ```rust
//! use spindle_log::{Format, Level, LogEnv};
//!
//! let env = LogEnv::from_lookup(|key| match key {
//!     "SPINDLE_LOG_LEVEL" => Some("warn".to_string()),
//!     "SPINDLE_LOG_FORMAT" => Some("pretty".to_string()),
//!     _ => None,
//! });
//! assert_eq!(env.level, Level::Warn);
//! assert_eq!(env.format, Format::Pretty);
//! ```

use once_cell::sync::Lazy;

pub const DEBUG_VAR: &str = "SPINDLE_DEBUG";
pub const LEVEL_VAR: &str = "SPINDLE_LOG_LEVEL";
pub const FORMAT_VAR: &str = "SPINDLE_LOG_FORMAT";
pub const COLOR_VAR: &str = "SPINDLE_LOG_COLOR";

/// Minimum severity requested through `SPINDLE_LOG_LEVEL`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Level {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
    /// Silences the subscriber
    Off,
}

impl Level {
    /// Case-insensitive; accepts `warning` and `none` as aliases.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "trace" => Some(Level::Trace),
            "debug" => Some(Level::Debug),
            "info" => Some(Level::Info),
            "warn" | "warning" => Some(Level::Warn),
            "error" => Some(Level::Error),
            "off" | "none" => Some(Level::Off),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Trace => "trace",
            Level::Debug => "debug",
            Level::Info => "info",
            Level::Warn => "warn",
            Level::Error => "error",
            Level::Off => "off",
        }
    }
}

impl std::fmt::Display for Level {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Output format requested through `SPINDLE_LOG_FORMAT`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Format {
    #[default]
    Json,
    Pretty,
    Compact,
}

impl Format {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Some(Format::Json),
            "pretty" => Some(Format::Pretty),
            "compact" => Some(Format::Compact),
            _ => None,
        }
    }
}

/// Snapshot of the logging variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEnv {
    pub debug: bool,
    /// Already lowered to `Debug` when `debug` is set and no level was given
    pub level: Level,
    pub format: Format,
    pub color: bool,
}

impl Default for LogEnv {
    fn default() -> Self {
        Self {
            debug: false,
            level: Level::Info,
            format: Format::Json,
            color: false,
        }
    }
}

fn flag(raw: &str) -> bool {
    matches!(raw.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on")
}

impl LogEnv {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the snapshot from any variable source. Unparseable values fall
    /// back to the defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let debug = lookup(DEBUG_VAR).is_some_and(|raw| flag(&raw));
        let fallback = if debug { Level::Debug } else { Level::Info };

        let level = lookup(LEVEL_VAR)
            .and_then(|raw| Level::parse(&raw))
            .unwrap_or(fallback);
        let format = lookup(FORMAT_VAR)
            .and_then(|raw| Format::parse(&raw))
            .unwrap_or_default();

        // NO_COLOR wins over a terminal being present
        let color = match lookup(COLOR_VAR) {
            Some(raw) => flag(&raw),
            None => lookup("NO_COLOR").is_none() && lookup("TERM").is_some(),
        };

        Self {
            debug,
            level,
            format,
            color,
        }
    }
}

static ENV: Lazy<LogEnv> = Lazy::new(LogEnv::from_env);

/// Process-wide snapshot, read on first use.
pub fn config() -> &'static LogEnv {
    &ENV
}
