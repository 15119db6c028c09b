//! Kernel configuration

use serde::{Deserialize, Serialize};
use spindle_events::EmitterConfig;

/// Kernel configuration.
///
/// All fields have defaults, so a partial document deserializes cleanly:
///
/// ```rust
/// use spindle_core::KernelConfig;
///
/// let config: KernelConfig = serde_json::from_str(r#"{ "exit_on_terminate": false }"#).unwrap();
/// assert!(!config.exit_on_terminate);
/// assert!(config.log_lifecycle);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KernelConfig {
    /// Exit the process with code 0 once `kernel.terminate` has been emitted
    pub exit_on_terminate: bool,

    /// Log lifecycle transitions at info level
    pub log_lifecycle: bool,

    /// Configuration of the kernel's emitter
    pub emitter: EmitterConfig,
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self {
            exit_on_terminate: true,
            log_lifecycle: true,
            emitter: EmitterConfig::default(),
        }
    }
}

impl KernelConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn exit_on_terminate(mut self, enabled: bool) -> Self {
        self.exit_on_terminate = enabled;
        self
    }

    pub fn log_lifecycle(mut self, enabled: bool) -> Self {
        self.log_lifecycle = enabled;
        self
    }

    pub fn emitter(mut self, emitter: EmitterConfig) -> Self {
        self.emitter = emitter;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = KernelConfig::default();
        assert!(config.exit_on_terminate);
        assert!(config.log_lifecycle);
        assert!(config.emitter.enable_logging);
        assert!(!config.emitter.consume_failed_once);
    }

    #[test]
    fn test_builder() {
        let config = KernelConfig::new()
            .exit_on_terminate(false)
            .log_lifecycle(false)
            .emitter(EmitterConfig {
                enable_logging: false,
                consume_failed_once: true,
            });

        assert!(!config.exit_on_terminate);
        assert!(!config.log_lifecycle);
        assert!(config.emitter.consume_failed_once);
    }

    #[test]
    fn test_nested_emitter_section() {
        let config: KernelConfig = serde_json::from_str(r#"{ "emitter": { "consume_failed_once": true } }"#).unwrap();
        assert!(config.exit_on_terminate);
        assert!(config.emitter.enable_logging);
        assert!(config.emitter.consume_failed_once);
    }
}
