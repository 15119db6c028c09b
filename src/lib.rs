// Spindle - An annotation-driven middleware and event kernel for Rust
//
// This library ties together declarative annotations, the observer bus and
// the onion-ordered middleware pipeline behind a single lifecycle kernel.

// Re-export core functionality
pub use spindle_core::*;

// Re-export the event bus
pub use spindle_events;

// Re-export the crates application code implements traits with
pub use async_trait::async_trait;
pub use serde;
pub use serde_json;

// Re-export optional crates
#[cfg(feature = "config")]
pub use spindle_config;

#[cfg(feature = "testing")]
pub use spindle_testing;

// Prelude for common imports
pub mod prelude {
    pub use spindle_core::prelude::*;
    pub use spindle_core::{
        Callback, ClassMetadata, EventData, KernelState, MethodMetadata, Observer, ObserverResult, TracingMiddleware,
    };

    #[cfg(feature = "config")]
    pub use spindle_config::{ConfigBuilder, ConfigManager, SpindleConfig};
}
