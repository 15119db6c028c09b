//! Prioritized event emitter for Spindle
//!
//! This crate provides the in-process observer bus the Spindle kernel and
//! annotated services publish lifecycle events on.
//!
//! ## Features
//!
//! - **Priorities** - Explicit priorities run highest first, automatic ones last
//! - **Once observers** - Removed after their first successful run
//! - **Stop propagation** - An observer can end an emission early
//! - **Event state** - Observer return values flow into the event
//! - **Async** - Suspending observers awaited one at a time
//!
//! ## Quick Start
//!
//! ```rust
//! use spindle_events::{Callback, Emitter, Priority};
//! use serde_json::json;
//!
//! let emitter = Emitter::new();
//!
//! emitter.subscribe("user.created", Callback::new(|event| {
//!     event.set("welcomed", json!(true));
//!     Ok(None)
//! }), Priority::Value(10), false);
//!
//! emitter.on("user.created", |_| Ok(Some(json!("audited"))));
//!
//! let event = emitter.emit("user.created").unwrap();
//! assert_eq!(event.get("welcomed"), Some(&json!(true)));
//! assert_eq!(event.state(), Some(&json!("audited")));
//! ```
//!
//! ## Suspending Observers
//!
//! ```rust
//! use spindle_events::Emitter;
//!
//! # tokio_test::block_on(async {
//! let emitter = Emitter::new();
//! emitter.on_suspending("report.ready", |event| {
//!     Box::pin(async move {
//!         event.set("delivered", true.into());
//!         Ok(None)
//!     })
//! });
//!
//! // Blocking dispatch refuses suspending observers.
//! assert!(emitter.emit("report.ready").is_err());
//!
//! let event = emitter.emit_async("report.ready").await.unwrap();
//! assert!(event.get("delivered").is_some());
//! # });
//! ```
//!
//! ## Configuration
//!
//! ```rust
//! use spindle_events::EmitterBuilder;
//!
//! let emitter = EmitterBuilder::new()
//!     .enable_logging(false)        // Silence tracing output
//!     .consume_failed_once(true)    // Drop once-observers that fail
//!     .build();
//! ```

pub mod emitter;
pub mod error;
pub mod event;
pub mod extensions;
pub mod listener;
pub mod observer;
pub mod subject;

pub use emitter::{Emitter, EmitterBuilder, EmitterConfig, IntoEventNames};
pub use error::{EmitterError, IntoObserverResult, ObserverError, ObserverResult};
pub use event::{Event, EventData};
pub use extensions::Extensions;
pub use listener::Listener;
pub use observer::{AUTO_PRIORITY, BlockingFn, Callback, Observer, ObserverId, Priority, SuspendingFn};
pub use subject::EventSubject;
