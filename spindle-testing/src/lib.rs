//! Testing utilities for Spindle applications
//!
//! Recording doubles for every seam of the framework: middleware that log
//! their entry and exit, an application that logs its call, an observer
//! that captures emissions, and a wireable annotation that captures its
//! wiring calls. All of them can share one [`CallLog`] so a test can
//! assert on the exact interleaving.
//!
//! ```rust
//! use spindle_testing::*;
//!
//! # tokio_test::block_on(async {
//! let log = CallLog::new();
//! let kernel = TestKernelBuilder::<_, u32, u32>::new(RecordingApplication::new(&log))
//!     .through(RecordingMiddleware::new("outer", &log))
//!     .through(RecordingMiddleware::new("inner", &log))
//!     .build()
//!     .unwrap();
//! let spy = EventSpy::attach(&kernel, "kernel.startup kernel.shutdown");
//!
//! assert_eq!(kernel.run(1, 2).await.unwrap(), 2);
//! assert_calls(&log, &["enter:outer", "enter:inner", "kernel", "exit:inner", "exit:outer"]);
//! assert_event_order(&spy, &["kernel.startup", "kernel.shutdown"]);
//! # });
//! ```

pub mod assertions;
pub mod mock;
pub mod spy;
pub mod test_app;
pub mod wire;

pub use assertions::*;
pub use mock::{CallLog, FailingMiddleware, RecordingMiddleware, ShortCircuitMiddleware};
pub use spy::{EventSpy, SpiedEvent};
pub use test_app::{RecordingApplication, TestKernelBuilder};
pub use wire::{RecordingWire, WireCall};
