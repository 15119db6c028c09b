// Core library for Spindle
// Annotations, the middleware pipeline and the lifecycle kernel built on spindle-events

// Lets generated code name `::spindle_core` from inside this crate too.
extern crate self as spindle_core;

pub mod annotation;
pub mod config;
pub mod error;
pub mod kernel;
pub mod logging;
pub mod middleware;
pub mod pipeline;

pub use annotation::{
    Annotated, Annotation, AnnotationRegistry, ClassMetadata, MethodMetadata, Observer, Reader, WireTarget,
    Wireable, WiresAnnotations,
};
pub use config::KernelConfig;
pub use error::{AnnotationScope, BoxError, Error, ReflectionError, Result};
pub use kernel::{Application, Kernel, KernelInput, KernelOutput, KernelState, events};
pub use logging::{LogConfig, LogFormat, LogLevel, LogOutput, Rotation};
pub use middleware::{FnMiddleware, Middleware, Next, TracingMiddleware};
pub use pipeline::Pipeline;

pub use serde_json::json;
pub use spindle_events::{
    Callback, Emitter, EmitterBuilder, EmitterConfig, EmitterError, Event, EventData, EventSubject, Extensions,
    Listener, ObserverError, ObserverId, ObserverResult, Priority,
};
pub use spindle_macros::{Annotation, annotated};

#[doc(hidden)]
pub mod __private {
    pub use spindle_events::{Callback, Event, IntoObserverResult};
}

/// Commonly used items
pub mod prelude {
    pub use crate::annotation::{Annotated, AnnotationRegistry, Reader, Wireable, WireTarget, WiresAnnotations};
    pub use crate::{
        Annotation, Application, Emitter, Error, Event, EventSubject, FnMiddleware, Kernel, KernelConfig,
        KernelInput, KernelOutput, Middleware, Next, Pipeline, Priority, annotated, events, json,
    };
}
