//! Annotations: named, typed metadata attached to types and methods
//!
//! Types declare annotations with [`#[annotated]`](crate::annotated). A
//! shared [`AnnotationRegistry`] maps annotation names to concrete Rust
//! types, and a [`Reader`] materializes the declarations of one type into
//! memoized annotation instances. Annotations that implement [`Wireable`]
//! can then hook behavior into a live instance, the way the built-in
//! [`Observer`] subscribes methods to an emitter.
//!
//! ```rust
//! use spindle_core::annotation::*;
//! use spindle_core::{Annotation, annotated};
//! use serde::Deserialize;
//! use std::sync::Arc;
//!
//! #[derive(Debug, Deserialize, Annotation)]
//! struct Route {
//!     #[serde(skip)]
//!     name: String,
//!     path: String,
//!     #[serde(default)]
//!     method: Option<String>,
//! }
//!
//! struct Users;
//!
//! #[annotated(Route("/users"))]
//! impl Users {
//!     #[annotate(Route("/users/:id", "GET"))]
//!     fn show(&self) {}
//! }
//!
//! let registry = Arc::new(AnnotationRegistry::new());
//! registry.map::<Route>("Route").unwrap();
//!
//! let reader = Reader::new::<Users>(registry);
//! let route = reader.method_annotation("show", "Route").unwrap();
//! let route = route.downcast_ref::<Route>().unwrap();
//! assert_eq!(route.path, "/users/:id");
//! assert_eq!(route.method.as_deref(), Some("GET"));
//! ```

mod builtin;
mod metadata;
mod reader;
mod registry;
mod wiring;

pub use builtin::Observer;
pub use metadata::{Annotated, AnnotationDeclaration, ClassMetadata, MethodMetadata};
pub use reader::Reader;
pub use registry::AnnotationRegistry;
pub use wiring::{
    WireTarget, Wireable, WiresAnnotations, wire_annotations, wire_class_annotation, wire_method_annotation,
};

use indexmap::IndexMap;
use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// Annotation names starting with this prefix are internal and never
/// materialized.
pub const RESERVED_PREFIX: &str = "__";

/// Annotations of one scope, keyed by declared name in declaration order.
pub type AnnotationMap = IndexMap<String, Arc<dyn Annotation>>;

/// A materialized annotation.
///
/// Implementations are constructed by the registry from the declaration's
/// positional arguments, then given their declared name through
/// [`set_name`](Annotation::set_name). `#[derive(Annotation)]` covers the
/// usual case of a struct with a `name: String` field.
pub trait Annotation: Any + Send + Sync + fmt::Debug {
    /// Name the annotation was declared under
    fn name(&self) -> &str;

    fn set_name(&mut self, name: String);

    fn as_any(&self) -> &dyn Any;

    /// The wiring capability, for annotations that have one.
    fn as_wireable(&self) -> Option<&dyn Wireable> {
        None
    }
}

impl dyn Annotation {
    pub fn downcast_ref<T: Annotation>(&self) -> Option<&T> {
        self.as_any().downcast_ref::<T>()
    }

    pub fn is<T: Annotation>(&self) -> bool {
        self.as_any().is::<T>()
    }

    pub fn is_wireable(&self) -> bool {
        self.as_wireable().is_some()
    }
}

pub(crate) fn is_reserved(name: &str) -> bool {
    name.starts_with(RESERVED_PREFIX)
}
