//! Declaration-site metadata of annotated types

use serde_json::Value;
use spindle_events::Callback;
use std::sync::Arc;

/// One annotation as declared in source: a name plus ordered arguments.
#[derive(Debug, Clone, PartialEq)]
pub struct AnnotationDeclaration {
    pub name: String,
    pub arguments: Vec<Value>,
}

impl AnnotationDeclaration {
    pub fn new(name: impl Into<String>, arguments: Vec<Value>) -> Self {
        Self {
            name: name.into(),
            arguments,
        }
    }
}

/// A declared method and the annotations placed on it.
#[derive(Debug, Clone, PartialEq)]
pub struct MethodMetadata {
    pub name: String,
    pub annotations: Vec<AnnotationDeclaration>,
}

impl MethodMetadata {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            annotations: Vec::new(),
        }
    }

    pub fn with_annotation(mut self, declaration: AnnotationDeclaration) -> Self {
        self.annotations.push(declaration);
        self
    }
}

/// Everything the annotation reader knows about a type.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassMetadata {
    pub type_name: String,
    pub annotations: Vec<AnnotationDeclaration>,
    /// Methods in declaration order
    pub methods: Vec<MethodMetadata>,
}

impl ClassMetadata {
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            annotations: Vec::new(),
            methods: Vec::new(),
        }
    }

    pub fn with_annotation(mut self, declaration: AnnotationDeclaration) -> Self {
        self.annotations.push(declaration);
        self
    }

    pub fn with_method(mut self, method: MethodMetadata) -> Self {
        self.methods.push(method);
        self
    }

    pub fn method(&self, name: &str) -> Option<&MethodMetadata> {
        self.methods.iter().find(|m| m.name == name)
    }
}

/// A type carrying annotation metadata.
///
/// Normally generated by [`#[annotated]`](crate::annotated); hand-written
/// implementations are fine for types the macro cannot see.
///
/// ```rust
/// use spindle_core::annotation::{Annotated, AnnotationDeclaration, ClassMetadata, MethodMetadata};
/// use serde_json::json;
///
/// struct Inventory;
///
/// impl Annotated for Inventory {
///     fn class_metadata() -> ClassMetadata {
///         ClassMetadata::new("Inventory")
///             .with_annotation(AnnotationDeclaration::new("Service", vec![json!("inventory")]))
///             .with_method(MethodMetadata::new("restock"))
///     }
/// }
///
/// assert_eq!(Inventory::class_metadata().methods.len(), 1);
/// ```
pub trait Annotated: Send + Sync + 'static {
    fn class_metadata() -> ClassMetadata;

    /// Turn a method of a live instance into an emitter callback.
    ///
    /// Returns `None` for methods that do not take `(&self, &mut Event)`.
    /// Generated callbacks hold a weak reference to the instance.
    fn bind_method(this: &Arc<Self>, method: &str) -> Option<Callback>
    where
        Self: Sized,
    {
        let _ = (this, method);
        None
    }
}
