//! Annotation name to type registry

use super::{Annotation, is_reserved};
use crate::error::{AnnotationScope, Error, Result};
use crate::logging::debug;
use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

type Factory = Arc<dyn Fn(Value) -> std::result::Result<Box<dyn Annotation>, serde_json::Error> + Send + Sync>;

#[derive(Clone)]
struct AnnotationBinding {
    type_name: &'static str,
    factory: Factory,
}

/// Maps annotation names to the types that materialize them.
///
/// Registration appends or overwrites; nothing is ever removed. Share one
/// registry per process as `Arc<AnnotationRegistry>`.
///
/// Arguments are applied positionally: the declaration's argument list is
/// deserialized as a sequence into the annotation type, so struct fields
/// receive arguments in field order. Mark trailing optional fields
/// `#[serde(default)]` and the name field `#[serde(skip)]`.
#[derive(Default)]
pub struct AnnotationRegistry {
    bindings: RwLock<HashMap<String, AnnotationBinding>>,
}

impl AnnotationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry with the built-in annotations mapped under their usual
    /// names.
    pub fn with_builtins() -> Self {
        let registry = Self::new();
        registry.bind::<super::Observer>("Observer");
        registry
    }

    /// Register `T` under `name`, replacing any previous mapping.
    ///
    /// Fails with [`Error::InvalidClass`] when the name could never be
    /// declared: empty, containing whitespace, or using the reserved prefix.
    pub fn map<T>(&self, name: impl Into<String>) -> Result<&Self>
    where
        T: Annotation + DeserializeOwned,
    {
        let name = name.into();
        if name.is_empty() || name.chars().any(char::is_whitespace) || is_reserved(&name) {
            return Err(Error::InvalidClass(format!(
                "cannot map {} under annotation name '{}'",
                std::any::type_name::<T>(),
                name
            )));
        }

        self.bind::<T>(name);
        Ok(self)
    }

    fn bind<T>(&self, name: impl Into<String>)
    where
        T: Annotation + DeserializeOwned,
    {
        let name = name.into();
        let binding = AnnotationBinding {
            type_name: std::any::type_name::<T>(),
            factory: Arc::new(|arguments| {
                let annotation: T = serde_json::from_value(arguments)?;
                Ok(Box::new(annotation) as Box<dyn Annotation>)
            }),
        };

        debug!(annotation = %name, type_name = binding.type_name, "Mapped annotation");
        self.bindings.write().insert(name, binding);
    }

    /// Construct an instance of the type mapped under `name`.
    pub fn factory(&self, name: &str, arguments: &[Value]) -> Result<Arc<dyn Annotation>> {
        let factory = self
            .bindings
            .read()
            .get(name)
            .map(|binding| Arc::clone(&binding.factory))
            .ok_or_else(|| Error::missing(name, AnnotationScope::Registry))?;

        let mut annotation = factory(Value::Array(arguments.to_vec())).map_err(|source| Error::InvalidArguments {
            name: name.to_string(),
            source,
        })?;
        annotation.set_name(name.to_string());

        Ok(Arc::from(annotation))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.bindings.read().contains_key(name)
    }

    /// Rust type mapped under `name`, as reported by `type_name`.
    pub fn type_name(&self, name: &str) -> Option<&'static str> {
        self.bindings.read().get(name).map(|binding| binding.type_name)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<_> = self.bindings.read().keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.bindings.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.read().is_empty()
    }
}

impl std::fmt::Debug for AnnotationRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnnotationRegistry")
            .field("names", &self.names())
            .finish()
    }
}
