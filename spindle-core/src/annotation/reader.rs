//! Memoized access to the annotations of one type

use super::{Annotated, AnnotationDeclaration, AnnotationMap, AnnotationRegistry, ClassMetadata, is_reserved};
use crate::error::{AnnotationScope, Error, ReflectionError, Result};
use crate::logging::trace;
use indexmap::IndexMap;
use once_cell::sync::OnceCell;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

/// Reads and caches the annotations declared on one type.
///
/// Every lookup is computed at most once per reader; repeated calls hand
/// back the same `Arc`. Later registry changes do not affect annotations a
/// reader has already materialized.
pub struct Reader {
    metadata: ClassMetadata,
    registry: Arc<AnnotationRegistry>,
    class_annotations: OnceCell<Arc<AnnotationMap>>,
    method_annotations: RwLock<HashMap<String, Arc<AnnotationMap>>>,
    annotated_methods: OnceCell<Arc<IndexMap<String, Arc<AnnotationMap>>>>,
}

impl Reader {
    pub fn new<T: Annotated>(registry: Arc<AnnotationRegistry>) -> Self {
        Self::from_metadata(T::class_metadata(), registry)
    }

    pub fn from_metadata(metadata: ClassMetadata, registry: Arc<AnnotationRegistry>) -> Self {
        Self {
            metadata,
            registry,
            class_annotations: OnceCell::new(),
            method_annotations: RwLock::new(HashMap::new()),
            annotated_methods: OnceCell::new(),
        }
    }

    pub fn type_name(&self) -> &str {
        &self.metadata.type_name
    }

    pub fn metadata(&self) -> &ClassMetadata {
        &self.metadata
    }

    pub fn registry(&self) -> &Arc<AnnotationRegistry> {
        &self.registry
    }

    /// Class-level annotations in declaration order.
    pub fn class_annotations(&self) -> Result<Arc<AnnotationMap>> {
        self.class_annotations
            .get_or_try_init(|| {
                let scope = AnnotationScope::Class(self.metadata.type_name.clone());
                self.materialize(&self.metadata.annotations, &scope).map(Arc::new)
            })
            .cloned()
    }

    pub fn class_annotation(&self, name: &str) -> Result<Arc<dyn super::Annotation>> {
        self.class_annotations()?
            .get(name)
            .cloned()
            .ok_or_else(|| Error::missing(name, AnnotationScope::Class(self.metadata.type_name.clone())))
    }

    /// Annotations of one method in declaration order.
    ///
    /// Fails with [`ReflectionError::MethodNotFound`] when the type declares
    /// no such method.
    pub fn method_annotations(&self, method: &str) -> Result<Arc<AnnotationMap>> {
        if let Some(cached) = self.method_annotations.read().get(method) {
            return Ok(Arc::clone(cached));
        }

        let declared = self.metadata.method(method).ok_or_else(|| ReflectionError::MethodNotFound {
            class: self.metadata.type_name.clone(),
            method: method.to_string(),
        })?;

        let scope = AnnotationScope::Method {
            class: self.metadata.type_name.clone(),
            method: method.to_string(),
        };
        let annotations = Arc::new(self.materialize(&declared.annotations, &scope)?);

        let mut cache = self.method_annotations.write();
        Ok(Arc::clone(cache.entry(method.to_string()).or_insert(annotations)))
    }

    pub fn method_annotation(&self, method: &str, name: &str) -> Result<Arc<dyn super::Annotation>> {
        self.method_annotations(method)?.get(name).cloned().ok_or_else(|| {
            Error::missing(
                name,
                AnnotationScope::Method {
                    class: self.metadata.type_name.clone(),
                    method: method.to_string(),
                },
            )
        })
    }

    /// Every method with at least one annotation, in declaration order.
    pub fn annotated_methods(&self) -> Result<Arc<IndexMap<String, Arc<AnnotationMap>>>> {
        self.annotated_methods
            .get_or_try_init(|| {
                let mut methods = IndexMap::new();
                for method in &self.metadata.methods {
                    let annotations = self.method_annotations(&method.name)?;
                    if !annotations.is_empty() {
                        methods.insert(method.name.clone(), annotations);
                    }
                }
                Ok::<_, Error>(Arc::new(methods))
            })
            .cloned()
    }

    fn materialize(&self, declarations: &[AnnotationDeclaration], scope: &AnnotationScope) -> Result<AnnotationMap> {
        let mut annotations = AnnotationMap::new();
        for declaration in declarations.iter().filter(|d| !is_reserved(&d.name)) {
            let annotation = self
                .registry
                .factory(&declaration.name, &declaration.arguments)
                .map_err(|err| match err {
                    Error::MissingAnnotation { name, .. } => Error::missing(name, scope.clone()),
                    other => other,
                })?;
            annotations.insert(declaration.name.clone(), annotation);
        }

        trace!(scope = %scope, count = annotations.len(), "Materialized annotations");
        Ok(annotations)
    }
}

impl std::fmt::Debug for Reader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reader")
            .field("type_name", &self.metadata.type_name)
            .field("methods", &self.metadata.methods.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotation::MethodMetadata;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Deserialize, crate::Annotation)]
    struct Tag {
        #[serde(skip)]
        name: String,
        value: String,
    }

    fn registry() -> Arc<AnnotationRegistry> {
        let registry = AnnotationRegistry::new();
        registry.map::<Tag>("Tag").unwrap();
        registry.map::<Tag>("Label").unwrap();
        Arc::new(registry)
    }

    fn metadata() -> ClassMetadata {
        ClassMetadata::new("Catalog")
            .with_annotation(AnnotationDeclaration::new("Tag", vec![json!("catalog")]))
            .with_annotation(AnnotationDeclaration::new("__internal", vec![]))
            .with_method(MethodMetadata::new("list"))
            .with_method(
                MethodMetadata::new("search")
                    .with_annotation(AnnotationDeclaration::new("Label", vec![json!("first")]))
                    .with_annotation(AnnotationDeclaration::new("Tag", vec![json!("query")]))
                    .with_annotation(AnnotationDeclaration::new("Label", vec![json!("second")])),
            )
    }

    #[test]
    fn test_class_annotations_memoized() {
        let reader = Reader::from_metadata(metadata(), registry());
        let first = reader.class_annotations().unwrap();
        let second = reader.class_annotations().unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.keys().collect::<Vec<_>>(), ["Tag"]);
    }

    #[test]
    fn test_method_annotations_memoized() {
        let reader = Reader::from_metadata(metadata(), registry());
        let first = reader.method_annotations("search").unwrap();
        let second = reader.method_annotations("search").unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_duplicate_names_last_wins_first_position() {
        let reader = Reader::from_metadata(metadata(), registry());
        let annotations = reader.method_annotations("search").unwrap();

        assert_eq!(annotations.keys().collect::<Vec<_>>(), ["Label", "Tag"]);
        let label = annotations["Label"].downcast_ref::<Tag>().unwrap();
        assert_eq!(label.value, "second");
    }

    #[test]
    fn test_unknown_method() {
        let reader = Reader::from_metadata(metadata(), registry());
        let err = reader.method_annotations("delete").unwrap_err();
        assert!(matches!(
            err,
            Error::Reflection(ReflectionError::MethodNotFound { ref method, .. }) if method == "delete"
        ));
    }

    #[test]
    fn test_missing_annotation_lookup() {
        let reader = Reader::from_metadata(metadata(), registry());
        let err = reader.class_annotation("Label").unwrap_err();
        assert!(matches!(err, Error::MissingAnnotation { ref scope, .. } if *scope == AnnotationScope::Class("Catalog".to_string())));

        let err = reader.method_annotation("list", "Tag").unwrap_err();
        assert!(err.is_missing_annotation());
    }

    #[test]
    fn test_unregistered_declaration_reports_scope() {
        let metadata = ClassMetadata::new("Catalog").with_annotation(AnnotationDeclaration::new("Unknown", vec![]));
        let reader = Reader::from_metadata(metadata, registry());

        let err = reader.class_annotations().unwrap_err();
        assert_eq!(err.to_string(), "Missing annotation 'Unknown' in class Catalog");
    }

    #[test]
    fn test_annotated_methods_skip_bare_methods() {
        let reader = Reader::from_metadata(metadata(), registry());
        let methods = reader.annotated_methods().unwrap();

        assert_eq!(methods.keys().collect::<Vec<_>>(), ["search"]);
        assert!(Arc::ptr_eq(&methods, &reader.annotated_methods().unwrap()));
        assert!(Arc::ptr_eq(&methods["search"], &reader.method_annotations("search").unwrap()));
    }

    #[test]
    fn test_cache_survives_registry_changes() {
        let registry = registry();
        let reader = Reader::from_metadata(metadata(), Arc::clone(&registry));
        let before = reader.class_annotations().unwrap();

        #[derive(Debug, Deserialize, crate::Annotation)]
        struct Replacement {
            #[serde(skip)]
            name: String,
            #[allow(dead_code)]
            value: String,
        }
        registry.map::<Replacement>("Tag").unwrap();

        let after = reader.class_annotations().unwrap();
        assert!(Arc::ptr_eq(&before, &after));
        assert!(after["Tag"].is::<Tag>());
    }
}
