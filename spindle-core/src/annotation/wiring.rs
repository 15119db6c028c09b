//! Wiring annotations into live instances

use super::{Annotated, Annotation, AnnotationRegistry, Reader};
use crate::error::Result;
use crate::logging::debug;
use once_cell::sync::OnceCell;
use spindle_events::{Callback, EventSubject};
use std::any::Any;
use std::sync::Arc;

/// An annotation that can hook behavior into the instance it is declared on.
pub trait Wireable: Send + Sync {
    /// Wire this annotation into `target`.
    ///
    /// `method` is the annotated method, or `None` for a class-level
    /// declaration.
    fn wire(&self, target: &WireTarget<'_>, method: Option<&str>) -> Result<()>;
}

/// Borrowed view of an instance being wired.
pub struct WireTarget<'a> {
    type_name: &'static str,
    instance: &'a (dyn Any + Send + Sync),
    subject: Option<&'a dyn EventSubject>,
    binder: Box<dyn Fn(&str) -> Option<Callback> + 'a>,
}

impl<'a> WireTarget<'a> {
    pub fn new<T: Annotated>(instance: &'a Arc<T>) -> Self {
        Self {
            type_name: std::any::type_name::<T>(),
            instance: &**instance,
            subject: None,
            binder: Box::new(move |method| T::bind_method(instance, method)),
        }
    }

    /// Emitter that observer-style annotations subscribe on.
    pub fn with_subject(mut self, subject: &'a dyn EventSubject) -> Self {
        self.subject = Some(subject);
        self
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn instance(&self) -> &(dyn Any + Send + Sync) {
        self.instance
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.instance.downcast_ref::<T>()
    }

    pub fn subject(&self) -> Option<&'a dyn EventSubject> {
        self.subject
    }

    /// Bind a method of the instance as an emitter callback.
    pub fn bind(&self, method: &str) -> Option<Callback> {
        (self.binder)(method)
    }
}

impl std::fmt::Debug for WireTarget<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WireTarget")
            .field("type_name", &self.type_name)
            .field("has_subject", &self.subject.is_some())
            .finish()
    }
}

/// Wire every wireable annotation: class-level first, then methods in
/// declaration order. Returns how many were wired.
pub fn wire_annotations(reader: &Reader, target: &WireTarget<'_>) -> Result<usize> {
    let mut wired = 0;

    for annotation in reader.class_annotations()?.values() {
        if let Some(wireable) = annotation.as_wireable() {
            wireable.wire(target, None)?;
            wired += 1;
        }
    }

    for (method, annotations) in reader.annotated_methods()?.iter() {
        for annotation in annotations.values() {
            if let Some(wireable) = annotation.as_wireable() {
                wireable.wire(target, Some(method))?;
                wired += 1;
            }
        }
    }

    debug!(type_name = target.type_name(), wired, "Wired annotations");
    Ok(wired)
}

/// Wire one class-level annotation. Non-wireable annotations are returned
/// untouched.
pub fn wire_class_annotation(reader: &Reader, target: &WireTarget<'_>, name: &str) -> Result<Arc<dyn Annotation>> {
    let annotation = reader.class_annotation(name)?;
    if let Some(wireable) = annotation.as_wireable() {
        wireable.wire(target, None)?;
    }
    Ok(annotation)
}

/// Wire one method-level annotation. Non-wireable annotations are returned
/// untouched.
pub fn wire_method_annotation(
    reader: &Reader,
    target: &WireTarget<'_>,
    method: &str,
    name: &str,
) -> Result<Arc<dyn Annotation>> {
    let annotation = reader.method_annotation(method, name)?;
    if let Some(wireable) = annotation.as_wireable() {
        wireable.wire(target, Some(method))?;
    }
    Ok(annotation)
}

/// Mixin for types that wire their own annotations.
///
/// Implementors store a registry handle and an empty `OnceCell<Reader>`;
/// the reader is created on first use and kept for the instance's life.
///
/// ```rust
/// use spindle_core::annotation::{AnnotationRegistry, Reader, WiresAnnotations};
/// use spindle_core::{annotated, Event};
/// use spindle_events::{Emitter, EventSubject};
/// use once_cell::sync::OnceCell;
/// use std::sync::Arc;
///
/// struct Cache {
///     registry: Arc<AnnotationRegistry>,
///     reader: OnceCell<Reader>,
///     emitter: Emitter,
/// }
///
/// #[annotated]
/// impl Cache {
///     #[annotate(Observer("cache.flush"))]
///     fn flush(&self, _event: &mut Event) {}
/// }
///
/// impl WiresAnnotations for Cache {
///     fn registry(&self) -> &Arc<AnnotationRegistry> { &self.registry }
///     fn reader_slot(&self) -> &OnceCell<Reader> { &self.reader }
///     fn event_subject(&self) -> Option<&dyn EventSubject> { Some(&self.emitter) }
/// }
///
/// let cache = Arc::new(Cache {
///     registry: Arc::new(AnnotationRegistry::with_builtins()),
///     reader: OnceCell::new(),
///     emitter: Emitter::new(),
/// });
/// assert_eq!(cache.wire_annotations().unwrap(), 1);
/// assert!(cache.emitter.has_observers("cache.flush"));
/// ```
pub trait WiresAnnotations: Annotated + Sized {
    fn registry(&self) -> &Arc<AnnotationRegistry>;

    fn reader_slot(&self) -> &OnceCell<Reader>;

    fn reader(&self) -> &Reader {
        self.reader_slot()
            .get_or_init(|| Reader::new::<Self>(Arc::clone(self.registry())))
    }

    /// Emitter handed to wireable annotations, if the type has one.
    fn event_subject(&self) -> Option<&dyn EventSubject> {
        None
    }

    fn wire_target(self: &Arc<Self>) -> WireTarget<'_> {
        let target = WireTarget::new(self);
        match self.event_subject() {
            Some(subject) => target.with_subject(subject),
            None => target,
        }
    }

    fn wire_annotations(self: &Arc<Self>) -> Result<usize> {
        wire_annotations(self.reader(), &self.wire_target())
    }

    fn wire_class_annotation(self: &Arc<Self>, name: &str) -> Result<Arc<dyn Annotation>> {
        wire_class_annotation(self.reader(), &self.wire_target(), name)
    }

    fn wire_method_annotation(self: &Arc<Self>, method: &str, name: &str) -> Result<Arc<dyn Annotation>> {
        wire_method_annotation(self.reader(), &self.wire_target(), method, name)
    }
}
