// Wireable annotation that records its wiring calls

use once_cell::sync::Lazy;
use parking_lot::Mutex;
use serde::Deserialize;
use spindle_core::annotation::{AnnotationRegistry, WireTarget, Wireable};
use spindle_core::{Annotation, Result};

static WIRED: Lazy<Mutex<Vec<WireCall>>> = Lazy::new(|| Mutex::new(Vec::new()));

/// One call to [`RecordingWire::wire`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WireCall {
    pub label: String,
    pub type_name: String,
    /// Annotated method, `None` for a class-level declaration
    pub method: Option<String>,
}

/// Test annotation declared as `RecordingWire("label")`.
///
/// Wiring never fails; every call is recorded under the label. Calls are
/// kept process-wide, so give each test its own label.
///
/// ```rust
/// use spindle_core::annotation::{AnnotationRegistry, Reader, WireTarget, wire_annotations};
/// use spindle_core::annotated;
/// use spindle_testing::RecordingWire;
/// use std::sync::Arc;
///
/// struct Checkout;
///
/// #[annotated(RecordingWire("doc-checkout"))]
/// impl Checkout {
///     #[annotate(RecordingWire("doc-checkout"))]
///     fn pay(&self) {}
/// }
///
/// let registry = AnnotationRegistry::new();
/// RecordingWire::register(&registry).unwrap();
///
/// let checkout = Arc::new(Checkout);
/// wire_annotations(&Reader::new::<Checkout>(Arc::new(registry)), &WireTarget::new(&checkout)).unwrap();
///
/// let methods: Vec<_> = RecordingWire::calls("doc-checkout").into_iter().map(|c| c.method).collect();
/// assert_eq!(methods, [None, Some("pay".to_string())]);
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize, Annotation)]
#[annotation(wireable)]
pub struct RecordingWire {
    #[serde(skip)]
    name: String,
    pub label: String,
}

impl RecordingWire {
    pub const NAME: &'static str = "RecordingWire";

    /// Map this type under [`RecordingWire::NAME`].
    pub fn register(registry: &AnnotationRegistry) -> Result<()> {
        registry.map::<Self>(Self::NAME)?;
        Ok(())
    }

    /// Calls recorded under `label`, in order.
    pub fn calls(label: &str) -> Vec<WireCall> {
        WIRED.lock().iter().filter(|call| call.label == label).cloned().collect()
    }

    /// Forget the calls recorded under `label`.
    pub fn reset(label: &str) {
        WIRED.lock().retain(|call| call.label != label);
    }
}

impl Wireable for RecordingWire {
    fn wire(&self, target: &WireTarget<'_>, method: Option<&str>) -> Result<()> {
        WIRED.lock().push(WireCall {
            label: self.label.clone(),
            type_name: target.type_name().to_string(),
            method: method.map(str::to_string),
        });
        Ok(())
    }
}
