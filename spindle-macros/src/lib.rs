//! Procedural macros for Spindle annotations.
//!
//! These macros are re-exported by `spindle-core`; depend on that crate
//! rather than on this one directly.

use proc_macro::TokenStream;

mod annotated;
mod annotation_derive;
mod declaration;

/// Attach annotation metadata to a type.
///
/// Placed on an inherent `impl` block. The attribute's own arguments become
/// class-level declarations; `#[annotate(...)]` on a method declares
/// method-level ones. Every method of the block is recorded in declaration
/// order. Methods shaped `fn(&self, &mut Event) -> R` or
/// `async fn(&self, &mut Event) -> R` can be bound as emitter observers.
///
/// ```rust,ignore
/// use spindle_core::prelude::*;
///
/// struct Billing;
///
/// #[annotated(Service("billing"))]
/// impl Billing {
///     #[annotate(Observer("kernel.startup", 10))]
///     fn warm_up(&self, event: &mut Event) {}
///
///     #[annotate(Observer("kernel.shutdown"))]
///     async fn flush(&self, event: &mut Event) -> Result<(), std::io::Error> {
///         Ok(())
///     }
/// }
/// ```
#[proc_macro_attribute]
pub fn annotated(attr: TokenStream, item: TokenStream) -> TokenStream {
    annotated::annotated_impl(attr, item)
}

/// Implement `Annotation` for a struct with a `name: String` field.
///
/// Add `#[annotation(wireable)]` when the type also implements `Wireable`.
#[proc_macro_derive(Annotation, attributes(annotation))]
pub fn derive_annotation(item: TokenStream) -> TokenStream {
    annotation_derive::annotation_derive(item)
}
