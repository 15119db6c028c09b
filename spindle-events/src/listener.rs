//! Multi-event listener bundles

use crate::error::ObserverResult;
use crate::event::Event;
use indexmap::IndexMap;

/// An object handling several events through named handler methods.
///
/// [`Emitter::listen`](crate::Emitter::listen) subscribes one observer per
/// entry of [`subscribed_events`](Listener::subscribed_events); each observer
/// routes back into [`on_event`](Listener::on_event) with the method name.
///
/// ```rust
/// use spindle_events::{Event, Listener, ObserverResult};
/// use indexmap::IndexMap;
///
/// struct AuditListener;
///
/// impl Listener for AuditListener {
///     fn subscribed_events(&self) -> IndexMap<String, String> {
///         IndexMap::from([
///             ("kernel.startup".to_string(), "opened".to_string()),
///             ("kernel.shutdown".to_string(), "closed".to_string()),
///         ])
///     }
///
///     fn on_event(&self, method: &str, event: &mut Event) -> ObserverResult {
///         event.set(method, true.into());
///         Ok(None)
///     }
/// }
/// ```
pub trait Listener: Send + Sync + 'static {
    /// Event name mapped to the handler method name.
    fn subscribed_events(&self) -> IndexMap<String, String>;

    /// Dispatch an event to the named handler.
    fn on_event(&self, method: &str, event: &mut Event) -> ObserverResult;
}
