// Event spy

use parking_lot::Mutex;
use serde_json::Value;
use spindle_core::{Callback, Event, EventSubject, ObserverId, Priority};
use spindle_events::IntoEventNames;
use std::sync::Arc;

/// What the spy saw of one emission.
#[derive(Debug, Clone, PartialEq)]
pub struct SpiedEvent {
    pub key: String,
    /// Index of the spy in the emission's call stack
    pub index: usize,
    /// Event state when the spy ran
    pub state: Option<Value>,
}

/// Observer that records every emission of the events it watches.
///
/// ```rust
/// use spindle_core::Emitter;
/// use spindle_testing::EventSpy;
///
/// let emitter = Emitter::new();
/// let spy = EventSpy::attach(&emitter, "order.placed order.paid");
///
/// emitter.emit("order.paid").unwrap();
/// assert_eq!(spy.keys(), ["order.paid"]);
/// ```
#[derive(Clone, Default)]
pub struct EventSpy {
    seen: Arc<Mutex<Vec<SpiedEvent>>>,
    subscriptions: Arc<Mutex<Vec<(String, ObserverId)>>>,
}

impl EventSpy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spy on `events` with automatic priority, so the spy runs after the
    /// observers already subscribed.
    pub fn attach(subject: &dyn EventSubject, events: impl IntoEventNames) -> Self {
        let spy = Self::new();
        spy.watch(subject, events, Priority::Auto);
        spy
    }

    /// Subscribe this spy to more events.
    pub fn watch(&self, subject: &dyn EventSubject, events: impl IntoEventNames, priority: Priority) {
        for event in events.into_event_names() {
            let id = subject.subscribe(&event, self.callback(), priority, false);
            self.subscriptions.lock().push((event, id));
        }
    }

    /// Remove every subscription made through this spy.
    pub fn detach(&self, subject: &dyn EventSubject) -> usize {
        let subscriptions = std::mem::take(&mut *self.subscriptions.lock());
        subscriptions
            .into_iter()
            .filter(|(event, id)| subject.emitter().unsubscribe_id(event, *id))
            .count()
    }

    fn callback(&self) -> Callback {
        let seen = Arc::clone(&self.seen);
        Callback::new(move |event: &mut Event| {
            seen.lock().push(SpiedEvent {
                key: event.key().to_string(),
                index: event.index(),
                state: event.state().cloned(),
            });
            Ok(None)
        })
    }

    pub fn events(&self) -> Vec<SpiedEvent> {
        self.seen.lock().clone()
    }

    /// Keys of the recorded emissions in order.
    pub fn keys(&self) -> Vec<String> {
        self.seen.lock().iter().map(|e| e.key.clone()).collect()
    }

    pub fn count(&self, key: &str) -> usize {
        self.seen.lock().iter().filter(|e| e.key == key).count()
    }

    pub fn was_emitted(&self, key: &str) -> bool {
        self.count(key) > 0
    }

    pub fn last(&self) -> Option<SpiedEvent> {
        self.seen.lock().last().cloned()
    }

    pub fn clear(&self) {
        self.seen.lock().clear();
    }
}

impl std::fmt::Debug for EventSpy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventSpy")
            .field("seen", &self.keys())
            .field("subscriptions", &self.subscriptions.lock().len())
            .finish()
    }
}
