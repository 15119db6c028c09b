//! Event emitter implementation

use crate::error::{EmitterError, ObserverResult};
use crate::event::{Event, EventData};
use crate::listener::Listener;
use crate::observer::{Callback, Observer, ObserverId, Priority};
use dashmap::DashMap;
use futures::future::BoxFuture;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, error, trace};

/// Prioritized, in-process event emitter.
///
/// Observers are kept per event name in dispatch order. Every emission works
/// on a snapshot of that list, so observers subscribed or removed while an
/// emission is running only affect later emissions. No lock is held while an
/// observer runs; observers may freely subscribe, unsubscribe or emit.
///
/// Cloning an `Emitter` shares its observers.
#[derive(Clone)]
pub struct Emitter {
    observers: Arc<DashMap<String, Vec<Arc<Observer>>>>,
    listeners: Arc<DashMap<String, Vec<ListenerBinding>>>,
    next_id: Arc<AtomicU64>,
    config: Arc<EmitterConfig>,
}

#[derive(Clone)]
struct ListenerBinding {
    listener: Arc<dyn Listener>,
    callback: Callback,
}

/// Emitter configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmitterConfig {
    /// Log subscriptions and emissions through `tracing`
    pub enable_logging: bool,

    /// Drop a `once` observer even when its invocation failed
    pub consume_failed_once: bool,
}

impl Default for EmitterConfig {
    fn default() -> Self {
        Self {
            enable_logging: true,
            consume_failed_once: false,
        }
    }
}

impl Emitter {
    pub fn new() -> Self {
        Self::with_config(EmitterConfig::default())
    }

    pub fn with_config(config: EmitterConfig) -> Self {
        Self {
            observers: Arc::new(DashMap::new()),
            listeners: Arc::new(DashMap::new()),
            next_id: Arc::new(AtomicU64::new(1)),
            config: Arc::new(config),
        }
    }

    pub fn builder() -> EmitterBuilder {
        EmitterBuilder::new()
    }

    pub fn config(&self) -> &EmitterConfig {
        &self.config
    }

    /// Subscribe a callback to an event.
    ///
    /// Explicit priorities run in descending order, ties in registration
    /// order. [`Priority::Auto`] observers run after all of them, also in
    /// registration order.
    ///
    /// ```rust
    /// use spindle_events::{Callback, Emitter, Priority};
    ///
    /// let emitter = Emitter::new();
    /// emitter.subscribe("order.placed", Callback::new(|_| Ok(None)), Priority::Value(10), false);
    /// assert_eq!(emitter.observer_count("order.placed"), 1);
    /// ```
    pub fn subscribe(
        &self,
        event: &str,
        callback: Callback,
        priority: impl Into<Priority>,
        once: bool,
    ) -> ObserverId {
        let priority = priority.into();
        let id = ObserverId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let observer = Arc::new(Observer::new(id, callback, priority, once));

        let mut observers = self.observers.entry(event.to_string()).or_default();
        let position = observers
            .iter()
            .position(|existing| priority.outranks(&existing.priority()))
            .unwrap_or(observers.len());
        observers.insert(position, observer);
        drop(observers);

        if self.config.enable_logging {
            debug!(event, observer = %id, ?priority, once, "Subscribed observer");
        }

        id
    }

    /// Subscribe a blocking closure with automatic priority.
    pub fn on<F>(&self, event: &str, f: F) -> ObserverId
    where
        F: Fn(&mut Event) -> ObserverResult + Send + Sync + 'static,
    {
        self.subscribe(event, Callback::new(f), Priority::Auto, false)
    }

    /// Subscribe a blocking closure that is removed after its first
    /// successful run.
    pub fn once<F>(&self, event: &str, f: F) -> ObserverId
    where
        F: Fn(&mut Event) -> ObserverResult + Send + Sync + 'static,
    {
        self.subscribe(event, Callback::new(f), Priority::Auto, true)
    }

    /// Subscribe a suspending closure with automatic priority.
    pub fn on_suspending<F>(&self, event: &str, f: F) -> ObserverId
    where
        F: for<'a> Fn(&'a mut Event) -> BoxFuture<'a, ObserverResult> + Send + Sync + 'static,
    {
        self.subscribe(event, Callback::suspending(f), Priority::Auto, false)
    }

    /// Remove the first observer of `event` holding this exact callback.
    pub fn unsubscribe(&self, event: &str, callback: &Callback) -> bool {
        let removed = self.remove_where(event, |observer| observer.callback().same_as(callback));
        if removed && self.config.enable_logging {
            debug!(event, "Unsubscribed observer");
        }
        removed
    }

    /// Remove an observer by the id returned from [`subscribe`](Emitter::subscribe).
    pub fn unsubscribe_id(&self, event: &str, id: ObserverId) -> bool {
        self.remove_where(event, |observer| observer.id() == id)
    }

    /// Subscribe every `(event, method)` pair a listener declares.
    pub fn listen(&self, listener: Arc<dyn Listener>) {
        for (event, method) in listener.subscribed_events() {
            let target = Arc::clone(&listener);
            let callback = Callback::new(move |e| target.on_event(&method, e));
            self.subscribe(&event, callback.clone(), Priority::Auto, false);

            self.listeners.entry(event).or_default().push(ListenerBinding {
                listener: Arc::clone(&listener),
                callback,
            });
        }
    }

    /// Undo a previous [`listen`](Emitter::listen). Returns the number of
    /// observers removed.
    pub fn unlisten(&self, listener: &Arc<dyn Listener>) -> usize {
        let mut detached = Vec::new();
        for mut entry in self.listeners.iter_mut() {
            let event = entry.key().clone();
            entry.value_mut().retain(|binding| {
                if Arc::ptr_eq(&binding.listener, listener) {
                    detached.push((event.clone(), binding.callback.clone()));
                    false
                } else {
                    true
                }
            });
        }
        self.listeners.retain(|_, bindings| !bindings.is_empty());

        detached
            .into_iter()
            .filter(|(event, callback)| self.unsubscribe(event, callback))
            .count()
    }

    /// Emit an event with no payload.
    pub fn emit(&self, event: &str) -> Result<Event, EmitterError> {
        self.dispatch(Event::new(event))
    }

    /// Emit an event carrying a data payload.
    pub fn emit_with(&self, event: &str, data: EventData) -> Result<Event, EmitterError> {
        self.dispatch(Event::new(event).with_data(data))
    }

    /// Emit several events independently, in order.
    ///
    /// A string is split on whitespace and commas.
    ///
    /// ```rust
    /// use spindle_events::Emitter;
    ///
    /// let emitter = Emitter::new();
    /// let events = emitter.emit_many("cache.warm, cache.flush").unwrap();
    /// assert_eq!(events.keys().collect::<Vec<_>>(), ["cache.warm", "cache.flush"]);
    /// ```
    pub fn emit_many(&self, events: impl IntoEventNames) -> Result<IndexMap<String, Event>, EmitterError> {
        let mut emitted = IndexMap::new();
        for name in events.into_event_names() {
            let event = self.emit(&name)?;
            emitted.insert(name, event);
        }
        Ok(emitted)
    }

    /// Run blocking observers for a prepared event.
    ///
    /// Fails with [`EmitterError::SuspendingObserver`] before any observer
    /// runs when the snapshot contains a suspending observer.
    pub fn dispatch(&self, mut event: Event) -> Result<Event, EmitterError> {
        let snapshot = self.snapshot(event.key());
        if snapshot.iter().any(|observer| observer.is_suspending()) {
            return Err(EmitterError::SuspendingObserver {
                event: event.key().to_string(),
            });
        }

        self.log_dispatch(&event, snapshot.len());
        event.set_call_stack(snapshot);

        while let Some(observer) = self.pending(&event) {
            let result = match observer.callback() {
                Callback::Blocking(f) => f(&mut event),
                Callback::Suspending(_) => {
                    return Err(EmitterError::SuspendingObserver {
                        event: event.key().to_string(),
                    });
                }
            };
            self.settle(&mut event, &observer, result)?;
        }

        Ok(event)
    }

    /// Run observers for a prepared event, awaiting suspending ones in turn.
    pub async fn dispatch_async(&self, mut event: Event) -> Result<Event, EmitterError> {
        let snapshot = self.snapshot(event.key());
        self.log_dispatch(&event, snapshot.len());
        event.set_call_stack(snapshot);

        while let Some(observer) = self.pending(&event) {
            let result = observer.execute_async(&mut event).await;
            self.settle(&mut event, &observer, result)?;
        }

        Ok(event)
    }

    pub async fn emit_async(&self, event: &str) -> Result<Event, EmitterError> {
        self.dispatch_async(Event::new(event)).await
    }

    pub async fn emit_with_async(&self, event: &str, data: EventData) -> Result<Event, EmitterError> {
        self.dispatch_async(Event::new(event).with_data(data)).await
    }

    pub fn has_observers(&self, event: &str) -> bool {
        self.observer_count(event) > 0
    }

    pub fn observer_count(&self, event: &str) -> usize {
        self.observers.get(event).map(|o| o.len()).unwrap_or(0)
    }

    /// Names of events with at least one observer.
    pub fn event_names(&self) -> Vec<String> {
        self.observers
            .iter()
            .filter(|entry| !entry.value().is_empty())
            .map(|entry| entry.key().clone())
            .collect()
    }

    /// Current observers of an event, in dispatch order.
    pub fn observers(&self, event: &str) -> Vec<Arc<Observer>> {
        self.snapshot(event)
    }

    /// Drop every observer of one event.
    pub fn clear(&self, event: &str) {
        self.observers.remove(event);
        self.listeners.remove(event);
        if self.config.enable_logging {
            debug!(event, "Cleared observers");
        }
    }

    /// Drop every observer of every event.
    pub fn clear_all(&self) {
        self.observers.clear();
        self.listeners.clear();
        if self.config.enable_logging {
            debug!("Cleared all observers");
        }
    }

    fn snapshot(&self, event: &str) -> Vec<Arc<Observer>> {
        self.observers
            .get(event)
            .map(|observers| observers.clone())
            .unwrap_or_default()
    }

    fn pending(&self, event: &Event) -> Option<Arc<Observer>> {
        if event.is_stopped() {
            return None;
        }
        event.current_observer().cloned()
    }

    fn settle(&self, event: &mut Event, observer: &Arc<Observer>, result: ObserverResult) -> Result<(), EmitterError> {
        match result {
            Ok(state) => {
                event.set_state(state);
                observer.mark_executed();
                event.next();
                if observer.is_once() {
                    self.unsubscribe_id(event.key(), observer.id());
                }
                Ok(())
            }
            Err(source) => {
                if observer.is_once() && self.config.consume_failed_once {
                    self.unsubscribe_id(event.key(), observer.id());
                }
                if self.config.enable_logging {
                    error!(event = event.key(), observer = %observer.id(), "Observer failed: {}", source);
                }
                Err(EmitterError::ObserverFailed {
                    event: event.key().to_string(),
                    observer: observer.id(),
                    source,
                })
            }
        }
    }

    fn remove_where(&self, event: &str, matches: impl Fn(&Observer) -> bool) -> bool {
        let removed = match self.observers.get_mut(event) {
            Some(mut observers) => match observers.iter().position(|o| matches(o.as_ref())) {
                Some(index) => {
                    observers.remove(index);
                    true
                }
                None => false,
            },
            None => false,
        };
        if removed {
            self.observers.remove_if(event, |_, observers| observers.is_empty());
        }
        removed
    }

    fn log_dispatch(&self, event: &Event, observers: usize) {
        if self.config.enable_logging {
            trace!(event = event.key(), id = %event.id(), observers, "Dispatching event");
        }
    }
}

impl Default for Emitter {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Emitter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Emitter")
            .field("events", &self.observers.len())
            .field("config", &self.config)
            .finish()
    }
}

/// Conversion into the list of event names for [`Emitter::emit_many`].
pub trait IntoEventNames {
    fn into_event_names(self) -> Vec<String>;
}

fn split_names(names: &str) -> Vec<String> {
    names
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect()
}

fn collect_names<S: AsRef<str>>(names: impl IntoIterator<Item = S>) -> Vec<String> {
    names
        .into_iter()
        .map(|name| name.as_ref().trim().to_string())
        .filter(|name| !name.is_empty())
        .collect()
}

impl IntoEventNames for &str {
    fn into_event_names(self) -> Vec<String> {
        split_names(self)
    }
}

impl IntoEventNames for String {
    fn into_event_names(self) -> Vec<String> {
        split_names(&self)
    }
}

impl<S: AsRef<str>> IntoEventNames for Vec<S> {
    fn into_event_names(self) -> Vec<String> {
        collect_names(self)
    }
}

impl<S: AsRef<str>> IntoEventNames for &[S] {
    fn into_event_names(self) -> Vec<String> {
        collect_names(self)
    }
}

impl<S: AsRef<str>, const N: usize> IntoEventNames for [S; N] {
    fn into_event_names(self) -> Vec<String> {
        collect_names(self)
    }
}

/// Emitter builder
pub struct EmitterBuilder {
    config: EmitterConfig,
}

impl EmitterBuilder {
    pub fn new() -> Self {
        Self {
            config: EmitterConfig::default(),
        }
    }

    pub fn enable_logging(mut self, enabled: bool) -> Self {
        self.config.enable_logging = enabled;
        self
    }

    pub fn consume_failed_once(mut self, enabled: bool) -> Self {
        self.config.consume_failed_once = enabled;
        self
    }

    pub fn build(self) -> Emitter {
        Emitter::with_config(self.config)
    }
}

impl Default for EmitterBuilder {
    fn default() -> Self {
        Self::new()
    }
}
