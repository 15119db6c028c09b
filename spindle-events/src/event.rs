//! The mutable event object threaded through one emission

use crate::extensions::Extensions;
use crate::observer::Observer;
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

/// Loosely typed payload attached to an event.
pub type EventData = serde_json::Map<String, Value>;

/// A single emission of a named event.
///
/// An `Event` is created per emission and is not reused. Observers receive
/// it mutably in call-stack order; each observer's return value replaces
/// [`state`](Event::state), so after dispatch the state holds whatever the
/// last executed observer returned.
pub struct Event {
    key: String,
    id: Uuid,
    timestamp: DateTime<Utc>,
    index: usize,
    stopped: bool,
    state: Option<Value>,
    data: EventData,
    extensions: Extensions,
    call_stack: Vec<Arc<Observer>>,
}

impl Event {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            index: 0,
            stopped: false,
            state: None,
            data: EventData::new(),
            extensions: Extensions::new(),
            call_stack: Vec::new(),
        }
    }

    pub fn with_data(mut self, data: EventData) -> Self {
        self.data = data;
        self
    }

    /// Attach a typed value observers can read or mutate.
    pub fn with_extension<T: Send + Sync + 'static>(mut self, value: T) -> Self {
        self.extensions.insert(value);
        self
    }

    /// Event name this emission was created for.
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// Position of the observer currently executing in the call stack.
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    /// Stop propagation. No later observer in this emission runs.
    pub fn stop(&mut self) {
        self.stopped = true;
    }

    /// Advance to the next observer. Has no effect once stopped.
    pub fn next(&mut self) {
        if !self.stopped {
            self.index += 1;
        }
    }

    pub fn state(&self) -> Option<&Value> {
        self.state.as_ref()
    }

    pub fn set_state(&mut self, state: Option<Value>) {
        self.state = state;
    }

    pub fn take_state(&mut self) -> Option<Value> {
        self.state.take()
    }

    pub fn data(&self) -> &EventData {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut EventData {
        &mut self.data
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }

    pub fn set(&mut self, key: impl Into<String>, value: Value) -> Option<Value> {
        self.data.insert(key.into(), value)
    }

    pub fn extensions(&self) -> &Extensions {
        &self.extensions
    }

    pub fn extensions_mut(&mut self) -> &mut Extensions {
        &mut self.extensions
    }

    /// Observers snapshotted for this emission, in dispatch order.
    pub fn call_stack(&self) -> &[Arc<Observer>] {
        &self.call_stack
    }

    /// The observer at [`index`](Event::index), if any.
    pub fn current_observer(&self) -> Option<&Arc<Observer>> {
        self.call_stack.get(self.index)
    }

    pub(crate) fn set_call_stack(&mut self, call_stack: Vec<Arc<Observer>>) {
        self.call_stack = call_stack;
    }
}

impl fmt::Debug for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Event")
            .field("key", &self.key)
            .field("id", &self.id)
            .field("timestamp", &self.timestamp)
            .field("index", &self.index)
            .field("stopped", &self.stopped)
            .field("state", &self.state)
            .field("data", &self.data)
            .field("extensions", &self.extensions)
            .field("call_stack", &self.call_stack.len())
            .finish()
    }
}
