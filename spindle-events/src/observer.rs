//! Observers and their callbacks

use crate::error::ObserverResult;
use crate::event::Event;
use futures::future::BoxFuture;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Blocking observer callback.
pub type BlockingFn = dyn Fn(&mut Event) -> ObserverResult + Send + Sync;

/// Observer callback that may suspend; awaited before the next observer runs.
pub type SuspendingFn = dyn for<'a> Fn(&'a mut Event) -> BoxFuture<'a, ObserverResult> + Send + Sync;

/// Identifier handed out by [`Emitter::subscribe`](crate::Emitter::subscribe).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObserverId(pub(crate) u64);

impl ObserverId {
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ObserverId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Dispatch priority of an observer.
///
/// Explicit values run in descending order; `Auto` observers run after every
/// explicitly prioritized one, in registration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Priority {
    #[default]
    Auto,
    Value(i32),
}

/// Sentinel for "after all explicit priorities".
pub const AUTO_PRIORITY: Priority = Priority::Auto;

impl Priority {
    /// Whether an observer with this priority must run before `other`.
    ///
    /// Equal priorities never outrank each other, which keeps insertion
    /// stable.
    pub fn outranks(&self, other: &Priority) -> bool {
        match (self, other) {
            (Priority::Value(a), Priority::Value(b)) => a > b,
            (Priority::Value(_), Priority::Auto) => true,
            (Priority::Auto, _) => false,
        }
    }

    pub fn is_auto(&self) -> bool {
        matches!(self, Priority::Auto)
    }
}

impl From<i32> for Priority {
    fn from(value: i32) -> Self {
        Priority::Value(value)
    }
}

impl From<Option<i32>> for Priority {
    fn from(value: Option<i32>) -> Self {
        value.map(Priority::Value).unwrap_or_default()
    }
}

/// A subscribed callable.
///
/// Cloning a callback shares it; [`Emitter::unsubscribe`](crate::Emitter::unsubscribe)
/// matches callbacks by identity, so keep a clone around to remove it later.
#[derive(Clone)]
pub enum Callback {
    Blocking(Arc<BlockingFn>),
    Suspending(Arc<SuspendingFn>),
}

impl Callback {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&mut Event) -> ObserverResult + Send + Sync + 'static,
    {
        Callback::Blocking(Arc::new(f))
    }

    /// Wrap a callback returning a boxed future borrowing the event.
    ///
    /// ```rust
    /// use spindle_events::Callback;
    ///
    /// let callback = Callback::suspending(|event| {
    ///     Box::pin(async move {
    ///         event.set("seen", true.into());
    ///         Ok(None)
    ///     })
    /// });
    /// assert!(callback.is_suspending());
    /// ```
    pub fn suspending<F>(f: F) -> Self
    where
        F: for<'a> Fn(&'a mut Event) -> BoxFuture<'a, ObserverResult> + Send + Sync + 'static,
    {
        Callback::Suspending(Arc::new(f))
    }

    pub fn is_suspending(&self) -> bool {
        matches!(self, Callback::Suspending(_))
    }

    /// Identity comparison: true only for clones of the same callback.
    pub fn same_as(&self, other: &Callback) -> bool {
        match (self, other) {
            (Callback::Blocking(a), Callback::Blocking(b)) => Arc::ptr_eq(a, b),
            (Callback::Suspending(a), Callback::Suspending(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Debug for Callback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Callback::Blocking(_) => f.write_str("Callback::Blocking"),
            Callback::Suspending(_) => f.write_str("Callback::Suspending"),
        }
    }
}

/// A callback registered for one event name.
pub struct Observer {
    id: ObserverId,
    callback: Callback,
    priority: Priority,
    once: bool,
    executed: AtomicBool,
}

impl Observer {
    pub(crate) fn new(id: ObserverId, callback: Callback, priority: Priority, once: bool) -> Self {
        Self {
            id,
            callback,
            priority,
            once,
            executed: AtomicBool::new(false),
        }
    }

    pub fn id(&self) -> ObserverId {
        self.id
    }

    pub fn callback(&self) -> &Callback {
        &self.callback
    }

    pub fn priority(&self) -> Priority {
        self.priority
    }

    pub fn is_once(&self) -> bool {
        self.once
    }

    pub fn is_suspending(&self) -> bool {
        self.callback.is_suspending()
    }

    /// True once the callback has completed successfully at least once.
    pub fn is_executed(&self) -> bool {
        self.executed.load(Ordering::Acquire)
    }

    pub(crate) fn mark_executed(&self) {
        self.executed.store(true, Ordering::Release);
    }

    /// Run the callback, awaiting it if it suspends.
    pub(crate) async fn execute_async(&self, event: &mut Event) -> ObserverResult {
        match &self.callback {
            Callback::Blocking(f) => f(event),
            Callback::Suspending(f) => f(event).await,
        }
    }
}

impl fmt::Debug for Observer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Observer")
            .field("id", &self.id)
            .field("priority", &self.priority)
            .field("once", &self.once)
            .field("executed", &self.is_executed())
            .field("suspending", &self.is_suspending())
            .finish()
    }
}
