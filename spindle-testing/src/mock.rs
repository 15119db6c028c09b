// Recording doubles for pipelines

use async_trait::async_trait;
use parking_lot::Mutex;
use spindle_core::{Error, Middleware, Next};
use std::sync::Arc;

/// Shared, ordered log of calls.
///
/// Clones share the same entries, so one log can be handed to several
/// middleware, observers and applications to capture their interleaving.
#[derive(Clone, Default)]
pub struct CallLog {
    entries: Arc<Mutex<Vec<String>>>,
}

impl CallLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, entry: impl Into<String>) {
        self.entries.lock().push(entry.into());
    }

    /// Copy of the entries in call order.
    pub fn entries(&self) -> Vec<String> {
        self.entries.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    pub fn contains(&self, entry: &str) -> bool {
        self.entries.lock().iter().any(|e| e == entry)
    }

    /// How many times `entry` was recorded.
    pub fn count(&self, entry: &str) -> usize {
        self.entries.lock().iter().filter(|e| *e == entry).count()
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }
}

impl std::fmt::Debug for CallLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.entries.lock().iter()).finish()
    }
}

/// Records `enter:<name>` before calling `next` and `exit:<name>` after.
pub struct RecordingMiddleware {
    name: String,
    log: CallLog,
}

impl RecordingMiddleware {
    pub fn new(name: impl Into<String>, log: &CallLog) -> Self {
        Self {
            name: name.into(),
            log: log.clone(),
        }
    }
}

#[async_trait]
impl<I, O> Middleware<I, O> for RecordingMiddleware
where
    I: Send + 'static,
    O: Send + 'static,
{
    async fn process(&self, input: I, output: O, next: Next<I, O>) -> Result<O, Error> {
        self.log.record(format!("enter:{}", self.name));
        let output = next(input, output).await?;
        self.log.record(format!("exit:{}", self.name));
        Ok(output)
    }
}

/// Records `enter:<name>` and returns the output without calling `next`.
pub struct ShortCircuitMiddleware {
    name: String,
    log: CallLog,
}

impl ShortCircuitMiddleware {
    pub fn new(name: impl Into<String>, log: &CallLog) -> Self {
        Self {
            name: name.into(),
            log: log.clone(),
        }
    }
}

#[async_trait]
impl<I, O> Middleware<I, O> for ShortCircuitMiddleware
where
    I: Send + 'static,
    O: Send + 'static,
{
    async fn process(&self, _input: I, output: O, _next: Next<I, O>) -> Result<O, Error> {
        self.log.record(format!("enter:{}", self.name));
        Ok(output)
    }
}

/// Records `enter:<name>` and fails with [`Error::Middleware`].
pub struct FailingMiddleware {
    name: String,
    log: CallLog,
}

impl FailingMiddleware {
    pub fn new(name: impl Into<String>, log: &CallLog) -> Self {
        Self {
            name: name.into(),
            log: log.clone(),
        }
    }
}

#[async_trait]
impl<I, O> Middleware<I, O> for FailingMiddleware
where
    I: Send + 'static,
    O: Send + 'static,
{
    async fn process(&self, _input: I, _output: O, _next: Next<I, O>) -> Result<O, Error> {
        self.log.record(format!("enter:{}", self.name));
        Err(Error::middleware(format!("{} failed", self.name)))
    }
}
