//! Kernel: lifecycle events around a middleware pipeline
//!
//! A [`Kernel`] owns an [`Application`], a [`Pipeline`] and an [`Emitter`].
//! Each [`run`](Kernel::run) goes through the same states:
//!
//! ```text
//! Idle ─► StartupEmitted ─► Piped ─► PipelineHandled ─► ShutdownEmitted ─► Returned
//! ```
//!
//! [`terminate`](Kernel::terminate) can be called at any point and is
//! final. On construction the application's wireable annotations are wired
//! with the kernel as their event subject, so `Observer` methods on the
//! application fire on the kernel's lifecycle events.

use crate::annotation::{Annotated, AnnotationRegistry, Reader, WireTarget, wire_annotations};
use crate::config::KernelConfig;
use crate::error::{Error, Result};
use crate::logging::{debug, info};
use crate::middleware::{Middleware, Next};
use crate::pipeline::Pipeline;
use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use spindle_events::{Emitter, Event, EventSubject};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Lifecycle event keys
pub mod events {
    /// Emitted before the pipeline runs, with the input and output attached
    pub const STARTUP: &str = "kernel.startup";
    /// Emitted after the pipeline unwinds, with the output attached
    pub const SHUTDOWN: &str = "kernel.shutdown";
    /// Emitted by [`Kernel::terminate`](super::Kernel::terminate)
    pub const TERMINATE: &str = "kernel.terminate";
}

/// Business logic run at the center of the pipeline.
///
/// The application is always the innermost stage and has nothing after it,
/// so it receives no `next`.
///
/// ```rust
/// use spindle_core::{annotated, Application, Error};
/// use async_trait::async_trait;
///
/// struct Echo;
///
/// #[annotated]
/// impl Echo {}
///
/// #[async_trait]
/// impl Application<String, String> for Echo {
///     async fn handle(&self, input: String, _output: String) -> Result<String, Error> {
///         Ok(input)
///     }
/// }
/// ```
#[async_trait]
pub trait Application<I, O>: Annotated
where
    I: Send + 'static,
    O: Send + 'static,
{
    async fn handle(&self, input: I, output: O) -> Result<O>;
}

/// Input attached to `kernel.startup`. Observers may replace it.
#[derive(Debug, Clone, PartialEq)]
pub struct KernelInput<I>(pub I);

/// Output attached to `kernel.startup` and `kernel.shutdown`. Observers may
/// replace it.
#[derive(Debug, Clone, PartialEq)]
pub struct KernelOutput<O>(pub O);

/// Where a kernel is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KernelState {
    Idle,
    StartupEmitted,
    Piped,
    PipelineHandled,
    ShutdownEmitted,
    Returned,
    Terminated,
}

impl KernelState {
    pub fn as_str(&self) -> &'static str {
        match self {
            KernelState::Idle => "idle",
            KernelState::StartupEmitted => "startup_emitted",
            KernelState::Piped => "piped",
            KernelState::PipelineHandled => "pipeline_handled",
            KernelState::ShutdownEmitted => "shutdown_emitted",
            KernelState::Returned => "returned",
            KernelState::Terminated => "terminated",
        }
    }
}

impl std::fmt::Display for KernelState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Terminal pipeline stage handing control to the application.
struct ApplicationTerminal<A> {
    app: Arc<A>,
}

#[async_trait]
impl<A, I, O> Middleware<I, O> for ApplicationTerminal<A>
where
    A: Application<I, O>,
    I: Send + 'static,
    O: Send + 'static,
{
    async fn process(&self, input: I, output: O, _next: Next<I, O>) -> Result<O> {
        self.app.handle(input, output).await
    }
}

/// Runs an [`Application`] inside a pipeline and emits lifecycle events
/// around it.
pub struct Kernel<A, I, O>
where
    A: Application<I, O>,
    I: Clone + Send + Sync + 'static,
    O: Clone + Send + Sync + 'static,
{
    app: Arc<A>,
    pipeline: RwLock<Pipeline<I, O>>,
    emitter: Emitter,
    reader: Reader,
    config: KernelConfig,
    started: Instant,
    state: Mutex<KernelState>,
    input: Mutex<Option<I>>,
    output: Mutex<Option<O>>,
}

impl<A, I, O> Kernel<A, I, O>
where
    A: Application<I, O>,
    I: Clone + Send + Sync + 'static,
    O: Clone + Send + Sync + 'static,
{
    /// Create a kernel with the default configuration.
    pub fn new(app: impl Into<Arc<A>>, registry: Arc<AnnotationRegistry>) -> Result<Self> {
        Self::with_config(app, registry, KernelConfig::default())
    }

    /// Create a kernel and wire the application's annotations into it.
    ///
    /// Fails if an annotation declared on the application cannot be
    /// materialized or wired.
    pub fn with_config(app: impl Into<Arc<A>>, registry: Arc<AnnotationRegistry>, config: KernelConfig) -> Result<Self> {
        let kernel = Self {
            app: app.into(),
            pipeline: RwLock::new(Pipeline::new()),
            emitter: Emitter::with_config(config.emitter.clone()),
            reader: Reader::new::<A>(registry),
            config,
            started: Instant::now(),
            state: Mutex::new(KernelState::Idle),
            input: Mutex::new(None),
            output: Mutex::new(None),
        };

        let wired = {
            let target = WireTarget::new(&kernel.app).with_subject(&kernel);
            wire_annotations(&kernel.reader, &target)?
        };
        debug!(application = kernel.reader.type_name(), wired, "Kernel created");

        Ok(kernel)
    }

    /// Append a middleware to the kernel's pipeline.
    ///
    /// Takes effect from the next [`run`](Kernel::run).
    pub fn through<M: Middleware<I, O> + 'static>(&self, middleware: M) -> &Self {
        self.pipeline.write().through(middleware);
        self
    }

    /// Append a shared middleware to the kernel's pipeline.
    pub fn through_arc(&self, middleware: Arc<dyn Middleware<I, O>>) -> &Self {
        self.pipeline.write().through_arc(middleware);
        self
    }

    /// Run the application through the pipeline.
    ///
    /// Emits `kernel.startup` before any middleware and `kernel.shutdown`
    /// after the pipeline has fully unwound. Errors from observers,
    /// middleware or the application propagate unchanged; a failed pipeline
    /// never emits `kernel.shutdown`.
    pub async fn run(&self, input: I, output: O) -> Result<O> {
        if self.is_terminated() {
            return Err(Error::Terminated);
        }
        self.transition(KernelState::Idle);
        *self.input.lock() = Some(input.clone());
        *self.output.lock() = Some(output.clone());

        let startup = Event::new(events::STARTUP)
            .with_extension(KernelInput(input))
            .with_extension(KernelOutput(output));
        let mut startup = self.emitter.dispatch_async(startup).await?;
        let KernelInput(input) = take_extension::<KernelInput<I>>(&mut startup)?;
        let KernelOutput(output) = take_extension::<KernelOutput<O>>(&mut startup)?;
        *self.input.lock() = Some(input.clone());
        self.transition(KernelState::StartupEmitted);

        let mut pipeline = self.pipeline.read().clone();
        pipeline.through(ApplicationTerminal {
            app: Arc::clone(&self.app),
        });
        self.transition(KernelState::Piped);

        let output = pipeline.handle(input, output).await?;
        *self.output.lock() = Some(output.clone());
        self.transition(KernelState::PipelineHandled);

        let shutdown = Event::new(events::SHUTDOWN).with_extension(KernelOutput(output));
        let mut shutdown = self.emitter.dispatch_async(shutdown).await?;
        let KernelOutput(output) = take_extension::<KernelOutput<O>>(&mut shutdown)?;
        *self.output.lock() = Some(output.clone());
        self.transition(KernelState::ShutdownEmitted);

        self.transition(KernelState::Returned);
        Ok(output)
    }

    /// Emit `kernel.terminate` and stop the kernel.
    ///
    /// With [`KernelConfig::exit_on_terminate`] set (the default) the
    /// process then exits with code 0 and this never returns.
    pub async fn terminate(&self) -> Result<()> {
        if self.is_terminated() {
            return Err(Error::Terminated);
        }

        self.emitter.dispatch_async(Event::new(events::TERMINATE)).await?;
        self.transition(KernelState::Terminated);

        if self.config.exit_on_terminate {
            info!(execution_secs = self.execution_secs(), "Kernel terminated, exiting");
            std::process::exit(0);
        }
        Ok(())
    }

    pub fn state(&self) -> KernelState {
        *self.state.lock()
    }

    pub fn is_terminated(&self) -> bool {
        self.state() == KernelState::Terminated
    }

    /// Input of the most recent run, as seen by the pipeline.
    pub fn last_input(&self) -> Option<I> {
        self.input.lock().clone()
    }

    /// Output of the most recent run at its latest completed stage.
    pub fn last_output(&self) -> Option<O> {
        self.output.lock().clone()
    }

    pub fn app(&self) -> &Arc<A> {
        &self.app
    }

    /// Annotation reader for the application type.
    pub fn reader(&self) -> &Reader {
        &self.reader
    }

    pub fn config(&self) -> &KernelConfig {
        &self.config
    }

    /// Wall-clock time since the kernel was created.
    pub fn execution_time(&self) -> Duration {
        self.started.elapsed()
    }

    pub fn execution_secs(&self) -> f64 {
        self.execution_time().as_secs_f64()
    }

    fn transition(&self, next: KernelState) {
        let mut state = self.state.lock();
        if *state == KernelState::Terminated {
            return;
        }
        *state = next;
        drop(state);

        if self.config.log_lifecycle {
            info!(state = %next, "Kernel state changed");
        } else {
            debug!(state = %next, "Kernel state changed");
        }
    }
}

impl<A, I, O> EventSubject for Kernel<A, I, O>
where
    A: Application<I, O>,
    I: Clone + Send + Sync + 'static,
    O: Clone + Send + Sync + 'static,
{
    fn emitter(&self) -> &Emitter {
        &self.emitter
    }
}

impl<A, I, O> std::fmt::Debug for Kernel<A, I, O>
where
    A: Application<I, O>,
    I: Clone + Send + Sync + 'static,
    O: Clone + Send + Sync + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Kernel")
            .field("application", &self.reader.type_name())
            .field("state", &self.state())
            .field("middlewares", &self.pipeline.read().len())
            .finish()
    }
}

fn take_extension<T: Send + Sync + 'static>(event: &mut Event) -> Result<T> {
    event.extensions_mut().remove::<T>().ok_or_else(|| {
        Error::Lifecycle(format!(
            "an observer of '{}' removed {}",
            event.key(),
            std::any::type_name::<T>()
        ))
    })
}
