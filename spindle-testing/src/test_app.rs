// Test application and kernel builder

use crate::mock::CallLog;
use async_trait::async_trait;
use spindle_core::annotation::AnnotationRegistry;
use spindle_core::{Application, Error, Kernel, KernelConfig, Middleware, annotated};
use std::sync::Arc;

/// Application that records `kernel` and returns the output untouched.
#[derive(Clone, Default)]
pub struct RecordingApplication {
    log: CallLog,
}

impl RecordingApplication {
    pub fn new(log: &CallLog) -> Self {
        Self { log: log.clone() }
    }

    pub fn log(&self) -> &CallLog {
        &self.log
    }
}

#[annotated]
impl RecordingApplication {}

#[async_trait]
impl<I, O> Application<I, O> for RecordingApplication
where
    I: Send + 'static,
    O: Send + 'static,
{
    async fn handle(&self, _input: I, output: O) -> Result<O, Error> {
        self.log.record("kernel");
        Ok(output)
    }
}

/// Builds kernels for tests.
///
/// Kernels built here never exit the process on `terminate`.
///
/// ```rust
/// use spindle_testing::{CallLog, RecordingApplication, RecordingMiddleware, TestKernelBuilder};
///
/// # tokio_test::block_on(async {
/// let log = CallLog::new();
/// let kernel = TestKernelBuilder::<_, String, ()>::new(RecordingApplication::new(&log))
///     .through(RecordingMiddleware::new("auth", &log))
///     .build()
///     .unwrap();
///
/// kernel.run("ping".to_string(), ()).await.unwrap();
/// assert_eq!(log.entries(), ["enter:auth", "kernel", "exit:auth"]);
/// # });
/// ```
pub struct TestKernelBuilder<A, I, O>
where
    I: Send + 'static,
    O: Send + 'static,
{
    app: A,
    registry: Arc<AnnotationRegistry>,
    config: KernelConfig,
    middlewares: Vec<Arc<dyn Middleware<I, O>>>,
}

impl<A, I, O> TestKernelBuilder<A, I, O>
where
    A: Application<I, O>,
    I: Clone + Send + Sync + 'static,
    O: Clone + Send + Sync + 'static,
{
    pub fn new(app: A) -> Self {
        Self {
            app,
            registry: Arc::new(AnnotationRegistry::with_builtins()),
            config: KernelConfig::default().exit_on_terminate(false),
            middlewares: Vec::new(),
        }
    }

    /// Use a registry other than the built-ins.
    pub fn registry(mut self, registry: Arc<AnnotationRegistry>) -> Self {
        self.registry = registry;
        self
    }

    /// Use `config`, with `exit_on_terminate` forced off.
    pub fn config(mut self, config: KernelConfig) -> Self {
        self.config = config.exit_on_terminate(false);
        self
    }

    pub fn through<M: Middleware<I, O> + 'static>(mut self, middleware: M) -> Self {
        self.middlewares.push(Arc::new(middleware));
        self
    }

    pub fn build(self) -> Result<Kernel<A, I, O>, Error> {
        let kernel = Kernel::with_config(self.app, self.registry, self.config)?;
        for middleware in self.middlewares {
            kernel.through_arc(middleware);
        }
        Ok(kernel)
    }
}
