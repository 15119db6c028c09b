// Middleware for the kernel pipeline

use crate::error::Error;
use crate::logging::{debug, trace};
use async_trait::async_trait;
use futures_util::future::BoxFuture;
use std::future::Future;
use std::time::Instant;
use tracing::Instrument;

/// The rest of the pipeline, handed to each middleware.
///
/// Calling it runs every later middleware and yields their output. Not
/// calling it short-circuits the pipeline.
pub type Next<I, O> = Box<dyn FnOnce(I, O) -> BoxFuture<'static, Result<O, Error>> + Send>;

/// A stage of a [`Pipeline`](crate::Pipeline).
///
/// Middleware receive the input, the output being built, and the
/// continuation. Work done before calling `next` happens on the way in,
/// work done after it on the way out.
///
/// ```rust
/// use spindle_core::{Error, Middleware, Next};
/// use async_trait::async_trait;
///
/// struct Uppercase;
///
/// #[async_trait]
/// impl Middleware<String, String> for Uppercase {
///     async fn process(&self, input: String, output: String, next: Next<String, String>) -> Result<String, Error> {
///         let output = next(input, output).await?;
///         Ok(output.to_uppercase())
///     }
/// }
/// ```
#[async_trait]
pub trait Middleware<I, O>: Send + Sync
where
    I: Send + 'static,
    O: Send + 'static,
{
    async fn process(&self, input: I, output: O, next: Next<I, O>) -> Result<O, Error>;
}

/// Middleware built from a closure.
///
/// ```rust
/// use spindle_core::{FnMiddleware, Next, Pipeline};
///
/// let mut pipeline: Pipeline<u32, Vec<u32>> = Pipeline::new();
/// pipeline.through(FnMiddleware::new(|input: u32, mut output: Vec<u32>, next: Next<u32, Vec<u32>>| {
///     output.push(input);
///     next(input, output)
/// }));
/// ```
pub struct FnMiddleware<F> {
    f: F,
}

impl<F> FnMiddleware<F> {
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

#[async_trait]
impl<I, O, F, Fut> Middleware<I, O> for FnMiddleware<F>
where
    I: Send + 'static,
    O: Send + 'static,
    F: Fn(I, O, Next<I, O>) -> Fut + Send + Sync,
    Fut: Future<Output = Result<O, Error>> + Send + 'static,
{
    async fn process(&self, input: I, output: O, next: Next<I, O>) -> Result<O, Error> {
        (self.f)(input, output, next).await
    }
}

/// Wraps the rest of the pipeline in a `tracing` span and logs its timing.
pub struct TracingMiddleware {
    name: String,
}

impl TracingMiddleware {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl Default for TracingMiddleware {
    fn default() -> Self {
        Self::new("pipeline")
    }
}

#[async_trait]
impl<I, O> Middleware<I, O> for TracingMiddleware
where
    I: Send + 'static,
    O: Send + 'static,
{
    async fn process(&self, input: I, output: O, next: Next<I, O>) -> Result<O, Error> {
        let span = tracing::info_span!("middleware", name = %self.name);
        let start = Instant::now();
        trace!(name = %self.name, "Entering pipeline stage");

        let result = next(input, output).instrument(span).await;

        let elapsed_us = start.elapsed().as_micros() as u64;
        match &result {
            Ok(_) => debug!(name = %self.name, elapsed_us, "Pipeline stage completed"),
            Err(e) => debug!(name = %self.name, elapsed_us, error = %e, "Pipeline stage failed"),
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity() -> Next<u8, Vec<u8>> {
        Box::new(|_: u8, output: Vec<u8>| -> BoxFuture<'static, Result<Vec<u8>, Error>> {
            Box::pin(async move { Ok(output) })
        })
    }

    #[tokio::test]
    async fn test_fn_middleware_calls_closure() {
        let middleware = FnMiddleware::new(|input: u8, mut output: Vec<u8>, next: Next<u8, Vec<u8>>| {
            output.push(input);
            next(input, output)
        });

        let output = middleware.process(7, Vec::new(), identity()).await.unwrap();
        assert_eq!(output, [7]);
    }

    #[tokio::test]
    async fn test_tracing_middleware_is_transparent() {
        let middleware = TracingMiddleware::new("test");
        let output = middleware.process(1, vec![9], identity()).await.unwrap();
        assert_eq!(output, [9]);
    }

    #[tokio::test]
    async fn test_tracing_middleware_passes_errors_through() {
        let middleware = TracingMiddleware::default();
        let failing: Next<u8, Vec<u8>> = Box::new(|_: u8, _: Vec<u8>| -> BoxFuture<'static, Result<Vec<u8>, Error>> {
            Box::pin(async { Err(Error::middleware("denied")) })
        });

        let err = middleware.process(1, Vec::new(), failing).await.unwrap_err();
        assert_eq!(err.to_string(), "Middleware error: denied");
    }
}
