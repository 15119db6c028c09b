//! Onion-ordered middleware pipeline
//!
//! A pipeline runs its middleware in insertion order on the way in and in
//! reverse on the way out:
//!
//! ```text
//!  input ──► A ──► B ──► C ──┐
//!                            │ (end of chain: output returned unchanged)
//! output ◄── A ◄── B ◄── C ◄─┘
//! ```
//!
//! Any middleware may return without calling `next`; later middleware then
//! never run and the earlier ones unwind from that point.

use crate::error::Error;
use crate::logging::trace;
use crate::middleware::{Middleware, Next};
use futures_util::future::BoxFuture;
use std::sync::Arc;

/// Ordered middleware list over input `I` and output `O`.
///
/// Cloning is cheap and the clone is independent: adding middleware to one
/// copy never changes the other.
pub struct Pipeline<I, O>
where
    I: Send + 'static,
    O: Send + 'static,
{
    middlewares: Arc<Vec<Arc<dyn Middleware<I, O>>>>,
}

impl<I, O> Clone for Pipeline<I, O>
where
    I: Send + 'static,
    O: Send + 'static,
{
    fn clone(&self) -> Self {
        Self {
            middlewares: Arc::clone(&self.middlewares),
        }
    }
}

impl<I, O> Pipeline<I, O>
where
    I: Send + 'static,
    O: Send + 'static,
{
    pub fn new() -> Self {
        Self {
            middlewares: Arc::new(Vec::new()),
        }
    }

    /// Append a middleware.
    pub fn through<M: Middleware<I, O> + 'static>(&mut self, middleware: M) -> &mut Self {
        self.through_arc(Arc::new(middleware))
    }

    /// Append a shared middleware.
    pub fn through_arc(&mut self, middleware: Arc<dyn Middleware<I, O>>) -> &mut Self {
        Arc::make_mut(&mut self.middlewares).push(middleware);
        self
    }

    pub fn len(&self) -> usize {
        self.middlewares.len()
    }

    pub fn is_empty(&self) -> bool {
        self.middlewares.is_empty()
    }

    /// Run the pipeline.
    pub async fn handle(&self, input: I, output: O) -> Result<O, Error> {
        trace!(middleware_count = self.middlewares.len(), "Handling pipeline");
        self.execute_from(0, input, output).await
    }

    fn execute_from(&self, index: usize, input: I, output: O) -> BoxFuture<'static, Result<O, Error>> {
        match self.middlewares.get(index) {
            None => {
                trace!("Pipeline exhausted, returning output");
                Box::pin(async move { Ok(output) })
            }
            Some(middleware) => {
                let middleware = Arc::clone(middleware);
                let pipeline = self.clone();
                trace!(middleware_index = index, "Executing middleware");

                let next: Next<I, O> = Box::new(move |input, output| pipeline.execute_from(index + 1, input, output));
                Box::pin(async move { middleware.process(input, output, next).await })
            }
        }
    }
}

impl<I, O> Default for Pipeline<I, O>
where
    I: Send + 'static,
    O: Send + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<I, O> std::fmt::Debug for Pipeline<I, O>
where
    I: Send + 'static,
    O: Send + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("middlewares", &self.middlewares.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    /// Appends `>name` on the way in and `<name` on the way out.
    struct Mark(&'static str);

    #[async_trait]
    impl Middleware<String, Vec<String>> for Mark {
        async fn process(
            &self,
            input: String,
            mut output: Vec<String>,
            next: Next<String, Vec<String>>,
        ) -> Result<Vec<String>, Error> {
            output.push(format!(">{}", self.0));
            let mut output = next(input, output).await?;
            output.push(format!("<{}", self.0));
            Ok(output)
        }
    }

    /// Answers without calling `next`.
    struct Halt;

    #[async_trait]
    impl Middleware<String, Vec<String>> for Halt {
        async fn process(
            &self,
            input: String,
            mut output: Vec<String>,
            _next: Next<String, Vec<String>>,
        ) -> Result<Vec<String>, Error> {
            output.push(format!("halt:{}", input));
            Ok(output)
        }
    }

    struct Fail;

    #[async_trait]
    impl Middleware<String, Vec<String>> for Fail {
        async fn process(
            &self,
            _input: String,
            _output: Vec<String>,
            _next: Next<String, Vec<String>>,
        ) -> Result<Vec<String>, Error> {
            Err(Error::middleware("rejected"))
        }
    }

    #[tokio::test]
    async fn test_onion_order() {
        let mut pipeline: Pipeline<String, Vec<String>> = Pipeline::new();
        pipeline.through(Mark("a")).through(Mark("b")).through(Mark("c"));

        let output = pipeline.handle("req".to_string(), Vec::new()).await.unwrap();
        assert_eq!(output, [">a", ">b", ">c", "<c", "<b", "<a"]);
    }

    #[tokio::test]
    async fn test_short_circuit() {
        let mut pipeline: Pipeline<String, Vec<String>> = Pipeline::new();
        pipeline.through(Mark("a")).through(Halt).through(Mark("c"));

        let output = pipeline.handle("req".to_string(), Vec::new()).await.unwrap();
        assert_eq!(output, [">a", "halt:req", "<a"]);
    }

    #[tokio::test]
    async fn test_empty_pipeline_returns_output() {
        let pipeline: Pipeline<String, Vec<String>> = Pipeline::new();
        assert!(pipeline.is_empty());

        let output = pipeline.handle("req".to_string(), vec!["seed".to_string()]).await.unwrap();
        assert_eq!(output, ["seed"]);
    }

    #[tokio::test]
    async fn test_error_unwinds_without_outer_tail() {
        let mut pipeline: Pipeline<String, Vec<String>> = Pipeline::new();
        pipeline.through(Mark("a")).through(Fail);

        let err = pipeline.handle("req".to_string(), Vec::new()).await.unwrap_err();
        assert!(matches!(err, Error::Middleware(_)));
    }

    #[tokio::test]
    async fn test_clones_are_independent() {
        let mut base: Pipeline<String, Vec<String>> = Pipeline::new();
        base.through(Mark("a"));

        let mut extended = base.clone();
        extended.through(Mark("b"));

        assert_eq!(base.len(), 1);
        assert_eq!(extended.len(), 2);

        let output = base.handle("req".to_string(), Vec::new()).await.unwrap();
        assert_eq!(output, [">a", "<a"]);
    }
}
