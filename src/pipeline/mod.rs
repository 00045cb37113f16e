//! Minimal task-pipeline runtime.
//!
//! The full system expresses every request flow (startup, shutdown, the RTB
//! auction, billing events, user sync) as a `Pipeline<Context, Error>` built
//! from boxed `BlockingTask`/`AsyncTask` trait objects, via a sibling
//! `pipeline` crate. That crate isn't available here, so this module vendors
//! a compatible minimal implementation: same trait names, same builder API,
//! same "first error aborts the rest" semantics.

use async_trait::async_trait;
use std::fmt;

/// A task whose body is synchronous CPU-bound work. Run inline by the
/// pipeline (no executor handoff) — use for in-memory validation/transform
/// steps that never await.
pub trait BlockingTask<Ctx, E>: Send + Sync {
    fn run(&self, ctx: &Ctx) -> Result<(), E>;
}

/// A task whose body may await (network calls, channel sends, locks held
/// across await points).
#[async_trait]
pub trait AsyncTask<Ctx, E>: Send + Sync {
    async fn run(&self, ctx: &Ctx) -> Result<(), E>;
}

enum Stage<Ctx, E> {
    Blocking(Box<dyn BlockingTask<Ctx, E>>),
    Async(Box<dyn AsyncTask<Ctx, E>>),
}

/// An ordered sequence of stages run against a shared `Ctx`. Execution stops
/// at the first stage that returns `Err`; earlier stages' effects on `Ctx`
/// are not rolled back (tasks are expected to record partial state, e.g. a
/// no-bid reason, before returning their error).
pub struct Pipeline<Ctx, E> {
    stages: Vec<Stage<Ctx, E>>,
}

impl<Ctx, E> Pipeline<Ctx, E>
where
    Ctx: Sync,
{
    pub async fn run(&self, ctx: &Ctx) -> Result<(), E> {
        for stage in &self.stages {
            match stage {
                Stage::Blocking(task) => task.run(ctx)?,
                Stage::Async(task) => task.run(ctx).await?,
            }
        }

        Ok(())
    }
}

impl<Ctx, E> fmt::Debug for Pipeline<Ctx, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline").field("stages", &self.stages.len()).finish()
    }
}

#[derive(Default)]
pub struct PipelineBuilder<Ctx, E> {
    stages: Vec<Stage<Ctx, E>>,
}

impl<Ctx, E> PipelineBuilder<Ctx, E> {
    pub fn new() -> Self {
        Self { stages: Vec::new() }
    }

    pub fn with_blocking(mut self, task: Box<dyn BlockingTask<Ctx, E>>) -> Self {
        self.stages.push(Stage::Blocking(task));
        self
    }

    pub fn with_async(mut self, task: Box<dyn AsyncTask<Ctx, E>>) -> Self {
        self.stages.push(Stage::Async(task));
        self
    }

    pub fn add_async(&mut self, task: Box<dyn AsyncTask<Ctx, E>>) {
        self.stages.push(Stage::Async(task));
    }

    pub fn add_blocking(&mut self, task: Box<dyn BlockingTask<Ctx, E>>) {
        self.stages.push(Stage::Blocking(task));
    }

    /// `None` if no stages were ever added.
    pub fn build(self) -> Option<Pipeline<Ctx, E>> {
        if self.stages.is_empty() {
            None
        } else {
            Some(Pipeline { stages: self.stages })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Counter(AtomicUsize);

    struct Increment;
    impl BlockingTask<Counter, anyhow::Error> for Increment {
        fn run(&self, ctx: &Counter) -> Result<(), anyhow::Error> {
            ctx.0.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    struct Fail;
    #[async_trait]
    impl AsyncTask<Counter, anyhow::Error> for Fail {
        async fn run(&self, _ctx: &Counter) -> Result<(), anyhow::Error> {
            Err(anyhow::anyhow!("boom"))
        }
    }

    #[tokio::test]
    async fn runs_stages_in_order() {
        let ctx = Counter(AtomicUsize::new(0));
        let pipeline = PipelineBuilder::new()
            .with_blocking(Box::new(Increment))
            .with_blocking(Box::new(Increment))
            .build()
            .unwrap();

        pipeline.run(&ctx).await.unwrap();
        assert_eq!(ctx.0.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn aborts_remaining_stages_on_error() {
        let ctx = Counter(AtomicUsize::new(0));
        let pipeline = PipelineBuilder::new()
            .with_blocking(Box::new(Increment))
            .with_async(Box::new(Fail))
            .with_blocking(Box::new(Increment))
            .build()
            .unwrap();

        let res = pipeline.run(&ctx).await;
        assert!(res.is_err());
        assert_eq!(ctx.0.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn empty_builder_yields_no_pipeline() {
        let built: Option<Pipeline<Counter, anyhow::Error>> = PipelineBuilder::new().build();
        assert!(built.is_none());
    }
}
