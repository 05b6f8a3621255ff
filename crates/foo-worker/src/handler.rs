//! Job handler type.

use crate::error::JobResult;
use crate::job::{Job, JobContext};
use futures::future::BoxFuture;
use std::future::Future;
use std::sync::Arc;

/// Business logic for one topic.
///
/// Handlers are shared between the registration site and the worker loop,
/// so they are reference counted and must be `Send + Sync`.
pub type JobHandler =
    Arc<dyn Fn(JobContext, Job) -> BoxFuture<'static, JobResult<()>> + Send + Sync>;

/// Wraps an async closure into a [`JobHandler`].
///
/// # Example
///
/// ```rust
/// use foo_worker::{handler_fn, JobContext, Job};
///
/// let handler = handler_fn(|_ctx: JobContext, job: Job| async move {
///     tracing::info!(topic = %job.topic(), "handled");
///     Ok(())
/// });
/// # let _ = handler;
/// ```
pub fn handler_fn<F, Fut>(f: F) -> JobHandler
where
    F: Fn(JobContext, Job) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = JobResult<()>> + Send + 'static,
{
    Arc::new(move |ctx, job| -> BoxFuture<'static, JobResult<()>> { Box::pin(f(ctx, job)) })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::JobError;
    use tokio_util::sync::CancellationToken;

    #[tokio::test]
    async fn test_handler_fn_passes_job_through() {
        let handler = handler_fn(|ctx: JobContext, job: Job| async move {
            assert_eq!(ctx.topic, job.topic());
            if job.payload().is_empty() {
                Err(JobError::ExecutionFailed("empty payload".into()))
            } else {
                Ok(())
            }
        });

        let ctx = JobContext::new("demo", 1, CancellationToken::new());
        assert!(handler(ctx.clone(), Job::new("demo", "x")).await.is_ok());
        assert!(handler(ctx, Job::new("demo", "")).await.is_err());
    }
}
