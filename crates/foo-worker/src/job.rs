//! Job and execution context definitions.

use crate::error::JobResult;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use futures::future::BoxFuture;
use parking_lot::Mutex;
use std::borrow::Cow;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Completion callback invoked once a job has been handled successfully.
pub type DoneFn = Box<dyn FnOnce() -> BoxFuture<'static, JobResult<()>> + Send>;

/// A unit of work delivered by a listener.
///
/// Cloning a job is cheap; all clones share one completion callback, which
/// runs at most once and only when the worker has handled the job.
#[derive(Clone)]
pub struct Job {
    topic: String,
    payload: Bytes,
    done: Arc<Mutex<Option<DoneFn>>>,
}

impl Job {
    /// Creates a job without a completion callback.
    pub fn new(topic: impl Into<String>, payload: impl Into<Bytes>) -> Self {
        Self {
            topic: topic.into(),
            payload: payload.into(),
            done: Arc::new(Mutex::new(None)),
        }
    }

    /// Attaches the completion callback, replacing any previous one.
    #[must_use]
    pub fn with_done<F, Fut>(self, done: F) -> Self
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = JobResult<()>> + Send + 'static,
    {
        let callback: DoneFn =
            Box::new(move || -> BoxFuture<'static, JobResult<()>> { Box::pin(done()) });
        *self.done.lock() = Some(callback);
        self
    }

    /// Routing key.
    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Opaque payload.
    pub fn payload(&self) -> &Bytes {
        &self.payload
    }

    /// Payload rendered as text for logs and span attributes.
    pub fn payload_lossy(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.payload)
    }

    /// Runs the completion callback if it has not run yet.
    pub(crate) async fn complete(&self) -> JobResult<()> {
        let done = self.done.lock().take();
        match done {
            Some(done) => done().await,
            None => Ok(()),
        }
    }
}

impl fmt::Debug for Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Job")
            .field("topic", &self.topic)
            .field("payload", &self.payload_lossy())
            .field("has_done", &self.done.lock().is_some())
            .finish()
    }
}

/// Per-invocation context handed to job handlers.
///
/// Cancellation is cooperative: the worker never aborts a running handler,
/// it only cancels the token once the handler returned or the loop exited.
#[derive(Debug, Clone)]
pub struct JobContext {
    /// Topic the job was routed by.
    pub topic: String,

    /// 1-based position of the job in the current run's dequeue order.
    pub sequence: u64,

    /// When the worker took the job off the queue.
    pub received_at: DateTime<Utc>,

    cancel: CancellationToken,
}

impl JobContext {
    /// Creates a context bound to `cancel`.
    pub fn new(topic: impl Into<String>, sequence: u64, cancel: CancellationToken) -> Self {
        Self {
            topic: topic.into(),
            sequence,
            received_at: Utc::now(),
            cancel,
        }
    }

    /// Returns true once the context has been cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Resolves when the context is cancelled.
    pub async fn cancelled(&self) {
        self.cancel.cancelled().await;
    }

    /// The underlying cancellation token, for handlers that spawn sub-tasks.
    pub fn token(&self) -> &CancellationToken {
        &self.cancel
    }
}
