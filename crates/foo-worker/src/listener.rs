//! Listener contract: the producer side of the worker queue.

use crate::error::ListenerError;
use crate::job::Job;
use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio_util::sync::CancellationToken;
use tracing::warn;

/// Subscribes to an external source and feeds jobs into the worker queue.
///
/// `listen` must return promptly: long-running production belongs in a
/// task spawned by the implementation. Production has to stop once
/// `stop` fires, and must not block indefinitely past that point.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Listener: Send + Sync + 'static {
    /// Starts producing jobs for `topics` into `sink` until `stop` fires.
    ///
    /// An error here aborts worker startup.
    async fn listen(
        &self,
        topics: Vec<String>,
        sink: JobSink,
        stop: StopSignal,
    ) -> Result<(), ListenerError>;

    /// Releases the listener's resources. Called once the worker has stopped.
    async fn close(&self) -> Result<(), ListenerError> {
        Ok(())
    }
}

/// Producer handle to the worker's bounded queue.
///
/// Sending suspends while the queue is full; jobs are never dropped by the
/// sink itself.
#[derive(Debug, Clone)]
pub struct JobSink {
    queue: mpsc::Sender<Job>,
    errors: mpsc::UnboundedSender<ListenerError>,
}

impl JobSink {
    pub(crate) fn new(
        queue: mpsc::Sender<Job>,
        errors: mpsc::UnboundedSender<ListenerError>,
    ) -> Self {
        Self { queue, errors }
    }

    /// Enqueues a job, waiting for a free slot.
    pub async fn send(&self, job: Job) -> Result<(), ListenerError> {
        self.queue
            .send(job)
            .await
            .map_err(|_| ListenerError::QueueClosed)
    }

    /// Enqueues a job only if a slot is free right now.
    pub fn try_send(&self, job: Job) -> Result<(), TrySendError<Job>> {
        self.queue.try_send(job)
    }

    /// Fixed capacity of the queue.
    pub fn capacity(&self) -> usize {
        self.queue.max_capacity()
    }

    /// Slots currently free.
    pub fn available(&self) -> usize {
        self.queue.capacity()
    }

    /// Returns true once the worker has stopped consuming.
    pub fn is_closed(&self) -> bool {
        self.queue.is_closed()
    }

    /// Reports a failure that happened after `listen` returned.
    pub fn report(&self, err: ListenerError) {
        if let Err(mpsc::error::SendError(err)) = self.errors.send(err) {
            warn!(error = %err, "Listener error reported after worker stopped");
        }
    }
}

/// Signal telling a listener to stop producing. A fresh one is created on
/// every worker run.
#[derive(Debug, Clone, Default)]
pub struct StopSignal(CancellationToken);

impl StopSignal {
    pub(crate) fn new() -> Self {
        Self(CancellationToken::new())
    }

    pub(crate) fn trigger(&self) {
        self.0.cancel();
    }

    /// Returns true once the worker asked the listener to stop.
    pub fn is_stopped(&self) -> bool {
        self.0.is_cancelled()
    }

    /// Resolves when the worker asks the listener to stop.
    pub async fn stopped(&self) {
        self.0.cancelled().await;
    }
}
