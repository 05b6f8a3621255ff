//! Worker error types.

use thiserror::Error;

/// Result type for job handlers and completion callbacks.
pub type JobResult<T> = Result<T, JobError>;

/// Result type for worker lifecycle operations.
pub type WorkerResult<T> = Result<T, WorkerError>;

/// Errors produced while handling a single job.
///
/// These never cross the worker's public API: the loop logs them and
/// abandons the job.
#[derive(Debug, Error)]
pub enum JobError {
    /// The handler could not process the job.
    #[error("Job execution failed: {0}")]
    ExecutionFailed(String),

    /// The handler observed cancellation of its context.
    #[error("Job was cancelled")]
    Cancelled,

    /// The job's completion callback failed.
    #[error("Job completion failed: {0}")]
    Completion(String),

    /// Any other handler error.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl JobError {
    /// Short, stable label used for log fields and metric labels.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::ExecutionFailed(_) => "execution_failed",
            Self::Cancelled => "cancelled",
            Self::Completion(_) => "completion",
            Self::Other(_) => "other",
        }
    }
}

/// Errors raised by a job listener.
#[derive(Debug, Error)]
pub enum ListenerError {
    /// Subscribing to the external source failed.
    #[error("Listener subscribe failed: {0}")]
    Subscribe(String),

    /// Producing jobs failed after startup.
    #[error("Listener produce failed: {0}")]
    Produce(String),

    /// The worker queue is gone; nothing will consume further jobs.
    #[error("Job queue is closed")]
    QueueClosed,

    /// Releasing listener resources failed.
    #[error("Listener close failed: {0}")]
    Close(String),
}

/// Errors surfaced by [`Worker`](crate::Worker) lifecycle calls.
#[derive(Debug, Error)]
pub enum WorkerError {
    /// The listener failed to start; the worker stays in `Created`.
    #[error("Listener failed to start: {0}")]
    ListenerStartup(#[source] ListenerError),

    /// The listener failed while the worker was running, or on close.
    #[error("Listener error: {0}")]
    Listener(#[source] ListenerError),

    /// `stop` was called on a worker that was never started.
    #[error("Worker is not running")]
    NotRunning,

    /// The call is not valid in the worker's current state.
    #[error("Invalid worker state: expected {expected}, got {actual}")]
    InvalidState {
        expected: &'static str,
        actual: &'static str,
    },

    /// The processing loop terminated abnormally.
    #[error("Worker loop terminated abnormally: {0}")]
    Join(String),
}

impl From<WorkerError> for foo_core::FooError {
    fn from(err: WorkerError) -> Self {
        foo_core::FooError::Worker(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_error_kind() {
        assert_eq!(JobError::ExecutionFailed("x".into()).kind(), "execution_failed");
        assert_eq!(JobError::Cancelled.kind(), "cancelled");
        assert_eq!(JobError::Completion("ack".into()).kind(), "completion");
        assert_eq!(JobError::from(anyhow::anyhow!("boom")).kind(), "other");
    }

    #[test]
    fn test_other_is_transparent() {
        let err = JobError::from(anyhow::anyhow!("disk full"));
        assert_eq!(err.to_string(), "disk full");
    }

    #[test]
    fn test_listener_startup_keeps_source() {
        let err = WorkerError::ListenerStartup(ListenerError::Subscribe("no broker".into()));
        let msg = err.to_string();
        assert!(msg.contains("failed to start") && msg.contains("no broker"));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_error_display_invalid_state() {
        let err = WorkerError::InvalidState {
            expected: "created",
            actual: "running",
        };
        let msg = err.to_string();
        assert!(msg.contains("created") && msg.contains("running"));
    }

    #[test]
    fn test_into_foo_error() {
        let err: foo_core::FooError = WorkerError::NotRunning.into();
        match err {
            foo_core::FooError::Worker(msg) => assert!(msg.contains("not running")),
            other => panic!("Expected Worker error, got {other:?}"),
        }
    }
}
