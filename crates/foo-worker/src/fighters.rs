//! Demo consumer for fighter jobs.

use crate::error::JobError;
use crate::handler::{handler_fn, JobHandler};
use crate::job::{Job, JobContext};
use rand::Rng;
use std::time::Duration;
use tracing::info;

/// Handler that logs the job and sleeps to emulate processing latency.
///
/// Each call waits `latency` plus a random jitter below `max_jitter`, and
/// gives up with [`JobError::Cancelled`] if its context is cancelled first.
pub fn fake_fighter_consumer(latency: Duration, max_jitter: Duration) -> JobHandler {
    handler_fn(move |ctx: JobContext, job: Job| async move {
        info!(job = %job.payload_lossy(), "Fake fighter consumer received");

        let jitter = if max_jitter.is_zero() {
            Duration::ZERO
        } else {
            rand::thread_rng().gen_range(Duration::ZERO..max_jitter)
        };

        tokio::select! {
            _ = tokio::time::sleep(latency + jitter) => Ok(()),
            _ = ctx.cancelled() => Err(JobError::Cancelled),
        }
    })
}
