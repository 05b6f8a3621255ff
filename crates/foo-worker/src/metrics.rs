//! Metrics recorded by the job middleware.
//!
//! The worker itself records nothing; these are only emitted when
//! [`metrics_middleware`](crate::metrics_middleware) is installed.

use metrics::{counter, describe_counter, describe_histogram, histogram};
use std::time::Duration;

/// Metric names.
pub mod names {
    /// Total jobs handled, labelled by topic and status.
    pub const JOBS_HANDLED_TOTAL: &str = "foo_jobs_handled_total";
    /// Handler duration in seconds, labelled by topic and status.
    pub const JOB_DURATION_SECONDS: &str = "foo_job_duration_seconds";
}

/// Register metric descriptions with the installed recorder.
pub fn register_metrics() {
    describe_counter!(
        names::JOBS_HANDLED_TOTAL,
        "Total number of jobs handled, by topic and outcome"
    );
    describe_histogram!(
        names::JOB_DURATION_SECONDS,
        "Job handler duration in seconds"
    );
}

/// Job metrics recorder.
#[derive(Clone)]
pub struct JobMetrics;

impl JobMetrics {
    /// Record a job that the handler accepted.
    pub fn job_succeeded(topic: &str, duration: Duration) {
        Self::record(topic, "success", duration);
    }

    /// Record a job that the handler rejected.
    pub fn job_failed(topic: &str, error_kind: &'static str, duration: Duration) {
        Self::record(topic, error_kind, duration);
    }

    fn record(topic: &str, status: &'static str, duration: Duration) {
        counter!(
            names::JOBS_HANDLED_TOTAL,
            "topic" => topic.to_string(),
            "status" => status
        )
        .increment(1);

        histogram!(
            names::JOB_DURATION_SECONDS,
            "topic" => topic.to_string(),
            "status" => status
        )
        .record(duration.as_secs_f64());
    }
}
