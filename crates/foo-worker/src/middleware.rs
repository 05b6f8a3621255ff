//! Middleware chain for job handlers.
//!
//! A middleware takes the next handler and returns a handler that wraps it.
//! [`compose`] applies a list in registration order, so the first middleware
//! registered is the outermost one: `[m1, m2]` around `h` runs as
//! `m1(m2(h))`, and `m1` sees each call first and last. Wrapping the handler
//! once per registration (`h = m(h)`) would give the opposite nesting, with
//! the last middleware outermost; callers relying on that order must register
//! in reverse.

use crate::handler::{handler_fn, JobHandler};
use crate::metrics::JobMetrics;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{error, info, info_span, Instrument, Span};

/// Decorator producing a new handler around an existing one.
pub type Middleware = Arc<dyn Fn(JobHandler) -> JobHandler + Send + Sync>;

/// Wraps a closure into a [`Middleware`].
pub fn middleware_fn<F>(f: F) -> Middleware
where
    F: Fn(JobHandler) -> JobHandler + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Applies `middlewares` around `handler`, first entry outermost.
pub fn compose(handler: JobHandler, middlewares: &[Middleware]) -> JobHandler {
    middlewares
        .iter()
        .rev()
        .fold(handler, |next, middleware| middleware(next))
}

/// Logs receipt, failure and duration of every job.
pub fn logging_middleware() -> Middleware {
    middleware_fn(|next: JobHandler| {
        handler_fn(move |ctx, job| {
            let next = next.clone();
            async move {
                let start = Instant::now();
                let topic = job.topic().to_string();
                info!(topic = %topic, payload = %job.payload_lossy(), "Job received");

                if let Err(e) = next(ctx, job).await {
                    error!(topic = %topic, error = %e, "Job handler failed");
                    return Err(e);
                }

                info!(
                    topic = %topic,
                    duration_ms = millis(start.elapsed()),
                    "Job success"
                );
                Ok(())
            }
        })
    })
}

/// Whole milliseconds in `duration`, saturating at `u64::MAX`.
fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// Runs every job inside a `job` span carrying its topic and payload.
///
/// Failures mark the span with `otel.status_code = "ERROR"` so the
/// OpenTelemetry layer exports them as errored spans.
pub fn tracing_middleware() -> Middleware {
    middleware_fn(|next: JobHandler| {
        handler_fn(move |ctx, job| {
            let span = info_span!(
                "job",
                topic = %job.topic(),
                payload = %job.payload_lossy(),
                otel.status_code = tracing::field::Empty,
                error = tracing::field::Empty,
            );
            let next = next.clone();
            async move {
                let result = next(ctx, job).await;
                if let Err(e) = &result {
                    let span = Span::current();
                    span.record("otel.status_code", "ERROR");
                    span.record("error", tracing::field::display(e));
                }
                result
            }
            .instrument(span)
        })
    })
}

/// Records handled-job counters and duration histograms per topic.
pub fn metrics_middleware() -> Middleware {
    middleware_fn(|next: JobHandler| {
        handler_fn(move |ctx, job| {
            let next = next.clone();
            async move {
                let start = Instant::now();
                let topic = job.topic().to_string();
                let result = next(ctx, job).await;
                match &result {
                    Ok(()) => JobMetrics::job_succeeded(&topic, start.elapsed()),
                    Err(e) => JobMetrics::job_failed(&topic, e.kind(), start.elapsed()),
                }
                result
            }
        })
    })
}
