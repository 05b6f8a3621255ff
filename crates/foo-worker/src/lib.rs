//! Foo Worker - topic-routed job processing
//!
//! A single-consumer work queue fed by an external [`Listener`]:
//! - Bounded FIFO queue with producer backpressure
//! - Topic router with one [`JobHandler`] per topic
//! - Ordered [`Middleware`] chain composed once per run
//! - Cooperative cancellation through [`JobContext`]
//! - Graceful stop that finishes the in-flight job
//!
//! # Architecture
//!
//! ```text
//!   Listener ──send──▶ [ bounded queue ] ──recv──▶ worker loop
//!      ▲                                               │
//!      │ stop signal                      route by topic
//!      │                                               ▼
//!   Worker::stop ◀──── ack ──────  middleware(handler) ──▶ Job::done
//! ```
//!
//! Jobs whose topic has no handler are dropped. A handler error abandons
//! the job without calling its completion callback; nothing is retried.

pub mod config;
pub mod error;
pub mod fighters;
pub mod handler;
pub mod job;
pub mod listener;
pub mod metrics;
pub mod middleware;
pub mod producer;
pub mod worker;

pub use config::{ListenerFailurePolicy, WorkerConfig, DEFAULT_QUEUE_SIZE};
pub use error::{JobError, JobResult, ListenerError, WorkerError, WorkerResult};
pub use fighters::fake_fighter_consumer;
pub use handler::{handler_fn, JobHandler};
pub use job::{DoneFn, Job, JobContext};
pub use listener::{JobSink, Listener, StopSignal};
pub use metrics::register_metrics;
pub use middleware::{
    compose, logging_middleware, metrics_middleware, middleware_fn, tracing_middleware, Middleware,
};
pub use producer::FakeProducer;
pub use worker::{Worker, WorkerState};
