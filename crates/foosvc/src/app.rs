//! Application modes and worker wiring.

use foo_config::AppConfig;
use foo_core::FooError;
use foo_worker::{
    fake_fighter_consumer, logging_middleware, metrics_middleware, tracing_middleware,
    FakeProducer, Worker, WorkerConfig,
};
use std::fmt;
use std::str::FromStr;
use tracing::info;

/// What the process runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppMode {
    /// Demo job worker fed by the fake producer.
    Worker,
}

impl FromStr for AppMode {
    type Err = FooError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "worker" => Ok(Self::Worker),
            _ => Err(FooError::configuration(format!(
                "app mode not supported: {s}"
            ))),
        }
    }
}

impl fmt::Display for AppMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Worker => f.write_str("worker"),
        }
    }
}

/// Builds the demo worker: fake producer in, fake fighter consumer out.
///
/// Tracing is registered before logging so log lines carry the job span.
pub fn build_worker(config: &AppConfig) -> Worker<FakeProducer> {
    let producer = FakeProducer::from_settings(&config.producer);
    let mut worker = Worker::new(producer, WorkerConfig::from(&config.worker));

    worker.use_middleware([tracing_middleware(), logging_middleware(), metrics_middleware()]);
    worker.handle(
        config.producer.topic.clone(),
        fake_fighter_consumer(config.consumer.latency(), config.consumer.max_jitter()),
    );

    info!(
        topic = %config.producer.topic,
        queue_size = worker.queue_capacity(),
        "Worker configured"
    );
    worker
}
