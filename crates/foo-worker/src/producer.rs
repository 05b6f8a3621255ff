//! Fake job producer used for local runs and demos.

use crate::error::ListenerError;
use crate::job::Job;
use crate::listener::{JobSink, Listener, StopSignal};
use async_trait::async_trait;
use foo_config::ProducerSettings;
use parking_lot::Mutex;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, info_span, warn, Instrument};

/// Listener that emits a `{"faker": n}` job on a fixed interval.
pub struct FakeProducer {
    interval: Duration,
    topic: String,
    task: Mutex<Option<JoinHandle<u64>>>,
}

impl FakeProducer {
    /// Creates a producer emitting jobs for `topic` every `interval`.
    pub fn new(interval: Duration, topic: impl Into<String>) -> Self {
        Self {
            interval,
            topic: topic.into(),
            task: Mutex::new(None),
        }
    }

    /// Creates a producer from application settings.
    pub fn from_settings(settings: &ProducerSettings) -> Self {
        Self::new(settings.interval(), settings.topic.clone())
    }
}

#[async_trait]
impl Listener for FakeProducer {
    async fn listen(
        &self,
        topics: Vec<String>,
        sink: JobSink,
        stop: StopSignal,
    ) -> Result<(), ListenerError> {
        if self.interval.is_zero() {
            return Err(ListenerError::Subscribe(
                "producer interval must be greater than zero".to_string(),
            ));
        }
        if !topics.contains(&self.topic) {
            warn!(topic = %self.topic, ?topics, "Fake producer topic has no handler; jobs will be dropped");
        }
        info!(?topics, "Fake producer subscribed");

        let interval = self.interval;
        let topic = self.topic.clone();
        let task = tokio::spawn(
            async move {
                let mut ticker = tokio::time::interval(interval);
                let mut produced: u64 = 0;
                loop {
                    tokio::select! {
                        biased;
                        _ = stop.stopped() => break,
                        _ = ticker.tick() => {}
                    }

                    let seq = produced + 1;
                    let job = Job::new(topic.clone(), format!(r#"{{"faker": {seq}}}"#))
                        .with_done(move || async move {
                            info!(seq, "Fake job done");
                            Ok(())
                        });

                    tokio::select! {
                        biased;
                        _ = stop.stopped() => break,
                        sent = sink.send(job) => match sent {
                            Ok(()) => {
                                produced = seq;
                                debug!(seq, "Fake produced job");
                            }
                            Err(e) => {
                                warn!(error = %e, "Fake producer cannot enqueue, stopping");
                                break;
                            }
                        },
                    }
                }
                info!(produced, "Fake producer stopped");
                produced
            }
            .instrument(info_span!("fake_producer")),
        );

        if let Some(previous) = self.task.lock().replace(task) {
            previous.abort();
        }
        Ok(())
    }

    async fn close(&self) -> Result<(), ListenerError> {
        let task = self.task.lock().take();
        if let Some(task) = task {
            let produced = task
                .await
                .map_err(|e| ListenerError::Close(e.to_string()))?;
            info!(produced, "Fake producer closed");
        } else {
            info!("Fake producer closed before listening");
        }
        Ok(())
    }
}
