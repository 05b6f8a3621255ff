//! Shared test infrastructure for worker integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use foo_worker::{Job, JobSink, Listener, ListenerError, StopSignal};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

/// Listener that hands its sink and stop signal to the test instead of
/// producing anything itself.
pub struct ChannelListener {
    connections: mpsc::UnboundedSender<(JobSink, StopSignal)>,
    closed: Arc<AtomicBool>,
}

/// Test-side end of a [`ChannelListener`].
pub struct ListenerProbe {
    connections: mpsc::UnboundedReceiver<(JobSink, StopSignal)>,
    closed: Arc<AtomicBool>,
}

impl ListenerProbe {
    /// Waits for the worker to start the listener.
    pub async fn connected(&mut self) -> (JobSink, StopSignal) {
        tokio::time::timeout(Duration::from_secs(2), self.connections.recv())
            .await
            .expect("listener was not started in time")
            .expect("listener dropped")
    }

    /// Returns true once the worker closed the listener.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

pub fn channel_listener() -> (ChannelListener, ListenerProbe) {
    let (tx, rx) = mpsc::unbounded_channel();
    let closed = Arc::new(AtomicBool::new(false));
    (
        ChannelListener {
            connections: tx,
            closed: closed.clone(),
        },
        ListenerProbe {
            connections: rx,
            closed,
        },
    )
}

#[async_trait]
impl Listener for ChannelListener {
    async fn listen(
        &self,
        _topics: Vec<String>,
        sink: JobSink,
        stop: StopSignal,
    ) -> Result<(), ListenerError> {
        self.connections
            .send((sink, stop))
            .map_err(|e| ListenerError::Subscribe(e.to_string()))
    }

    async fn close(&self) -> Result<(), ListenerError> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

/// Job whose completion callback increments `done`.
pub fn tracked_job(topic: &str, payload: &str, done: &Arc<AtomicU32>) -> Job {
    let done = done.clone();
    Job::new(topic.to_string(), payload.to_string()).with_done(move || async move {
        done.fetch_add(1, Ordering::SeqCst);
        Ok(())
    })
}

/// Polls `condition` until it holds or two seconds elapse.
pub async fn eventually(mut condition: impl FnMut() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    while tokio::time::Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    condition()
}
