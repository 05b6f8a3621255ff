//! Topic-routed job worker.

use crate::config::{ListenerFailurePolicy, WorkerConfig};
use crate::error::{JobResult, ListenerError, WorkerError, WorkerResult};
use crate::handler::{handler_fn, JobHandler};
use crate::job::{Job, JobContext};
use crate::listener::{JobSink, Listener, StopSignal};
use crate::middleware::{compose, Middleware};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, info_span, warn, Instrument};

/// Worker lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    /// Constructed; handlers and middleware may be registered.
    Created,
    /// The processing loop is running.
    Running,
    /// A stop was requested and is waiting for the loop to exit.
    Stopping,
    /// The loop has exited.
    Stopped,
}

impl WorkerState {
    /// Lowercase name used in logs and errors.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Running => "running",
            Self::Stopping => "stopping",
            Self::Stopped => "stopped",
        }
    }
}

impl fmt::Display for WorkerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Single-consumer worker that routes queued jobs to handlers by topic.
///
/// Register handlers with [`handle`](Self::handle) and middleware with
/// [`use_middleware`](Self::use_middleware), then call [`run`](Self::run).
/// The handler chains are composed once at `run`; registrations made after
/// that are ignored.
///
/// # Example
///
/// ```rust,ignore
/// let mut worker = Worker::new(listener, WorkerConfig::with_queue_size(10));
/// worker.use_middleware([tracing_middleware(), logging_middleware()]);
/// worker.handle_fn("demo", |_ctx, job| async move {
///     tracing::info!(payload = %job.payload_lossy(), "processing");
///     Ok(())
/// });
/// worker.run().await?;
/// // ...
/// worker.stop().await?;
/// ```
pub struct Worker<L: Listener> {
    config: WorkerConfig,
    listener: Arc<L>,
    queue_tx: mpsc::Sender<Job>,
    queue_rx: Option<mpsc::Receiver<Job>>,
    router: HashMap<String, JobHandler>,
    middlewares: Vec<Middleware>,
    state: Arc<RwLock<WorkerState>>,
    running: Option<RunHandle>,
}

/// Handles to a started processing loop.
struct RunHandle {
    quit: oneshot::Sender<()>,
    task: JoinHandle<WorkerResult<()>>,
    listener_stop: StopSignal,
}

impl<L: Listener> Worker<L> {
    /// Creates a worker whose queue capacity is fixed from `config`.
    pub fn new(listener: L, config: WorkerConfig) -> Self {
        Self::with_shared_listener(Arc::new(listener), config)
    }

    /// Creates a worker around a listener the caller keeps a handle to.
    pub fn with_shared_listener(listener: Arc<L>, config: WorkerConfig) -> Self {
        let config = config.normalized();
        let (queue_tx, queue_rx) = mpsc::channel(config.queue_size);

        info!(queue_size = config.queue_size, "Worker initialized");

        Self {
            config,
            listener,
            queue_tx,
            queue_rx: Some(queue_rx),
            router: HashMap::new(),
            middlewares: Vec::new(),
            state: Arc::new(RwLock::new(WorkerState::Created)),
            running: None,
        }
    }

    /// Routes jobs with `topic` to `handler`, replacing any previous handler.
    pub fn handle(&mut self, topic: impl Into<String>, handler: JobHandler) -> &mut Self {
        let topic = topic.into();
        if !self.accepts_registration("handler") {
            return self;
        }
        if topic.is_empty() {
            warn!("Ignoring handler registered for an empty topic");
            return self;
        }
        if self.router.insert(topic.clone(), handler).is_some() {
            debug!(topic = %topic, "Replaced job handler");
        }
        self
    }

    /// Routes jobs with `topic` to an async closure.
    pub fn handle_fn<F, Fut>(&mut self, topic: impl Into<String>, f: F) -> &mut Self
    where
        F: Fn(JobContext, Job) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = JobResult<()>> + Send + 'static,
    {
        self.handle(topic, handler_fn(f))
    }

    /// Appends middleware; the first registered runs outermost.
    pub fn use_middleware(&mut self, middlewares: impl IntoIterator<Item = Middleware>) -> &mut Self {
        if self.accepts_registration("middleware") {
            self.middlewares.extend(middlewares);
        }
        self
    }

    /// Starts the listener and the processing loop.
    ///
    /// Returns once both are running. If the listener fails to start, the
    /// error is returned and the worker stays in [`WorkerState::Created`].
    pub async fn run(&mut self) -> WorkerResult<()> {
        let current = self.state();
        if current != WorkerState::Created {
            return Err(WorkerError::InvalidState {
                expected: WorkerState::Created.as_str(),
                actual: current.as_str(),
            });
        }
        let Some(queue) = self.queue_rx.take() else {
            return Err(WorkerError::InvalidState {
                expected: WorkerState::Created.as_str(),
                actual: current.as_str(),
            });
        };

        let topics = self.topics();
        for topic in &topics {
            info!(topic = %topic, "Registered topic");
        }

        let stop = StopSignal::new();
        let (errors_tx, errors_rx) = mpsc::unbounded_channel();
        let sink = JobSink::new(self.queue_tx.clone(), errors_tx);

        if let Err(e) = self.listener.listen(topics, sink, stop.clone()).await {
            error!(error = %e, "Listener failed to start");
            self.queue_rx = Some(queue);
            return Err(WorkerError::ListenerStartup(e));
        }

        let routes: HashMap<String, JobHandler> = self
            .router
            .iter()
            .map(|(topic, handler)| (topic.clone(), compose(handler.clone(), &self.middlewares)))
            .collect();

        let (quit_tx, quit_rx) = oneshot::channel();
        let event_loop = EventLoop {
            routes,
            queue,
            quit: quit_rx,
            listener_errors: errors_rx,
            listener_stop: stop.clone(),
            policy: self.config.on_listener_error,
            state: self.state.clone(),
        };

        *self.state.write() = WorkerState::Running;
        let task = tokio::spawn(event_loop.run().instrument(info_span!("worker")));
        self.running = Some(RunHandle {
            quit: quit_tx,
            task,
            listener_stop: stop,
        });

        info!(
            queue_size = self.config.queue_size,
            middlewares = self.middlewares.len(),
            "Worker running"
        );
        Ok(())
    }

    /// Requests shutdown and waits for the loop to exit.
    ///
    /// The job in flight when the request arrives runs to completion; jobs
    /// still queued are dropped. Calling `stop` again after it returned is a
    /// no-op. The listener is closed once the loop has exited.
    pub async fn stop(&mut self) -> WorkerResult<()> {
        let Some(running) = self.running.take() else {
            return match self.state() {
                WorkerState::Created => Err(WorkerError::NotRunning),
                _ => Ok(()),
            };
        };

        info!("Stopping worker...");
        {
            let mut state = self.state.write();
            if *state == WorkerState::Running {
                *state = WorkerState::Stopping;
            }
        }

        // The loop may already have exited on its own.
        let _ = running.quit.send(());
        let outcome = match running.task.await {
            Ok(result) => result,
            Err(e) => {
                error!(error = %e, "Worker loop panicked");
                Err(WorkerError::Join(e.to_string()))
            }
        };
        // The loop only signals the listener when it exits normally.
        running.listener_stop.trigger();
        *self.state.write() = WorkerState::Stopped;

        let closed = self.listener.close().await.map_err(WorkerError::Listener);
        if let Err(e) = &closed {
            error!(error = %e, "Listener close failed");
        }

        info!("Worker stopped");
        outcome.and(closed)
    }

    /// Current lifecycle state.
    pub fn state(&self) -> WorkerState {
        *self.state.read()
    }

    /// Registered topics, sorted.
    pub fn topics(&self) -> Vec<String> {
        let mut topics: Vec<String> = self.router.keys().cloned().collect();
        topics.sort();
        topics
    }

    /// Fixed queue capacity.
    pub fn queue_capacity(&self) -> usize {
        self.config.queue_size
    }

    /// Worker configuration.
    pub fn config(&self) -> &WorkerConfig {
        &self.config
    }

    fn accepts_registration(&self, what: &'static str) -> bool {
        let state = self.state();
        if state == WorkerState::Created {
            return true;
        }
        warn!(state = %state, kind = what, "Ignoring registration after worker started");
        false
    }
}

impl<L: Listener> fmt::Debug for Worker<L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Worker")
            .field("state", &self.state())
            .field("queue_size", &self.config.queue_size)
            .field("topics", &self.topics())
            .field("middlewares", &self.middlewares.len())
            .finish()
    }
}

/// State owned by the background processing loop.
struct EventLoop {
    routes: HashMap<String, JobHandler>,
    queue: mpsc::Receiver<Job>,
    quit: oneshot::Receiver<()>,
    listener_errors: mpsc::UnboundedReceiver<ListenerError>,
    listener_stop: StopSignal,
    policy: ListenerFailurePolicy,
    state: Arc<RwLock<WorkerState>>,
}

impl EventLoop {
    async fn run(self) -> WorkerResult<()> {
        let EventLoop {
            routes,
            mut queue,
            mut quit,
            mut listener_errors,
            listener_stop,
            policy,
            state,
        } = self;

        let root = CancellationToken::new();
        let _cancel_jobs = root.clone().drop_guard();
        let mut sequence: u64 = 0;
        let mut errors_open = true;

        let result = loop {
            tokio::select! {
                biased;

                // Checked first so that once a quit is pending no further
                // job is started.
                _ = &mut quit => {
                    info!("Worker quitting...");
                    break Ok(());
                }

                reported = listener_errors.recv(), if errors_open => match reported {
                    Some(err) => {
                        error!(error = %err, policy = ?policy, "Listener reported an error");
                        if policy == ListenerFailurePolicy::Shutdown {
                            break Err(WorkerError::Listener(err));
                        }
                    }
                    None => errors_open = false,
                },

                job = queue.recv() => match job {
                    Some(job) => {
                        sequence += 1;
                        dispatch(&routes, &root, job, sequence).await;
                    }
                    None => {
                        info!("Job queue closed");
                        break Ok(());
                    }
                },
            }
        };

        listener_stop.trigger();
        root.cancel();
        *state.write() = WorkerState::Stopped;
        debug!(processed = sequence, "Worker loop exited");
        result
    }
}

/// Runs one job through its handler chain and completes it on success.
async fn dispatch(
    routes: &HashMap<String, JobHandler>,
    root: &CancellationToken,
    job: Job,
    sequence: u64,
) {
    let Some(handler) = routes.get(job.topic()) else {
        debug!(topic = %job.topic(), "Topic not handled, dropping job");
        return;
    };

    let token = root.child_token();
    let ctx = JobContext::new(job.topic(), sequence, token.clone());
    let result = handler(ctx, job.clone()).await;
    token.cancel();

    if let Err(e) = result {
        warn!(topic = %job.topic(), error = %e, "Job handler failed, job abandoned");
        return;
    }

    if let Err(e) = job.complete().await {
        error!(topic = %job.topic(), error = %e, "Job done callback failed");
    }
}
