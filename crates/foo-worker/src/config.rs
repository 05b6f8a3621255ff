//! Worker configuration.

use foo_config::WorkerSettings;
use serde::{Deserialize, Serialize};

/// Queue capacity used when none (or zero) is configured.
pub const DEFAULT_QUEUE_SIZE: usize = 10;

/// What the worker loop does when the listener reports an error after startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListenerFailurePolicy {
    /// Log the error and keep processing.
    #[default]
    Log,
    /// Log the error, stop the listener and exit the loop.
    Shutdown,
}

/// Worker configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// Capacity of the bounded job queue.
    #[serde(default = "default_queue_size")]
    pub queue_size: usize,

    /// Reaction to asynchronous listener failures.
    #[serde(default)]
    pub on_listener_error: ListenerFailurePolicy,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            queue_size: DEFAULT_QUEUE_SIZE,
            on_listener_error: ListenerFailurePolicy::default(),
        }
    }
}

fn default_queue_size() -> usize {
    DEFAULT_QUEUE_SIZE
}

impl WorkerConfig {
    /// Creates a config with the given queue size; zero means the default.
    #[must_use]
    pub fn with_queue_size(queue_size: usize) -> Self {
        Self {
            queue_size,
            ..Self::default()
        }
        .normalized()
    }

    /// Sets the listener failure policy.
    #[must_use]
    pub fn on_listener_error(mut self, policy: ListenerFailurePolicy) -> Self {
        self.on_listener_error = policy;
        self
    }

    /// Replaces a zero queue size with [`DEFAULT_QUEUE_SIZE`].
    #[must_use]
    pub fn normalized(mut self) -> Self {
        if self.queue_size == 0 {
            self.queue_size = DEFAULT_QUEUE_SIZE;
        }
        self
    }
}

impl From<&WorkerSettings> for WorkerConfig {
    fn from(settings: &WorkerSettings) -> Self {
        let policy = if settings.shutdown_on_listener_error {
            ListenerFailurePolicy::Shutdown
        } else {
            ListenerFailurePolicy::Log
        };
        Self::with_queue_size(settings.queue_size).on_listener_error(policy)
    }
}
