//! Application configuration structures.

use foo_core::TelemetryConfig;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Application name and metadata.
    #[serde(default)]
    pub app: AppMetadata,

    /// Job worker settings.
    #[serde(default)]
    pub worker: WorkerSettings,

    /// Demo producer settings.
    #[serde(default)]
    pub producer: ProducerSettings,

    /// Demo consumer settings.
    #[serde(default)]
    pub consumer: ConsumerSettings,

    /// Logging and tracing.
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

/// Application metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppMetadata {
    /// Application name.
    pub name: String,
    /// Application version.
    pub version: String,
    /// Environment (development, staging, production).
    pub environment: String,
}

impl Default for AppMetadata {
    fn default() -> Self {
        Self {
            name: "foosvc".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            environment: "development".to_string(),
        }
    }
}

/// Job worker settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerSettings {
    /// Bounded queue capacity. Zero selects the worker default.
    pub queue_size: usize,
    /// Stop the worker when the listener reports an error after startup.
    pub shutdown_on_listener_error: bool,
}

impl Default for WorkerSettings {
    fn default() -> Self {
        Self {
            queue_size: 10,
            shutdown_on_listener_error: false,
        }
    }
}

/// Fake producer settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProducerSettings {
    /// Milliseconds between produced jobs.
    pub interval_ms: u64,
    /// Topic the produced jobs carry.
    pub topic: String,
}

impl Default for ProducerSettings {
    fn default() -> Self {
        Self {
            interval_ms: 1000,
            topic: "demo".to_string(),
        }
    }
}

impl ProducerSettings {
    /// Production interval as a [`Duration`].
    #[must_use]
    pub const fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

/// Fake consumer settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsumerSettings {
    /// Base processing latency in milliseconds.
    pub latency_ms: u64,
    /// Upper bound of the random jitter added to each job, in milliseconds.
    pub max_jitter_ms: u64,
}

impl Default for ConsumerSettings {
    fn default() -> Self {
        Self {
            latency_ms: 2000,
            max_jitter_ms: 3000,
        }
    }
}

impl ConsumerSettings {
    /// Base latency as a [`Duration`].
    #[must_use]
    pub const fn latency(&self) -> Duration {
        Duration::from_millis(self.latency_ms)
    }

    /// Maximum jitter as a [`Duration`].
    #[must_use]
    pub const fn max_jitter(&self) -> Duration {
        Duration::from_millis(self.max_jitter_ms)
    }
}
