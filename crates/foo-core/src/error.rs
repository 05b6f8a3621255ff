//! Service-level error type.

use thiserror::Error;

/// Top-level error for the foo service.
///
/// Crate-specific errors (worker, config loading) convert into this type at
/// the application boundary.
#[derive(Error, Debug)]
pub enum FooError {
    /// Configuration could not be loaded or is invalid
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Logging or tracing could not be initialized
    #[error("Telemetry error: {0}")]
    Telemetry(String),

    /// Worker lifecycle failure
    #[error("Worker error: {0}")]
    Worker(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),

    /// Generic error wrapper
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl FooError {
    /// Returns a machine-readable error code.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::Configuration(_) => "CONFIGURATION_ERROR",
            Self::Telemetry(_) => "TELEMETRY_ERROR",
            Self::Worker(_) => "WORKER_ERROR",
            Self::Internal(_) | Self::Other(_) => "INTERNAL_ERROR",
        }
    }

    /// Creates a configuration error.
    #[must_use]
    pub fn configuration<T: Into<String>>(message: T) -> Self {
        Self::Configuration(message.into())
    }

    /// Creates an internal error.
    #[must_use]
    pub fn internal<T: Into<String>>(message: T) -> Self {
        Self::Internal(message.into())
    }
}
