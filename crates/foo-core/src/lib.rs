//! # Foo Core
//!
//! Error types and logging/telemetry setup shared by every foo crate.

pub mod error;
pub mod result;
pub mod telemetry;

pub use error::*;
pub use result::*;
pub use telemetry::{init_telemetry, shutdown_telemetry, TelemetryConfig};
