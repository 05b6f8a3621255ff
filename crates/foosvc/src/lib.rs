//! # foosvc
//!
//! Wiring for the foo job worker service: mode selection, worker setup and
//! signal-driven run/stop.

pub mod app;
pub mod runner;

pub use app::{build_worker, AppMode};
pub use runner::{run_until_signal, shutdown_signal, Runner};
