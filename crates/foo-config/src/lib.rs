//! # Foo Config
//!
//! Layered configuration for the foo service: TOML files, a `.env` file and
//! `FOO__`-prefixed environment variables.

mod app_config;
mod loader;

pub use app_config::*;
pub use loader::*;
