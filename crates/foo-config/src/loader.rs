//! Configuration loader with layered sources.

use crate::AppConfig;
use config::{Config, ConfigError, Environment, File};
use foo_core::{FooError, FooResult};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Prefix of environment variables that override file settings.
pub const ENV_PREFIX: &str = "FOO";

/// Environment variable selecting the `{environment}.toml` layer.
pub const ENVIRONMENT_VAR: &str = "FOO_ENVIRONMENT";

/// Layered configuration loader.
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    config_dir: PathBuf,
    environment: Option<String>,
    env_prefix: String,
}

impl ConfigLoader {
    /// Creates a loader reading from `config_dir`.
    ///
    /// Sources are applied in order, later ones winning:
    /// 1. `default.toml`
    /// 2. `{environment}.toml`, from `FOO_ENVIRONMENT` (default `development`)
    /// 3. `local.toml`
    /// 4. Environment variables such as `FOO__WORKER__QUEUE_SIZE`
    pub fn new(config_dir: impl Into<PathBuf>) -> Self {
        Self {
            config_dir: config_dir.into(),
            environment: None,
            env_prefix: ENV_PREFIX.to_string(),
        }
    }

    /// Loader for the default location (`./config`).
    pub fn from_default_location() -> Self {
        Self::new("./config")
    }

    /// Selects the environment layer instead of reading `FOO_ENVIRONMENT`.
    #[must_use]
    pub fn with_environment(mut self, environment: impl Into<String>) -> Self {
        self.environment = Some(environment.into());
        self
    }

    /// Changes the environment variable prefix.
    #[must_use]
    pub fn with_env_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.env_prefix = prefix.into();
        self
    }

    /// Loads, merges and validates the configuration.
    pub fn load(&self) -> FooResult<AppConfig> {
        if let Err(e) = dotenvy::dotenv() {
            debug!("No .env file found or error loading it: {}", e);
        }

        let environment = self
            .environment
            .clone()
            .or_else(|| std::env::var(ENVIRONMENT_VAR).ok())
            .unwrap_or_else(|| "development".to_string());

        info!(
            environment = %environment,
            config_dir = %self.config_dir.display(),
            "Loading configuration"
        );

        let mut builder = Config::builder()
            .set_default("app.environment", environment.as_str())
            .map_err(config_error_to_foo_error)?;

        for layer in ["default", environment.as_str(), "local"] {
            let path = self.config_dir.join(format!("{layer}.toml"));
            if Path::new(&path).exists() {
                debug!(path = %path.display(), "Loading config layer");
                builder = builder.add_source(File::from(path).required(false));
            }
        }

        builder = builder.add_source(
            Environment::with_prefix(&self.env_prefix)
                .separator("__")
                .try_parsing(true),
        );

        let app_config: AppConfig = builder
            .build()
            .and_then(|config| config.try_deserialize())
            .map_err(config_error_to_foo_error)?;

        validate_config(&app_config)?;
        Ok(app_config)
    }
}

/// Rejects configurations the service cannot start with.
pub fn validate_config(config: &AppConfig) -> FooResult<()> {
    if config.app.name.trim().is_empty() {
        return Err(FooError::configuration("app.name must not be empty"));
    }

    if config.producer.interval_ms == 0 {
        return Err(FooError::configuration(
            "producer.interval_ms must be greater than zero",
        ));
    }

    if !(0.0..=1.0).contains(&config.telemetry.sampling_ratio) {
        return Err(FooError::configuration(
            "telemetry.sampling_ratio must be between 0.0 and 1.0",
        ));
    }

    if config.worker.queue_size == 0 {
        warn!("worker.queue_size is 0, the worker default will be used");
    }

    Ok(())
}

fn config_error_to_foo_error(err: ConfigError) -> FooError {
    FooError::Configuration(err.to_string())
}
