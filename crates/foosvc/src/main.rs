//! # foosvc
//!
//! Entry point for the foo job worker service.

use clap::Parser;
use foo_config::ConfigLoader;
use foo_core::{init_telemetry, shutdown_telemetry, FooResult};
use foosvc::{build_worker, run_until_signal, shutdown_signal, AppMode};
use std::path::PathBuf;
use tracing::{error, info};

/// Command line arguments.
#[derive(Debug, Parser)]
#[command(name = "foosvc", version, about = "Foo job worker service")]
struct Cli {
    /// Application mode to run.
    mode: String,

    /// Directory holding `default.toml` and its overrides.
    #[arg(long, default_value = "./config")]
    config_dir: PathBuf,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match ConfigLoader::new(&cli.config_dir).load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    if let Err(e) = init_telemetry(&config.telemetry) {
        eprintln!("Failed to initialize telemetry: {e}");
        std::process::exit(1);
    }

    info!("Starting foosvc...");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));
    info!("Environment: {}", config.app.environment);

    let result = run(&cli.mode, &config).await;
    shutdown_telemetry();

    if let Err(e) = result {
        error!("Application error: {}", e);
        std::process::exit(1);
    }
}

async fn run(mode: &str, config: &foo_config::AppConfig) -> FooResult<()> {
    match mode.parse::<AppMode>()? {
        AppMode::Worker => {
            foo_worker::register_metrics();
            let mut worker = build_worker(config);
            run_until_signal(&mut worker, shutdown_signal()).await
        }
    }
}
