//! Logging and distributed tracing setup.
//!
//! Installs a `tracing` subscriber with an env filter and a console layer
//! (text or JSON). With the `telemetry` feature, spans are also exported
//! over OTLP when enabled in the configuration.

#[cfg(feature = "telemetry")]
use opentelemetry::trace::TracerProvider;
#[cfg(feature = "telemetry")]
use opentelemetry::KeyValue;
#[cfg(feature = "telemetry")]
use opentelemetry_otlp::WithExportConfig;
#[cfg(feature = "telemetry")]
use opentelemetry_sdk::{
    runtime,
    trace::{RandomIdGenerator, Sampler},
    Resource,
};
#[cfg(feature = "telemetry")]
use opentelemetry_semantic_conventions::resource::SERVICE_NAME;

use crate::{FooError, FooResult};
use serde::{Deserialize, Serialize};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Filter used when `RUST_LOG` is not set.
pub const DEFAULT_LOG_FILTER: &str = "info,foo=debug";

/// Telemetry configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// Whether OpenTelemetry export is enabled.
    #[serde(default)]
    pub enabled: bool,

    /// Service name for tracing.
    #[serde(default = "default_service_name")]
    pub service_name: String,

    /// OTLP endpoint URL (e.g., "http://localhost:4317").
    #[serde(default)]
    pub otlp_endpoint: Option<String>,

    /// Sampling ratio (0.0 to 1.0).
    #[serde(default = "default_sampling_ratio")]
    pub sampling_ratio: f64,

    /// Whether to log to the console.
    #[serde(default = "default_console_output")]
    pub console_output: bool,

    /// Emit console logs as JSON lines.
    #[serde(default)]
    pub json_output: bool,
}

fn default_service_name() -> String {
    "foosvc".to_string()
}

fn default_sampling_ratio() -> f64 {
    1.0
}

fn default_console_output() -> bool {
    true
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            service_name: default_service_name(),
            otlp_endpoint: None,
            sampling_ratio: default_sampling_ratio(),
            console_output: default_console_output(),
            json_output: false,
        }
    }
}

/// Installs the global tracing subscriber.
///
/// Fails if a global subscriber is already set.
pub fn init_telemetry(config: &TelemetryConfig) -> FooResult<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    let text = config.console_output && !config.json_output;
    let json = config.console_output && config.json_output;

    let registry = tracing_subscriber::registry()
        .with(filter)
        .with(text.then(|| fmt::layer().with_target(true)))
        .with(json.then(|| fmt::layer().json().with_current_span(true)));

    #[cfg(feature = "telemetry")]
    let registry = registry.with(otel_layer(config)?);

    registry
        .try_init()
        .map_err(|e| FooError::Telemetry(e.to_string()))?;

    tracing::info!(
        service_name = %config.service_name,
        otel = config.enabled,
        json = config.json_output,
        "Telemetry initialized"
    );
    Ok(())
}

#[cfg(feature = "telemetry")]
fn sampler(ratio: f64) -> Sampler {
    if ratio >= 1.0 {
        Sampler::AlwaysOn
    } else if ratio <= 0.0 {
        Sampler::AlwaysOff
    } else {
        Sampler::TraceIdRatioBased(ratio)
    }
}

/// Builds the OpenTelemetry layer, or `None` when export is disabled.
#[cfg(feature = "telemetry")]
fn otel_layer<S>(
    config: &TelemetryConfig,
) -> FooResult<Option<tracing_opentelemetry::OpenTelemetryLayer<S, opentelemetry_sdk::trace::Tracer>>>
where
    S: tracing::Subscriber + for<'span> tracing_subscriber::registry::LookupSpan<'span>,
{
    if !config.enabled {
        return Ok(None);
    }

    let resource = Resource::new(vec![KeyValue::new(SERVICE_NAME, config.service_name.clone())]);
    let builder = opentelemetry_sdk::trace::TracerProvider::builder()
        .with_sampler(sampler(config.sampling_ratio))
        .with_id_generator(RandomIdGenerator::default())
        .with_resource(resource);

    let tracer_provider = if let Some(endpoint) = &config.otlp_endpoint {
        let exporter = opentelemetry_otlp::SpanExporter::builder()
            .with_tonic()
            .with_endpoint(endpoint)
            .build()
            .map_err(|e| FooError::Telemetry(format!("Failed to create OTLP exporter: {e}")))?;
        builder.with_batch_exporter(exporter, runtime::Tokio).build()
    } else {
        builder.build()
    };

    let tracer = tracer_provider.tracer("foosvc");
    opentelemetry::global::set_tracer_provider(tracer_provider);

    Ok(Some(tracing_opentelemetry::layer().with_tracer(tracer)))
}

/// Flushes pending spans and shuts the tracer provider down.
#[cfg(feature = "telemetry")]
pub fn shutdown_telemetry() {
    opentelemetry::global::shutdown_tracer_provider();
    tracing::info!("Telemetry shutdown complete");
}

/// No spans are exported without the `telemetry` feature.
#[cfg(not(feature = "telemetry"))]
pub fn shutdown_telemetry() {}
