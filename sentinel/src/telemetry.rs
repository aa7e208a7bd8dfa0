//! Tracing setup: an fmt subscriber filtered by `RUST_LOG`, plus optional OTLP span export.
//!
//! OTLP export is off unless `enable_otel_export` is set. When on, the exporter reads the
//! standard variables:
//!
//! - `OTEL_EXPORTER_OTLP_ENDPOINT` (default `http://localhost:4318`)
//! - `OTEL_EXPORTER_OTLP_PROTOCOL` (`http/protobuf` or `http/json`)
//! - `OTEL_EXPORTER_OTLP_HEADERS` as `key=value` pairs, commas between pairs, `%20` for spaces
//! - `OTEL_SERVICE_NAME` (default `sentinel`)
//!
//! The provider is kept in a `OnceLock` so [`shutdown_telemetry`] can flush pending spans;
//! `tracing-opentelemetry` only holds the tracer.

use opentelemetry::KeyValue;
use opentelemetry::trace::TracerProvider as _;
use opentelemetry_otlp::{Protocol, WithExportConfig, WithHttpConfig};
use opentelemetry_sdk::trace::{SdkTracerProvider, Tracer};
use std::collections::HashMap;
use std::sync::OnceLock;
use tracing::info;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

static TRACER_PROVIDER: OnceLock<SdkTracerProvider> = OnceLock::new();

/// Install the global subscriber. Falls back to console-only logging if the OTLP exporter
/// cannot be built.
pub fn init_telemetry(enable_otel_export: bool) -> anyhow::Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let (tracer, otlp_error) = if enable_otel_export {
        match create_otlp_tracer() {
            Ok(tracer) => (Some(tracer), None),
            Err(e) => (None, Some(e)),
        }
    } else {
        (None, None)
    };
    let otel_enabled = tracer.is_some();

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .with(tracer.map(|tracer| tracing_opentelemetry::layer().with_tracer(tracer)))
        .try_init()?;

    match (otel_enabled, otlp_error) {
        (true, _) => info!("Telemetry initialized with OTLP export enabled"),
        (false, Some(e)) => info!("Telemetry initialized without OTLP export: {}", e),
        (false, None) => info!("Telemetry initialized (OTLP export disabled)"),
    }

    Ok(())
}

fn parse_otlp_headers(raw: &str) -> HashMap<String, String> {
    raw.replace("%20", " ")
        .split(',')
        .filter_map(|pair| pair.split_once('='))
        .map(|(key, value)| (key.trim().to_string(), value.trim().to_string()))
        .collect()
}

fn create_otlp_tracer() -> anyhow::Result<Tracer> {
    let service_name = std::env::var("OTEL_SERVICE_NAME").unwrap_or_else(|_| "sentinel".to_string());
    let endpoint = std::env::var("OTEL_EXPORTER_OTLP_ENDPOINT").unwrap_or_else(|_| "http://localhost:4318".to_string());
    let headers = std::env::var("OTEL_EXPORTER_OTLP_HEADERS")
        .map(|raw| parse_otlp_headers(&raw))
        .unwrap_or_default();
    let protocol = match std::env::var("OTEL_EXPORTER_OTLP_PROTOCOL").as_deref() {
        Ok("http/json") => Protocol::HttpJson,
        _ => Protocol::HttpBinary,
    };

    eprintln!("[OTLP] service={} endpoint={} headers={}", service_name, endpoint, headers.len());

    let exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_http()
        .with_endpoint(&endpoint)
        .with_protocol(protocol)
        .with_headers(headers)
        .build()?;

    let tracer_provider = SdkTracerProvider::builder()
        .with_batch_exporter(exporter)
        .with_resource(
            opentelemetry_sdk::Resource::builder()
                .with_attribute(KeyValue::new("service.name", service_name.clone()))
                .build(),
        )
        .build();

    let tracer = tracer_provider.tracer(service_name);
    let _ = TRACER_PROVIDER.set(tracer_provider);

    Ok(tracer)
}

/// Flush and shut down the tracer provider, if one was installed.
pub fn shutdown_telemetry() {
    if let Some(provider) = TRACER_PROVIDER.get()
        && let Err(e) = provider.shutdown()
    {
        tracing::error!("Failed to shutdown tracer provider: {}", e);
    }
}
