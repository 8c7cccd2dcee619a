//! Tracing subscriber initialization with structured logging and optional
//! OpenTelemetry trace export.
//!
//! # Usage
//!
//! ```no_run
//! use botfleet_observe::TracingOptions;
//!
//! // Human-readable structured logging only
//! botfleet_observe::init_tracing(TracingOptions::default()).unwrap();
//!
//! // JSON lines plus OpenTelemetry export to stdout (local development)
//! botfleet_observe::init_tracing(TracingOptions { json: true, otel: true }).unwrap();
//! ```

use opentelemetry::trace::TracerProvider as _;
use opentelemetry_sdk::trace::SdkTracerProvider;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use std::sync::OnceLock;

/// Stores the OTel tracer provider so it can be shut down cleanly on exit.
static TRACER_PROVIDER: OnceLock<SdkTracerProvider> = OnceLock::new();

/// Output selection for [`init_tracing`].
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingOptions {
    /// Emit JSON lines instead of the human-readable format. Fleet
    /// deployments ship these to a log collector.
    pub json: bool,
    /// Bridge tracing spans to OpenTelemetry with a stdout exporter
    /// (suitable for local development; swap the exporter for OTLP in
    /// production).
    pub otel: bool,
}

/// Initialize the global tracing subscriber.
///
/// Always installs a structured `fmt` layer with target visibility and span
/// close timing. Respects `RUST_LOG` via `EnvFilter::from_default_env()`.
///
/// # Errors
///
/// Returns an error if the global subscriber has already been set or if
/// the OTel pipeline fails to initialize.
pub fn init_tracing(options: TracingOptions) -> Result<(), Box<dyn std::error::Error>> {
    let env_filter = EnvFilter::from_default_env();
    let registry = tracing_subscriber::registry().with(env_filter);

    let tracer = if options.otel {
        let provider = SdkTracerProvider::builder()
            .with_simple_exporter(opentelemetry_stdout::SpanExporter::default())
            .build();
        let tracer = provider.tracer("botfleet");

        // Store the provider for shutdown and register it globally.
        let _ = TRACER_PROVIDER.set(provider.clone());
        opentelemetry::global::set_tracer_provider(provider);

        Some(tracer)
    } else {
        None
    };

    if options.json {
        let fmt_layer = tracing_subscriber::fmt::layer()
            .json()
            .with_target(true)
            .with_span_events(FmtSpan::CLOSE);
        let otel_layer = tracer.map(|t| tracing_opentelemetry::layer().with_tracer(t));
        registry.with(fmt_layer).with(otel_layer).init();
    } else {
        let fmt_layer = tracing_subscriber::fmt::layer()
            .with_target(true)
            .with_span_events(FmtSpan::CLOSE);
        let otel_layer = tracer.map(|t| tracing_opentelemetry::layer().with_tracer(t));
        registry.with(fmt_layer).with(otel_layer).init();
    }

    Ok(())
}

/// Flush pending traces and shut down the OpenTelemetry tracer provider.
///
/// Call this before process exit to ensure all buffered spans are exported.
/// Safe to call even when OTel was not enabled (no-op in that case).
pub fn shutdown_tracing() {
    if let Some(provider) = TRACER_PROVIDER.get() {
        if let Err(e) = provider.shutdown() {
            eprintln!("Warning: OTel tracer provider shutdown error: {e}");
        }
    }
}
