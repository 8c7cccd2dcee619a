//! Observability for Botfleet: tracing subscriber setup with optional
//! JSON output and OpenTelemetry trace export.

pub mod tracing_setup;

pub use tracing_setup::{TracingOptions, init_tracing, shutdown_tracing};
