//! # Telemetry Features
//!
//! Logging is always on: a `tracing_subscriber` registry filtered by
//! `RUST_LOG` (default `info`) prints events to the console.
//!
//! Optional OpenTelemetry metrics are available behind cargo features.
//!
//! ## Feature matrix
//!
//! - `metrics`: Enables OpenTelemetry metrics (counters and a histogram).
//! - `stdout`: Exports the metrics to stdout every few seconds.
//!
//! ## Feature constraints
//!
//! - `stdout` requires `metrics`.
//!
//! ## Metrics
//!
//! - `records_processed`: records written (or dry-run validated)
//! - `records_failed`: records whose write failed or had no destination
//! - `lines_rejected`: lines the parser rejected
//! - `write_errors`: store writes that returned an error
//! - `files_handled`: files that reached disposition
//! - `file_duration`: wall time per file, in milliseconds
//!
//! ## Example usage
//!
//! ```bash
//! cargo run --features metrics,stdout -- --dry
//! ```

// Disallow using `stdout` without `metrics`
#[cfg(all(feature = "stdout", not(feature = "metrics")))]
compile_error!("The 'stdout' feature requires 'metrics' to be enabled.");

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[cfg(feature = "metrics")]
use opentelemetry::{
    InstrumentationScope, KeyValue,
    metrics::{Counter, Histogram, Meter},
};
#[cfg(feature = "metrics")]
use opentelemetry_sdk::{Resource, metrics as sdkmetrics};
#[cfg(feature = "metrics")]
use opentelemetry_semantic_conventions as semvcns;
#[cfg(feature = "metrics")]
use std::sync::OnceLock;

pub struct TelemetryProviders {
    #[cfg(feature = "metrics")]
    pub meter_provider: sdkmetrics::SdkMeterProvider,
}

impl TelemetryProviders {
    /// Flushes pending metrics and shuts the exporters down.
    pub fn shutdown(self) {
        #[cfg(feature = "metrics")]
        {
            if let Err(err) = self.meter_provider.force_flush() {
                eprintln!("Error flushing metrics: {:#?}", err);
            }
            if let Err(err) = self.meter_provider.shutdown() {
                eprintln!("Error shutting down meter: {:#?}", err);
            }
        }
    }
}

pub fn init_telemetry() -> anyhow::Result<TelemetryProviders> {
    #[cfg(feature = "metrics")]
    let meter_provider = init_metrics();

    #[cfg(feature = "metrics")]
    {
        let scope = InstrumentationScope::builder("memc-loader")
            .with_version(env!("CARGO_PKG_VERSION"))
            .with_schema_url(semvcns::SCHEMA_URL)
            .build();
        opentelemetry::global::set_meter_provider(meter_provider.clone());
        init_metric_handles(opentelemetry::global::meter_with_scope(scope));
    }

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(
            tracing_subscriber::fmt::layer()
                .with_thread_ids(true)
                .with_line_number(true)
                .with_target(false)
                .with_timer(tracing_subscriber::fmt::time::ChronoLocal::rfc_3339())
                .with_file(true),
        )
        .try_init()?;

    Ok(TelemetryProviders {
        #[cfg(feature = "metrics")]
        meter_provider,
    })
}

#[cfg(feature = "metrics")]
fn resource() -> Resource {
    Resource::builder()
        .with_service_name("memc-loader")
        .with_schema_url(
            [KeyValue::new(
                semvcns::resource::SERVICE_VERSION,
                env!("CARGO_PKG_VERSION"),
            )],
            semvcns::SCHEMA_URL,
        )
        .build()
}

#[cfg(feature = "metrics")]
fn init_metrics() -> sdkmetrics::SdkMeterProvider {
    let builder = sdkmetrics::SdkMeterProvider::builder().with_resource(resource());

    #[cfg(feature = "stdout")]
    let builder = {
        use opentelemetry_stdout::MetricExporter;
        let exporter = MetricExporter::default();
        let reader = sdkmetrics::PeriodicReader::builder(exporter)
            .with_interval(std::time::Duration::from_secs(5))
            .build();

        builder.with_reader(reader)
    };

    builder.build()
}

// Metric handles - only compiled when metrics feature is enabled
#[cfg(feature = "metrics")]
static RECORDS_PROCESSED: OnceLock<Counter<u64>> = OnceLock::new();
#[cfg(feature = "metrics")]
static RECORDS_FAILED: OnceLock<Counter<u64>> = OnceLock::new();
#[cfg(feature = "metrics")]
static LINES_REJECTED: OnceLock<Counter<u64>> = OnceLock::new();
#[cfg(feature = "metrics")]
static WRITE_ERRORS: OnceLock<Counter<u64>> = OnceLock::new();
#[cfg(feature = "metrics")]
static FILES_HANDLED: OnceLock<Counter<u64>> = OnceLock::new();
#[cfg(feature = "metrics")]
static FILE_DURATION_MS: OnceLock<Histogram<f64>> = OnceLock::new();

#[cfg(feature = "metrics")]
fn init_metric_handles(meter: Meter) {
    let _ = RECORDS_PROCESSED.set(
        meter
            .u64_counter("records_processed")
            .with_description("Records stored or dry-run validated")
            .build(),
    );

    let _ = RECORDS_FAILED.set(
        meter
            .u64_counter("records_failed")
            .with_description("Records with a failed write or unknown destination")
            .build(),
    );

    let _ = LINES_REJECTED.set(
        meter
            .u64_counter("lines_rejected")
            .with_description("Input lines rejected by the parser")
            .build(),
    );

    let _ = WRITE_ERRORS.set(
        meter
            .u64_counter("write_errors")
            .with_description("Store writes that returned an error")
            .build(),
    );

    let _ = FILES_HANDLED.set(
        meter
            .u64_counter("files_handled")
            .with_description("Input files that reached disposition")
            .build(),
    );

    let _ = FILE_DURATION_MS.set(
        meter
            .f64_histogram("file_duration")
            .with_unit("ms")
            .with_description("End-to-end processing time per file")
            .build(),
    );
}

// Convenience functions that compile to no-ops when metrics are disabled
#[cfg(feature = "metrics")]
pub fn increment_records_processed(count: u64) {
    if let Some(counter) = RECORDS_PROCESSED.get() {
        counter.add(count, &[]);
    }
}

#[cfg(not(feature = "metrics"))]
pub fn increment_records_processed(_count: u64) {}

#[cfg(feature = "metrics")]
pub fn increment_records_failed(count: u64) {
    if let Some(counter) = RECORDS_FAILED.get() {
        counter.add(count, &[]);
    }
}

#[cfg(not(feature = "metrics"))]
pub fn increment_records_failed(_count: u64) {}

#[cfg(feature = "metrics")]
pub fn increment_lines_rejected(count: u64) {
    if let Some(counter) = LINES_REJECTED.get() {
        counter.add(count, &[]);
    }
}

#[cfg(not(feature = "metrics"))]
pub fn increment_lines_rejected(_count: u64) {}

#[cfg(feature = "metrics")]
pub fn increment_write_errors() {
    if let Some(counter) = WRITE_ERRORS.get() {
        counter.add(1, &[]);
    }
}

#[cfg(not(feature = "metrics"))]
pub fn increment_write_errors() {}

#[cfg(feature = "metrics")]
pub fn increment_files_handled() {
    if let Some(counter) = FILES_HANDLED.get() {
        counter.add(1, &[]);
    }
}

#[cfg(not(feature = "metrics"))]
pub fn increment_files_handled() {}

#[cfg(feature = "metrics")]
pub fn record_file_duration(duration_ms: f64) {
    if let Some(histogram) = FILE_DURATION_MS.get() {
        histogram.record(duration_ms, &[]);
    }
}

#[cfg(not(feature = "metrics"))]
pub fn record_file_duration(_duration_ms: f64) {}
