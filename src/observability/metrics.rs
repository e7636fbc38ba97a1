//! Metrics collection and exposition.
//!
//! # Metrics
//! - `workload_requests_total` (counter): requests by method, route, status code
//! - `workload_request_duration_seconds` (histogram): latency by method, route, status code
//! - `workload_simulated_failures_total` (counter): requests failed on purpose
//! - `workload_config_reloads_total` (counter): reload attempts by outcome
//! - `workload_config_generation` (gauge): generation of the published snapshot
//! - `workload_memory_buffer_bytes` (gauge): size of the resident buffer
//!
//! # Design Decisions
//! - One Prometheus recorder per process, installed on first use
//! - Rendering is pull-based through the handle served on `/metrics`

use std::sync::OnceLock;
use std::time::{Duration, Instant};

use ::metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram, Unit};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use tokio::sync::broadcast;

pub const REQUESTS_TOTAL: &str = "workload_requests_total";
pub const REQUEST_DURATION: &str = "workload_request_duration_seconds";
pub const SIMULATED_FAILURES: &str = "workload_simulated_failures_total";
pub const CONFIG_RELOADS: &str = "workload_config_reloads_total";
pub const CONFIG_GENERATION: &str = "workload_config_generation";
pub const MEMORY_BUFFER_BYTES: &str = "workload_memory_buffer_bytes";

const DURATION_BUCKETS: &[f64] = &[
    0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
];

static HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Install the Prometheus recorder and return its handle.
///
/// Safe to call repeatedly; later calls return the handle of the first one.
pub fn init_metrics() -> PrometheusHandle {
    HANDLE
        .get_or_init(|| {
            let builder = PrometheusBuilder::new()
                .set_buckets_for_metric(Matcher::Full(REQUEST_DURATION.to_string()), DURATION_BUCKETS)
                .unwrap_or_else(|e| {
                    tracing::warn!(error = %e, "Invalid histogram buckets, using summaries");
                    PrometheusBuilder::new()
                });

            let recorder = builder.build_recorder();
            let handle = recorder.handle();
            if let Err(e) = ::metrics::set_global_recorder(recorder) {
                tracing::warn!(error = %e, "Metrics recorder already installed");
            }

            describe_counter!(REQUESTS_TOTAL, "HTTP requests served");
            describe_histogram!(REQUEST_DURATION, Unit::Seconds, "HTTP request latency");
            describe_counter!(SIMULATED_FAILURES, "Requests failed by the configured error rate");
            describe_counter!(CONFIG_RELOADS, "Configuration reload attempts by outcome");
            describe_gauge!(CONFIG_GENERATION, "Generation of the active configuration");
            describe_gauge!(MEMORY_BUFFER_BYTES, Unit::Bytes, "Size of the simulated memory buffer");

            handle
        })
        .clone()
}

/// Drain histogram buffers periodically until shutdown.
pub fn spawn_upkeep(
    handle: PrometheusHandle,
    interval: Duration,
    mut shutdown: broadcast::Receiver<()>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            tokio::select! {
                _ = ticker.tick() => handle.run_upkeep(),
                _ = shutdown.recv() => break,
            }
        }
    })
}

/// Record a served request.
pub fn record_request(method: &str, route: &str, status: u16, start: Instant) {
    let labels = [
        ("method", method.to_string()),
        ("route", route.to_string()),
        ("code", status.to_string()),
    ];
    counter!(REQUESTS_TOTAL, &labels).increment(1);
    histogram!(REQUEST_DURATION, &labels).record(start.elapsed().as_secs_f64());
}

pub fn record_simulated_failure() {
    counter!(SIMULATED_FAILURES).increment(1);
}

/// Record a reload attempt; `outcome` is `success` or a `ConfigError` kind.
pub fn record_reload(outcome: &'static str) {
    counter!(CONFIG_RELOADS, "outcome" => outcome).increment(1);
}

pub fn record_config_applied(generation: u64, buffer_bytes: usize) {
    gauge!(CONFIG_GENERATION).set(generation as f64);
    gauge!(MEMORY_BUFFER_BYTES).set(buffer_bytes as f64);
}
