//! Prometheus metrics export.
//!
//! Counters and a duration histogram for CLI runs, served over an
//! optional HTTP listener. Telemetry is best-effort: a failed exporter
//! install degrades to a warning and the command proceeds.

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, describe_counter, describe_histogram, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use tracing::{debug, warn};

const RUNS: &str = "channel_ops_runs_total";
const ERRORS: &str = "channel_ops_errors_total";
const DURATION: &str = "channel_ops_duration_seconds";

/// Installs the Prometheus exporter on the given address.
pub fn init(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => {
            describe_counter!(RUNS, "Total CLI runs");
            describe_counter!(ERRORS, "Failed runs");
            describe_histogram!(DURATION, "Command execution time");
            debug!("Metrics exporter listening on {}", addr);
        }
        Err(e) => warn!("Failed to install metrics exporter on {}: {}", addr, e),
    }
}

/// Counts one CLI run.
pub fn record_run() {
    counter!(RUNS, 1);
}

/// Counts one failed run.
pub fn record_error() {
    counter!(ERRORS, 1);
}

/// Records the elapsed time since `started`.
pub fn record_duration(started: Instant) {
    histogram!(DURATION, started.elapsed().as_secs_f64());
}
