//! Metrics collection and exposition.
//!
//! # Metrics
//! - `vhost_dispatch_total` (counter): dispatches by outcome
//!   (`hit`, `not_found`, `handler_error`, `error_handler_failed`)
//! - `vhost_dispatch_duration_seconds` (histogram): time spent in handlers
//! - `vhost_registry_size` (gauge): current number of vhosts
//! - `vhost_registry_persist_total` (counter): saves / loads by result
//!
//! # Design Decisions
//! - Recording without an installed exporter is a no-op
//! - Prometheus exporter is optional and off by default

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};
use std::net::SocketAddr;
use std::time::Instant;

/// Install the Prometheus exporter listening on `addr`.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics exporter listening");
    Ok(())
}

/// Record one dispatch and its duration.
pub fn record_dispatch(outcome: &'static str, start_time: Instant) {
    ::metrics::counter!("vhost_dispatch_total", "outcome" => outcome).increment(1);
    ::metrics::histogram!("vhost_dispatch_duration_seconds")
        .record(start_time.elapsed().as_secs_f64());
}

/// Record the current registry size.
pub fn record_registry_size(size: usize) {
    ::metrics::gauge!("vhost_registry_size").set(size as f64);
}

/// Record a save or load attempt.
pub fn record_persist(op: &'static str, ok: bool) {
    let result = if ok { "ok" } else { "error" };
    ::metrics::counter!("vhost_registry_persist_total", "op" => op, "result" => result)
        .increment(1);
}
