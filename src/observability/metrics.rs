//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Install the Prometheus recorder once per process
//! - Record per-request counters and latency histograms
//! - Track open connections
//!
//! # Metrics
//! - `http_requests_total` (counter): requests by method, endpoint, status
//! - `http_request_duration_seconds` (histogram): latency distribution
//! - `http_connections_active` (gauge): current connection count
//!
//! # Design Decisions
//! - `endpoint` is always a route template or `unknown`, never a raw path
//! - Histogram buckets are the classic Prometheus defaults

use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use metrics_exporter_prometheus::{BuildError, Matcher, PrometheusBuilder, PrometheusHandle};
use tokio::sync::broadcast;

pub const REQUESTS_TOTAL: &str = "http_requests_total";
pub const REQUEST_DURATION: &str = "http_request_duration_seconds";
pub const CONNECTIONS_ACTIVE: &str = "http_connections_active";

/// Route label used when no route template matched.
pub const UNKNOWN_ROUTE: &str = "unknown";

const LATENCY_BUCKETS: &[f64] = &[
    0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
];

static RECORDER: Mutex<Option<PrometheusHandle>> = Mutex::new(None);

/// Install the global Prometheus recorder, or return the handle of the one already installed.
pub fn init_metrics() -> Result<PrometheusHandle, BuildError> {
    let mut slot = RECORDER.lock().unwrap_or_else(PoisonError::into_inner);
    if let Some(handle) = slot.as_ref() {
        return Ok(handle.clone());
    }

    let handle = PrometheusBuilder::new()
        .set_buckets_for_metric(Matcher::Full(REQUEST_DURATION.to_string()), LATENCY_BUCKETS)?
        .install_recorder()?;

    tracing::info!("Prometheus recorder installed");
    *slot = Some(handle.clone());
    Ok(handle)
}

/// Periodically drain histogram buffers until shutdown.
pub async fn run_upkeep(
    handle: PrometheusHandle,
    period: Duration,
    mut shutdown: broadcast::Receiver<()>,
) {
    let mut ticker = tokio::time::interval(period);
    loop {
        tokio::select! {
            _ = ticker.tick() => handle.run_upkeep(),
            _ = shutdown.recv() => {
                tracing::debug!("Metrics upkeep stopped");
                break;
            }
        }
    }
}

/// Record one completed request.
pub fn record_request(method: &str, route: &str, status: u16, elapsed: Duration) {
    let status = status.to_string();
    metrics::counter!(
        REQUESTS_TOTAL,
        "method" => method.to_string(),
        "endpoint" => route.to_string(),
        "status" => status.clone()
    )
    .increment(1);
    metrics::histogram!(
        REQUEST_DURATION,
        "method" => method.to_string(),
        "endpoint" => route.to_string(),
        "status" => status
    )
    .record(elapsed.as_secs_f64());
}

pub fn connection_opened() {
    metrics::gauge!(CONNECTIONS_ACTIVE).increment(1.0);
}

pub fn connection_closed() {
    metrics::gauge!(CONNECTIONS_ACTIVE).decrement(1.0);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_is_idempotent() {
        let first = init_metrics().unwrap();
        record_request("PATCH", "/idempotent/:id", 204, Duration::from_millis(3));

        // A second install hands back a view of the same registry.
        let second = init_metrics().unwrap();
        assert!(first.render().contains(r#"endpoint="/idempotent/:id""#));
        assert!(second.render().contains(r#"endpoint="/idempotent/:id""#));
    }
}
