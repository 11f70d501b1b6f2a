//! Prometheus metrics exposition
//!
//! - `gallery_token_exchanges_total` (counter): label `outcome`
//! - `gallery_resource_fetches_total` (counter): labels `resource`, `outcome`
//! - `gallery_resource_fetch_duration_seconds` (histogram): label `resource`
//! - `gallery_sessions_active` (gauge)
//!
//! The paging crate adds `paging_pages_fetched_total` and
//! `paging_violations_total` through the same recorder.

use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};

const DURATION_BUCKETS: &[f64] = &[0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0];

fn builder() -> PrometheusBuilder {
    PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Full("gallery_resource_fetch_duration_seconds".to_string()),
            DURATION_BUCKETS,
        )
        .expect("histogram buckets are non-empty")
}

/// Install the Prometheus recorder and return a handle for rendering metrics.
pub fn install_recorder() -> PrometheusHandle {
    builder()
        .install_recorder()
        .expect("failed to install Prometheus recorder")
}

/// Build a recorder handle without installing it globally (for tests).
#[cfg(test)]
pub fn isolated_handle() -> PrometheusHandle {
    builder().build_recorder().handle()
}

/// Record the result of an authorization code exchange.
pub fn record_token_exchange(outcome: &'static str) {
    metrics::counter!("gallery_token_exchanges_total", "outcome" => outcome).increment(1);
}

/// Record one resource collection fetch, successful or not.
pub fn record_resource_fetch(resource: &'static str, outcome: &'static str, duration_secs: f64) {
    metrics::counter!(
        "gallery_resource_fetches_total",
        "resource" => resource,
        "outcome" => outcome
    )
    .increment(1);
    metrics::histogram!("gallery_resource_fetch_duration_seconds", "resource" => resource)
        .record(duration_secs);
}

/// Update the number of live sessions.
pub fn set_active_sessions(count: usize) {
    metrics::gauge!("gallery_sessions_active").set(count as f64);
}
