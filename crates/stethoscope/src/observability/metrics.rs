//! Metric definitions.
//!
//! All metrics use the `stethoscope_` prefix, `_total` for counters and
//! `_seconds` for duration histograms.

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::time::Duration;

/// Install the Prometheus recorder and return the handle used by `/metrics`.
///
/// Must be called before any metric is recorded.
///
/// # Errors
///
/// Returns error if a recorder is already installed.
pub fn init_metrics_recorder() -> Result<PrometheusHandle, String> {
    PrometheusBuilder::new()
        // Registry removal is a network call bounded by the deregister timeout
        .set_buckets_for_metric(
            Matcher::Prefix("stethoscope_deregistration".to_string()),
            &[
                0.001, 0.005, 0.010, 0.025, 0.050, 0.100, 0.250, 0.500, 1.000, 2.500, 5.000,
                10.000,
            ],
        )
        .map_err(|e| format!("Failed to set deregistration buckets: {e}"))?
        .install_recorder()
        .map_err(|e| format!("Failed to install Prometheus metrics recorder: {e}"))
}

/// Record one accepted checkin.
///
/// Metric: `stethoscope_checkins_total`
pub fn record_checkin() {
    counter!("stethoscope_checkins_total").increment(1);
}

/// Record one entry leaving the cache.
///
/// Metric: `stethoscope_evictions_total`
/// Labels: `cause` (expired, explicit)
pub fn record_eviction(cause: &'static str) {
    counter!("stethoscope_evictions_total", "cause" => cause).increment(1);
}

/// Record the outcome of one registry removal.
///
/// Metric: `stethoscope_deregistrations_total`,
/// `stethoscope_deregistration_duration_seconds`
/// Labels: `status` (success, error, timeout, skipped)
///
/// `skipped` outcomes carry no duration.
pub fn record_deregistration(status: &'static str, duration: Option<Duration>) {
    if let Some(duration) = duration {
        histogram!("stethoscope_deregistration_duration_seconds", "status" => status)
            .record(duration.as_secs_f64());
    }
    counter!("stethoscope_deregistrations_total", "status" => status).increment(1);
}

/// Set the live-entry count observed by the last maintenance cycle.
///
/// Metric: `stethoscope_cache_entries`
#[allow(clippy::cast_precision_loss)]
pub fn set_cache_entries(count: usize) {
    gauge!("stethoscope_cache_entries").set(count as f64);
}

/// Set the number of endpoints seeded from the registry at startup.
///
/// Metric: `stethoscope_bootstrap_endpoints`
#[allow(clippy::cast_precision_loss)]
pub fn record_bootstrap_endpoints(count: usize) {
    gauge!("stethoscope_bootstrap_endpoints").set(count as f64);
}
