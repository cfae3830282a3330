//! Observability for Stethoscope.
//!
//! # Metrics
//!
//! | Metric | Type | Labels | Purpose |
//! |--------|------|--------|---------|
//! | `stethoscope_checkins_total` | Counter | none | Accepted checkins |
//! | `stethoscope_evictions_total` | Counter | `cause` | Entries leaving the cache |
//! | `stethoscope_deregistrations_total` | Counter | `status` | Registry removal outcomes |
//! | `stethoscope_deregistration_duration_seconds` | Histogram | `status` | Registry removal latency |
//! | `stethoscope_cache_entries` | Gauge | none | Live entries after a maintenance cycle |
//! | `stethoscope_bootstrap_endpoints` | Gauge | none | Endpoints seeded at startup |
//!
//! Labels are bounded: `cause` has two values, `status` has four
//! (success, error, timeout, skipped).

pub mod health;
pub mod metrics;

pub use self::health::{health_router, metrics_router, HealthState};
pub use self::metrics::{
    init_metrics_recorder, record_bootstrap_endpoints, record_checkin, record_deregistration,
    record_eviction, set_cache_entries,
};
