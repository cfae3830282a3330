//! Cache maintenance background task.
//!
//! Forces expiry of stale entries on a fixed interval so that endpoints which
//! stop checking in are evicted even when nothing reads their keys.
//!
//! # Graceful Shutdown
//!
//! The task exits when the cancellation token is triggered. A cycle already
//! running completes first.

use crate::cache::LivenessCache;
use crate::observability::metrics;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument};

/// Start the cache maintenance task.
///
/// The first cycle runs immediately; later cycles run every `interval`.
/// Missed ticks are skipped rather than run back to back.
///
/// Returns when the cancellation token is triggered.
#[instrument(skip_all, name = "stethoscope.task.cache_maintenance")]
pub async fn start_cache_maintenance(
    cache: Arc<LivenessCache>,
    interval: Duration,
    cancel_token: CancellationToken,
) {
    info!(
        target: "stethoscope.task.cache_maintenance",
        interval_secs = interval.as_secs(),
        "Starting cache maintenance task"
    );

    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                run_cycle(&cache).await;
            }
            _ = cancel_token.cancelled() => {
                info!(
                    target: "stethoscope.task.cache_maintenance",
                    "Cache maintenance task received shutdown signal, exiting"
                );
                break;
            }
        }
    }

    info!(
        target: "stethoscope.task.cache_maintenance",
        "Cache maintenance task stopped"
    );
}

async fn run_cycle(cache: &LivenessCache) {
    debug!(target: "stethoscope.task.cache_maintenance", "Cleaning up cache");

    let evicted = cache.force_maintenance().await;
    let live = cache.size().await;

    metrics::set_cache_entries(live);

    info!(
        target: "stethoscope.task.cache_maintenance",
        evicted = evicted,
        live = live,
        "Cache maintenance cycle complete"
    );
}
