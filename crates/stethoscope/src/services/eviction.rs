//! Eviction handler.
//!
//! Receives every removal from the [`LivenessCache`](crate::cache::LivenessCache)
//! and, when deregistration is enabled, removes the endpoint from the
//! registry on a tracked background task. The notifying caller never waits
//! on the registry.
//!
//! Each registry call is bounded by `deregister_timeout`. Failures and
//! timeouts are logged and counted, never retried, and never re-insert the
//! entry.

use crate::cache::{RemovalListener, RemovalNotification};
use crate::errors::StethoscopeError;
use crate::observability::metrics;
use crate::registry::RegistryClient;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, warn};

/// Removal listener that deregisters evicted endpoints.
pub struct EvictionHandler {
    registry: Arc<dyn RegistryClient>,
    remove_from_registry: bool,
    deregister_timeout: Duration,
    tracker: TaskTracker,
    drain_lock: Mutex<()>,
}

impl EvictionHandler {
    /// Create a handler.
    ///
    /// With `remove_from_registry` false the handler only logs and counts.
    pub fn new(
        registry: Arc<dyn RegistryClient>,
        remove_from_registry: bool,
        deregister_timeout: Duration,
    ) -> Self {
        Self {
            registry,
            remove_from_registry,
            deregister_timeout,
            tracker: TaskTracker::new(),
            drain_lock: Mutex::new(()),
        }
    }

    /// Number of deregistrations still running.
    pub fn in_flight(&self) -> usize {
        self.tracker.len()
    }

    /// Wait until every in-flight deregistration has finished.
    ///
    /// New deregistrations may be spawned again after this returns.
    /// Concurrent drains run one at a time so that one caller's reopen never
    /// leaves another waiting on an open tracker.
    pub async fn drain(&self) {
        let _guard = self.drain_lock.lock().await;
        self.tracker.close();
        self.tracker.wait().await;
        self.tracker.reopen();
    }
}

impl RemovalListener for EvictionHandler {
    fn on_removal(&self, notification: RemovalNotification) {
        let RemovalNotification {
            endpoint,
            entry,
            cause,
        } = notification;

        metrics::record_eviction(cause.as_str());

        if !self.remove_from_registry {
            info!(
                target: "stethoscope.eviction",
                application = %entry.application,
                service = %entry.service,
                endpoint = %endpoint,
                cause = cause.as_str(),
                "Endpoint evicted, registry removal disabled"
            );
            metrics::record_deregistration("skipped", None);
            return;
        }

        info!(
            target: "stethoscope.eviction",
            application = %entry.application,
            service = %entry.service,
            endpoint = %endpoint,
            cause = cause.as_str(),
            "Endpoint evicted, removing from registry"
        );

        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            warn!(
                target: "stethoscope.eviction",
                endpoint = %endpoint,
                "Eviction outside a runtime; skipping registry removal"
            );
            metrics::record_deregistration("skipped", None);
            return;
        };

        let registry = Arc::clone(&self.registry);
        let deregister_timeout = self.deregister_timeout;

        self.tracker.spawn_on(
            async move {
                let start = Instant::now();
                let result = tokio::time::timeout(
                    deregister_timeout,
                    registry.remove_endpoint(&entry.application, &entry.service, &endpoint),
                )
                .await
                .unwrap_or_else(|_| {
                    Err(StethoscopeError::RegistryTimeout(
                        u64::try_from(deregister_timeout.as_millis()).unwrap_or(u64::MAX),
                    ))
                });
                let elapsed = start.elapsed();

                match result {
                    Ok(()) => {
                        debug!(
                            target: "stethoscope.eviction",
                            application = %entry.application,
                            service = %entry.service,
                            endpoint = %endpoint,
                            "Removed endpoint from registry"
                        );
                        metrics::record_deregistration("success", Some(elapsed));
                    }
                    Err(e @ StethoscopeError::RegistryTimeout(_)) => {
                        warn!(
                            target: "stethoscope.eviction",
                            application = %entry.application,
                            service = %entry.service,
                            endpoint = %endpoint,
                            error = %e,
                            "Registry removal timed out"
                        );
                        metrics::record_deregistration("timeout", Some(elapsed));
                    }
                    Err(e) => {
                        warn!(
                            target: "stethoscope.eviction",
                            application = %entry.application,
                            service = %entry.service,
                            endpoint = %endpoint,
                            error = %e,
                            "Registry removal failed"
                        );
                        metrics::record_deregistration("error", Some(elapsed));
                    }
                }
            },
            &handle,
        );
    }
}
