//! Stethoscope service object.
//!
//! Owns the liveness cache, the eviction handler and the registry handle for
//! the lifetime of the process. Construction runs the bootstrap loader, so a
//! `Stethoscope` that exists has already been seeded from the registry.

use crate::cache::LivenessCache;
use crate::config::Config;
use crate::errors::StethoscopeError;
use crate::models::{CheckinEntry, EndpointId};
use crate::observability::metrics;
use crate::registry::RegistryClient;
use crate::services::bootstrap::populate_from_registry;
use crate::services::eviction::EvictionHandler;
use crate::tasks::start_cache_maintenance;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

/// Timing and behavior knobs for the liveness core.
#[derive(Debug, Clone)]
pub struct LivenessSettings {
    pub expire_after_write: Duration,
    pub cleanup_interval: Duration,
    pub remove_from_registry: bool,
    pub deregister_timeout: Duration,
    pub bootstrap_timeout: Duration,
}

impl From<&Config> for LivenessSettings {
    fn from(config: &Config) -> Self {
        Self {
            expire_after_write: config.expire_after_write,
            cleanup_interval: config.cleanup_interval,
            remove_from_registry: config.remove_from_registry,
            deregister_timeout: config.deregister_timeout,
            bootstrap_timeout: config.bootstrap_timeout,
        }
    }
}

/// The liveness tracker.
pub struct Stethoscope {
    cache: Arc<LivenessCache>,
    eviction: Arc<EvictionHandler>,
    registry: Arc<dyn RegistryClient>,
    settings: LivenessSettings,
}

impl Stethoscope {
    /// Build the cache and eviction handler, then seed the cache from the
    /// registry.
    ///
    /// # Errors
    ///
    /// `StethoscopeError::Bootstrap` if the registry walk fails or does not
    /// finish within `bootstrap_timeout`. The process must not serve.
    pub async fn initialize(
        registry: Arc<dyn RegistryClient>,
        settings: LivenessSettings,
    ) -> Result<Self, StethoscopeError> {
        info!(
            target: "stethoscope.bootstrap",
            expire_after_write_secs = settings.expire_after_write.as_secs(),
            cleanup_interval_secs = settings.cleanup_interval.as_secs(),
            remove_from_registry = settings.remove_from_registry,
            "Initializing liveness tracker"
        );

        let eviction = Arc::new(EvictionHandler::new(
            Arc::clone(&registry),
            settings.remove_from_registry,
            settings.deregister_timeout,
        ));
        let cache = Arc::new(LivenessCache::new(
            settings.expire_after_write,
            eviction.clone(),
        ));

        let loaded = tokio::time::timeout(
            settings.bootstrap_timeout,
            populate_from_registry(registry.as_ref(), &cache),
        )
        .await
        .map_err(|_| {
            error!(
                target: "stethoscope.bootstrap",
                timeout_secs = settings.bootstrap_timeout.as_secs(),
                "Registry walk timed out"
            );
            StethoscopeError::Bootstrap(format!(
                "registry walk exceeded {}s",
                settings.bootstrap_timeout.as_secs()
            ))
        })??;

        metrics::record_bootstrap_endpoints(loaded);

        Ok(Self {
            cache,
            eviction,
            registry,
            settings,
        })
    }

    /// Record a checkin for `endpoint`, creating or refreshing its entry.
    pub async fn checkin(&self, application: &str, service: &str, endpoint: EndpointId) {
        debug!(
            target: "stethoscope.cache",
            application = %application,
            service = %service,
            endpoint = %endpoint,
            "Endpoint checked in"
        );
        self.cache
            .put(endpoint, CheckinEntry::now(application, service))
            .await;
        metrics::record_checkin();
    }

    pub fn cache(&self) -> &Arc<LivenessCache> {
        &self.cache
    }

    pub fn eviction(&self) -> &Arc<EvictionHandler> {
        &self.eviction
    }

    pub fn registry(&self) -> &Arc<dyn RegistryClient> {
        &self.registry
    }

    /// Spawn the maintenance task on the current runtime.
    pub fn spawn_maintenance(&self, cancel_token: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(start_cache_maintenance(
            Arc::clone(&self.cache),
            self.settings.cleanup_interval,
            cancel_token,
        ))
    }

    /// Wait for in-flight deregistrations.
    pub async fn drain_evictions(&self) {
        self.eviction.drain().await;
    }
}
