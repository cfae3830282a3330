//! Bootstrap loader.
//!
//! Seeds the liveness cache from the registry so that endpoints which never
//! check in after a restart still expire and get cleaned up.

use crate::cache::LivenessCache;
use crate::errors::StethoscopeError;
use crate::models::{CheckinEntry, EndpointId};
use crate::registry::RegistryClient;
use tracing::{debug, error, info, instrument};

/// Walk every application, service and endpoint in the registry and seed
/// the cache with an entry stamped now.
///
/// Returns the number of endpoints loaded. Never triggers deregistration.
///
/// # Errors
///
/// `StethoscopeError::Bootstrap` on any registry error or on an endpoint
/// string with no canonical identity. Callers treat this as fatal.
#[instrument(skip_all, name = "stethoscope.bootstrap")]
pub async fn populate_from_registry(
    registry: &dyn RegistryClient,
    cache: &LivenessCache,
) -> Result<usize, StethoscopeError> {
    let mut count = 0usize;

    for application in registry.list_applications().await.map_err(fatal)? {
        for service in registry.list_services(&application).await.map_err(fatal)? {
            for raw in registry
                .list_endpoints(&application, &service)
                .await
                .map_err(fatal)?
            {
                let endpoint = EndpointId::parse(&raw).map_err(fatal)?;

                debug!(
                    target: "stethoscope.bootstrap",
                    application = %application,
                    service = %service,
                    endpoint = %endpoint,
                    "Loaded endpoint"
                );

                cache
                    .put(endpoint, CheckinEntry::now(application.clone(), service.clone()))
                    .await;
                count += 1;
            }
        }
    }

    info!(
        target: "stethoscope.bootstrap",
        count = count,
        "Loaded endpoints from registry"
    );

    Ok(count)
}

fn fatal(err: StethoscopeError) -> StethoscopeError {
    error!(
        target: "stethoscope.bootstrap",
        error = %err,
        "Unable to load the cache from the registry"
    );
    StethoscopeError::Bootstrap(err.to_string())
}
