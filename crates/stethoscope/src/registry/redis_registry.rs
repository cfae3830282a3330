//! Redis-backed service-discovery registry.
//!
//! # Key Patterns
//!
//! - `ezDiscovery` - SET of application names
//! - `ezDiscovery/{app}` - SET of service names
//! - `ezDiscovery/{app}/{service}/endpoints` - SET of `host:port` strings
//!
//! Multi-key updates go through Lua scripts so parents never dangle.
//!
//! # Usage
//!
//! ```rust,ignore
//! let registry = RedisRegistry::new("redis://localhost:6379").await?;
//! let apps = registry.list_applications().await?;
//! ```

use crate::errors::StethoscopeError;
use crate::models::EndpointId;
use crate::registry::{lua_scripts, RegistryClient};
use redis::aio::MultiplexedConnection;
use redis::{AsyncCommands, Client, Script};
use tracing::{debug, error, instrument, warn};

/// Root key of the discovery namespace.
pub const ROOT_KEY: &str = "ezDiscovery";

fn application_key(application: &str) -> String {
    format!("{ROOT_KEY}/{application}")
}

fn endpoints_key(application: &str, service: &str) -> String {
    format!("{ROOT_KEY}/{application}/{service}/endpoints")
}

/// Redis registry client.
///
/// Cheaply cloneable; the `MultiplexedConnection` is shared across tasks.
#[derive(Clone)]
pub struct RedisRegistry {
    connection: MultiplexedConnection,
    remove_script: Script,
}

impl RedisRegistry {
    /// Connect to the registry.
    ///
    /// # Errors
    ///
    /// Returns `StethoscopeError::Registry` if the URL is invalid or the
    /// connection fails.
    pub async fn new(registry_url: &str) -> Result<Self, StethoscopeError> {
        // registry_url may carry a password; never log it
        let client = Client::open(registry_url).map_err(|e| {
            error!(
                target: "stethoscope.registry.redis",
                error = %e,
                "Failed to open registry client"
            );
            StethoscopeError::Registry(format!("Failed to open registry client: {e}"))
        })?;

        let connection = client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| {
                error!(
                    target: "stethoscope.registry.redis",
                    error = %e,
                    "Failed to connect to registry"
                );
                StethoscopeError::Registry(format!("Failed to connect to registry: {e}"))
            })?;

        Ok(Self {
            connection,
            remove_script: Script::new(lua_scripts::REMOVE_ENDPOINT),
        })
    }

    async fn members(&self, key: &str) -> Result<Vec<String>, StethoscopeError> {
        let mut conn = self.connection.clone();
        let mut members: Vec<String> = conn.smembers(key).await.inspect_err(|e| {
            warn!(
                target: "stethoscope.registry.redis",
                error = %e,
                key = %key,
                "Failed to list registry members"
            );
        })?;
        // SMEMBERS order is unspecified
        members.sort();
        Ok(members)
    }
}

#[async_trait::async_trait]
impl RegistryClient for RedisRegistry {
    #[instrument(skip_all)]
    async fn list_applications(&self) -> Result<Vec<String>, StethoscopeError> {
        self.members(ROOT_KEY).await
    }

    #[instrument(skip_all, fields(application = %application))]
    async fn list_services(&self, application: &str) -> Result<Vec<String>, StethoscopeError> {
        self.members(&application_key(application)).await
    }

    #[instrument(skip_all, fields(application = %application, service = %service))]
    async fn list_endpoints(
        &self,
        application: &str,
        service: &str,
    ) -> Result<Vec<String>, StethoscopeError> {
        self.members(&endpoints_key(application, service)).await
    }

    #[instrument(skip_all, fields(application = %application, service = %service, endpoint = %endpoint))]
    async fn remove_endpoint(
        &self,
        application: &str,
        service: &str,
        endpoint: &EndpointId,
    ) -> Result<(), StethoscopeError> {
        let mut conn = self.connection.clone();

        let removed: i64 = self
            .remove_script
            .key(ROOT_KEY)
            .key(application_key(application))
            .key(endpoints_key(application, service))
            .arg(application)
            .arg(service)
            .arg(endpoint.as_str())
            .invoke_async(&mut conn)
            .await
            .inspect_err(|e| {
                warn!(
                    target: "stethoscope.registry.redis",
                    error = %e,
                    endpoint = %endpoint,
                    "Failed to remove endpoint"
                );
            })?;

        if removed == 0 {
            debug!(
                target: "stethoscope.registry.redis",
                application = %application,
                service = %service,
                endpoint = %endpoint,
                "Endpoint was not registered"
            );
        } else {
            debug!(
                target: "stethoscope.registry.redis",
                application = %application,
                service = %service,
                endpoint = %endpoint,
                "Removed endpoint"
            );
        }

        Ok(())
    }
}
