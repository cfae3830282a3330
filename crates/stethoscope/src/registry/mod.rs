//! Service-discovery registry client.
//!
//! The registry is the durable record of which endpoints exist. Stethoscope
//! reads the whole tree once at startup and removes single endpoints when
//! they stop checking in.
//!
//! # Layout
//!
//! ```text
//! application
//! └── service
//!     └── endpoint ("host:port")
//! ```
//!
//! # Backends
//!
//! - [`RedisRegistry`] - Redis sets, one per tree level
//! - [`mock::MockRegistry`] - in-memory tree for tests

pub mod lua_scripts;
pub mod redis_registry;

pub use redis_registry::RedisRegistry;

use crate::errors::StethoscopeError;
use crate::models::EndpointId;

/// Narrow registry interface consumed by the liveness core.
#[async_trait::async_trait]
pub trait RegistryClient: Send + Sync {
    /// All registered application names.
    async fn list_applications(&self) -> Result<Vec<String>, StethoscopeError>;

    /// Service names registered under `application`.
    async fn list_services(&self, application: &str) -> Result<Vec<String>, StethoscopeError>;

    /// Raw endpoint strings registered under `application`/`service`.
    async fn list_endpoints(
        &self,
        application: &str,
        service: &str,
    ) -> Result<Vec<String>, StethoscopeError>;

    /// Remove one endpoint registration.
    async fn remove_endpoint(
        &self,
        application: &str,
        service: &str,
        endpoint: &EndpointId,
    ) -> Result<(), StethoscopeError>;
}

/// Mock registry module for testing.
///
/// Provides an in-memory registry that records removal calls and can be told
/// to fail or hang.
pub mod mock {
    use super::*;
    use std::collections::BTreeMap;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Mutex;

    type Tree = BTreeMap<String, BTreeMap<String, Vec<String>>>;

    /// A recorded `remove_endpoint` call.
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct RemovalCall {
        pub application: String,
        pub service: String,
        pub endpoint: String,
    }

    /// In-memory registry for unit and integration tests.
    #[derive(Default)]
    pub struct MockRegistry {
        tree: Mutex<Tree>,
        removals: Mutex<Vec<RemovalCall>>,
        list_calls: AtomicUsize,
        fail_listing: AtomicBool,
        fail_removal: AtomicBool,
        hang_removal: AtomicBool,
    }

    impl MockRegistry {
        /// Empty registry.
        pub fn new() -> Self {
            Self::default()
        }

        /// Registry pre-populated with `(application, service, endpoint)` triples.
        pub fn with_endpoints(triples: &[(&str, &str, &str)]) -> Self {
            let registry = Self::new();
            {
                let mut tree = registry.lock_tree();
                for (application, service, endpoint) in triples {
                    tree.entry((*application).to_string())
                        .or_default()
                        .entry((*service).to_string())
                        .or_default()
                        .push((*endpoint).to_string());
                }
            }
            registry
        }

        /// Make every list call fail.
        pub fn failing_listing(self) -> Self {
            self.fail_listing.store(true, Ordering::SeqCst);
            self
        }

        /// Make every `remove_endpoint` call fail.
        pub fn failing_removal(self) -> Self {
            self.fail_removal.store(true, Ordering::SeqCst);
            self
        }

        /// Make every `remove_endpoint` call never complete.
        pub fn hanging_removal(self) -> Self {
            self.hang_removal.store(true, Ordering::SeqCst);
            self
        }

        /// Every `remove_endpoint` call made so far, in order.
        pub fn removal_calls(&self) -> Vec<RemovalCall> {
            self.removals
                .lock()
                .map(|calls| calls.clone())
                .unwrap_or_default()
        }

        /// Number of list calls of any kind made so far.
        pub fn list_call_count(&self) -> usize {
            self.list_calls.load(Ordering::SeqCst)
        }

        /// Endpoints currently registered under `application`/`service`.
        pub fn registered(&self, application: &str, service: &str) -> Vec<String> {
            self.lock_tree()
                .get(application)
                .and_then(|services| services.get(service))
                .cloned()
                .unwrap_or_default()
        }

        /// Application names currently registered.
        pub fn applications(&self) -> Vec<String> {
            self.lock_tree().keys().cloned().collect()
        }

        fn lock_tree(&self) -> std::sync::MutexGuard<'_, Tree> {
            self.tree
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner)
        }

        fn check_listing(&self) -> Result<(), StethoscopeError> {
            self.list_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_listing.load(Ordering::SeqCst) {
                return Err(StethoscopeError::Registry(
                    "Mock registry listing error".to_string(),
                ));
            }
            Ok(())
        }
    }

    #[async_trait::async_trait]
    impl RegistryClient for MockRegistry {
        async fn list_applications(&self) -> Result<Vec<String>, StethoscopeError> {
            self.check_listing()?;
            Ok(self.lock_tree().keys().cloned().collect())
        }

        async fn list_services(&self, application: &str) -> Result<Vec<String>, StethoscopeError> {
            self.check_listing()?;
            Ok(self
                .lock_tree()
                .get(application)
                .map(|services| services.keys().cloned().collect())
                .unwrap_or_default())
        }

        async fn list_endpoints(
            &self,
            application: &str,
            service: &str,
        ) -> Result<Vec<String>, StethoscopeError> {
            self.check_listing()?;
            Ok(self.registered(application, service))
        }

        async fn remove_endpoint(
            &self,
            application: &str,
            service: &str,
            endpoint: &EndpointId,
        ) -> Result<(), StethoscopeError> {
            if let Ok(mut calls) = self.removals.lock() {
                calls.push(RemovalCall {
                    application: application.to_string(),
                    service: service.to_string(),
                    endpoint: endpoint.to_string(),
                });
            }

            if self.hang_removal.load(Ordering::SeqCst) {
                std::future::pending::<()>().await;
            }

            if self.fail_removal.load(Ordering::SeqCst) {
                return Err(StethoscopeError::Registry(
                    "Mock registry removal error".to_string(),
                ));
            }

            let mut tree = self.lock_tree();
            if let Some(services) = tree.get_mut(application) {
                if let Some(endpoints) = services.get_mut(service) {
                    endpoints.retain(|e| e != endpoint.as_str());
                    if endpoints.is_empty() {
                        services.remove(service);
                    }
                }
                if services.is_empty() {
                    tree.remove(application);
                }
            }
            Ok(())
        }
    }

}
