//! Liveness services.
//!
//! - [`bootstrap`] seeds the cache from the registry at startup
//! - [`eviction`] deregisters endpoints the cache evicts
//! - [`liveness`] ties both to the cache in one owned service object

pub mod bootstrap;
pub mod eviction;
pub mod liveness;

pub use bootstrap::populate_from_registry;
pub use eviction::EvictionHandler;
pub use liveness::{LivenessSettings, Stethoscope};
