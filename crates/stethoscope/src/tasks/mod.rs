//! Background tasks.

pub mod cache_maintenance;

pub use cache_maintenance::start_cache_maintenance;
