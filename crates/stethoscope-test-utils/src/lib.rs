//! # Stethoscope Test Utilities
//!
//! This crate provides:
//! - Server test harness (`TestStethoscopeServer` for end-to-end checkin tests)
//! - Re-exported `MockRegistry` for seeding and observing the registry
//! - `wait_until` for polling wall-clock expiry
//!
//! ## Usage
//!
//! ```rust,ignore
//! use stethoscope_test_utils::*;
//!
//! #[tokio::test]
//! async fn test_example() -> Result<(), anyhow::Error> {
//!     let registry = Arc::new(MockRegistry::new());
//!     let server = TestStethoscopeServer::spawn(registry, test_settings()).await?;
//!     let mut client = server.client().await?;
//!     // ...
//!     Ok(())
//! }
//! ```

pub mod server_harness;
pub mod wait;

pub use server_harness::{checkin_request, test_settings, TestStethoscopeServer};
pub use wait::wait_until;
pub use stethoscope::registry::mock::{MockRegistry, RemovalCall};
