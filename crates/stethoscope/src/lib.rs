//! Stethoscope Service Library
//!
//! Stethoscope tracks the liveness of endpoints registered in the
//! service-discovery registry. Endpoints check in periodically; an endpoint
//! that stops checking in is evicted after a fixed window and, when
//! configured, removed from the registry.
//!
//! # Architecture
//!
//! ```text
//! grpc/checkin_service.rs -> services/liveness.rs -> cache/mod.rs
//!                                                      |
//!                            services/eviction.rs <----+ (removal listener)
//!                                    |
//!                               registry/*.rs
//! ```
//!
//! # Modules
//!
//! - `cache` - Expire-after-write liveness cache
//! - `config` - Service configuration from environment
//! - `errors` - Error types with gRPC status mapping
//! - `grpc` - Checkin gRPC service
//! - `models` - Endpoint identity and checkin entry
//! - `observability` - Metrics and health endpoints
//! - `registry` - Registry client trait and backends
//! - `services` - Bootstrap, eviction and the service object
//! - `tasks` - Background maintenance

pub mod cache;
pub mod config;
pub mod errors;
pub mod grpc;
pub mod models;
pub mod observability;
pub mod registry;
pub mod services;
pub mod tasks;
