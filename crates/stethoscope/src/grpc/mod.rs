//! gRPC surface.

pub mod checkin_service;

pub use checkin_service::CheckinService;
