//! Protocol Buffer code for the Stethoscope checkin service.
//!
//! `build.rs` compiles `proto/stethoscope.proto` into `generated/` with
//! `tonic-build` on every build where the proto changed.

#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::doc_markdown)] // Generated code has various doc formatting

// Re-export prost traits for convenience
pub use prost::Message;

// Generated service code is outside the workspace no-panic policy
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
pub mod stethoscope {
    //! Endpoint checkin messages and service
    include!("generated/stethoscope.rs");
}
