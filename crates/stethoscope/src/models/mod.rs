//! Stethoscope models.
//!
//! Endpoint identity and the per-endpoint checkin record held by the
//! liveness cache.

use crate::errors::StethoscopeError;
use std::fmt;
use tokio::time::Instant;

/// Canonical `host:port` identity of a service endpoint.
///
/// IPv6 hosts are bracketed (`[::1]:8080`). Two endpoints are the same
/// entity iff their canonical strings are equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EndpointId(String);

impl EndpointId {
    /// Build the canonical identity from a hostname and port.
    ///
    /// # Errors
    ///
    /// `StethoscopeError::InvalidEndpoint` if the port is outside
    /// `0..=65535`. An empty hostname is allowed and yields `:port`.
    pub fn from_parts(hostname: &str, port: i32) -> Result<Self, StethoscopeError> {
        let port = u16::try_from(port).map_err(|_| {
            StethoscopeError::InvalidEndpoint(format!("port {port} is out of range"))
        })?;

        let host = hostname
            .strip_prefix('[')
            .and_then(|h| h.strip_suffix(']'))
            .unwrap_or(hostname);

        if host.contains(':') {
            Ok(Self(format!("[{host}]:{port}")))
        } else {
            Ok(Self(format!("{host}:{port}")))
        }
    }

    /// Parse an identity as stored in the registry (`host:port` or
    /// `[v6-host]:port`).
    ///
    /// Unbracketed IPv6 strings are split on the last colon.
    ///
    /// # Errors
    ///
    /// `StethoscopeError::InvalidEndpoint` if no port can be found.
    pub fn parse(raw: &str) -> Result<Self, StethoscopeError> {
        let (host, port) = raw.rsplit_once(':').ok_or_else(|| {
            StethoscopeError::InvalidEndpoint(format!("'{raw}' has no port"))
        })?;

        let port: i32 = port.parse().map_err(|_| {
            StethoscopeError::InvalidEndpoint(format!("'{raw}' has a non-numeric port"))
        })?;

        Self::from_parts(host, port)
    }

    /// The canonical string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EndpointId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Liveness record for one endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckinEntry {
    /// Application the endpoint belongs to.
    pub application: String,

    /// Service within the application.
    pub service: String,

    /// Monotonic time of the last checkin (or bootstrap seeding).
    pub last_checkin: Instant,
}

impl CheckinEntry {
    /// Create an entry stamped with the current time.
    pub fn now(application: impl Into<String>, service: impl Into<String>) -> Self {
        Self {
            application: application.into(),
            service: service.into(),
            last_checkin: Instant::now(),
        }
    }
}
