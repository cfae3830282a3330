//! Stethoscope error types.
//!
//! Registry failures inside the eviction path are logged and dropped; only
//! bootstrap and configuration failures reach `main`. Checkin callers see
//! `INVALID_ARGUMENT` for malformed endpoints and nothing else.

use thiserror::Error;
use tonic::Status;

/// Stethoscope error type.
#[derive(Debug, Error)]
pub enum StethoscopeError {
    /// Registry backend operation failed.
    #[error("Registry error: {0}")]
    Registry(String),

    /// Registry call exceeded its time bound.
    #[error("Registry call timed out after {0} ms")]
    RegistryTimeout(u64),

    /// Startup walk of the registry failed. Fatal.
    #[error("Bootstrap failed: {0}")]
    Bootstrap(String),

    /// Endpoint has no canonical `host:port` identity.
    #[error("Invalid endpoint: {0}")]
    InvalidEndpoint(String),
}

/// Convert to a gRPC status with a client-safe message.
impl From<StethoscopeError> for Status {
    fn from(err: StethoscopeError) -> Self {
        match err {
            StethoscopeError::InvalidEndpoint(reason) => Status::invalid_argument(reason),
            other => {
                tracing::error!(target: "stethoscope.grpc", error = %other, "Request failed");
                Status::internal("An internal error occurred")
            }
        }
    }
}

impl From<redis::RedisError> for StethoscopeError {
    fn from(err: redis::RedisError) -> Self {
        StethoscopeError::Registry(err.to_string())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_display_registry_error() {
        let error = StethoscopeError::Registry("connection refused".to_string());
        assert_eq!(format!("{}", error), "Registry error: connection refused");
    }

    #[test]
    fn test_display_registry_timeout() {
        let error = StethoscopeError::RegistryTimeout(10_000);
        assert_eq!(
            format!("{}", error),
            "Registry call timed out after 10000 ms"
        );
    }

    #[test]
    fn test_display_bootstrap() {
        let error = StethoscopeError::Bootstrap("registry unreachable".to_string());
        assert_eq!(format!("{}", error), "Bootstrap failed: registry unreachable");
    }

    #[test]
    fn test_display_invalid_endpoint() {
        let error = StethoscopeError::InvalidEndpoint("port out of range".to_string());
        assert_eq!(format!("{}", error), "Invalid endpoint: port out of range");
    }

    #[test]
    fn test_invalid_endpoint_maps_to_invalid_argument() {
        let status: Status = StethoscopeError::InvalidEndpoint("port 70000 is out of range".into()).into();
        assert_eq!(status.code(), tonic::Code::InvalidArgument);
        assert_eq!(status.message(), "port 70000 is out of range");
    }

    #[test]
    fn test_registry_error_maps_to_generic_internal() {
        let status: Status = StethoscopeError::Registry("zk://secret-host".into()).into();
        assert_eq!(status.code(), tonic::Code::Internal);
        assert!(!status.message().contains("secret-host"));
    }

    #[test]
    fn test_redis_error_converts_to_registry_error() {
        let redis_err = redis::RedisError::from((redis::ErrorKind::IoError, "connection reset"));
        let error: StethoscopeError = redis_err.into();
        assert!(matches!(error, StethoscopeError::Registry(msg) if msg.contains("connection reset")));
    }
}
