//! Stethoscope configuration.
//!
//! Configuration is loaded from environment variables. The registry URL may
//! carry credentials and is redacted in Debug output.

use secrecy::{ExposeSecret, SecretString};
use std::collections::HashMap;
use std::env;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Default gRPC bind address for checkins.
pub const DEFAULT_GRPC_BIND_ADDRESS: &str = "0.0.0.0:50070";

/// Default health/metrics HTTP bind address.
pub const DEFAULT_HEALTH_BIND_ADDRESS: &str = "0.0.0.0:8090";

/// Default expiration window, in minutes since last write.
pub const DEFAULT_WRITE_EXPIRE_MINUTES: u64 = 15;

/// Default maintenance interval in minutes.
pub const DEFAULT_CLEANUP_INTERVAL_MINUTES: u64 = 10;

/// Default per-call bound on registry deregistration.
pub const DEFAULT_DEREGISTER_TIMEOUT_SECONDS: u64 = 10;

/// Default bound on the startup registry walk.
pub const DEFAULT_BOOTSTRAP_TIMEOUT_SECONDS: u64 = 60;

/// Upper bound for minute-valued settings (one year).
pub const MAX_DURATION_MINUTES: u64 = 365 * 24 * 60;

/// Stethoscope configuration.
#[derive(Clone)]
pub struct Config {
    /// Registry (Redis) connection URL.
    pub registry_url: SecretString,

    /// gRPC server bind address (default: "0.0.0.0:50070").
    pub grpc_bind_address: String,

    /// Health and metrics HTTP bind address (default: "0.0.0.0:8090").
    pub health_bind_address: String,

    /// Entries not written within this window are evicted.
    pub expire_after_write: Duration,

    /// Interval between forced maintenance cycles.
    pub cleanup_interval: Duration,

    /// Whether evicted endpoints are removed from the registry.
    /// When false the service only observes.
    pub remove_from_registry: bool,

    /// Upper bound on a single registry removal call.
    pub deregister_timeout: Duration,

    /// Upper bound on the startup registry walk.
    pub bootstrap_timeout: Duration,
}

/// Custom Debug implementation that redacts the registry URL.
impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("registry_url", &"[REDACTED]")
            .field("grpc_bind_address", &self.grpc_bind_address)
            .field("health_bind_address", &self.health_bind_address)
            .field("expire_after_write", &self.expire_after_write)
            .field("cleanup_interval", &self.cleanup_interval)
            .field("remove_from_registry", &self.remove_from_registry)
            .field("deregister_timeout", &self.deregister_timeout)
            .field("bootstrap_timeout", &self.bootstrap_timeout)
            .finish()
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid duration configuration: {0}")]
    InvalidDuration(String),

    #[error("Invalid boolean configuration: {0}")]
    InvalidBool(String),
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load configuration from a HashMap (for testing).
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let registry_url = vars
            .get("REGISTRY_URL")
            .ok_or_else(|| ConfigError::MissingEnvVar("REGISTRY_URL".to_string()))?
            .clone();

        let grpc_bind_address = vars
            .get("STETHOSCOPE_GRPC_BIND_ADDRESS")
            .cloned()
            .unwrap_or_else(|| DEFAULT_GRPC_BIND_ADDRESS.to_string());

        let health_bind_address = vars
            .get("STETHOSCOPE_HEALTH_BIND_ADDRESS")
            .cloned()
            .unwrap_or_else(|| DEFAULT_HEALTH_BIND_ADDRESS.to_string());

        let expire_after_write = parse_minutes(
            vars,
            "STETHOSCOPE_WRITE_EXPIRE_MINUTES",
            DEFAULT_WRITE_EXPIRE_MINUTES,
        )?;

        let cleanup_interval = parse_minutes(
            vars,
            "STETHOSCOPE_CLEANUP_INTERVAL_MINUTES",
            DEFAULT_CLEANUP_INTERVAL_MINUTES,
        )?;

        let deregister_timeout_seconds = parse_positive(
            vars,
            "STETHOSCOPE_DEREGISTER_TIMEOUT_SECONDS",
            DEFAULT_DEREGISTER_TIMEOUT_SECONDS,
        )?;

        let bootstrap_timeout_seconds = parse_positive(
            vars,
            "STETHOSCOPE_BOOTSTRAP_TIMEOUT_SECONDS",
            DEFAULT_BOOTSTRAP_TIMEOUT_SECONDS,
        )?;

        let remove_from_registry =
            if let Some(value_str) = vars.get("STETHOSCOPE_REMOVE_FROM_REGISTRY") {
                value_str.trim().to_ascii_lowercase().parse::<bool>().map_err(|_| {
                    ConfigError::InvalidBool(format!(
                        "STETHOSCOPE_REMOVE_FROM_REGISTRY must be 'true' or 'false', got '{}'",
                        value_str
                    ))
                })?
            } else {
                false
            };

        Ok(Config {
            registry_url: SecretString::from(registry_url),
            grpc_bind_address,
            health_bind_address,
            expire_after_write,
            cleanup_interval,
            remove_from_registry,
            deregister_timeout: Duration::from_secs(deregister_timeout_seconds),
            bootstrap_timeout: Duration::from_secs(bootstrap_timeout_seconds),
        })
    }

    /// Registry URL for opening the client.
    pub fn registry_url(&self) -> &str {
        self.registry_url.expose_secret()
    }
}

/// Parse a strictly positive number of minutes into a `Duration`.
fn parse_minutes(
    vars: &HashMap<String, String>,
    name: &str,
    default: u64,
) -> Result<Duration, ConfigError> {
    let minutes = parse_positive(vars, name, default)?;
    minutes
        .checked_mul(60)
        .filter(|secs| *secs <= MAX_DURATION_MINUTES * 60)
        .map(Duration::from_secs)
        .ok_or_else(|| {
            ConfigError::InvalidDuration(format!(
                "{} of {} minutes is too large (max {})",
                name, minutes, MAX_DURATION_MINUTES
            ))
        })
}

/// Parse a strictly positive integer variable, falling back to `default`.
fn parse_positive(
    vars: &HashMap<String, String>,
    name: &str,
    default: u64,
) -> Result<u64, ConfigError> {
    let Some(value_str) = vars.get(name) else {
        return Ok(default);
    };

    let value: u64 = value_str.parse().map_err(|e| {
        ConfigError::InvalidDuration(format!(
            "{} must be a valid positive integer, got '{}': {}",
            name, value_str, e
        ))
    })?;

    if value == 0 {
        return Err(ConfigError::InvalidDuration(format!(
            "{} must be greater than 0",
            name
        )));
    }

    Ok(value)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn base_vars() -> HashMap<String, String> {
        HashMap::from([(
            "REGISTRY_URL".to_string(),
            "redis://:hunter2@localhost:6379".to_string(),
        )])
    }

    #[test]
    fn test_from_vars_success_with_defaults() {
        let config = Config::from_vars(&base_vars()).expect("Config should load successfully");

        assert_eq!(config.registry_url(), "redis://:hunter2@localhost:6379");
        assert_eq!(config.grpc_bind_address, DEFAULT_GRPC_BIND_ADDRESS);
        assert_eq!(config.health_bind_address, DEFAULT_HEALTH_BIND_ADDRESS);
        assert_eq!(config.expire_after_write, Duration::from_secs(15 * 60));
        assert_eq!(config.cleanup_interval, Duration::from_secs(10 * 60));
        assert!(!config.remove_from_registry);
        assert_eq!(config.deregister_timeout, Duration::from_secs(10));
        assert_eq!(config.bootstrap_timeout, Duration::from_secs(60));
    }

    #[test]
    fn test_from_vars_success_with_custom_values() {
        let mut vars = base_vars();
        vars.insert(
            "STETHOSCOPE_GRPC_BIND_ADDRESS".to_string(),
            "127.0.0.1:50071".to_string(),
        );
        vars.insert(
            "STETHOSCOPE_HEALTH_BIND_ADDRESS".to_string(),
            "127.0.0.1:9090".to_string(),
        );
        vars.insert("STETHOSCOPE_WRITE_EXPIRE_MINUTES".to_string(), "5".to_string());
        vars.insert("STETHOSCOPE_CLEANUP_INTERVAL_MINUTES".to_string(), "1".to_string());
        vars.insert("STETHOSCOPE_REMOVE_FROM_REGISTRY".to_string(), "TRUE".to_string());
        vars.insert(
            "STETHOSCOPE_DEREGISTER_TIMEOUT_SECONDS".to_string(),
            "3".to_string(),
        );
        vars.insert(
            "STETHOSCOPE_BOOTSTRAP_TIMEOUT_SECONDS".to_string(),
            "120".to_string(),
        );

        let config = Config::from_vars(&vars).expect("Config should load successfully");

        assert_eq!(config.grpc_bind_address, "127.0.0.1:50071");
        assert_eq!(config.health_bind_address, "127.0.0.1:9090");
        assert_eq!(config.expire_after_write, Duration::from_secs(300));
        assert_eq!(config.cleanup_interval, Duration::from_secs(60));
        assert!(config.remove_from_registry);
        assert_eq!(config.deregister_timeout, Duration::from_secs(3));
        assert_eq!(config.bootstrap_timeout, Duration::from_secs(120));
    }

    #[test]
    fn test_from_vars_missing_registry_url() {
        let result = Config::from_vars(&HashMap::new());
        assert!(matches!(result, Err(ConfigError::MissingEnvVar(v)) if v == "REGISTRY_URL"));
    }

    #[test]
    fn test_expire_minutes_rejects_zero() {
        let mut vars = base_vars();
        vars.insert("STETHOSCOPE_WRITE_EXPIRE_MINUTES".to_string(), "0".to_string());

        let result = Config::from_vars(&vars);
        assert!(
            matches!(result, Err(ConfigError::InvalidDuration(msg)) if msg.contains("must be greater than 0"))
        );
    }

    #[test]
    fn test_minutes_overflowing_seconds_are_rejected() {
        for name in [
            "STETHOSCOPE_WRITE_EXPIRE_MINUTES",
            "STETHOSCOPE_CLEANUP_INTERVAL_MINUTES",
        ] {
            let mut vars = base_vars();
            vars.insert(name.to_string(), "307445734561825861".to_string());

            let result = Config::from_vars(&vars);
            assert!(
                matches!(&result, Err(ConfigError::InvalidDuration(msg)) if msg.contains("too large")),
                "{name} should be rejected, got {result:?}"
            );
        }
    }

    #[test]
    fn test_minutes_bounded_by_maximum() {
        let mut vars = base_vars();
        vars.insert(
            "STETHOSCOPE_WRITE_EXPIRE_MINUTES".to_string(),
            MAX_DURATION_MINUTES.to_string(),
        );
        let config = Config::from_vars(&vars).unwrap();
        assert_eq!(
            config.expire_after_write,
            Duration::from_secs(MAX_DURATION_MINUTES * 60)
        );

        vars.insert(
            "STETHOSCOPE_WRITE_EXPIRE_MINUTES".to_string(),
            (MAX_DURATION_MINUTES + 1).to_string(),
        );
        assert!(matches!(
            Config::from_vars(&vars),
            Err(ConfigError::InvalidDuration(msg)) if msg.contains("too large")
        ));
    }

    #[test]
    fn test_cleanup_interval_rejects_non_numeric() {
        let mut vars = base_vars();
        vars.insert(
            "STETHOSCOPE_CLEANUP_INTERVAL_MINUTES".to_string(),
            "ten".to_string(),
        );

        let result = Config::from_vars(&vars);
        assert!(
            matches!(result, Err(ConfigError::InvalidDuration(msg)) if msg.contains("must be a valid positive integer"))
        );
    }

    #[test]
    fn test_deregister_timeout_rejects_negative() {
        let mut vars = base_vars();
        vars.insert(
            "STETHOSCOPE_DEREGISTER_TIMEOUT_SECONDS".to_string(),
            "-5".to_string(),
        );

        assert!(matches!(
            Config::from_vars(&vars),
            Err(ConfigError::InvalidDuration(_))
        ));
    }

    #[test]
    fn test_remove_from_registry_rejects_garbage() {
        let mut vars = base_vars();
        vars.insert("STETHOSCOPE_REMOVE_FROM_REGISTRY".to_string(), "yes".to_string());

        let result = Config::from_vars(&vars);
        assert!(
            matches!(result, Err(ConfigError::InvalidBool(msg)) if msg.contains("'yes'"))
        );
    }

    #[test]
    fn test_debug_redacts_registry_url() {
        let config = Config::from_vars(&base_vars()).expect("Config should load successfully");

        let debug_output = format!("{:?}", config);

        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("hunter2"));
        assert!(!debug_output.contains("redis://"));
    }
}
