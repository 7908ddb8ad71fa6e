//! Configuration management for the reservation server.
//!
//! Loads configuration from environment variables with sensible defaults.
//! Values that fail to parse fall back to their default.

use spotbook_core::{ReservationDefaults, ReservationSettings};
use spotbook_firebase::FirebaseConfig;
use std::env;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Log filter used when `RUST_LOG` is unset or invalid.
pub const DEFAULT_LOG_FILTER: &str = "info,spotbook=debug,tower_http=info";

/// Configuration problems that make startup pointless.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// `FIREBASE_DATABASE_URL` is empty.
    #[error("FIREBASE_DATABASE_URL must not be empty")]
    EmptyDatabaseUrl,

    /// `FIREBASE_CAS_ATTEMPTS` is zero.
    #[error("FIREBASE_CAS_ATTEMPTS must be at least 1")]
    ZeroCasAttempts,

    /// `HOST`/`PORT` do not form a socket address.
    #[error("invalid bind address {0}")]
    InvalidAddress(String),
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP server settings
    pub server: ServerConfig,
    /// Database connection
    pub firebase: FirebaseConfig,
    /// Capacity, paths and defaults of the reservation service
    pub reservations: ReservationSettings,
}

/// HTTP server settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Bind host
    pub host: String,
    /// Bind port
    pub port: u16,
    /// `tracing` filter directives
    pub log_level: String,
    /// Seconds to drain in-flight requests after Ctrl+C
    pub shutdown_timeout: u64,
    /// Install the Prometheus recorder and serve `/metrics`
    pub metrics_enabled: bool,
}

impl Config {
    /// Load configuration from the process environment.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through `lookup`, which returns the value of a
    /// variable or `None` when it is unset.
    #[must_use]
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let lookup = &lookup;
        let string = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let firebase_defaults = FirebaseConfig::default();
        let reservation_defaults = ReservationSettings::default();

        Self {
            server: ServerConfig {
                host: string("HOST", "0.0.0.0"),
                port: parsed(lookup, "PORT").unwrap_or(5000),
                log_level: string("RUST_LOG", DEFAULT_LOG_FILTER),
                shutdown_timeout: parsed(lookup, "SHUTDOWN_TIMEOUT").unwrap_or(30),
                metrics_enabled: lookup("METRICS_ENABLED")
                    .and_then(|s| parse_flag(&s))
                    .unwrap_or(true),
            },
            firebase: FirebaseConfig {
                database_url: string("FIREBASE_DATABASE_URL", &firebase_defaults.database_url),
                project_id: string("FIREBASE_PROJECT_ID", &firebase_defaults.project_id),
                namespace: lookup("FIREBASE_NAMESPACE").filter(|s| !s.trim().is_empty()),
                auth_token: lookup("FIREBASE_AUTH_TOKEN").filter(|s| !s.trim().is_empty()),
                timeout: parsed(lookup, "FIREBASE_TIMEOUT_SECS")
                    .map_or(firebase_defaults.timeout, Duration::from_secs),
                cas_attempts: parsed(lookup, "FIREBASE_CAS_ATTEMPTS")
                    .unwrap_or(firebase_defaults.cas_attempts),
            },
            reservations: ReservationSettings {
                max_capacity: parsed(lookup, "MAX_CAPACITY").unwrap_or(reservation_defaults.max_capacity),
                collection: string("RESERVATIONS_PATH", &reservation_defaults.collection),
                counter_path: string("RESERVATION_COUNTER_PATH", &reservation_defaults.counter_path),
                defaults: ReservationDefaults {
                    membership_type: string(
                        "DEFAULT_MEMBERSHIP_TYPE",
                        &reservation_defaults.defaults.membership_type,
                    ),
                    ..reservation_defaults.defaults
                },
            },
        }
    }

    /// Reject settings the server cannot run with.
    ///
    /// # Errors
    ///
    /// - [`ConfigError::EmptyDatabaseUrl`]
    /// - [`ConfigError::ZeroCasAttempts`]
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.firebase.database_url.trim().is_empty() {
            return Err(ConfigError::EmptyDatabaseUrl);
        }
        if self.firebase.cas_attempts == 0 {
            return Err(ConfigError::ZeroCasAttempts);
        }
        Ok(())
    }
}

impl ServerConfig {
    /// Address to bind.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidAddress`] when `host` is not an IP
    /// address.
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        let addr = format!("{}:{}", self.host, self.port);
        addr.parse().map_err(|_| ConfigError::InvalidAddress(addr))
    }

    /// Drain budget after a shutdown signal.
    #[must_use]
    pub const fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout)
    }
}

fn parsed<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    lookup(key).and_then(|s| s.trim().parse().ok())
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(vars: &[(&str, &str)]) -> Config {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[]);

        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 5000);
        assert_eq!(config.server.shutdown_timeout, 30);
        assert!(config.server.metrics_enabled);
        assert_eq!(config.server.log_level, DEFAULT_LOG_FILTER);
        assert_eq!(config.firebase, FirebaseConfig::default());
        assert_eq!(config.reservations, ReservationSettings::default());
        assert_eq!(config.reservations.max_capacity, 300);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_overrides() {
        let config = config_from(&[
            ("PORT", "8081"),
            ("METRICS_ENABLED", "off"),
            ("FIREBASE_DATABASE_URL", "https://demo.firebaseio.com"),
            ("FIREBASE_AUTH_TOKEN", "secret"),
            ("FIREBASE_TIMEOUT_SECS", "3"),
            ("MAX_CAPACITY", "0"),
            ("RESERVATIONS_PATH", "events/2025/reservations"),
            ("DEFAULT_MEMBERSHIP_TYPE", "standard"),
        ]);

        assert_eq!(config.server.port, 8081);
        assert!(!config.server.metrics_enabled);
        assert_eq!(config.firebase.database_url, "https://demo.firebaseio.com");
        assert_eq!(config.firebase.auth_token.as_deref(), Some("secret"));
        assert_eq!(config.firebase.timeout, Duration::from_secs(3));
        assert_eq!(config.reservations.max_capacity, 0);
        assert_eq!(config.reservations.collection, "events/2025/reservations");
        assert_eq!(config.reservations.defaults.membership_type, "standard");
    }

    #[test]
    fn test_unparseable_values_fall_back() {
        let config = config_from(&[
            ("PORT", "eighty"),
            ("MAX_CAPACITY", "-5"),
            ("METRICS_ENABLED", "maybe"),
            ("FIREBASE_CAS_ATTEMPTS", "lots"),
        ]);

        assert_eq!(config.server.port, 5000);
        assert_eq!(config.reservations.max_capacity, 300);
        assert!(config.server.metrics_enabled);
        assert_eq!(config.firebase.cas_attempts, 8);
    }

    #[test]
    fn test_blank_token_is_unset() {
        let config = config_from(&[("FIREBASE_AUTH_TOKEN", "  ")]);
        assert_eq!(config.firebase.auth_token, None);
    }

    #[test]
    fn test_validate_rejects_bad_firebase_settings() {
        let config = config_from(&[("FIREBASE_DATABASE_URL", "")]);
        assert_eq!(config.validate(), Err(ConfigError::EmptyDatabaseUrl));

        let config = config_from(&[("FIREBASE_CAS_ATTEMPTS", "0")]);
        assert_eq!(config.validate(), Err(ConfigError::ZeroCasAttempts));
    }

    #[test]
    fn test_socket_addr() {
        let config = config_from(&[("HOST", "127.0.0.1"), ("PORT", "9000")]);
        assert_eq!(
            config.server.socket_addr().unwrap(),
            "127.0.0.1:9000".parse::<SocketAddr>().unwrap()
        );

        let config = config_from(&[("HOST", "not a host")]);
        assert!(matches!(
            config.server.socket_addr(),
            Err(ConfigError::InvalidAddress(_))
        ));
    }
}
