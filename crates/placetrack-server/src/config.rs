//! Server configuration.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default listen port.
const DEFAULT_PORT: u16 = 5000;
/// Default identity lookup ceiling in seconds.
const DEFAULT_LOOKUP_TIMEOUT_SECS: u64 = 20;

/// Configuration errors.
///
/// All of these are fatal at startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// No token signing secret was configured.
    #[error("Missing token signing secret (set PLACETRACK_JWT_SECRET)")]
    MissingSecret,

    /// The configured secret could not be decoded.
    #[error("Invalid token signing secret: {0}")]
    InvalidSecret(String),

    /// The bind address could not be parsed.
    #[error("Invalid bind address: {0}")]
    InvalidAddress(String),
}

/// Runtime mode, gating diagnostic detail in error responses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuntimeMode {
    /// Error responses include diagnostic detail.
    Development,
    /// Error responses never include diagnostic detail.
    #[default]
    Production,
}

impl RuntimeMode {
    /// Check if this is development mode.
    #[must_use]
    pub fn is_development(&self) -> bool {
        matches!(self, Self::Development)
    }
}

impl std::str::FromStr for RuntimeMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "development" | "dev" => Ok(Self::Development),
            "production" | "prod" => Ok(Self::Production),
            _ => Err(format!("Unknown runtime mode: {s}")),
        }
    }
}

/// Authentication configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Token signing secret (hex-encoded). Required at startup.
    #[serde(default)]
    pub jwt_secret: Option<String>,

    /// Ceiling on identity lookups during request authentication, in
    /// seconds. A store that does not answer within this window fails
    /// the request.
    #[serde(default = "default_lookup_timeout")]
    pub lookup_timeout_secs: u64,
}

fn default_lookup_timeout() -> u64 {
    DEFAULT_LOOKUP_TIMEOUT_SECS
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: None,
            lookup_timeout_secs: default_lookup_timeout(),
        }
    }
}

impl AuthConfig {
    /// Get the identity lookup ceiling as a Duration.
    #[must_use]
    pub fn lookup_timeout(&self) -> Duration {
        Duration::from_secs(self.lookup_timeout_secs)
    }

    /// Load overrides from environment variables.
    #[must_use]
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(secret) = std::env::var("PLACETRACK_JWT_SECRET") {
            self.jwt_secret = Some(secret);
        }

        if let Ok(secs) = std::env::var("PLACETRACK_LOOKUP_TIMEOUT_SECS") {
            if let Ok(secs) = secs.parse() {
                self.lookup_timeout_secs = secs;
            }
        }

        self
    }
}

/// Server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Bind address.
    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    /// Runtime mode.
    #[serde(default)]
    pub mode: RuntimeMode,

    /// Data directory for persistent storage.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Authentication configuration.
    #[serde(default)]
    pub auth: AuthConfig,
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_bind_address() -> String {
    "127.0.0.1".to_string()
}

fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("placetrack")
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            bind_address: default_bind_address(),
            mode: RuntimeMode::default(),
            data_dir: default_data_dir(),
            auth: AuthConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Create a new config builder.
    #[must_use]
    pub fn builder() -> ServerConfigBuilder {
        ServerConfigBuilder::default()
    }

    /// Load overrides from environment variables.
    #[must_use]
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(mode) = std::env::var("PLACETRACK_MODE") {
            if let Ok(mode) = mode.parse() {
                self.mode = mode;
            }
        }

        if let Ok(port) = std::env::var("PLACETRACK_PORT") {
            if let Ok(port) = port.parse() {
                self.port = port;
            }
        }

        self.auth = self.auth.with_env_overrides();
        self
    }
}

/// Builder for `ServerConfig`.
#[derive(Debug, Default)]
pub struct ServerConfigBuilder {
    config: ServerConfig,
}

impl ServerConfigBuilder {
    /// Set the listen port.
    #[must_use]
    pub fn port(mut self, port: u16) -> Self {
        self.config.port = port;
        self
    }

    /// Set the bind address.
    #[must_use]
    pub fn bind_address(mut self, addr: impl Into<String>) -> Self {
        self.config.bind_address = addr.into();
        self
    }

    /// Set the runtime mode.
    #[must_use]
    pub fn mode(mut self, mode: RuntimeMode) -> Self {
        self.config.mode = mode;
        self
    }

    /// Set the data directory.
    #[must_use]
    pub fn data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.data_dir = dir.into();
        self
    }

    /// Set the token signing secret.
    #[must_use]
    pub fn jwt_secret(mut self, secret: impl Into<String>) -> Self {
        self.config.auth.jwt_secret = Some(secret.into());
        self
    }

    /// Set the identity lookup ceiling in seconds.
    #[must_use]
    pub fn lookup_timeout_secs(mut self, secs: u64) -> Self {
        self.config.auth.lookup_timeout_secs = secs;
        self
    }

    /// Build the config.
    #[must_use]
    pub fn build(self) -> ServerConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.port, 5000);
        assert_eq!(config.bind_address, "127.0.0.1");
        assert_eq!(config.mode, RuntimeMode::Production);
        assert!(config.auth.jwt_secret.is_none());
        assert_eq!(config.auth.lookup_timeout(), Duration::from_secs(20));
    }

    #[test]
    fn test_builder() {
        let config = ServerConfig::builder()
            .port(8080)
            .mode(RuntimeMode::Development)
            .jwt_secret("deadbeef")
            .lookup_timeout_secs(5)
            .build();

        assert_eq!(config.port, 8080);
        assert!(config.mode.is_development());
        assert_eq!(config.auth.jwt_secret.as_deref(), Some("deadbeef"));
        assert_eq!(config.auth.lookup_timeout_secs, 5);
    }

    #[test]
    fn test_mode_parsing() {
        assert_eq!("dev".parse::<RuntimeMode>().unwrap(), RuntimeMode::Development);
        assert_eq!("production".parse::<RuntimeMode>().unwrap(), RuntimeMode::Production);
        assert!("staging".parse::<RuntimeMode>().is_err());
    }
}
