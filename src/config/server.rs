//! HTTP listener settings and the deployment environment.

use serde::Deserialize;
use std::net::SocketAddr;
use std::time::Duration;

use super::error::ValidationError;

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default)]
    pub environment: Environment,

    /// Fallback filter when `RUST_LOG` is unset
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Applies to `/payments`, the webhook and unsubscribe alike
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Comma-separated origins allowed to call `POST /payments`
    pub cors_origins: Option<String>,
}

/// Production refuses in-memory storage and mock providers.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Production,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ValidationError> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|_| ValidationError::InvalidAddress)
    }

    pub fn is_production(&self) -> bool {
        self.environment == Environment::Production
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn cors_origins_list(&self) -> Vec<String> {
        self.cors_origins
            .iter()
            .flat_map(|s| s.split(','))
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect()
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.port == 0 {
            return Err(ValidationError::InvalidPort);
        }
        // Stripe gives up on a webhook after 30s; anything much longer only
        // holds connections.
        if !(1..=60).contains(&self.request_timeout_secs) {
            return Err(ValidationError::InvalidTimeout);
        }
        self.socket_addr().map(|_| ())
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            environment: Environment::default(),
            log_level: default_log_level(),
            request_timeout_secs: default_request_timeout(),
            cors_origins: None,
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_log_level() -> String {
    "info,pooled_inbox=debug,sqlx=warn".to_string()
}

fn default_request_timeout() -> u64 {
    20
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_listen_on_all_interfaces_in_development() {
        let config = ServerConfig::default();
        assert_eq!(config.socket_addr().unwrap().to_string(), "0.0.0.0:8080");
        assert!(!config.is_production());
        assert_eq!(config.validate(), Ok(()));
    }

    #[test]
    fn test_cors_origins_skip_blank_entries() {
        let config = ServerConfig {
            cors_origins: Some("https://pool.example, ,https://admin.pool.example".to_string()),
            ..Default::default()
        };
        assert_eq!(
            config.cors_origins_list(),
            vec!["https://pool.example", "https://admin.pool.example"]
        );
        assert!(ServerConfig::default().cors_origins_list().is_empty());
    }

    #[test]
    fn test_invalid_listener_settings_are_rejected() {
        let bad_host = ServerConfig {
            host: "not a host".to_string(),
            ..Default::default()
        };
        assert_eq!(bad_host.validate(), Err(ValidationError::InvalidAddress));

        let no_timeout = ServerConfig {
            request_timeout_secs: 0,
            ..Default::default()
        };
        assert_eq!(no_timeout.validate(), Err(ValidationError::InvalidTimeout));

        let long_timeout = ServerConfig {
            request_timeout_secs: 120,
            ..Default::default()
        };
        assert_eq!(long_timeout.validate(), Err(ValidationError::InvalidTimeout));
    }
}
