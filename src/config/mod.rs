//! Application configuration module
//!
//! Type-safe configuration loaded from environment variables using the
//! `config` and `dotenvy` crates. Variables carry the `POOLED_INBOX` prefix
//! and nested values are separated by double underscores.
//!
//! # Example
//!
//! ```no_run
//! use pooled_inbox::config::AppConfig;
//!
//! let config = AppConfig::load().expect("Failed to load configuration");
//! config.validate().expect("Invalid configuration");
//! ```

mod database;
mod error;
mod mail;
mod payment;
mod pricing;
mod server;
mod workers;

pub use database::DatabaseConfig;
pub use error::{ConfigError, ValidationError};
pub use mail::MailConfig;
pub use payment::PaymentConfig;
pub use pricing::PricingConfig;
pub use server::{Environment, ServerConfig};
pub use workers::WorkersConfig;

use serde::Deserialize;

/// Root application configuration
///
/// Load using [`AppConfig::load()`] which reads from environment variables.
/// Built once at startup and handed to the components that need it.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Server configuration (host, port, environment, HTTP middleware)
    #[serde(default)]
    pub server: ServerConfig,

    /// Database configuration; in-memory storage when absent
    pub database: Option<DatabaseConfig>,

    /// Payment configuration (Stripe)
    pub payment: PaymentConfig,

    /// Flat order price
    #[serde(default)]
    pub pricing: PricingConfig,

    /// Mail domain, intro message and route (Resend)
    pub mail: MailConfig,

    /// Background loops
    #[serde(default)]
    pub workers: WorkersConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// 1. Loads `.env` file if present (for development)
    /// 2. Reads environment variables with `POOLED_INBOX` prefix
    /// 3. Uses `__` (double underscore) to separate nested values
    ///
    /// # Environment Variable Format
    ///
    /// - `POOLED_INBOX__SERVER__PORT=8080` -> `server.port = 8080`
    /// - `POOLED_INBOX__MAIL__DOMAIN=pool.example` -> `mail.domain = pool.example`
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .prefix("POOLED_INBOX")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Validate all configuration values
    ///
    /// Production additionally requires a database and both provider keys,
    /// so it never silently runs on in-memory or mock adapters.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.server.validate()?;
        if let Some(database) = &self.database {
            database.validate()?;
        }
        self.payment.validate()?;
        self.pricing.validate()?;
        self.mail.validate()?;
        self.workers.validate()?;

        if self.is_production() {
            if self.database.is_none() {
                return Err(ValidationError::RequiredInProduction("database"));
            }
            if self.payment.stripe_api_key.is_none() {
                return Err(ValidationError::RequiredInProduction("payment.stripe_api_key"));
            }
            if self.mail.resend_api_key.is_none() {
                return Err(ValidationError::RequiredInProduction("mail.resend_api_key"));
            }
        }
        Ok(())
    }

    pub fn is_production(&self) -> bool {
        self.server.is_production()
    }
}
