//! Payment configuration

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use super::error::ValidationError;

/// Payment configuration (Stripe)
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentConfig {
    /// Stripe secret key. Without it checkout sessions come from the mock provider.
    pub stripe_api_key: Option<SecretString>,

    /// Stripe webhook signing secret
    pub stripe_webhook_secret: SecretString,

    /// Stripe API base URL
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// Where checkout returns after payment
    #[serde(default = "default_success_url")]
    pub success_url: String,

    /// Where checkout returns when abandoned
    #[serde(default = "default_cancel_url")]
    pub cancel_url: String,

    /// Reject webhook events created in test mode
    #[serde(default)]
    pub require_livemode: bool,
}

impl PaymentConfig {
    /// Check if using Stripe test mode
    pub fn is_test_mode(&self) -> bool {
        self.stripe_api_key
            .as_ref()
            .map_or(true, |k| k.expose_secret().starts_with("sk_test_"))
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if let Some(key) = &self.stripe_api_key {
            if !key.expose_secret().starts_with("sk_") {
                return Err(ValidationError::InvalidStripeKey);
            }
        }

        let secret = self.stripe_webhook_secret.expose_secret();
        if secret.is_empty() {
            return Err(ValidationError::MissingRequired("STRIPE_WEBHOOK_SECRET"));
        }
        if !secret.starts_with("whsec_") {
            return Err(ValidationError::InvalidStripeWebhookSecret);
        }
        Ok(())
    }
}

fn default_api_base_url() -> String {
    "https://api.stripe.com".to_string()
}

fn default_success_url() -> String {
    "http://localhost:8080/paid".to_string()
}

fn default_cancel_url() -> String {
    "http://localhost:8080/cancelled".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(api_key: Option<&str>, webhook_secret: &str) -> PaymentConfig {
        PaymentConfig {
            stripe_api_key: api_key.map(|k| SecretString::new(k.to_string())),
            stripe_webhook_secret: SecretString::new(webhook_secret.to_string()),
            api_base_url: default_api_base_url(),
            success_url: default_success_url(),
            cancel_url: default_cancel_url(),
            require_livemode: false,
        }
    }

    #[test]
    fn test_valid_config() {
        assert!(config(Some("sk_test_123"), "whsec_abc").validate().is_ok());
        assert!(config(None, "whsec_abc").validate().is_ok());
    }

    #[test]
    fn test_invalid_api_key_prefix() {
        assert_eq!(
            config(Some("pk_test_123"), "whsec_abc").validate(),
            Err(ValidationError::InvalidStripeKey)
        );
    }

    #[test]
    fn test_invalid_webhook_secret() {
        assert_eq!(
            config(Some("sk_test_123"), "secret").validate(),
            Err(ValidationError::InvalidStripeWebhookSecret)
        );
        assert_eq!(
            config(Some("sk_test_123"), "").validate(),
            Err(ValidationError::MissingRequired("STRIPE_WEBHOOK_SECRET"))
        );
    }

    #[test]
    fn test_mode_detection() {
        assert!(config(Some("sk_test_123"), "whsec_abc").is_test_mode());
        assert!(!config(Some("sk_live_123"), "whsec_abc").is_test_mode());
        assert!(config(None, "whsec_abc").is_test_mode());
    }
}
