//! Pricing configuration

use serde::Deserialize;

use crate::domain::order::FlatPricing;

use super::error::ValidationError;

/// Flat price charged per order, independent of recipients and weeks.
#[derive(Debug, Clone, Deserialize)]
pub struct PricingConfig {
    /// Price in the currency's minor unit (cents)
    #[serde(default = "default_flat_price")]
    pub flat_price_minor_units: i64,

    /// ISO 4217 currency code, lowercase
    #[serde(default = "default_currency")]
    pub currency: String,
}

impl PricingConfig {
    pub fn pricing(&self) -> FlatPricing {
        FlatPricing::new(self.flat_price_minor_units, self.currency.to_lowercase())
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.flat_price_minor_units <= 0 {
            return Err(ValidationError::InvalidPrice);
        }
        if self.currency.len() != 3 || !self.currency.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(ValidationError::InvalidCurrency);
        }
        Ok(())
    }
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            flat_price_minor_units: default_flat_price(),
            currency: default_currency(),
        }
    }
}

fn default_flat_price() -> i64 {
    500
}

fn default_currency() -> String {
    "usd".to_string()
}
