//! Order pricing.
//!
//! Pricing by recipient count and duration is owned by the business and has
//! not been defined, so the only policy is a flat configured price.

use serde::{Deserialize, Serialize};

/// An amount in minor currency units (cents for USD).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Price {
    pub amount_minor: i64,
    pub currency: String,
}

/// Quotes the same price for every order.
#[derive(Debug, Clone)]
pub struct FlatPricing {
    price: Price,
}

impl FlatPricing {
    pub fn new(amount_minor: i64, currency: impl Into<String>) -> Self {
        Self {
            price: Price {
                amount_minor,
                currency: currency.into().to_lowercase(),
            },
        }
    }

    /// Quote for an order. Inputs are accepted for the day a real formula exists.
    pub fn quote(&self, _recipient_count: usize, _weeks: u32) -> Price {
        self.price.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flat_pricing_ignores_order_shape() {
        let pricing = FlatPricing::new(500, "USD");
        assert_eq!(pricing.quote(1, 1), pricing.quote(20, 52));
        assert_eq!(pricing.quote(3, 4).amount_minor, 500);
        assert_eq!(pricing.quote(3, 4).currency, "usd");
    }
}
