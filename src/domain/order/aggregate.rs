//! Order aggregate.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{AccountId, OrderId, StateMachine, Timestamp, ValidationError};

use super::pricing::Price;
use super::state::OrderState;

/// Longest rental accepted, in weeks.
pub const MAX_WEEKS: u32 = 520;

/// Validated purchase request: the recipients and duration of a new order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderRequest {
    recipients: Vec<String>,
    weeks: u32,
}

impl OrderRequest {
    /// Validates raw input.
    ///
    /// Blank entries are dropped; every other entry must look like an address.
    /// Duplicates are kept so the account mirrors exactly what was paid for.
    pub fn new(recipients: Vec<String>, weeks: i64) -> Result<Self, ValidationError> {
        if weeks <= 0 || weeks > i64::from(MAX_WEEKS) {
            return Err(ValidationError::out_of_range(
                "weeks",
                1,
                i64::from(MAX_WEEKS),
                weeks,
            ));
        }

        let mut cleaned = Vec::with_capacity(recipients.len());
        for raw in recipients {
            let address = raw.trim();
            if address.is_empty() {
                continue;
            }
            validate_address(address)?;
            cleaned.push(address.to_string());
        }

        if cleaned.is_empty() {
            return Err(ValidationError::empty_field("recipients"));
        }

        Ok(Self {
            recipients: cleaned,
            weeks: weeks as u32,
        })
    }

    pub fn recipients(&self) -> &[String] {
        &self.recipients
    }

    pub fn weeks(&self) -> u32 {
        self.weeks
    }
}

fn validate_address(address: &str) -> Result<(), ValidationError> {
    let Some((local, domain)) = address.split_once('@') else {
        return Err(ValidationError::invalid_format(
            "recipients",
            format!("'{}' is not an email address", address),
        ));
    };
    if local.is_empty() || domain.is_empty() || address.chars().any(char::is_whitespace) {
        return Err(ValidationError::invalid_format(
            "recipients",
            format!("'{}' is not an email address", address),
        ));
    }
    Ok(())
}

/// A purchase of a pooled address, keyed by its checkout reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub price: Price,
    pub state: OrderState,
    pub recipients: Vec<String>,
    pub weeks: u32,
    /// Account id reserved in the same write that settles the order as succeeded.
    pub account_id: Option<AccountId>,
    /// Set once the reserved account has been stored.
    pub account_provisioned: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Order {
    /// Creates a new pending order for an already opened checkout session.
    pub fn pending(id: OrderId, request: OrderRequest, price: Price, now: Timestamp) -> Self {
        Self {
            id,
            price,
            state: OrderState::Pending,
            recipients: request.recipients,
            weeks: request.weeks,
            account_id: None,
            account_provisioned: false,
            created_at: now,
            updated_at: now,
        }
    }

    /// Succeeded but the account it paid for has not been stored yet.
    pub fn awaits_provisioning(&self) -> bool {
        self.state == OrderState::Succeeded && !self.account_provisioned
    }
}
