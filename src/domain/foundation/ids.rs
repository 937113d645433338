//! Strongly-typed identifier value objects.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::ValidationError;

/// Unique identifier for a provisioned forwarding account.
///
/// Opaque to everything but the account store. Also the local part of the
/// account's public address, so it is never reused. New accounts get a
/// random UUID; ids arriving in change records are taken as they are.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountId(String);

impl AccountId {
    /// Creates a new random AccountId.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Wraps an existing id, rejecting blank ones.
    pub fn parse(id: impl Into<String>) -> Result<Self, ValidationError> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(ValidationError::empty_field("account_id"));
        }
        Ok(Self(id))
    }

    /// Returns the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for AccountId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for AccountId {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Identifier of an order: the payment provider's checkout session reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderId(String);

impl OrderId {
    /// Creates an OrderId, rejecting blank references.
    pub fn new(reference: impl Into<String>) -> Result<Self, ValidationError> {
        let reference = reference.into();
        if reference.trim().is_empty() {
            return Err(ValidationError::empty_field("checkout_reference"));
        }
        Ok(Self(reference))
    }

    /// Returns the reference as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Opaque per-recipient credential used to self-unsubscribe.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UnsubscribeToken(String);

impl UnsubscribeToken {
    /// Generates a fresh random token.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Wraps a token received from a link or a stored record.
    pub fn new(token: impl Into<String>) -> Result<Self, ValidationError> {
        let token = token.into();
        if token.trim().is_empty() {
            return Err(ValidationError::empty_field("unsubscribe_token"));
        }
        Ok(Self(token))
    }

    /// Returns the token as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UnsubscribeToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn account_id_generates_unique_values() {
        let a = AccountId::new();
        let b = AccountId::new();
        assert_ne!(a, b);
    }

    #[test]
    fn account_id_parses_from_display() {
        let id = AccountId::new();
        let parsed: AccountId = id.to_string().parse().unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn account_id_accepts_any_non_blank_string() {
        assert_eq!(AccountId::parse("u1").unwrap().as_str(), "u1");
        assert!("".parse::<AccountId>().is_err());
        assert!(AccountId::parse("  ").is_err());
    }

    #[test]
    fn account_id_serializes_transparently() {
        let json = serde_json::to_string(&AccountId::parse("u1").unwrap()).unwrap();
        assert_eq!(json, "\"u1\"");
    }

    #[test]
    fn order_id_rejects_blank_reference() {
        assert!(OrderId::new("").is_err());
        assert!(OrderId::new("   ").is_err());
    }

    #[test]
    fn order_id_keeps_reference() {
        let id = OrderId::new("cs_test_a1b2").unwrap();
        assert_eq!(id.as_str(), "cs_test_a1b2");
        assert_eq!(id.to_string(), "cs_test_a1b2");
    }

    #[test]
    fn unsubscribe_tokens_are_unique() {
        assert_ne!(UnsubscribeToken::generate(), UnsubscribeToken::generate());
    }

    #[test]
    fn unsubscribe_token_rejects_blank() {
        assert!(UnsubscribeToken::new("").is_err());
        assert_eq!(UnsubscribeToken::new("t1").unwrap().as_str(), "t1");
    }
}
