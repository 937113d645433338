//! Account change records.
//!
//! The account store appends one record per insert or removal. Records reach
//! the processor as raw JSON and are decoded exactly once, here.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::account::{Account, AccountSnapshot, SnapshotError};

/// A change to the account store, carrying the full account snapshot.
///
/// Wire form: `{"eventName": "INSERT" | "REMOVE", "snapshot": {...}}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "eventName", content = "snapshot")]
pub enum ChangeRecord {
    #[serde(rename = "INSERT")]
    Inserted(AccountSnapshot),
    #[serde(rename = "REMOVE")]
    Removed(AccountSnapshot),
}

/// Decoded, validated change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccountChange {
    Inserted(Account),
    Removed(Account),
}

impl AccountChange {
    pub fn account(&self) -> &Account {
        match self {
            AccountChange::Inserted(a) | AccountChange::Removed(a) => a,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            AccountChange::Inserted(_) => "INSERT",
            AccountChange::Removed(_) => "REMOVE",
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ChangeDecodeError {
    #[error("malformed change record: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("invalid account snapshot: {0}")]
    InvalidSnapshot(#[from] SnapshotError),

    #[error("inserted account has no recipients")]
    EmptyInsert,
}

impl ChangeRecord {
    pub fn inserted(account: &Account) -> Self {
        ChangeRecord::Inserted(AccountSnapshot::from(account))
    }

    pub fn removed(account: &Account) -> Self {
        ChangeRecord::Removed(AccountSnapshot::from(account))
    }

    pub fn to_value(&self) -> Value {
        // Serializing a derive-only enum of strings and integers cannot fail.
        serde_json::to_value(self).unwrap_or(Value::Null)
    }

    /// Decodes and validates a raw record.
    ///
    /// A removal may carry an empty recipient list; an insert may not.
    pub fn decode(raw: &Value) -> Result<AccountChange, ChangeDecodeError> {
        let record: ChangeRecord = serde_json::from_value(raw.clone())?;
        match record {
            ChangeRecord::Inserted(snapshot) => {
                let account = Account::try_from(snapshot)?;
                if !account.has_recipients() {
                    return Err(ChangeDecodeError::EmptyInsert);
                }
                Ok(AccountChange::Inserted(account))
            }
            ChangeRecord::Removed(snapshot) => Ok(AccountChange::Removed(Account::try_from(snapshot)?)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::{AccountId, Timestamp};
    use serde_json::json;

    fn account() -> Account {
        Account::provision(AccountId::new(), &["a@x.com".to_string()], 1, Timestamp::now())
    }

    #[test]
    fn encodes_event_name_and_snapshot() {
        let account = account();
        let value = ChangeRecord::inserted(&account).to_value();
        assert_eq!(value["eventName"], "INSERT");
        assert_eq!(value["snapshot"]["id"], account.id.to_string());
        assert_eq!(value["snapshot"]["recipients"][0]["address"], "a@x.com");
    }

    #[test]
    fn decodes_insert() {
        let id = AccountId::new();
        let raw = json!({
            "eventName": "INSERT",
            "snapshot": {
                "id": id.to_string(),
                "recipients": [{"address": "a@x.com", "unsubscribeToken": "t1"}],
                "expiresAt": 1_900_000_000
            }
        });

        let change = ChangeRecord::decode(&raw).unwrap();
        assert_eq!(change.kind(), "INSERT");
        assert_eq!(change.account().id, id);
    }

    #[test]
    fn decodes_removal_with_no_recipients() {
        let raw = json!({
            "eventName": "REMOVE",
            "snapshot": {"id": AccountId::new().to_string(), "recipients": [], "expiresAt": 0}
        });
        assert!(matches!(
            ChangeRecord::decode(&raw),
            Ok(AccountChange::Removed(_))
        ));
    }

    #[test]
    fn rejects_insert_with_no_recipients() {
        let raw = json!({
            "eventName": "INSERT",
            "snapshot": {"id": AccountId::new().to_string(), "recipients": [], "expiresAt": 0}
        });
        assert!(matches!(
            ChangeRecord::decode(&raw),
            Err(ChangeDecodeError::EmptyInsert)
        ));
    }

    #[test]
    fn rejects_unknown_event_name() {
        let raw = json!({
            "eventName": "MODIFY",
            "snapshot": {"id": AccountId::new().to_string(), "recipients": [], "expiresAt": 0}
        });
        assert!(matches!(
            ChangeRecord::decode(&raw),
            Err(ChangeDecodeError::Malformed(_))
        ));
    }

    #[test]
    fn rejects_missing_snapshot_fields() {
        let raw = json!({"eventName": "INSERT", "snapshot": {"id": "x"}});
        assert!(matches!(
            ChangeRecord::decode(&raw),
            Err(ChangeDecodeError::Malformed(_))
        ));
    }
}
