//! Account-specific error types.
//!
//! Both not-found variants surface to users as 400: the unsubscribe link is
//! the only caller that looks accounts up by id.

use crate::domain::foundation::{AccountId, DomainError, ErrorCode};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccountError {
    NotFound(AccountId),
    RecipientNotFound(AccountId),
    /// Version checks kept failing.
    ConcurrentModification(AccountId),
    Infrastructure(String),
}

impl AccountError {
    pub fn not_found(id: AccountId) -> Self {
        AccountError::NotFound(id)
    }

    pub fn recipient_not_found(id: AccountId) -> Self {
        AccountError::RecipientNotFound(id)
    }

    pub fn infrastructure(message: impl Into<String>) -> Self {
        AccountError::Infrastructure(message.into())
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            AccountError::NotFound(_) => ErrorCode::AccountNotFound,
            AccountError::RecipientNotFound(_) => ErrorCode::RecipientNotFound,
            AccountError::ConcurrentModification(_) => ErrorCode::ConcurrentModification,
            AccountError::Infrastructure(_) => ErrorCode::DatabaseError,
        }
    }

    pub fn message(&self) -> String {
        match self {
            AccountError::NotFound(id) => format!("Account not found: {}", id),
            AccountError::RecipientNotFound(id) => {
                format!("No recipient of account {} holds that token", id)
            }
            AccountError::ConcurrentModification(id) => {
                format!("Account {} kept changing during update", id)
            }
            AccountError::Infrastructure(m) => format!("Internal error: {}", m),
        }
    }

    /// True for lookups that missed, as opposed to failures.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            AccountError::NotFound(_) | AccountError::RecipientNotFound(_)
        )
    }
}

impl std::fmt::Display for AccountError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for AccountError {}

impl From<DomainError> for AccountError {
    fn from(err: DomainError) -> Self {
        AccountError::Infrastructure(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_variants_are_classified() {
        let id = AccountId::new();
        assert!(AccountError::not_found(id.clone()).is_not_found());
        assert!(AccountError::recipient_not_found(id).is_not_found());
        assert!(!AccountError::infrastructure("boom").is_not_found());
    }

    #[test]
    fn codes_match_variants() {
        let id = AccountId::new();
        assert_eq!(AccountError::not_found(id.clone()).code(), ErrorCode::AccountNotFound);
        assert_eq!(
            AccountError::recipient_not_found(id).code(),
            ErrorCode::RecipientNotFound
        );
    }
}
