//! Mail route store port.
//!
//! The route is one shared allow-list, read and rewritten wholesale. Writes
//! are conditional on the version that was read.

use async_trait::async_trait;

use crate::domain::foundation::DomainError;

/// Identifies one allow-list rule.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MailRule {
    pub rule_set: String,
    pub name: String,
}

impl MailRule {
    pub fn new(rule_set: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            rule_set: rule_set.into(),
            name: name.into(),
        }
    }
}

impl std::fmt::Display for MailRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.rule_set, self.name)
    }
}

/// Allow-list contents at a given version.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RouteList {
    pub recipients: Vec<String>,
    /// Zero for a rule that has never been written.
    pub version: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    Written,
    /// Someone else wrote since the list was fetched.
    Conflict,
}

#[async_trait]
pub trait MailRouteStore: Send + Sync {
    async fn fetch(&self, rule: &MailRule) -> Result<RouteList, DomainError>;

    /// Replaces the list if the stored version still equals `expected_version`.
    async fn write(
        &self,
        rule: &MailRule,
        recipients: &[String],
        expected_version: u64,
    ) -> Result<WriteOutcome, DomainError>;
}
