//! In-memory account store with its change log.
//!
//! Implements both [`AccountRepository`] and [`ChangeFeed`]: every insert and
//! delete appends a change record under the same lock as the account write.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Mutex;

use crate::domain::account::{Account, Recipient};
use crate::domain::change::ChangeRecord;
use crate::domain::foundation::{AccountId, DomainError, ErrorCode, Timestamp};
use crate::ports::{AccountRepository, ChangeFeed, InsertOutcome, PendingChange};

#[derive(Default)]
struct State {
    accounts: HashMap<AccountId, Account>,
    released: HashSet<AccountId>,
    changes: BTreeMap<i64, Value>,
    next_sequence: i64,
}

impl State {
    fn append(&mut self, payload: Value) {
        self.next_sequence += 1;
        self.changes.insert(self.next_sequence, payload);
    }
}

#[derive(Default)]
pub struct InMemoryAccountStore {
    state: Mutex<State>,
    fail_inserts: AtomicBool,
}

impl InMemoryAccountStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes subsequent inserts fail, to simulate an outage.
    pub fn set_fail_inserts(&self, fail: bool) {
        self.fail_inserts.store(fail, Ordering::SeqCst);
    }

    /// Appends an arbitrary record to the change log.
    pub async fn push_raw_change(&self, payload: Value) {
        self.state.lock().await.append(payload);
    }

    pub async fn accounts(&self) -> Vec<Account> {
        self.state.lock().await.accounts.values().cloned().collect()
    }

    pub async fn pending_change_count(&self) -> usize {
        self.state.lock().await.changes.len()
    }
}

#[async_trait]
impl AccountRepository for InMemoryAccountStore {
    async fn insert(&self, account: &Account) -> Result<InsertOutcome, DomainError> {
        if self.fail_inserts.load(Ordering::SeqCst) {
            return Err(DomainError::new(
                ErrorCode::DatabaseError,
                "account store unavailable",
            ));
        }
        let mut state = self.state.lock().await;
        if state.accounts.contains_key(&account.id) {
            return Ok(InsertOutcome::AlreadyExists);
        }
        state.accounts.insert(account.id.clone(), account.clone());
        state.append(ChangeRecord::inserted(account).to_value());
        Ok(InsertOutcome::Inserted)
    }

    async fn find_by_id(&self, id: &AccountId) -> Result<Option<Account>, DomainError> {
        Ok(self.state.lock().await.accounts.get(id).cloned())
    }

    async fn update_recipients(
        &self,
        id: &AccountId,
        recipients: &[Recipient],
        expected_version: u64,
    ) -> Result<bool, DomainError> {
        let mut state = self.state.lock().await;
        match state.accounts.get_mut(id) {
            Some(account) if account.version == expected_version => {
                account.recipients = recipients.to_vec();
                account.version += 1;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn delete(&self, id: &AccountId) -> Result<bool, DomainError> {
        let mut state = self.state.lock().await;
        match state.accounts.remove(id) {
            Some(account) => {
                state.released.remove(id);
                state.append(ChangeRecord::removed(&account).to_value());
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn find_expired(&self, now: Timestamp, limit: u32) -> Result<Vec<AccountId>, DomainError> {
        let state = self.state.lock().await;
        Ok(state
            .accounts
            .values()
            .filter(|a| a.is_expired(&now))
            .map(|a| a.id.clone())
            .take(limit as usize)
            .collect())
    }

    async fn find_without_recipients(&self, limit: u32) -> Result<Vec<AccountId>, DomainError> {
        let state = self.state.lock().await;
        let mut ids: Vec<AccountId> = state
            .accounts
            .values()
            .filter(|a| !a.has_recipients() && !state.released.contains(&a.id))
            .map(|a| a.id.clone())
            .collect();
        ids.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        ids.truncate(limit as usize);
        Ok(ids)
    }

    async fn mark_route_released(&self, id: &AccountId) -> Result<(), DomainError> {
        let mut state = self.state.lock().await;
        if state.accounts.contains_key(id) {
            state.released.insert(id.clone());
        }
        Ok(())
    }
}

#[async_trait]
impl ChangeFeed for InMemoryAccountStore {
    async fn pending(&self, limit: u32) -> Result<Vec<PendingChange>, DomainError> {
        let state = self.state.lock().await;
        Ok(state
            .changes
            .iter()
            .take(limit as usize)
            .map(|(sequence, payload)| PendingChange {
                sequence: *sequence,
                payload: payload.clone(),
            })
            .collect())
    }

    async fn acknowledge(&self, sequence: i64) -> Result<(), DomainError> {
        self.state.lock().await.changes.remove(&sequence);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn account() -> Account {
        Account::provision(AccountId::new(), &["a@x.com".into()], 1, Timestamp::now())
    }

    #[tokio::test]
    async fn insert_is_idempotent_and_emits_once() {
        let store = InMemoryAccountStore::new();
        let a = account();

        assert_eq!(store.insert(&a).await.unwrap(), InsertOutcome::Inserted);
        assert_eq!(store.insert(&a).await.unwrap(), InsertOutcome::AlreadyExists);

        let pending = store.pending(10).await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].payload["eventName"], "INSERT");
    }

    #[tokio::test]
    async fn delete_emits_remove() {
        let store = InMemoryAccountStore::new();
        let a = account();
        store.insert(&a).await.unwrap();

        assert!(store.delete(&a.id).await.unwrap());
        assert!(!store.delete(&a.id).await.unwrap());

        let pending = store.pending(10).await.unwrap();
        assert_eq!(pending.len(), 2);
        assert_eq!(pending[1].payload["eventName"], "REMOVE");
    }

    #[tokio::test]
    async fn acknowledged_changes_are_not_redelivered() {
        let store = InMemoryAccountStore::new();
        store.insert(&account()).await.unwrap();
        store.insert(&account()).await.unwrap();

        let first = store.pending(10).await.unwrap();
        store.acknowledge(first[0].sequence).await.unwrap();

        let rest = store.pending(10).await.unwrap();
        assert_eq!(rest.len(), 1);
        assert_eq!(rest[0].sequence, first[1].sequence);
    }

    #[tokio::test]
    async fn update_recipients_checks_version() {
        let store = InMemoryAccountStore::new();
        let a = account();
        store.insert(&a).await.unwrap();

        assert!(store.update_recipients(&a.id, &[], a.version).await.unwrap());
        assert!(!store.update_recipients(&a.id, &[], a.version).await.unwrap());

        let stored = store.find_by_id(&a.id).await.unwrap().unwrap();
        assert!(stored.recipients.is_empty());
        assert_eq!(stored.version, a.version + 1);
        assert_eq!(store.find_without_recipients(10).await.unwrap(), vec![a.id]);
    }

    #[tokio::test]
    async fn released_accounts_leave_the_empty_listing() {
        let store = InMemoryAccountStore::new();
        let mut ids = Vec::new();
        for _ in 0..3 {
            let a = account();
            store.insert(&a).await.unwrap();
            store.update_recipients(&a.id, &[], a.version).await.unwrap();
            ids.push(a.id);
        }
        ids.sort_by(|a, b| a.as_str().cmp(b.as_str()));

        assert_eq!(store.find_without_recipients(1).await.unwrap(), vec![ids[0].clone()]);
        store.mark_route_released(&ids[0]).await.unwrap();
        assert_eq!(store.find_without_recipients(1).await.unwrap(), vec![ids[1].clone()]);
        assert_eq!(store.find_without_recipients(10).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn failing_inserts_write_nothing() {
        let store = InMemoryAccountStore::new();
        store.set_fail_inserts(true);
        assert!(store.insert(&account()).await.is_err());
        assert_eq!(store.pending_change_count().await, 0);
    }
}
