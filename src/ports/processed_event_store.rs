//! ProcessedEventStore port - dedup ledger for side effects that are not
//! safe to repeat.
//!
//! Keys are claimed before the side effect runs. A claim is per handler, so
//! different handlers can act on the same key independently.
//!
//! ```ignore
//! if !store.try_claim(&key, "intro").await? {
//!     return Ok(()); // already sent, or being sent
//! }
//! match send().await {
//!     Ok(_) => Ok(()),
//!     Err(e) => { store.release(&key, "intro").await?; Err(e) }
//! }
//! ```

use async_trait::async_trait;

use crate::domain::foundation::DomainError;

#[async_trait]
pub trait ProcessedEventStore: Send + Sync {
    /// Atomically records `(key, handler)`. Returns `false` if it was already recorded.
    async fn try_claim(&self, key: &str, handler_name: &str) -> Result<bool, DomainError>;

    /// Drops a claim so the side effect can be attempted again.
    async fn release(&self, key: &str, handler_name: &str) -> Result<(), DomainError>;
}
