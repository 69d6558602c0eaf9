//! Persistence interface for the credential store.
//!
//! The core only ever sees this trait; the Postgres and in-memory
//! implementations behind it guarantee per-account atomicity for `save`
//! and an atomic check-and-remove for refresh-token redemption.

mod memory;
mod postgres;

pub use memory::MemoryAccountStore;
pub use postgres::PgAccountStore;

use anyhow::Result;
use async_trait::async_trait;
use uuid::Uuid;

use crate::auth::account::{Account, RefreshTokenEntry};
use crate::auth::verification::TokenPurpose;

/// Outcome of creating an account; duplicate emails are a first-class
/// result, not an error string to parse.
#[derive(Debug)]
pub enum InsertOutcome {
    Created,
    DuplicateEmail,
}

/// Durable storage for accounts. `save` persists every mutated field
/// atomically; concurrent writers to the same account must not interleave
/// partial states.
#[async_trait]
pub trait AccountStore: Send + Sync {
    /// Create a new account, enforcing the unique-email invariant.
    async fn insert(&self, account: Account) -> Result<InsertOutcome>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Account>>;

    /// Lookup by normalized email.
    async fn find_by_email(&self, email: &str) -> Result<Option<Account>>;

    /// Lookup by the stored digest of a single-use token.
    async fn find_by_token_hash(
        &self,
        purpose: TokenPurpose,
        token_hash: &[u8],
    ) -> Result<Option<Account>>;

    /// Persist the account, all-or-nothing.
    async fn save(&self, account: &Account) -> Result<()>;

    /// Physical delete; only used to roll back a partially created signup.
    async fn delete(&self, id: Uuid) -> Result<()>;

    /// Atomically remove `presented` from the account's refresh-token set
    /// and install its replacement. Returns false when the token was not
    /// present, so of two concurrent redemptions exactly one can win.
    async fn redeem_refresh_token(
        &self,
        account_id: Uuid,
        presented: &str,
        replacement: RefreshTokenEntry,
    ) -> Result<bool>;
}
