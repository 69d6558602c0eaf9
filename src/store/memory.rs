//! In-memory account store for tests and DSN-less development runs.

use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::auth::account::{Account, RefreshTokenEntry};
use crate::auth::verification::TokenPurpose;

use super::{AccountStore, InsertOutcome};

/// Accounts behind a single async mutex. The one lock makes every trait
/// method atomic, including the redeem check-and-remove.
#[derive(Debug, Default)]
pub struct MemoryAccountStore {
    accounts: Mutex<HashMap<Uuid, Account>>,
}

impl MemoryAccountStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AccountStore for MemoryAccountStore {
    async fn insert(&self, account: Account) -> Result<InsertOutcome> {
        let mut accounts = self.accounts.lock().await;
        if accounts.values().any(|existing| existing.email == account.email) {
            return Ok(InsertOutcome::DuplicateEmail);
        }
        accounts.insert(account.id, account);
        Ok(InsertOutcome::Created)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Account>> {
        Ok(self.accounts.lock().await.get(&id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Account>> {
        Ok(self
            .accounts
            .lock()
            .await
            .values()
            .find(|account| account.email == email)
            .cloned())
    }

    async fn find_by_token_hash(
        &self,
        purpose: TokenPurpose,
        token_hash: &[u8],
    ) -> Result<Option<Account>> {
        let accounts = self.accounts.lock().await;
        let found = accounts.values().find(|account| {
            let stored = match purpose {
                TokenPurpose::EmailVerification => &account.email_verification_token_hash,
                TokenPurpose::PasswordReset => &account.password_reset_token_hash,
            };
            stored.as_deref() == Some(token_hash)
        });
        Ok(found.cloned())
    }

    async fn save(&self, account: &Account) -> Result<()> {
        self.accounts
            .lock()
            .await
            .insert(account.id, account.clone());
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        self.accounts.lock().await.remove(&id);
        Ok(())
    }

    async fn redeem_refresh_token(
        &self,
        account_id: Uuid,
        presented: &str,
        replacement: RefreshTokenEntry,
    ) -> Result<bool> {
        let mut accounts = self.accounts.lock().await;
        let Some(account) = accounts.get_mut(&account_id) else {
            return Ok(false);
        };
        // Check-and-remove under the lock: a second caller holding the same
        // token finds it gone and loses.
        if !account.remove_refresh_token(presented) {
            return Ok(false);
        }
        account.refresh_tokens.push(replacement);
        Ok(true)
    }
}
