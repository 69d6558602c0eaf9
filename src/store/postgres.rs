//! Postgres-backed account store.
//!
//! One row per account plus a child table for the refresh-token set, so
//! redemption can be a single conditional `DELETE ... RETURNING` and two
//! concurrent redemptions of the same token cannot both succeed. Schema
//! lives in `migrations/`.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::Value;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Postgres, Row, Transaction};
use std::time::Duration;
use tracing::Instrument;
use uuid::Uuid;

use crate::auth::account::{Account, RefreshTokenEntry};
use crate::auth::verification::TokenPurpose;

use super::{AccountStore, InsertOutcome};

const SELECT_ACCOUNT: &str = r"
    SELECT id, email, first_name, last_name, phone, password_hash, is_active,
           failed_attempts, locked_until,
           is_email_verified, email_verification_token_hash, email_verification_expires,
           password_reset_token_hash, password_reset_expires,
           two_factor_enabled, two_factor_secret, two_factor_backup_codes,
           onboarding_completed, onboarding_step, onboarding_data,
           last_login, created_at
    FROM accounts
";

pub struct PgAccountStore {
    pool: PgPool,
}

impl PgAccountStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect with the pool settings used in production.
    ///
    /// # Errors
    /// Returns an error if the database is unreachable.
    pub async fn connect(dsn: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .min_connections(1)
            .max_connections(5)
            .max_lifetime(Duration::from_secs(60 * 2))
            .test_before_acquire(true)
            .connect(dsn)
            .await
            .context("failed to connect to database")?;
        Ok(Self::new(pool))
    }

    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn load_refresh_tokens(&self, account_id: Uuid) -> Result<Vec<RefreshTokenEntry>> {
        let query = r"
            SELECT token, expires_at
            FROM account_refresh_tokens
            WHERE account_id = $1
            ORDER BY created_at
        ";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT",
            db.statement = query
        );
        let rows = sqlx::query(query)
            .bind(account_id)
            .fetch_all(&self.pool)
            .instrument(span)
            .await
            .context("failed to load refresh tokens")?;
        Ok(rows
            .into_iter()
            .map(|row| RefreshTokenEntry {
                token: row.get("token"),
                expires_at: row.get("expires_at"),
            })
            .collect())
    }

    async fn load_account(&self, filter: &str, row: Option<sqlx::postgres::PgRow>) -> Result<Option<Account>> {
        let Some(row) = row else {
            return Ok(None);
        };
        let mut account = row_to_account(&row).with_context(|| format!("bad account row ({filter})"))?;
        account.refresh_tokens = self.load_refresh_tokens(account.id).await?;
        Ok(Some(account))
    }
}

fn row_to_account(row: &sqlx::postgres::PgRow) -> Result<Account> {
    let backup_codes: Value = row.get("two_factor_backup_codes");
    let onboarding_data: Value = row.get("onboarding_data");
    Ok(Account {
        id: row.get("id"),
        email: row.get("email"),
        first_name: row.get("first_name"),
        last_name: row.get("last_name"),
        phone: row.get("phone"),
        password_hash: row.get("password_hash"),
        is_active: row.get("is_active"),
        failed_attempts: u32::try_from(row.get::<i32, _>("failed_attempts")).unwrap_or(0),
        locked_until: row.get("locked_until"),
        refresh_tokens: Vec::new(),
        is_email_verified: row.get("is_email_verified"),
        email_verification_token_hash: row.get("email_verification_token_hash"),
        email_verification_expires: row.get("email_verification_expires"),
        password_reset_token_hash: row.get("password_reset_token_hash"),
        password_reset_expires: row.get("password_reset_expires"),
        two_factor_enabled: row.get("two_factor_enabled"),
        two_factor_secret: row.get("two_factor_secret"),
        two_factor_backup_codes: serde_json::from_value(backup_codes)
            .context("bad backup code column")?,
        onboarding_completed: row.get("onboarding_completed"),
        onboarding_step: u32::try_from(row.get::<i32, _>("onboarding_step")).unwrap_or(0),
        onboarding_data: serde_json::from_value(onboarding_data)
            .context("bad onboarding data column")?,
        last_login: row.get("last_login"),
        created_at: row.get("created_at"),
    })
}

async fn replace_refresh_tokens(
    tx: &mut Transaction<'_, Postgres>,
    account: &Account,
) -> Result<()> {
    let query = "DELETE FROM account_refresh_tokens WHERE account_id = $1";
    sqlx::query(query)
        .bind(account.id)
        .execute(&mut **tx)
        .await
        .context("failed to clear refresh tokens")?;

    let query = r"
        INSERT INTO account_refresh_tokens (account_id, token, expires_at)
        VALUES ($1, $2, $3)
    ";
    for entry in &account.refresh_tokens {
        sqlx::query(query)
            .bind(account.id)
            .bind(&entry.token)
            .bind(entry.expires_at)
            .execute(&mut **tx)
            .await
            .context("failed to insert refresh token")?;
    }
    Ok(())
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.code().is_some_and(|code| code.as_ref() == "23505"),
        _ => false,
    }
}

#[async_trait]
impl AccountStore for PgAccountStore {
    async fn insert(&self, account: Account) -> Result<InsertOutcome> {
        let mut tx = self.pool.begin().await.context("begin insert transaction")?;

        let query = r"
            INSERT INTO accounts
                (id, email, first_name, last_name, phone, password_hash, is_active,
                 failed_attempts, locked_until,
                 is_email_verified, email_verification_token_hash, email_verification_expires,
                 password_reset_token_hash, password_reset_expires,
                 two_factor_enabled, two_factor_secret, two_factor_backup_codes,
                 onboarding_completed, onboarding_step, onboarding_data,
                 last_login, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14,
                    $15, $16, $17, $18, $19, $20, $21, $22)
        ";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "INSERT",
            db.statement = query
        );
        let result = sqlx::query(query)
            .bind(account.id)
            .bind(&account.email)
            .bind(&account.first_name)
            .bind(&account.last_name)
            .bind(&account.phone)
            .bind(&account.password_hash)
            .bind(account.is_active)
            .bind(i32::try_from(account.failed_attempts).unwrap_or(i32::MAX))
            .bind(account.locked_until)
            .bind(account.is_email_verified)
            .bind(&account.email_verification_token_hash)
            .bind(account.email_verification_expires)
            .bind(&account.password_reset_token_hash)
            .bind(account.password_reset_expires)
            .bind(account.two_factor_enabled)
            .bind(&account.two_factor_secret)
            .bind(serde_json::to_value(&account.two_factor_backup_codes)?)
            .bind(account.onboarding_completed)
            .bind(i32::try_from(account.onboarding_step).unwrap_or(i32::MAX))
            .bind(serde_json::to_value(&account.onboarding_data)?)
            .bind(account.last_login)
            .bind(account.created_at)
            .execute(&mut *tx)
            .instrument(span)
            .await;

        if let Err(err) = result {
            if is_unique_violation(&err) {
                let _ = tx.rollback().await;
                return Ok(InsertOutcome::DuplicateEmail);
            }
            return Err(err).context("failed to insert account");
        }

        replace_refresh_tokens(&mut tx, &account).await?;
        tx.commit().await.context("commit insert transaction")?;
        Ok(InsertOutcome::Created)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Account>> {
        let query = format!("{SELECT_ACCOUNT} WHERE id = $1");
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT",
            db.statement = query.as_str()
        );
        let row = sqlx::query(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .instrument(span)
            .await
            .context("failed to load account by id")?;
        self.load_account("by id", row).await
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Account>> {
        let query = format!("{SELECT_ACCOUNT} WHERE email = $1");
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT",
            db.statement = query.as_str()
        );
        let row = sqlx::query(&query)
            .bind(email)
            .fetch_optional(&self.pool)
            .instrument(span)
            .await
            .context("failed to load account by email")?;
        self.load_account("by email", row).await
    }

    async fn find_by_token_hash(
        &self,
        purpose: TokenPurpose,
        token_hash: &[u8],
    ) -> Result<Option<Account>> {
        let column = match purpose {
            TokenPurpose::EmailVerification => "email_verification_token_hash",
            TokenPurpose::PasswordReset => "password_reset_token_hash",
        };
        let query = format!("{SELECT_ACCOUNT} WHERE {column} = $1");
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT",
            db.statement = query.as_str()
        );
        let row = sqlx::query(&query)
            .bind(token_hash)
            .fetch_optional(&self.pool)
            .instrument(span)
            .await
            .context("failed to load account by token hash")?;
        self.load_account("by token hash", row).await
    }

    async fn save(&self, account: &Account) -> Result<()> {
        let mut tx = self.pool.begin().await.context("begin save transaction")?;

        let query = r"
            UPDATE accounts SET
                email = $2, first_name = $3, last_name = $4, phone = $5,
                password_hash = $6, is_active = $7,
                failed_attempts = $8, locked_until = $9,
                is_email_verified = $10, email_verification_token_hash = $11,
                email_verification_expires = $12,
                password_reset_token_hash = $13, password_reset_expires = $14,
                two_factor_enabled = $15, two_factor_secret = $16,
                two_factor_backup_codes = $17,
                onboarding_completed = $18, onboarding_step = $19, onboarding_data = $20,
                last_login = $21
            WHERE id = $1
        ";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "UPDATE",
            db.statement = query
        );
        sqlx::query(query)
            .bind(account.id)
            .bind(&account.email)
            .bind(&account.first_name)
            .bind(&account.last_name)
            .bind(&account.phone)
            .bind(&account.password_hash)
            .bind(account.is_active)
            .bind(i32::try_from(account.failed_attempts).unwrap_or(i32::MAX))
            .bind(account.locked_until)
            .bind(account.is_email_verified)
            .bind(&account.email_verification_token_hash)
            .bind(account.email_verification_expires)
            .bind(&account.password_reset_token_hash)
            .bind(account.password_reset_expires)
            .bind(account.two_factor_enabled)
            .bind(&account.two_factor_secret)
            .bind(serde_json::to_value(&account.two_factor_backup_codes)?)
            .bind(account.onboarding_completed)
            .bind(i32::try_from(account.onboarding_step).unwrap_or(i32::MAX))
            .bind(serde_json::to_value(&account.onboarding_data)?)
            .bind(account.last_login)
            .execute(&mut *tx)
            .instrument(span)
            .await
            .context("failed to update account")?;

        replace_refresh_tokens(&mut tx, account).await?;
        tx.commit().await.context("commit save transaction")?;
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        // Child rows go with the account via ON DELETE CASCADE.
        let query = "DELETE FROM accounts WHERE id = $1";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "DELETE",
            db.statement = query
        );
        sqlx::query(query)
            .bind(id)
            .execute(&self.pool)
            .instrument(span)
            .await
            .context("failed to delete account")?;
        Ok(())
    }

    async fn redeem_refresh_token(
        &self,
        account_id: Uuid,
        presented: &str,
        replacement: RefreshTokenEntry,
    ) -> Result<bool> {
        let mut tx = self.pool.begin().await.context("begin redeem transaction")?;

        // Conditional delete: zero rows means the token was already
        // redeemed or revoked, and this caller loses.
        let query = r"
            DELETE FROM account_refresh_tokens
            WHERE account_id = $1 AND token = $2
        ";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "DELETE",
            db.statement = query
        );
        let result = sqlx::query(query)
            .bind(account_id)
            .bind(presented)
            .execute(&mut *tx)
            .instrument(span)
            .await
            .context("failed to redeem refresh token")?;

        if result.rows_affected() == 0 {
            let _ = tx.rollback().await;
            return Ok(false);
        }

        let query = r"
            INSERT INTO account_refresh_tokens (account_id, token, expires_at)
            VALUES ($1, $2, $3)
        ";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "INSERT",
            db.statement = query
        );
        sqlx::query(query)
            .bind(account_id)
            .bind(&replacement.token)
            .bind(replacement.expires_at)
            .execute(&mut *tx)
            .instrument(span)
            .await
            .context("failed to insert replacement refresh token")?;

        tx.commit().await.context("commit redeem transaction")?;
        Ok(true)
    }
}
