//! Session manager: credential verification, token-pair issuance, rotation.

use chrono::{DateTime, Utc};
use tracing::{error, info};
use uuid::Uuid;

use crate::store::InsertOutcome;

use super::AuthService;
use super::account::{Account, NewAccount, RefreshTokenEntry, normalize_email};
use super::error::{AuthError, AuthResult};
use super::password;
use super::tokens::TokenScope;
use super::verification::TokenPurpose;

/// An access/refresh pair as handed to the caller.
#[derive(Clone, Debug)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// What a successful signup produced.
#[derive(Debug)]
pub struct SignupResult {
    pub account: Account,
    pub tokens: TokenPair,
}

/// Credential verification either finishes with tokens or parks the caller
/// behind a second-factor challenge.
#[derive(Debug)]
pub enum SigninOutcome {
    Complete { account: Account, tokens: TokenPair },
    TwoFactorRequired { intermediate_token: String },
}

impl AuthService {
    /// Create an account, stamp its verification token, persist it, issue
    /// the first token pair, and email the verification link.
    ///
    /// The email send is fire-and-forget: once the account is persisted a
    /// transport failure must not undo it. A failure between insertion and
    /// the final save rolls the account back with a compensating delete.
    ///
    /// # Errors
    /// `DuplicateEmail` when the normalized email is already taken.
    pub async fn signup(&self, mut identity: NewAccount) -> AuthResult<SignupResult> {
        identity.email = normalize_email(&identity.email);
        let now = self.clock.now();

        let password_hash = password::hash(&identity.password)?;
        let mut account = Account::new(&identity, password_hash, now);
        let verification_token =
            self.issue_verification_token(&mut account, TokenPurpose::EmailVerification)?;

        match self.store.insert(account.clone()).await? {
            InsertOutcome::Created => {}
            InsertOutcome::DuplicateEmail => return Err(AuthError::DuplicateEmail),
        }

        let tokens = match self.finish_signup(&mut account, now).await {
            Ok(tokens) => tokens,
            Err(err) => {
                // Compensating delete; its own failure is logged, not retried.
                if let Err(delete_err) = self.store.delete(account.id).await {
                    error!(account_id = %account.id, "signup rollback failed: {delete_err}");
                }
                return Err(err);
            }
        };

        self.send_verification_email(&account, &verification_token);
        info!(account_id = %account.id, "account created");

        Ok(SignupResult { account, tokens })
    }

    async fn finish_signup(
        &self,
        account: &mut Account,
        now: DateTime<Utc>,
    ) -> AuthResult<TokenPair> {
        let tokens = self.issue_token_pair(account, now)?;
        self.store.save(account).await?;
        Ok(tokens)
    }

    /// Verify credentials and hand out tokens, or an intermediate token
    /// when the account has two-factor enabled.
    ///
    /// # Errors
    /// `InvalidCredentials` for unknown email or wrong password (identical,
    /// to prevent enumeration), `AccountLocked` while a lockout is active,
    /// `AccountDisabled` for deactivated accounts.
    pub async fn authenticate(&self, email: &str, pw: &str) -> AuthResult<SigninOutcome> {
        let email = normalize_email(email);
        let now = self.clock.now();

        let Some(mut account) = self.store.find_by_email(&email).await? else {
            return Err(AuthError::InvalidCredentials);
        };

        if account.is_locked(now) {
            return Err(AuthError::AccountLocked);
        }

        if !password::verify(pw, &account.password_hash) {
            self.config.lockout().register_failure(&mut account, now);
            self.store.save(&account).await?;
            return Err(AuthError::InvalidCredentials);
        }

        if !account.is_active {
            return Err(AuthError::AccountDisabled);
        }

        self.config.lockout().register_success(&mut account);

        if account.two_factor_enabled {
            // Persist the attempt-counter reset, then park the session
            // behind a short-lived token scoped to the 2FA challenge.
            self.store.save(&account).await?;
            let intermediate = self.signer.issue(TokenScope::TwoFactor, account.id, now)?;
            return Ok(SigninOutcome::TwoFactorRequired {
                intermediate_token: intermediate.token,
            });
        }

        account.last_login = Some(now);
        account.clean_expired_tokens(now);
        let tokens = self.issue_token_pair(&mut account, now)?;
        self.store.save(&account).await?;

        Ok(SigninOutcome::Complete { account, tokens })
    }

    /// Rotate a refresh token: validate it, confirm it is still a member of
    /// the account's set, then atomically swap it for a fresh one. A
    /// presented token is redeemable exactly once; any failure, including
    /// losing the race to a concurrent redemption, is `InvalidToken`.
    pub async fn refresh(&self, presented: &str) -> AuthResult<TokenPair> {
        let now = self.clock.now();
        let account_id = self.signer.verify(TokenScope::Refresh, presented, now)?;

        let Some(account) = self.store.find_by_id(account_id).await? else {
            return Err(AuthError::InvalidToken);
        };
        if !account.is_active {
            return Err(AuthError::InvalidToken);
        }

        let replacement = self.signer.issue(TokenScope::Refresh, account_id, now)?;
        let redeemed = self
            .store
            .redeem_refresh_token(
                account_id,
                presented,
                RefreshTokenEntry {
                    token: replacement.token.clone(),
                    expires_at: replacement.expires_at,
                },
            )
            .await?;
        if !redeemed {
            return Err(AuthError::InvalidToken);
        }

        let access = self.signer.issue(TokenScope::Access, account_id, now)?;
        Ok(TokenPair {
            access_token: access.token,
            refresh_token: replacement.token,
        })
    }

    /// Remove a single refresh token (logout of one session). Idempotent.
    pub async fn revoke(&self, account_id: Uuid, refresh_token: &str) -> AuthResult<()> {
        let Some(mut account) = self.store.find_by_id(account_id).await? else {
            return Err(AuthError::InvalidToken);
        };
        if account.remove_refresh_token(refresh_token) {
            self.store.save(&account).await?;
        }
        Ok(())
    }

    /// Clear the whole refresh-token set (logout everywhere).
    pub async fn revoke_all(&self, account_id: Uuid) -> AuthResult<()> {
        let Some(mut account) = self.store.find_by_id(account_id).await? else {
            return Err(AuthError::InvalidToken);
        };
        account.refresh_tokens.clear();
        self.store.save(&account).await?;
        Ok(())
    }

    /// Resolve a bearer access token to a live account, for protected routes.
    ///
    /// # Errors
    /// `InvalidToken` for bad tokens or vanished accounts, `AccountDisabled`
    /// for deactivated ones.
    pub async fn authenticate_access_token(&self, token: &str) -> AuthResult<Account> {
        let now = self.clock.now();
        let account_id = self.signer.verify(TokenScope::Access, token, now)?;
        let Some(account) = self.store.find_by_id(account_id).await? else {
            return Err(AuthError::InvalidToken);
        };
        if !account.is_active {
            return Err(AuthError::AccountDisabled);
        }
        Ok(account)
    }

    /// Sign a fresh pair and append the refresh entry to the account's set.
    /// The caller persists the account.
    pub(crate) fn issue_token_pair(
        &self,
        account: &mut Account,
        now: DateTime<Utc>,
    ) -> AuthResult<TokenPair> {
        let access = self.signer.issue(TokenScope::Access, account.id, now)?;
        let refresh = self.signer.issue(TokenScope::Refresh, account.id, now)?;
        account.refresh_tokens.push(RefreshTokenEntry {
            token: refresh.token.clone(),
            expires_at: refresh.expires_at,
        });
        Ok(TokenPair {
            access_token: access.token,
            refresh_token: refresh.token,
        })
    }
}
