//! Single-use, time-boxed tokens for email verification and password reset.
//!
//! A token is random bytes handed out exactly once; only its SHA-256 digest
//! is stored, so redemption is a lookup by hash plus an expiry check. The
//! digest is deterministic on purpose (lookups need it) and is not a
//! substitute for password hashing.

use anyhow::{Context, Result};
use base64::Engine;
use chrono::Duration;
use rand::{RngCore, rngs::OsRng};
use serde_json::json;
use sha2::{Digest, Sha256};
use tracing::warn;

use super::AuthService;
use super::account::{Account, normalize_email};
use super::error::{AuthError, AuthResult};
use super::password;

const EMAIL_VERIFICATION_TTL_SECONDS: i64 = 24 * 60 * 60;
const PASSWORD_RESET_TTL_SECONDS: i64 = 10 * 60;

/// Which account fields a single-use token lives in.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TokenPurpose {
    EmailVerification,
    PasswordReset,
}

impl TokenPurpose {
    /// Reset authorizes a credential change, so its window is much tighter.
    #[must_use]
    pub fn ttl_seconds(self) -> i64 {
        match self {
            Self::EmailVerification => EMAIL_VERIFICATION_TTL_SECONDS,
            Self::PasswordReset => PASSWORD_RESET_TTL_SECONDS,
        }
    }
}

/// Create a fresh random token for an email link.
///
/// The returned value is sent to the user exactly once; only the hash is stored.
pub(crate) fn generate_token() -> Result<String> {
    let mut bytes = [0u8; 32];
    OsRng
        .try_fill_bytes(&mut bytes)
        .context("failed to generate token")?;
    Ok(base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes))
}

/// One-way digest used to look a token up without storing the plaintext.
#[must_use]
pub(crate) fn hash_token(token: &str) -> Vec<u8> {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hasher.finalize().to_vec()
}

/// Build the frontend link embedded in outbound email.
fn build_link(frontend_base_url: &str, path: &str, token: &str) -> String {
    let base = frontend_base_url.trim_end_matches('/');
    format!("{base}/{path}/{token}")
}

impl AuthService {
    /// Stamp a new single-use token onto the account and return the plaintext.
    /// The caller is responsible for persisting the account.
    pub(crate) fn issue_verification_token(
        &self,
        account: &mut Account,
        purpose: TokenPurpose,
    ) -> Result<String> {
        let token = generate_token()?;
        let token_hash = hash_token(&token);
        let expires_at = self.clock.now() + Duration::seconds(purpose.ttl_seconds());
        match purpose {
            TokenPurpose::EmailVerification => {
                account.email_verification_token_hash = Some(token_hash);
                account.email_verification_expires = Some(expires_at);
            }
            TokenPurpose::PasswordReset => {
                account.password_reset_token_hash = Some(token_hash);
                account.password_reset_expires = Some(expires_at);
            }
        }
        Ok(token)
    }

    /// Hash the presented token, find the matching account, and enforce the
    /// stored expiry. Any mismatch is `InvalidToken`; the caller applies the
    /// purpose-specific effect and clears the stored hash.
    async fn redeem_verification_token(
        &self,
        token: &str,
        purpose: TokenPurpose,
    ) -> AuthResult<Account> {
        let token_hash = hash_token(token.trim());
        let account = self
            .store
            .find_by_token_hash(purpose, &token_hash)
            .await?
            .ok_or(AuthError::InvalidToken)?;

        let expires_at = match purpose {
            TokenPurpose::EmailVerification => account.email_verification_expires,
            TokenPurpose::PasswordReset => account.password_reset_expires,
        };
        match expires_at {
            Some(expires_at) if expires_at > self.clock.now() => Ok(account),
            _ => Err(AuthError::InvalidToken),
        }
    }

    /// Consume an email-verification token and mark the account verified.
    ///
    /// # Errors
    /// `InvalidToken` if the token is unknown, already used, or expired.
    pub async fn verify_email(&self, token: &str) -> AuthResult<Account> {
        let mut account = self
            .redeem_verification_token(token, TokenPurpose::EmailVerification)
            .await?;
        account.is_email_verified = true;
        account.email_verification_token_hash = None;
        account.email_verification_expires = None;
        self.store.save(&account).await?;
        Ok(account)
    }

    /// Start a password reset: issue a token and email the reset link.
    ///
    /// Unknown emails succeed silently so the endpoint does not reveal
    /// which addresses exist. For a known account the send is awaited, and a
    /// transport failure leaves no reset token persisted.
    ///
    /// # Errors
    /// Infrastructure errors from the store or the mail transport.
    pub async fn forgot_password(&self, email: &str) -> AuthResult<()> {
        let email = normalize_email(email);
        let Some(mut account) = self.store.find_by_email(&email).await? else {
            return Ok(());
        };

        let token = self.issue_verification_token(&mut account, TokenPurpose::PasswordReset)?;
        let reset_url = build_link(self.config.frontend_base_url(), "reset-password", &token);
        self.mailer
            .send(
                &account.email,
                "password_reset",
                &json!({
                    "name": account.first_name,
                    "reset_url": reset_url,
                }),
            )
            .context("failed to queue password reset email")?;

        self.store.save(&account).await?;
        Ok(())
    }

    /// Redeem a reset token and install the new password. Every outstanding
    /// refresh token is revoked: recovering a compromised password must not
    /// leave old sessions alive.
    ///
    /// # Errors
    /// `InvalidToken` if the token is unknown, already used, or expired.
    pub async fn reset_password(&self, token: &str, new_password: &str) -> AuthResult<()> {
        let mut account = self
            .redeem_verification_token(token, TokenPurpose::PasswordReset)
            .await?;
        account.password_hash = password::hash(new_password)?;
        account.password_reset_token_hash = None;
        account.password_reset_expires = None;
        account.refresh_tokens.clear();
        self.store.save(&account).await?;
        Ok(())
    }

    /// Email the verification link for a freshly created account.
    /// Fire-and-forget: a transport failure is logged, never propagated.
    pub(crate) fn send_verification_email(&self, account: &Account, token: &str) {
        let verify_url = build_link(self.config.frontend_base_url(), "verify-email", token);
        if let Err(err) = self.mailer.send(
            &account.email,
            "email_verification",
            &json!({
                "name": account.first_name,
                "verify_url": verify_url,
            }),
        ) {
            warn!(email = %account.email, "failed to send verification email: {err}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{TokenPurpose, build_link, generate_token, hash_token};
    use anyhow::Result;
    use base64::Engine;
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;

    #[test]
    fn generated_tokens_are_32_random_bytes() -> Result<()> {
        let token = generate_token()?;
        let decoded = URL_SAFE_NO_PAD.decode(token.as_bytes())?;
        assert_eq!(decoded.len(), 32);
        assert_ne!(token, generate_token()?);
        Ok(())
    }

    #[test]
    fn hash_token_is_deterministic() {
        assert_eq!(hash_token("token"), hash_token("token"));
        assert_ne!(hash_token("token"), hash_token("other"));
        assert_eq!(hash_token("token").len(), 32);
    }

    #[test]
    fn reset_window_is_tighter_than_verification() {
        assert_eq!(TokenPurpose::EmailVerification.ttl_seconds(), 86_400);
        assert_eq!(TokenPurpose::PasswordReset.ttl_seconds(), 600);
    }

    #[test]
    fn build_link_trims_trailing_slash() {
        let url = build_link("https://app.teamflow.dev/", "verify-email", "tok");
        assert_eq!(url, "https://app.teamflow.dev/verify-email/tok");
    }
}
