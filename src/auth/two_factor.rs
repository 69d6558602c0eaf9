//! Two-factor engine: TOTP enrollment, challenge, backup codes, disable.

use anyhow::{Context, Result, anyhow};
use rand::{RngCore, rngs::OsRng};
use sha2::{Digest, Sha256};
use totp_rs::{Algorithm, Secret, TOTP};
use tracing::info;
use uuid::Uuid;

use super::AuthService;
use super::account::Account;
use super::error::{AuthError, AuthResult};
use super::session::TokenPair;
use super::tokens::TokenScope;

const BACKUP_CODE_COUNT: usize = 10;
const BACKUP_CODE_LEN: usize = 8;
// No 0/O/1/I: codes get read off a printout.
const BACKUP_CODE_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

const TOTP_DIGITS: usize = 6;
const TOTP_SKEW: u8 = 1;
const TOTP_STEP: u64 = 30;

/// Material handed to the user exactly once at enrollment.
#[derive(Debug)]
pub struct Enrollment {
    pub secret: String,
    pub provisioning_uri: String,
    pub backup_codes: Vec<String>,
}

/// A completed second-factor challenge.
#[derive(Debug)]
pub struct ChallengeOutcome {
    pub account: Account,
    pub tokens: TokenPair,
    pub used_backup_code: bool,
}

fn build_totp(secret_base32: &str, issuer: &str, label: &str) -> Result<TOTP> {
    let secret = Secret::Encoded(secret_base32.to_string())
        .to_bytes()
        .map_err(|err| anyhow!("invalid TOTP secret: {err:?}"))?;
    TOTP::new(
        Algorithm::SHA1,
        TOTP_DIGITS,
        TOTP_SKEW,
        TOTP_STEP,
        secret,
        Some(issuer.to_string()),
        label.to_string(),
    )
    .map_err(|err| anyhow!("failed to build TOTP: {err}"))
}

/// Check a code against the stored secret within the skew window.
/// The label does not participate in verification.
fn totp_code_matches(secret_base32: &str, issuer: &str, code: &str) -> Result<bool> {
    let totp = build_totp(secret_base32, issuer, "account")?;
    Ok(totp.check_current(code).unwrap_or(false))
}

fn generate_backup_code() -> Result<String> {
    let mut raw = [0u8; BACKUP_CODE_LEN];
    OsRng
        .try_fill_bytes(&mut raw)
        .context("failed to generate backup code")?;
    Ok(raw
        .iter()
        .map(|byte| BACKUP_CODE_ALPHABET[usize::from(*byte) % BACKUP_CODE_ALPHABET.len()] as char)
        .collect())
}

/// Backup codes are random and high-entropy, so a deterministic digest is
/// enough for storage; membership is checked by hash, like single-use tokens.
fn hash_backup_code(code: &str) -> String {
    let normalized: String = code
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .map(|ch| ch.to_ascii_uppercase())
        .collect();
    let mut hasher = Sha256::new();
    hasher.update(normalized.as_bytes());
    hasher
        .finalize()
        .iter()
        .map(|byte| format!("{byte:02x}"))
        .collect()
}

impl AuthService {
    /// Generate a shared secret plus backup codes and persist them on the
    /// account. Enrollment stays provisional: `two_factor_enabled` flips
    /// only on confirmation. Re-running regenerates all material.
    ///
    /// # Errors
    /// `InvalidToken` when the account no longer exists.
    pub async fn begin_two_factor_enrollment(&self, account_id: Uuid) -> AuthResult<Enrollment> {
        let Some(mut account) = self.store.find_by_id(account_id).await? else {
            return Err(AuthError::InvalidToken);
        };

        let secret = Secret::generate_secret();
        let secret_bytes = secret
            .to_bytes()
            .map_err(|err| anyhow!("failed to generate TOTP secret: {err:?}"))?;
        let totp = TOTP::new(
            Algorithm::SHA1,
            TOTP_DIGITS,
            TOTP_SKEW,
            TOTP_STEP,
            secret_bytes,
            Some(self.config.totp_issuer().to_string()),
            account.email.clone(),
        )
        .map_err(|err| anyhow!("failed to build TOTP: {err}"))?;

        let secret_base32 = totp.get_secret_base32();
        let provisioning_uri = totp.get_url();

        let mut backup_codes = Vec::with_capacity(BACKUP_CODE_COUNT);
        let mut code_hashes = Vec::with_capacity(BACKUP_CODE_COUNT);
        for _ in 0..BACKUP_CODE_COUNT {
            let code = generate_backup_code()?;
            code_hashes.push(hash_backup_code(&code));
            backup_codes.push(code);
        }

        account.two_factor_secret = Some(secret_base32.clone());
        account.two_factor_backup_codes = code_hashes;
        self.store.save(&account).await?;

        Ok(Enrollment {
            secret: secret_base32,
            provisioning_uri,
            backup_codes,
        })
    }

    /// Verify the first code against the pending secret and enable 2FA.
    ///
    /// # Errors
    /// `InvalidCode` for a wrong code or when no enrollment is pending.
    pub async fn confirm_two_factor_enrollment(
        &self,
        account_id: Uuid,
        code: &str,
    ) -> AuthResult<()> {
        let Some(mut account) = self.store.find_by_id(account_id).await? else {
            return Err(AuthError::InvalidToken);
        };
        let Some(secret) = account.two_factor_secret.clone() else {
            return Err(AuthError::InvalidCode);
        };
        if !totp_code_matches(&secret, self.config.totp_issuer(), code)? {
            return Err(AuthError::InvalidCode);
        }

        account.two_factor_enabled = true;
        self.store.save(&account).await?;
        info!(account_id = %account.id, "two-factor authentication enabled");
        Ok(())
    }

    /// Finish a sign-in parked behind 2FA. The code is checked against the
    /// TOTP secret first; on failure, against the unused backup codes, where
    /// a match is consumed and succeeds once only. Finalizes exactly like a
    /// plain successful sign-in.
    ///
    /// # Errors
    /// `InvalidToken` for a bad intermediate token, `InvalidCode` when
    /// neither check matches.
    pub async fn complete_two_factor_challenge(
        &self,
        intermediate_token: &str,
        code: &str,
    ) -> AuthResult<ChallengeOutcome> {
        let now = self.clock.now();
        let account_id = self
            .signer
            .verify(TokenScope::TwoFactor, intermediate_token, now)?;

        let Some(mut account) = self.store.find_by_id(account_id).await? else {
            return Err(AuthError::InvalidToken);
        };
        let Some(secret) = account.two_factor_secret.clone() else {
            return Err(AuthError::InvalidToken);
        };

        let mut used_backup_code = false;
        if !totp_code_matches(&secret, self.config.totp_issuer(), code)? {
            let code_hash = hash_backup_code(code);
            let before = account.two_factor_backup_codes.len();
            account
                .two_factor_backup_codes
                .retain(|stored| stored != &code_hash);
            if account.two_factor_backup_codes.len() == before {
                return Err(AuthError::InvalidCode);
            }
            used_backup_code = true;
        }

        account.last_login = Some(now);
        account.clean_expired_tokens(now);
        let tokens = self.issue_token_pair(&mut account, now)?;
        self.store.save(&account).await?;

        Ok(ChallengeOutcome {
            account,
            tokens,
            used_backup_code,
        })
    }

    /// Turn 2FA off. Requires a live TOTP code; backup codes are not
    /// accepted here since disabling is a standing-state change, not a
    /// one-time login. Clears the secret and every backup code.
    ///
    /// # Errors
    /// `NotEnabled` when 2FA is off, `InvalidCode` for a wrong code.
    pub async fn disable_two_factor(&self, account_id: Uuid, code: &str) -> AuthResult<()> {
        let Some(mut account) = self.store.find_by_id(account_id).await? else {
            return Err(AuthError::InvalidToken);
        };
        if !account.two_factor_enabled {
            return Err(AuthError::NotEnabled);
        }
        let Some(secret) = account.two_factor_secret.clone() else {
            return Err(AuthError::NotEnabled);
        };
        if !totp_code_matches(&secret, self.config.totp_issuer(), code)? {
            return Err(AuthError::InvalidCode);
        }

        account.two_factor_enabled = false;
        account.two_factor_secret = None;
        account.two_factor_backup_codes.clear();
        self.store.save(&account).await?;
        info!(account_id = %account.id, "two-factor authentication disabled");
        Ok(())
    }
}
