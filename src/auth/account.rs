//! The durable account record and its invariant-preserving helpers.

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use uuid::Uuid;

/// One issued refresh token: raw value plus the persisted expiry mirroring
/// the signed claim. One entry per concurrent session.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshTokenEntry {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Identity fields captured at signup, before any hashing happens.
#[derive(Clone, Debug)]
pub struct NewAccount {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub password: String,
}

/// The credential store's entity. The password hash and two-factor secret
/// live only here; response types never carry them.
#[derive(Clone, Debug)]
pub struct Account {
    pub id: Uuid,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: Option<String>,
    pub password_hash: String,
    pub is_active: bool,

    pub failed_attempts: u32,
    pub locked_until: Option<DateTime<Utc>>,

    pub refresh_tokens: Vec<RefreshTokenEntry>,

    pub is_email_verified: bool,
    pub email_verification_token_hash: Option<Vec<u8>>,
    pub email_verification_expires: Option<DateTime<Utc>>,

    pub password_reset_token_hash: Option<Vec<u8>>,
    pub password_reset_expires: Option<DateTime<Utc>>,

    pub two_factor_enabled: bool,
    pub two_factor_secret: Option<String>,
    pub two_factor_backup_codes: Vec<String>,

    pub onboarding_completed: bool,
    pub onboarding_step: u32,
    pub onboarding_data: BTreeMap<String, Value>,

    pub last_login: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Account {
    /// Build a fresh account from signup identity plus an already-hashed
    /// password. Email must be normalized by the caller.
    #[must_use]
    pub fn new(identity: &NewAccount, password_hash: String, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            email: identity.email.clone(),
            first_name: identity.first_name.clone(),
            last_name: identity.last_name.clone(),
            phone: identity.phone.clone(),
            password_hash,
            is_active: true,
            failed_attempts: 0,
            locked_until: None,
            refresh_tokens: Vec::new(),
            is_email_verified: false,
            email_verification_token_hash: None,
            email_verification_expires: None,
            password_reset_token_hash: None,
            password_reset_expires: None,
            two_factor_enabled: false,
            two_factor_secret: None,
            two_factor_backup_codes: Vec::new(),
            onboarding_completed: false,
            onboarding_step: 0,
            onboarding_data: BTreeMap::new(),
            last_login: None,
            created_at: now,
        }
    }

    /// Locked status is a pure function of the stored timestamp and "now";
    /// an elapsed lockout needs no stored transition to unlock.
    #[must_use]
    pub fn is_locked(&self, now: DateTime<Utc>) -> bool {
        self.locked_until.is_some_and(|until| until > now)
    }

    /// Drop stale refresh tokens to bound set growth. Maintenance only:
    /// expired tokens already fail validation on their own.
    pub fn clean_expired_tokens(&mut self, now: DateTime<Utc>) {
        self.refresh_tokens.retain(|entry| entry.expires_at > now);
    }

    /// Remove one refresh token by exact value. Returns whether it was present.
    pub fn remove_refresh_token(&mut self, token: &str) -> bool {
        let before = self.refresh_tokens.len();
        self.refresh_tokens.retain(|entry| entry.token != token);
        self.refresh_tokens.len() != before
    }
}

/// Normalize an email for lookup and uniqueness checks.
#[must_use]
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Basic email format check on already-normalized input.
#[must_use]
pub fn valid_email(email_normalized: &str) -> bool {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").is_ok_and(|regex| regex.is_match(email_normalized))
}

#[cfg(test)]
mod tests {
    use super::{Account, NewAccount, RefreshTokenEntry, normalize_email, valid_email};
    use chrono::{Duration, Utc};

    fn account() -> Account {
        let identity = NewAccount {
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            email: "ada@example.com".to_string(),
            phone: None,
            password: String::new(),
        };
        Account::new(&identity, "digest".to_string(), Utc::now())
    }

    #[test]
    fn normalize_email_trims_and_lowercases() {
        assert_eq!(normalize_email(" Ada@Example.COM "), "ada@example.com");
    }

    #[test]
    fn valid_email_accepts_basic_format() {
        assert!(valid_email("a@example.com"));
        assert!(valid_email("name.surname@example.co"));
    }

    #[test]
    fn valid_email_rejects_missing_parts() {
        assert!(!valid_email("not-an-email"));
        assert!(!valid_email("missing-at.example.com"));
        assert!(!valid_email("missing-domain@"));
    }

    #[test]
    fn new_account_starts_unverified_and_unlocked() {
        let account = account();
        assert!(!account.is_email_verified);
        assert!(!account.onboarding_completed);
        assert_eq!(account.onboarding_step, 0);
        assert_eq!(account.failed_attempts, 0);
        assert!(!account.is_locked(Utc::now()));
        assert!(account.refresh_tokens.is_empty());
    }

    #[test]
    fn lock_elapses_as_pure_function_of_time() {
        let now = Utc::now();
        let mut account = account();
        account.locked_until = Some(now + Duration::hours(2));
        assert!(account.is_locked(now));
        assert!(!account.is_locked(now + Duration::hours(2) + Duration::seconds(1)));
    }

    #[test]
    fn clean_expired_tokens_keeps_live_entries() {
        let now = Utc::now();
        let mut account = account();
        account.refresh_tokens = vec![
            RefreshTokenEntry {
                token: "stale".to_string(),
                expires_at: now - Duration::days(1),
            },
            RefreshTokenEntry {
                token: "live".to_string(),
                expires_at: now + Duration::days(7),
            },
        ];
        account.clean_expired_tokens(now);
        assert_eq!(account.refresh_tokens.len(), 1);
        assert_eq!(account.refresh_tokens[0].token, "live");
    }

    #[test]
    fn remove_refresh_token_is_exact_match() {
        let now = Utc::now();
        let mut account = account();
        account.refresh_tokens = vec![RefreshTokenEntry {
            token: "abc".to_string(),
            expires_at: now + Duration::days(7),
        }];
        assert!(!account.remove_refresh_token("ab"));
        assert!(account.remove_refresh_token("abc"));
        assert!(!account.remove_refresh_token("abc"));
    }
}
