//! Brute-force lockout policy.
//!
//! A stateless decision function over the account's failed-attempt counter
//! and lockout timestamp. Callers persist the account after every hook.

use chrono::{DateTime, Duration, Utc};

use super::account::Account;

const DEFAULT_MAX_FAILED_ATTEMPTS: u32 = 5;
const DEFAULT_LOCKOUT_SECONDS: i64 = 2 * 60 * 60;

#[derive(Clone, Copy, Debug)]
pub struct LockoutPolicy {
    max_failed_attempts: u32,
    lockout_seconds: i64,
}

impl Default for LockoutPolicy {
    fn default() -> Self {
        Self {
            max_failed_attempts: DEFAULT_MAX_FAILED_ATTEMPTS,
            lockout_seconds: DEFAULT_LOCKOUT_SECONDS,
        }
    }
}

impl LockoutPolicy {
    #[must_use]
    pub fn new(max_failed_attempts: u32, lockout_seconds: i64) -> Self {
        Self {
            max_failed_attempts,
            lockout_seconds,
        }
    }

    /// Record a failed credential check. Crossing the threshold stamps
    /// `locked_until` and resets the counter to zero, so the counter stays
    /// bounded and a later run of failures re-locks cleanly.
    pub fn register_failure(&self, account: &mut Account, now: DateTime<Utc>) {
        account.failed_attempts += 1;
        if account.failed_attempts >= self.max_failed_attempts {
            account.locked_until = Some(now + Duration::seconds(self.lockout_seconds));
            account.failed_attempts = 0;
        }
    }

    /// Record a successful credential check: counter back to zero, lock cleared.
    pub fn register_success(&self, account: &mut Account) {
        account.failed_attempts = 0;
        account.locked_until = None;
    }
}
