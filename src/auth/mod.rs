//! The authentication and session-lifecycle core.
//!
//! `AuthService` owns the injected collaborators (account store, mail
//! transport, clock, token signer) and exposes one method per operation of
//! the produced surface. Each request-scoped call is a read-modify-write
//! against the store; nothing here holds cross-request mutable state.

pub mod account;
pub mod clock;
pub mod error;
pub mod lockout;
pub mod onboarding;
pub mod password;
pub mod session;
pub mod tokens;
pub mod two_factor;
pub mod verification;

pub use self::account::Account;
pub use self::error::{AuthError, AuthResult};

use std::sync::Arc;

use crate::email::Mailer;
use crate::store::AccountStore;

use self::clock::Clock;
use self::lockout::LockoutPolicy;
use self::tokens::TokenSigner;

const DEFAULT_TOTP_ISSUER: &str = "TeamFlow HR";
const DEFAULT_ONBOARDING_MIN_STEPS: u32 = 8;
const DEFAULT_ONBOARDING_MAX_STEP: u32 = 8;

/// Tunables for the core, defaults matching production behavior.
#[derive(Clone, Debug)]
pub struct AuthConfig {
    frontend_base_url: String,
    totp_issuer: String,
    onboarding_min_steps: u32,
    onboarding_max_step: u32,
    lockout: LockoutPolicy,
}

impl AuthConfig {
    #[must_use]
    pub fn new(frontend_base_url: String) -> Self {
        Self {
            frontend_base_url,
            totp_issuer: DEFAULT_TOTP_ISSUER.to_string(),
            onboarding_min_steps: DEFAULT_ONBOARDING_MIN_STEPS,
            onboarding_max_step: DEFAULT_ONBOARDING_MAX_STEP,
            lockout: LockoutPolicy::default(),
        }
    }

    #[must_use]
    pub fn with_totp_issuer(mut self, issuer: String) -> Self {
        self.totp_issuer = issuer;
        self
    }

    #[must_use]
    pub fn with_onboarding_steps(mut self, min_steps: u32, max_step: u32) -> Self {
        self.onboarding_min_steps = min_steps;
        self.onboarding_max_step = max_step;
        self
    }

    #[must_use]
    pub fn with_lockout(mut self, lockout: LockoutPolicy) -> Self {
        self.lockout = lockout;
        self
    }

    #[must_use]
    pub fn frontend_base_url(&self) -> &str {
        &self.frontend_base_url
    }

    pub(crate) fn totp_issuer(&self) -> &str {
        &self.totp_issuer
    }

    pub(crate) fn onboarding_min_steps(&self) -> u32 {
        self.onboarding_min_steps
    }

    pub(crate) fn onboarding_max_step(&self) -> u32 {
        self.onboarding_max_step
    }

    pub(crate) fn lockout(&self) -> LockoutPolicy {
        self.lockout
    }
}

/// The core service: explicitly constructed collaborators, no implicit
/// lookups. Cheap to share behind an `Arc`.
pub struct AuthService {
    pub(crate) store: Arc<dyn AccountStore>,
    pub(crate) mailer: Arc<dyn Mailer>,
    pub(crate) clock: Arc<dyn Clock>,
    pub(crate) signer: TokenSigner,
    pub(crate) config: AuthConfig,
}

impl AuthService {
    #[must_use]
    pub fn new(
        store: Arc<dyn AccountStore>,
        mailer: Arc<dyn Mailer>,
        clock: Arc<dyn Clock>,
        signer: TokenSigner,
        config: AuthConfig,
    ) -> Self {
        Self {
            store,
            mailer,
            clock,
            signer,
            config,
        }
    }

    #[must_use]
    pub fn config(&self) -> &AuthConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::AuthConfig;
    use crate::auth::lockout::LockoutPolicy;

    #[test]
    fn config_defaults_and_overrides() {
        let config = AuthConfig::new("https://app.teamflow.dev".to_string());
        assert_eq!(config.frontend_base_url(), "https://app.teamflow.dev");
        assert_eq!(config.totp_issuer(), "TeamFlow HR");
        assert_eq!(config.onboarding_min_steps(), 8);
        assert_eq!(config.onboarding_max_step(), 8);

        let config = config
            .with_totp_issuer("Acme".to_string())
            .with_onboarding_steps(3, 5)
            .with_lockout(LockoutPolicy::new(2, 60));
        assert_eq!(config.totp_issuer(), "Acme");
        assert_eq!(config.onboarding_min_steps(), 3);
        assert_eq!(config.onboarding_max_step(), 5);
    }
}
