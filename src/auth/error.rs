//! Domain error taxonomy for the authentication core.

use thiserror::Error;

/// Every recoverable failure an auth operation can return.
///
/// `InvalidCredentials` deliberately merges unknown-email and wrong-password,
/// and `InvalidToken` covers malformed, expired, revoked, and wrong-purpose
/// tokens uniformly, so responses never reveal which check failed.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("an account with this email already exists")]
    DuplicateEmail,

    #[error("invalid email or password")]
    InvalidCredentials,

    #[error("account is temporarily locked due to too many failed login attempts")]
    AccountLocked,

    #[error("account has been deactivated")]
    AccountDisabled,

    #[error("invalid or expired token")]
    InvalidToken,

    #[error("invalid verification code")]
    InvalidCode,

    #[error("two-factor authentication is not enabled")]
    NotEnabled,

    #[error("onboarding steps cannot be skipped")]
    StepSkipped,

    #[error("not enough onboarding steps completed")]
    InsufficientSteps,

    /// Persistence or mail-transport failure; never maps to a domain status.
    #[error(transparent)]
    Infrastructure(#[from] anyhow::Error),
}

pub type AuthResult<T> = std::result::Result<T, AuthError>;
