//! Signed token issuance and verification.
//!
//! Access, refresh, and intermediate two-factor tokens are HS256 JWTs
//! carrying the account id, issue/expiry claims, and a scope. Access and
//! refresh tokens are signed with separate secrets; the intermediate token
//! shares the access secret but is fenced off by its scope claim. Expiry is
//! checked against the injected clock, never the library's system time.

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::error::AuthError;

const DEFAULT_ACCESS_TTL_SECONDS: i64 = 15 * 60;
const DEFAULT_REFRESH_TTL_SECONDS: i64 = 7 * 24 * 60 * 60;
const DEFAULT_TWO_FACTOR_TTL_SECONDS: i64 = 5 * 60;

/// What a signed token is allowed to do.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TokenScope {
    /// Authorizes protected operations; short-lived, never persisted.
    Access,
    /// Redeemable exactly once for a new pair; mirrored in the account's set.
    Refresh,
    /// Only completes a pending two-factor challenge.
    TwoFactor,
}

impl TokenScope {
    fn as_str(self) -> &'static str {
        match self {
            Self::Access => "access",
            Self::Refresh => "refresh",
            Self::TwoFactor => "2fa",
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: String,
    iat: i64,
    exp: i64,
    scope: String,
    jti: String,
}

/// A freshly signed token with the expiry baked into its claims.
#[derive(Clone, Debug)]
pub struct SignedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Issues and verifies the three token kinds.
#[derive(Clone, Debug)]
pub struct TokenSigner {
    access_secret: String,
    refresh_secret: String,
    access_ttl_seconds: i64,
    refresh_ttl_seconds: i64,
    two_factor_ttl_seconds: i64,
}

impl TokenSigner {
    #[must_use]
    pub fn new(access_secret: String, refresh_secret: String) -> Self {
        Self {
            access_secret,
            refresh_secret,
            access_ttl_seconds: DEFAULT_ACCESS_TTL_SECONDS,
            refresh_ttl_seconds: DEFAULT_REFRESH_TTL_SECONDS,
            two_factor_ttl_seconds: DEFAULT_TWO_FACTOR_TTL_SECONDS,
        }
    }

    #[must_use]
    pub fn with_access_ttl_seconds(mut self, seconds: i64) -> Self {
        self.access_ttl_seconds = seconds;
        self
    }

    #[must_use]
    pub fn with_refresh_ttl_seconds(mut self, seconds: i64) -> Self {
        self.refresh_ttl_seconds = seconds;
        self
    }

    #[must_use]
    pub fn with_two_factor_ttl_seconds(mut self, seconds: i64) -> Self {
        self.two_factor_ttl_seconds = seconds;
        self
    }

    fn secret(&self, scope: TokenScope) -> &[u8] {
        match scope {
            TokenScope::Access | TokenScope::TwoFactor => self.access_secret.as_bytes(),
            TokenScope::Refresh => self.refresh_secret.as_bytes(),
        }
    }

    fn ttl_seconds(&self, scope: TokenScope) -> i64 {
        match scope {
            TokenScope::Access => self.access_ttl_seconds,
            TokenScope::Refresh => self.refresh_ttl_seconds,
            TokenScope::TwoFactor => self.two_factor_ttl_seconds,
        }
    }

    /// Sign a token for `account_id` expiring after the scope's TTL.
    ///
    /// # Errors
    /// Returns an error if JWT encoding fails.
    pub fn issue(
        &self,
        scope: TokenScope,
        account_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<SignedToken> {
        let expires_at = now + Duration::seconds(self.ttl_seconds(scope));
        let claims = Claims {
            sub: account_id.to_string(),
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
            scope: scope.as_str().to_string(),
            jti: Uuid::new_v4().to_string(),
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret(scope)),
        )
        .context("failed to sign token")?;
        Ok(SignedToken { token, expires_at })
    }

    /// Verify signature, scope, and expiry; return the embedded account id.
    ///
    /// # Errors
    /// Returns `InvalidToken` for any failure, without distinguishing them.
    pub fn verify(
        &self,
        scope: TokenScope,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<Uuid, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        // Expiry is compared against the injected clock below.
        validation.validate_exp = false;

        let data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret(scope)),
            &validation,
        )
        .map_err(|_| AuthError::InvalidToken)?;

        if data.claims.scope != scope.as_str() || data.claims.exp <= now.timestamp() {
            return Err(AuthError::InvalidToken);
        }

        Uuid::parse_str(&data.claims.sub).map_err(|_| AuthError::InvalidToken)
    }
}

#[cfg(test)]
mod tests {
    use super::{TokenScope, TokenSigner};
    use crate::auth::error::AuthError;
    use anyhow::Result;
    use chrono::{Duration, Utc};
    use uuid::Uuid;

    fn signer() -> TokenSigner {
        TokenSigner::new("access-secret".to_string(), "refresh-secret".to_string())
    }

    #[test]
    fn issue_and_verify_round_trip() -> Result<()> {
        let signer = signer();
        let now = Utc::now();
        let id = Uuid::new_v4();

        for scope in [TokenScope::Access, TokenScope::Refresh, TokenScope::TwoFactor] {
            let signed = signer.issue(scope, id, now)?;
            assert_eq!(signer.verify(scope, &signed.token, now)?, id);
        }
        Ok(())
    }

    #[test]
    fn scopes_are_not_interchangeable() -> Result<()> {
        let signer = signer();
        let now = Utc::now();
        let id = Uuid::new_v4();

        // Same secret as access tokens, so only the scope claim fences it.
        let two_factor = signer.issue(TokenScope::TwoFactor, id, now)?;
        assert!(matches!(
            signer.verify(TokenScope::Access, &two_factor.token, now),
            Err(AuthError::InvalidToken)
        ));

        let refresh = signer.issue(TokenScope::Refresh, id, now)?;
        assert!(matches!(
            signer.verify(TokenScope::Access, &refresh.token, now),
            Err(AuthError::InvalidToken)
        ));
        Ok(())
    }

    #[test]
    fn expiry_follows_the_injected_clock() -> Result<()> {
        let signer = signer().with_access_ttl_seconds(60);
        let now = Utc::now();
        let id = Uuid::new_v4();

        let signed = signer.issue(TokenScope::Access, id, now)?;
        assert!(signer.verify(TokenScope::Access, &signed.token, now).is_ok());

        let later = now + Duration::seconds(61);
        assert!(matches!(
            signer.verify(TokenScope::Access, &signed.token, later),
            Err(AuthError::InvalidToken)
        ));
        Ok(())
    }

    #[test]
    fn tampered_or_foreign_tokens_fail() -> Result<()> {
        let signer = signer();
        let other = TokenSigner::new("other".to_string(), "other".to_string());
        let now = Utc::now();
        let id = Uuid::new_v4();

        let signed = other.issue(TokenScope::Access, id, now)?;
        assert!(matches!(
            signer.verify(TokenScope::Access, &signed.token, now),
            Err(AuthError::InvalidToken)
        ));

        let mut tampered = signer.issue(TokenScope::Access, id, now)?.token;
        tampered.pop();
        assert!(matches!(
            signer.verify(TokenScope::Access, &tampered, now),
            Err(AuthError::InvalidToken)
        ));

        assert!(matches!(
            signer.verify(TokenScope::Access, "not-a-jwt", now),
            Err(AuthError::InvalidToken)
        ));
        Ok(())
    }
}
