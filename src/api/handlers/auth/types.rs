//! Request and response bodies for the auth endpoints.
//!
//! `AccountResponse` is the only account shape that ever leaves the API;
//! hashes, secrets, and token material stay in the store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use crate::auth::Account;

#[derive(Debug, Deserialize)]
pub struct SignupRequest {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct SigninRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Debug, Deserialize)]
pub struct LogoutRequest {
    pub refresh_token: String,
}

#[derive(Debug, Deserialize)]
pub struct TwoFactorChallengeRequest {
    pub intermediate_token: String,
    pub code: String,
}

#[derive(Debug, Deserialize)]
pub struct TwoFactorCodeRequest {
    pub code: String,
}

#[derive(Debug, Deserialize)]
pub struct VerifyEmailRequest {
    pub token: String,
}

#[derive(Debug, Deserialize)]
pub struct ForgotPasswordRequest {
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct ResetPasswordRequest {
    pub token: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct OnboardingStepRequest {
    pub step: u32,
    #[serde(default)]
    pub data: BTreeMap<String, Value>,
}

/// Public projection of an account.
#[derive(Debug, Serialize)]
pub struct AccountResponse {
    pub id: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: Option<String>,
    pub is_email_verified: bool,
    pub two_factor_enabled: bool,
    pub onboarding_completed: bool,
    pub onboarding_step: u32,
    pub last_login: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<&Account> for AccountResponse {
    fn from(account: &Account) -> Self {
        Self {
            id: account.id.to_string(),
            email: account.email.clone(),
            first_name: account.first_name.clone(),
            last_name: account.last_name.clone(),
            phone: account.phone.clone(),
            is_email_verified: account.is_email_verified,
            two_factor_enabled: account.two_factor_enabled,
            onboarding_completed: account.onboarding_completed,
            onboarding_step: account.onboarding_step,
            last_login: account.last_login,
            created_at: account.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub account: AccountResponse,
    pub access_token: String,
    pub refresh_token: String,
}

/// Sign-in either completes with a session or parks behind a 2FA challenge.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum SigninResponse {
    TwoFactorRequired {
        two_factor_required: bool,
        intermediate_token: String,
    },
    Complete(SessionResponse),
}

#[derive(Debug, Serialize)]
pub struct TokenPairResponse {
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(Debug, Serialize)]
pub struct EnrollmentResponse {
    pub secret: String,
    pub provisioning_uri: String,
    pub backup_codes: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::account::NewAccount;
    use chrono::Utc;

    fn sample_account() -> Account {
        let identity = NewAccount {
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            email: "ada@example.com".to_string(),
            phone: None,
            password: "unused".to_string(),
        };
        Account::new(&identity, "argon2-hash".to_string(), Utc::now())
    }

    #[test]
    fn account_response_omits_secret_material() -> anyhow::Result<()> {
        let mut account = sample_account();
        account.two_factor_secret = Some("JBSWY3DPEHPK3PXP".to_string());
        account.two_factor_backup_codes = vec!["deadbeef".to_string()];

        let body = serde_json::to_string(&AccountResponse::from(&account))?;
        assert!(!body.contains("argon2-hash"));
        assert!(!body.contains("JBSWY3DPEHPK3PXP"));
        assert!(!body.contains("deadbeef"));
        assert!(body.contains("ada@example.com"));
        Ok(())
    }

    #[test]
    fn signin_response_flags_pending_challenge() -> anyhow::Result<()> {
        let response = SigninResponse::TwoFactorRequired {
            two_factor_required: true,
            intermediate_token: "tok".to_string(),
        };
        let body = serde_json::to_value(&response)?;
        assert_eq!(body["two_factor_required"], true);
        assert_eq!(body["intermediate_token"], "tok");
        Ok(())
    }
}
