//! Guided-setup state machine: step progression plus a step-scoped payload.
//!
//! The step only moves forward while onboarding is incomplete; the one way
//! back is the explicit reset. The email-verified gate lives at the API
//! boundary, not here.

use serde_json::Value;
use std::collections::BTreeMap;
use uuid::Uuid;

use super::AuthService;
use super::account::Account;
use super::error::{AuthError, AuthResult};

/// Snapshot of an account's onboarding progress.
#[derive(Debug)]
pub struct OnboardingStatus {
    pub completed: bool,
    pub current_step: u32,
    pub data: BTreeMap<String, Value>,
}

impl OnboardingStatus {
    fn of(account: &Account) -> Self {
        Self {
            completed: account.onboarding_completed,
            current_step: account.onboarding_step,
            data: account.onboarding_data.clone(),
        }
    }
}

impl AuthService {
    /// Current progress for the account.
    ///
    /// # Errors
    /// `InvalidToken` when the account no longer exists.
    pub async fn onboarding_status(&self, account_id: Uuid) -> AuthResult<OnboardingStatus> {
        let Some(account) = self.store.find_by_id(account_id).await? else {
            return Err(AuthError::InvalidToken);
        };
        Ok(OnboardingStatus::of(&account))
    }

    /// Move to `target_step`, merging the payload into the step-scoped data.
    /// Keys are stored as `step{N}_{key}`: new keys are added, existing ones
    /// overwritten. Revisiting an earlier step merges data without moving
    /// the step backwards.
    ///
    /// # Errors
    /// `StepSkipped` when the target jumps past `current + 1` or past the
    /// configured maximum step.
    pub async fn advance_onboarding(
        &self,
        account_id: Uuid,
        target_step: u32,
        payload: BTreeMap<String, Value>,
    ) -> AuthResult<OnboardingStatus> {
        let Some(mut account) = self.store.find_by_id(account_id).await? else {
            return Err(AuthError::InvalidToken);
        };

        if target_step > account.onboarding_step + 1
            || target_step > self.config.onboarding_max_step()
        {
            return Err(AuthError::StepSkipped);
        }

        for (key, value) in payload {
            account
                .onboarding_data
                .insert(format!("step{target_step}_{key}"), value);
        }
        account.onboarding_step = account.onboarding_step.max(target_step);
        self.store.save(&account).await?;

        Ok(OnboardingStatus::of(&account))
    }

    /// Mark onboarding finished once enough steps are done.
    ///
    /// # Errors
    /// `InsufficientSteps` below the configured minimum.
    pub async fn complete_onboarding(&self, account_id: Uuid) -> AuthResult<()> {
        let Some(mut account) = self.store.find_by_id(account_id).await? else {
            return Err(AuthError::InvalidToken);
        };
        if account.onboarding_step < self.config.onboarding_min_steps() {
            return Err(AuthError::InsufficientSteps);
        }
        account.onboarding_completed = true;
        self.store.save(&account).await?;
        Ok(())
    }

    /// Back to square one: step 0, nothing completed, payload cleared.
    /// Fully re-enterable afterwards.
    pub async fn reset_onboarding(&self, account_id: Uuid) -> AuthResult<()> {
        let Some(mut account) = self.store.find_by_id(account_id).await? else {
            return Err(AuthError::InvalidToken);
        };
        account.onboarding_completed = false;
        account.onboarding_step = 0;
        account.onboarding_data.clear();
        self.store.save(&account).await?;
        Ok(())
    }
}
