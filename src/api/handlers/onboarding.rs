//! Guided-setup endpoints.
//!
//! Every route requires a bearer access token and a verified email; the gate
//! sits here so the state machine itself stays transport-free.

use axum::{
    Json,
    extract::Extension,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json::{Value, json};
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::auth::onboarding::OnboardingStatus;
use crate::auth::{Account, AuthService};

use super::auth::types::OnboardingStepRequest;
use super::{error_response, require_account};

#[derive(Debug, Serialize)]
pub struct OnboardingStatusResponse {
    pub completed: bool,
    pub current_step: u32,
    pub data: BTreeMap<String, Value>,
}

impl From<OnboardingStatus> for OnboardingStatusResponse {
    fn from(status: OnboardingStatus) -> Self {
        Self {
            completed: status.completed,
            current_step: status.current_step,
            data: status.data,
        }
    }
}

async fn require_verified_account(
    service: &AuthService,
    headers: &HeaderMap,
) -> Result<Account, Response> {
    let account = require_account(service, headers).await?;
    if !account.is_email_verified {
        return Err((
            StatusCode::FORBIDDEN,
            Json(json!({"error": "email verification required"})),
        )
            .into_response());
    }
    Ok(account)
}

/// `GET /v1/onboarding/status`
pub async fn status(
    service: Extension<Arc<AuthService>>,
    headers: HeaderMap,
) -> impl IntoResponse {
    let account = match require_verified_account(&service, &headers).await {
        Ok(account) => account,
        Err(response) => return response,
    };
    match service.onboarding_status(account.id).await {
        Ok(status) => Json(OnboardingStatusResponse::from(status)).into_response(),
        Err(err) => error_response(err),
    }
}

/// `POST /v1/onboarding/step` - advance to a step and merge its payload.
pub async fn step(
    service: Extension<Arc<AuthService>>,
    headers: HeaderMap,
    Json(body): Json<OnboardingStepRequest>,
) -> impl IntoResponse {
    let account = match require_verified_account(&service, &headers).await {
        Ok(account) => account,
        Err(response) => return response,
    };
    match service
        .advance_onboarding(account.id, body.step, body.data)
        .await
    {
        Ok(status) => Json(OnboardingStatusResponse::from(status)).into_response(),
        Err(err) => error_response(err),
    }
}

/// `POST /v1/onboarding/complete`
pub async fn complete(
    service: Extension<Arc<AuthService>>,
    headers: HeaderMap,
) -> impl IntoResponse {
    let account = match require_verified_account(&service, &headers).await {
        Ok(account) => account,
        Err(response) => return response,
    };
    match service.complete_onboarding(account.id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => error_response(err),
    }
}

/// `POST /v1/onboarding/reset` - back to step zero, payload cleared.
pub async fn reset(
    service: Extension<Arc<AuthService>>,
    headers: HeaderMap,
) -> impl IntoResponse {
    let account = match require_verified_account(&service, &headers).await {
        Ok(account) => account,
        Err(response) => return response,
    };
    match service.reset_onboarding(account.id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => error_response(err),
    }
}
