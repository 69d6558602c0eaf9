//! Two-factor enrollment and challenge endpoints.

use axum::{Json, extract::Extension, http::HeaderMap, http::StatusCode, response::IntoResponse};
use std::sync::Arc;

use crate::auth::AuthService;

use super::super::{error_response, require_account};
use super::types::{
    EnrollmentResponse, SessionResponse, TwoFactorChallengeRequest, TwoFactorCodeRequest,
};

/// `POST /v1/auth/2fa/verify` - finish a sign-in parked behind 2FA.
pub async fn verify(
    service: Extension<Arc<AuthService>>,
    Json(body): Json<TwoFactorChallengeRequest>,
) -> impl IntoResponse {
    match service
        .complete_two_factor_challenge(&body.intermediate_token, &body.code)
        .await
    {
        Ok(outcome) => Json(SessionResponse {
            account: (&outcome.account).into(),
            access_token: outcome.tokens.access_token,
            refresh_token: outcome.tokens.refresh_token,
        })
        .into_response(),
        Err(err) => error_response(err),
    }
}

/// `POST /v1/auth/2fa/enable` - start enrollment for the caller.
pub async fn enable(
    service: Extension<Arc<AuthService>>,
    headers: HeaderMap,
) -> impl IntoResponse {
    let account = match require_account(&service, &headers).await {
        Ok(account) => account,
        Err(response) => return response,
    };
    match service.begin_two_factor_enrollment(account.id).await {
        Ok(enrollment) => Json(EnrollmentResponse {
            secret: enrollment.secret,
            provisioning_uri: enrollment.provisioning_uri,
            backup_codes: enrollment.backup_codes,
        })
        .into_response(),
        Err(err) => error_response(err),
    }
}

/// `POST /v1/auth/2fa/confirm` - prove possession of the authenticator.
pub async fn confirm(
    service: Extension<Arc<AuthService>>,
    headers: HeaderMap,
    Json(body): Json<TwoFactorCodeRequest>,
) -> impl IntoResponse {
    let account = match require_account(&service, &headers).await {
        Ok(account) => account,
        Err(response) => return response,
    };
    match service
        .confirm_two_factor_enrollment(account.id, &body.code)
        .await
    {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => error_response(err),
    }
}

/// `POST /v1/auth/2fa/disable` - requires a current TOTP code.
pub async fn disable(
    service: Extension<Arc<AuthService>>,
    headers: HeaderMap,
    Json(body): Json<TwoFactorCodeRequest>,
) -> impl IntoResponse {
    let account = match require_account(&service, &headers).await {
        Ok(account) => account,
        Err(response) => return response,
    };
    match service.disable_two_factor(account.id, &body.code).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => error_response(err),
    }
}
