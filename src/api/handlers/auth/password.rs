//! Email verification and password recovery endpoints.

use axum::{Json, extract::Extension, response::IntoResponse};
use std::sync::Arc;

use crate::auth::AuthService;

use super::MIN_PASSWORD_LENGTH;
use super::super::error_response;
use super::types::{
    AccountResponse, ForgotPasswordRequest, MessageResponse, ResetPasswordRequest,
    VerifyEmailRequest,
};

/// `POST /v1/auth/verify-email` - single-use, 24h window.
pub async fn verify_email(
    service: Extension<Arc<AuthService>>,
    Json(body): Json<VerifyEmailRequest>,
) -> impl IntoResponse {
    match service.verify_email(&body.token).await {
        Ok(account) => Json(AccountResponse::from(&account)).into_response(),
        Err(err) => error_response(err),
    }
}

/// `POST /v1/auth/forgot-password`
///
/// The response never reveals whether the email is registered.
pub async fn forgot_password(
    service: Extension<Arc<AuthService>>,
    Json(body): Json<ForgotPasswordRequest>,
) -> impl IntoResponse {
    match service.forgot_password(&body.email).await {
        Ok(()) => Json(MessageResponse::new(
            "if that email is registered, a reset link has been sent",
        ))
        .into_response(),
        Err(err) => error_response(err),
    }
}

/// `POST /v1/auth/reset-password` - consumes the token and revokes every
/// refresh token for the account.
pub async fn reset_password(
    service: Extension<Arc<AuthService>>,
    Json(body): Json<ResetPasswordRequest>,
) -> impl IntoResponse {
    if body.password.len() < MIN_PASSWORD_LENGTH {
        return (
            axum::http::StatusCode::BAD_REQUEST,
            Json(serde_json::json!({"error": "password must be at least 8 characters"})),
        )
            .into_response();
    }
    match service.reset_password(&body.token, &body.password).await {
        Ok(()) => Json(MessageResponse::new("password has been reset")).into_response(),
        Err(err) => error_response(err),
    }
}
