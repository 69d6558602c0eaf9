//! Account and session endpoints.

pub mod password;
pub mod two_factor;
pub mod types;

use axum::{Json, extract::Extension, http::HeaderMap, http::StatusCode, response::IntoResponse};
use std::sync::Arc;

use crate::auth::AuthService;
use crate::auth::account::{NewAccount, valid_email};
use crate::auth::session::SigninOutcome;

use super::{error_response, require_account};
use types::{
    LogoutRequest, RefreshRequest, SessionResponse, SigninRequest, SigninResponse, SignupRequest,
    TokenPairResponse,
};

const MIN_PASSWORD_LENGTH: usize = 8;

/// `POST /v1/auth/signup`
pub async fn signup(
    service: Extension<Arc<AuthService>>,
    Json(body): Json<SignupRequest>,
) -> impl IntoResponse {
    if !valid_email(body.email.trim().to_lowercase().as_str()) {
        return (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({"error": "invalid email address"})),
        )
            .into_response();
    }
    if body.password.len() < MIN_PASSWORD_LENGTH {
        return (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({"error": "password must be at least 8 characters"})),
        )
            .into_response();
    }

    let identity = NewAccount {
        first_name: body.first_name,
        last_name: body.last_name,
        email: body.email,
        phone: body.phone,
        password: body.password,
    };
    match service.signup(identity).await {
        Ok(result) => (
            StatusCode::CREATED,
            Json(SessionResponse {
                account: (&result.account).into(),
                access_token: result.tokens.access_token,
                refresh_token: result.tokens.refresh_token,
            }),
        )
            .into_response(),
        Err(err) => error_response(err),
    }
}

/// `POST /v1/auth/signin`
pub async fn signin(
    service: Extension<Arc<AuthService>>,
    Json(body): Json<SigninRequest>,
) -> impl IntoResponse {
    match service.authenticate(&body.email, &body.password).await {
        Ok(SigninOutcome::Complete { account, tokens }) => {
            Json(SigninResponse::Complete(SessionResponse {
                account: (&account).into(),
                access_token: tokens.access_token,
                refresh_token: tokens.refresh_token,
            }))
            .into_response()
        }
        Ok(SigninOutcome::TwoFactorRequired { intermediate_token }) => {
            Json(SigninResponse::TwoFactorRequired {
                two_factor_required: true,
                intermediate_token,
            })
            .into_response()
        }
        Err(err) => error_response(err),
    }
}

/// `POST /v1/auth/refresh-token`
pub async fn refresh_token(
    service: Extension<Arc<AuthService>>,
    Json(body): Json<RefreshRequest>,
) -> impl IntoResponse {
    match service.refresh(&body.refresh_token).await {
        Ok(tokens) => Json(TokenPairResponse {
            access_token: tokens.access_token,
            refresh_token: tokens.refresh_token,
        })
        .into_response(),
        Err(err) => error_response(err),
    }
}

/// `POST /v1/auth/logout` - revoke one refresh token.
pub async fn logout(
    service: Extension<Arc<AuthService>>,
    headers: HeaderMap,
    Json(body): Json<LogoutRequest>,
) -> impl IntoResponse {
    let account = match require_account(&service, &headers).await {
        Ok(account) => account,
        Err(response) => return response,
    };
    match service.revoke(account.id, &body.refresh_token).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => error_response(err),
    }
}

/// `POST /v1/auth/logout-all` - revoke every refresh token for the account.
pub async fn logout_all(
    service: Extension<Arc<AuthService>>,
    headers: HeaderMap,
) -> impl IntoResponse {
    let account = match require_account(&service, &headers).await {
        Ok(account) => account,
        Err(response) => return response,
    };
    match service.revoke_all(account.id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => error_response(err),
    }
}
