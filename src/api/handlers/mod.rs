//! API handlers and shared utilities.
//!
//! Handlers translate HTTP requests into [`AuthService`] calls and map
//! [`AuthError`] variants back onto status codes. They hold no auth logic of
//! their own.

pub mod auth;
pub mod health;
pub mod onboarding;

use axum::{
    Json,
    http::{HeaderMap, StatusCode, header::AUTHORIZATION},
    response::{IntoResponse, Response},
};
use serde_json::json;
use tracing::error;

use crate::auth::{Account, AuthError, AuthService};

/// Map a domain error onto a status code and JSON error body.
pub fn error_response(err: AuthError) -> Response {
    let status = match err {
        AuthError::DuplicateEmail
        | AuthError::NotEnabled
        | AuthError::StepSkipped
        | AuthError::InsufficientSteps => StatusCode::BAD_REQUEST,
        AuthError::InvalidCredentials | AuthError::InvalidToken | AuthError::InvalidCode => {
            StatusCode::UNAUTHORIZED
        }
        AuthError::AccountDisabled => StatusCode::FORBIDDEN,
        AuthError::AccountLocked => StatusCode::LOCKED,
        AuthError::Infrastructure(ref cause) => {
            error!("request failed: {cause:#}");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"error": "internal server error"})),
            )
                .into_response();
        }
    };
    (status, Json(json!({"error": err.to_string()}))).into_response()
}

/// Resolve the Authorization bearer token into an account.
///
/// Returns the mapped error response when the header is missing or the token
/// does not check out, so handlers can use `?` via `Result<_, Response>`.
pub async fn require_account(
    service: &AuthService,
    headers: &HeaderMap,
) -> Result<Account, Response> {
    let Some(token) = extract_bearer_token(headers) else {
        return Err(error_response(AuthError::InvalidToken));
    };
    service
        .authenticate_access_token(&token)
        .await
        .map_err(error_response)
}

pub(crate) fn extract_bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let trimmed = value.trim();
    let token = trimmed
        .strip_prefix("Bearer ")
        .or_else(|| trimmed.strip_prefix("bearer "))?
        .trim();
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn extract_bearer_token_strips_prefix() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer abc123"));
        assert_eq!(extract_bearer_token(&headers), Some("abc123".to_string()));
    }

    #[test]
    fn extract_bearer_token_accepts_lowercase_scheme() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("bearer abc123"));
        assert_eq!(extract_bearer_token(&headers), Some("abc123".to_string()));
    }

    #[test]
    fn extract_bearer_token_rejects_empty() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer "));
        assert_eq!(extract_bearer_token(&headers), None);
    }

    #[test]
    fn extract_bearer_token_rejects_missing_header() {
        let headers = HeaderMap::new();
        assert_eq!(extract_bearer_token(&headers), None);
    }

    #[test]
    fn error_response_maps_lockout_to_423() {
        let response = error_response(AuthError::AccountLocked);
        assert_eq!(response.status(), StatusCode::LOCKED);
    }

    #[test]
    fn error_response_hides_infrastructure_detail() {
        let response = error_response(AuthError::Infrastructure(anyhow::anyhow!("pool down")));
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
