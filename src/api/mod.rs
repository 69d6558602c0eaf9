//! HTTP surface: route table, middleware stack, and server startup.

use anyhow::{Context, Result, anyhow};
use axum::{
    Extension, Router,
    body::Body,
    extract::MatchedPath,
    http::{
        HeaderValue, Method, Request,
        header::{AUTHORIZATION, CONTENT_TYPE},
    },
    routing::{get, post},
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};
use tracing::{Span, info, info_span};
use url::Url;

use crate::auth::AuthService;

pub mod handlers;

use handlers::{auth, health, onboarding};

/// Build the application router around a shared [`AuthService`].
#[must_use]
pub fn router(service: Arc<AuthService>) -> Router {
    Router::new()
        .route("/health", get(health::health))
        .route("/v1/auth/signup", post(auth::signup))
        .route("/v1/auth/signin", post(auth::signin))
        .route("/v1/auth/refresh-token", post(auth::refresh_token))
        .route("/v1/auth/logout", post(auth::logout))
        .route("/v1/auth/logout-all", post(auth::logout_all))
        .route("/v1/auth/2fa/verify", post(auth::two_factor::verify))
        .route("/v1/auth/2fa/enable", post(auth::two_factor::enable))
        .route("/v1/auth/2fa/confirm", post(auth::two_factor::confirm))
        .route("/v1/auth/2fa/disable", post(auth::two_factor::disable))
        .route("/v1/auth/verify-email", post(auth::password::verify_email))
        .route(
            "/v1/auth/forgot-password",
            post(auth::password::forgot_password),
        )
        .route(
            "/v1/auth/reset-password",
            post(auth::password::reset_password),
        )
        .route("/v1/onboarding/status", get(onboarding::status))
        .route("/v1/onboarding/step", post(onboarding::step))
        .route("/v1/onboarding/complete", post(onboarding::complete))
        .route("/v1/onboarding/reset", post(onboarding::reset))
        .layer(Extension(service))
}

/// Start the server
/// # Errors
/// Return error if failed to start the server
pub async fn serve(port: u16, service: Arc<AuthService>) -> Result<()> {
    let frontend_origin = frontend_origin(service.config().frontend_base_url())?;
    let cors = CorsLayer::new()
        .allow_headers([CONTENT_TYPE, AUTHORIZATION])
        .allow_methods([Method::GET, Method::POST])
        .allow_origin(AllowOrigin::exact(frontend_origin))
        .allow_credentials(true);

    let app = router(service).layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http().make_span_with(make_span))
            .layer(cors),
    );

    let listener = TcpListener::bind(format!("::0:{port}")).await?;

    info!("Listening on [::]:{}", port);

    axum::serve(listener, app.into_make_service()).await?;

    Ok(())
}

fn make_span(request: &Request<Body>) -> Span {
    let matched_path = request
        .extensions()
        .get::<MatchedPath>()
        .map_or_else(|| request.uri().path(), MatchedPath::as_str);

    info_span!(
        "http.request",
        http.method = %request.method(),
        http.route = matched_path
    )
}

fn frontend_origin(frontend_base_url: &str) -> Result<HeaderValue> {
    let parsed = Url::parse(frontend_base_url)
        .with_context(|| format!("Invalid frontend base URL: {frontend_base_url}"))?;
    let host = parsed.host_str().ok_or_else(|| {
        anyhow!("Frontend base URL must include a valid host: {frontend_base_url}")
    })?;
    let port = parsed
        .port()
        .map_or_else(String::new, |port| format!(":{port}"));
    let origin = format!("{}://{}{}", parsed.scheme(), host, port);
    HeaderValue::from_str(&origin).context("Failed to build frontend origin header")
}

#[cfg(test)]
mod tests {
    use super::frontend_origin;

    #[test]
    fn frontend_origin_strips_path() -> anyhow::Result<()> {
        let origin = frontend_origin("https://app.teamflow.dev/login?next=/")?;
        assert_eq!(origin.to_str()?, "https://app.teamflow.dev");
        Ok(())
    }

    #[test]
    fn frontend_origin_keeps_port() -> anyhow::Result<()> {
        let origin = frontend_origin("http://localhost:5173")?;
        assert_eq!(origin.to_str()?, "http://localhost:5173");
        Ok(())
    }

    #[test]
    fn frontend_origin_rejects_relative_url() {
        assert!(frontend_origin("/dashboard").is_err());
    }
}
