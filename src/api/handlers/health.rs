use axum::response::{IntoResponse, Json};
use serde_json::json;

// axum handler for health
pub async fn health() -> impl IntoResponse {
    Json(json!({
        "name": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
