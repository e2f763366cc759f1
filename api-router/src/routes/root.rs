use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::json;

/// Service banner at `/`.
pub async fn service_info() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(json!({
            "status": "ok",
            "service": "Service Chatbot Backend",
            "version": env!("CARGO_PKG_VERSION"),
        })),
    )
}
