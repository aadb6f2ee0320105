use crate::models::api::MessageResponse;
use axum::{http::StatusCode, response::IntoResponse, Json};

/// Liveness check. Does not contact the device.
///
/// GET /
pub async fn root_handler() -> impl IntoResponse {
    (StatusCode::OK, Json(MessageResponse::new("API is running")))
}
