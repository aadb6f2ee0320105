// Centralized error handling for the HTTP layer

use crate::device::error::DeviceError;
use crate::models::api::ErrorResponse;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use thiserror::Error;
use tracing::error;

/// Every handler failure. All variants render as HTTP 500 with
/// `{"detail": "<message>"}`.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Error fetching members: {0}")]
    FetchMembers(DeviceError),

    #[error("Error fetching attendance: {0}")]
    FetchAttendance(DeviceError),

    #[error("Error fetching attendance: {0}")]
    InvalidAttendanceQuery(String),

    #[error("Error creating user: {0}")]
    CreateUser(DeviceError),

    #[error("Error deleting user: {0}")]
    DeleteUser(DeviceError),

    #[error("Error enabling user: {0}")]
    EnableUser(DeviceError),

    #[error("Error disabling user: {0}")]
    DisableUser(DeviceError),

    #[error("Error deleting fingerprints: {0}")]
    DeleteFingerprints(DeviceError),

    #[error("{0}")]
    Fingerprints(DeviceError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let detail = self.to_string();
        error!(error = %detail, "Request failed");

        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse { detail }),
        )
            .into_response()
    }
}
