use crate::core::error::ApiError;
use crate::core::state::AppState;
use crate::device::error::Result as DeviceResult;
use crate::models::api::{FingerprintsResponse, MessageResponse};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use std::sync::Arc;
use tracing::{info, warn};

/// Delete every enrolled finger of a user. Fingers the device refuses to
/// delete are skipped and left out of the count.
///
/// DELETE /user/delete_fingerprint/{user_id}
pub async fn delete_fingerprints_handler(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
) -> Result<Response, ApiError> {
    let gateway = &state.gateway;
    let mut session = gateway.open().await.map_err(ApiError::DeleteFingerprints)?;

    let result: DeviceResult<usize> = async {
        let templates = session.get_templates().await?;

        let mut deleted = 0;
        for template in templates.iter().filter(|t| t.user_id == user_id) {
            match session
                .delete_user_template(&user_id, template.finger_index)
                .await
            {
                Ok(()) => deleted += 1,
                Err(e) => warn!(
                    user_id = %user_id,
                    finger_index = template.finger_index,
                    error = %e,
                    "Failed to delete fingerprint template"
                ),
            }
        }
        Ok(deleted)
    }
    .await;

    let deleted = gateway
        .close(session, result)
        .await
        .map_err(ApiError::DeleteFingerprints)?;

    info!(user_id = %user_id, deleted, "Fingerprints deleted");

    Ok((
        StatusCode::OK,
        Json(MessageResponse::new(format!(
            "Deleted {} fingerprints for user {}",
            deleted, user_id
        ))),
    )
        .into_response())
}

/// Which fingers a user has enrolled
///
/// GET /user/fingerprints/{user_id}
pub async fn list_fingerprints_handler(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
) -> Result<Response, ApiError> {
    let gateway = &state.gateway;
    let mut session = gateway.open().await.map_err(ApiError::Fingerprints)?;
    let result = session.get_templates().await;
    let templates = gateway
        .close(session, result)
        .await
        .map_err(ApiError::Fingerprints)?;

    let finger_indexes: Vec<u8> = templates
        .iter()
        .filter(|t| t.user_id == user_id)
        .map(|t| t.finger_index)
        .collect();

    if finger_indexes.is_empty() {
        info!(user_id = %user_id, "No fingerprints enrolled");
        return Ok((
            StatusCode::OK,
            Json(MessageResponse::new(format!(
                "No fingerprint templates found for user {}",
                user_id
            ))),
        )
            .into_response());
    }

    info!(user_id = %user_id, count = finger_indexes.len(), "Fingerprints listed");

    Ok((
        StatusCode::OK,
        Json(FingerprintsResponse {
            user_id,
            total_fingerprints: finger_indexes.len(),
            finger_indexes,
        }),
    )
        .into_response())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::mock::MockDevice;
    use crate::models::api::ErrorResponse;
    use axum::body::{Body, Bytes};
    use axum::http::{Method, Request};
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    async fn send(device: &MockDevice, method: Method, uri: &str) -> (StatusCode, Bytes) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap();

        let response = device.app().oneshot(request).await.unwrap();
        let (parts, body) = response.into_parts();
        let bytes = Body::new(body).collect().await.unwrap().to_bytes();
        (parts.status, bytes)
    }

    fn message(bytes: &Bytes) -> String {
        let response: MessageResponse = serde_json::from_slice(bytes).unwrap();
        response.message
    }

    fn enrolled_device() -> MockDevice {
        MockDevice::new()
            .with_user(1, "7", "Ana")
            .with_template("7", 0)
            .with_template("8", 1)
            .with_template("7", 6)
    }

    #[tokio::test]
    async fn test_list_fingerprints() {
        let (status, bytes) = send(&enrolled_device(), Method::GET, "/user/fingerprints/7").await;
        assert_eq!(status, StatusCode::OK);

        let response: FingerprintsResponse = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(response.user_id, "7");
        assert_eq!(response.total_fingerprints, 2);
        assert_eq!(response.finger_indexes, vec![0, 6]);
    }

    #[tokio::test]
    async fn test_list_fingerprints_none() {
        let (status, bytes) = send(&enrolled_device(), Method::GET, "/user/fingerprints/9").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(message(&bytes), "No fingerprint templates found for user 9");
    }

    #[tokio::test]
    async fn test_list_fingerprints_error_is_bare() {
        let device = enrolled_device();
        device.state().refuse_connections = true;

        let (status, bytes) = send(&device, Method::GET, "/user/fingerprints/7").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);

        let error: ErrorResponse = serde_json::from_slice(&bytes).unwrap();
        assert!(error.detail.starts_with("Failed to connect to device: "));
    }

    #[tokio::test]
    async fn test_delete_fingerprints() {
        let device = enrolled_device();
        let (status, bytes) = send(&device, Method::DELETE, "/user/delete_fingerprint/7").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(message(&bytes), "Deleted 2 fingerprints for user 7");

        let state = device.state();
        assert_eq!(state.templates.len(), 1);
        assert_eq!(state.templates[0].user_id, "8");
        assert_eq!(state.disconnects, 1);
    }

    #[tokio::test]
    async fn test_delete_fingerprints_skips_failures() {
        let device = enrolled_device();
        device.state().failing_fingers = vec![6];

        let (status, bytes) = send(&device, Method::DELETE, "/user/delete_fingerprint/7").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(message(&bytes), "Deleted 1 fingerprints for user 7");
        assert_eq!(device.state().templates.len(), 2);
    }

    #[tokio::test]
    async fn test_delete_fingerprints_none_enrolled() {
        let (status, bytes) = send(&enrolled_device(), Method::DELETE, "/user/delete_fingerprint/9").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(message(&bytes), "Deleted 0 fingerprints for user 9");
    }

    #[tokio::test]
    async fn test_delete_fingerprints_device_down() {
        let device = enrolled_device();
        device.state().refuse_connections = true;

        let (status, bytes) = send(&device, Method::DELETE, "/user/delete_fingerprint/7").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);

        let error: ErrorResponse = serde_json::from_slice(&bytes).unwrap();
        assert!(error.detail.starts_with("Error deleting fingerprints: "));
    }
}
