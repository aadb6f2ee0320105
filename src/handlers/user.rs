use crate::core::error::ApiError;
use crate::core::state::AppState;
use crate::device::error::Result as DeviceResult;
use crate::models::api::{MessageResponse, NewUserRequest, UserStatusRequest};
use crate::models::user::UserUpdate;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use std::sync::Arc;
use tracing::info;

/// Create a user, or overwrite the one with the same id. New users are
/// always enabled.
///
/// POST /user/create
pub async fn create_user_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<NewUserRequest>,
) -> Result<Response, ApiError> {
    let update = UserUpdate {
        user_id: request.user_id,
        name: request.name,
        privilege: request.privilege,
        password: request.password,
        enabled: true,
    };

    let gateway = &state.gateway;
    let mut session = gateway.open().await.map_err(ApiError::CreateUser)?;
    let result = session.set_user(&update).await;
    gateway
        .close(session, result)
        .await
        .map_err(ApiError::CreateUser)?;

    info!(user_id = %update.user_id, privilege = update.privilege, "User created");

    Ok((
        StatusCode::OK,
        Json(MessageResponse::new(format!("User {} created", update.user_id))),
    )
        .into_response())
}

/// DELETE /user/delete/{user_id}
pub async fn delete_user_handler(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
) -> Result<Response, ApiError> {
    let gateway = &state.gateway;
    let mut session = gateway.open().await.map_err(ApiError::DeleteUser)?;
    let result = session.delete_user(&user_id).await;
    gateway
        .close(session, result)
        .await
        .map_err(ApiError::DeleteUser)?;

    info!(user_id = %user_id, "User deleted");

    Ok((
        StatusCode::OK,
        Json(MessageResponse::new(format!("User {} deleted", user_id))),
    )
        .into_response())
}

/// POST /user/enable
pub async fn enable_user_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<UserStatusRequest>,
) -> Result<Response, ApiError> {
    set_enabled(&state, &request.user_id, true)
        .await
        .map_err(ApiError::EnableUser)?;

    info!(user_id = %request.user_id, "User enabled");

    Ok((
        StatusCode::OK,
        Json(MessageResponse::new(format!("User {} enabled", request.user_id))),
    )
        .into_response())
}

/// POST /user/disable
pub async fn disable_user_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<UserStatusRequest>,
) -> Result<Response, ApiError> {
    set_enabled(&state, &request.user_id, false)
        .await
        .map_err(ApiError::DisableUser)?;

    info!(user_id = %request.user_id, "User disabled");

    Ok((
        StatusCode::OK,
        Json(MessageResponse::new(format!("User {} disabled", request.user_id))),
    )
        .into_response())
}

/// Resubmit an existing user with only the enabled flag changed
async fn set_enabled(state: &AppState, user_id: &str, enabled: bool) -> DeviceResult<()> {
    let gateway = &state.gateway;
    let mut session = gateway.open().await?;

    let result: DeviceResult<()> = async {
        let user = session.get_user_by_id(user_id).await?;
        session.set_user(&user.with_enabled(enabled)).await
    }
    .await;

    gateway.close(session, result).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::mock::MockDevice;
    use crate::models::api::ErrorResponse;
    use axum::body::{Body, Bytes};
    use axum::http::{header, Method, Request};
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    async fn send(device: &MockDevice, method: Method, uri: &str, body: Option<&str>) -> (StatusCode, Bytes) {
        let request = match body {
            Some(json) => Request::builder()
                .method(method)
                .uri(uri)
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => Request::builder()
                .method(method)
                .uri(uri)
                .body(Body::empty())
                .unwrap(),
        };

        let response = device.app().oneshot(request).await.unwrap();
        let (parts, body) = response.into_parts();
        let bytes = Body::new(body).collect().await.unwrap().to_bytes();
        (parts.status, bytes)
    }

    fn message(bytes: &Bytes) -> String {
        let response: MessageResponse = serde_json::from_slice(bytes).unwrap();
        response.message
    }

    fn detail(bytes: &Bytes) -> String {
        let response: ErrorResponse = serde_json::from_slice(bytes).unwrap();
        response.detail
    }

    #[tokio::test]
    async fn test_create_user() {
        let device = MockDevice::new();
        let (status, bytes) = send(
            &device,
            Method::POST,
            "/user/create",
            Some(r#"{"user_id": "42", "name": "Zoe", "privilege": 14, "password": "1234"}"#),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(message(&bytes), "User 42 created");

        let state = device.state();
        assert_eq!(state.users.len(), 1);
        assert_eq!(state.users[0].name, "Zoe");
        assert_eq!(state.users[0].privilege, 14);
        assert_eq!(state.users[0].password, "1234");
        assert!(state.users[0].enabled);
        assert_eq!(state.disconnects, 1);
    }

    #[tokio::test]
    async fn test_create_user_defaults() {
        let device = MockDevice::new();
        let (status, _) = send(
            &device,
            Method::POST,
            "/user/create",
            Some(r#"{"user_id": "5", "name": "Eli"}"#),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        let state = device.state();
        assert_eq!(state.users[0].privilege, 0);
        assert_eq!(state.users[0].password, "");
    }

    #[tokio::test]
    async fn test_create_user_overwrites_existing() {
        let device = MockDevice::new().with_user(3, "5", "Old");
        let (status, _) = send(
            &device,
            Method::POST,
            "/user/create",
            Some(r#"{"user_id": "5", "name": "New"}"#),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        let state = device.state();
        assert_eq!(state.users.len(), 1);
        assert_eq!(state.users[0].uid, 3);
        assert_eq!(state.users[0].name, "New");
    }

    #[tokio::test]
    async fn test_create_user_missing_name_rejected() {
        let device = MockDevice::new();
        let (status, _) = send(&device, Method::POST, "/user/create", Some(r#"{"user_id": "5"}"#)).await;

        assert!(status.is_client_error());
        assert_eq!(device.state().connects, 0);
    }

    #[tokio::test]
    async fn test_create_user_device_down() {
        let device = MockDevice::new();
        device.state().refuse_connections = true;

        let (status, bytes) = send(
            &device,
            Method::POST,
            "/user/create",
            Some(r#"{"user_id": "5", "name": "Eli"}"#),
        )
        .await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(detail(&bytes).starts_with("Error creating user: "));
    }

    #[tokio::test]
    async fn test_create_user_odd_privilege_rejected() {
        let device = MockDevice::new();
        let (status, bytes) = send(
            &device,
            Method::POST,
            "/user/create",
            Some(r#"{"user_id": "5", "name": "Eli", "privilege": 1}"#),
        )
        .await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(detail(&bytes).starts_with("Error creating user: Can't pack user: privilege 1"));
        let state = device.state();
        assert!(state.users.is_empty());
        assert_eq!(state.disconnects, 1);
    }

    #[tokio::test]
    async fn test_delete_user() {
        let device = MockDevice::new().with_user(1, "7", "Ana").with_user(2, "8", "Bo");
        let (status, bytes) = send(&device, Method::DELETE, "/user/delete/7", None).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(message(&bytes), "User 7 deleted");

        let state = device.state();
        assert_eq!(state.users.len(), 1);
        assert_eq!(state.users[0].user_id, "8");
    }

    #[tokio::test]
    async fn test_delete_unknown_user() {
        let device = MockDevice::new();
        let (status, bytes) = send(&device, Method::DELETE, "/user/delete/99", None).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(detail(&bytes), "Error deleting user: User 99 not found on device");
        assert_eq!(device.state().disconnects, 1);
    }

    #[tokio::test]
    async fn test_delete_user_device_down() {
        let device = MockDevice::new().with_user(1, "7", "Ana");
        device.state().refuse_connections = true;

        let (status, bytes) = send(&device, Method::DELETE, "/user/delete/7", None).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(detail(&bytes).starts_with("Error deleting user: "));
        assert_eq!(device.state().users.len(), 1);
    }

    #[tokio::test]
    async fn test_disable_then_enable_keeps_fields() {
        let device = MockDevice::new().with_user(4, "7", "Ana");
        {
            let mut state = device.state();
            state.users[0].privilege = 14;
            state.users[0].password = "99".to_string();
        }

        let (status, bytes) = send(&device, Method::POST, "/user/disable", Some(r#"{"user_id": "7"}"#)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(message(&bytes), "User 7 disabled");
        {
            let state = device.state();
            assert!(!state.users[0].enabled);
            assert_eq!(state.users[0].uid, 4);
            assert_eq!(state.users[0].name, "Ana");
            assert_eq!(state.users[0].privilege, 14);
            assert_eq!(state.users[0].password, "99");
        }

        let (status, bytes) = send(&device, Method::POST, "/user/enable", Some(r#"{"user_id": "7"}"#)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(message(&bytes), "User 7 enabled");
        assert!(device.state().users[0].enabled);
    }

    #[tokio::test]
    async fn test_enable_unknown_user() {
        let device = MockDevice::new();
        let (status, bytes) = send(&device, Method::POST, "/user/enable", Some(r#"{"user_id": "7"}"#)).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(detail(&bytes), "Error enabling user: User 7 not found on device");
        assert!(device.state().users.is_empty());
    }

    #[tokio::test]
    async fn test_disable_unknown_user() {
        let device = MockDevice::new();
        let (status, bytes) = send(&device, Method::POST, "/user/disable", Some(r#"{"user_id": "7"}"#)).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(detail(&bytes), "Error disabling user: User 7 not found on device");
    }

    #[tokio::test]
    async fn test_enable_disable_device_down() {
        let device = MockDevice::new().with_user(1, "7", "Ana");
        device.state().refuse_connections = true;

        let (status, bytes) = send(&device, Method::POST, "/user/enable", Some(r#"{"user_id": "7"}"#)).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(detail(&bytes).starts_with("Error enabling user: "));

        let (status, bytes) = send(&device, Method::POST, "/user/disable", Some(r#"{"user_id": "7"}"#)).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(detail(&bytes).starts_with("Error disabling user: "));

        assert!(device.state().users[0].enabled);
    }
}
