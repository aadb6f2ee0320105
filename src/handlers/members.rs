use crate::core::error::ApiError;
use crate::core::state::AppState;
use crate::models::api::{Member, MembersResponse};
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use std::sync::Arc;
use tracing::info;

/// List every user enrolled on the device
///
/// GET /members
pub async fn members_handler(State(state): State<Arc<AppState>>) -> Result<Response, ApiError> {
    let gateway = &state.gateway;

    let mut session = gateway.open().await.map_err(ApiError::FetchMembers)?;
    let result = session.get_users().await;
    let users = gateway
        .close(session, result)
        .await
        .map_err(ApiError::FetchMembers)?;

    info!(count = users.len(), "Members listed");

    let members: Vec<Member> = users.into_iter().map(Member::from).collect();

    Ok((StatusCode::OK, Json(MembersResponse { members })).into_response())
}
