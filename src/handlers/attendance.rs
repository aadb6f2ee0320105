use crate::core::error::ApiError;
use crate::core::state::AppState;
use crate::device::error::Result as DeviceResult;
use crate::models::api::{AttendanceEntry, AttendanceResponse};
use crate::models::attendance::AttendanceLog;
use crate::models::user::User;
use crate::utils::time::{format_timestamp, local_now};
use crate::validation::params::AttendanceQuery;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};

/// Attendance logs, optionally limited to a date range or a recent window
///
/// GET /attendance?hours=<n>
/// GET /attendance?from=<YYYY-MM-DD>&to=<YYYY-MM-DD>
pub async fn attendance_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<AttendanceQuery>,
) -> Result<Response, ApiError> {
    let filter = params.validate_at(local_now()).map_err(|e| {
        warn!(error = %e, "Invalid attendance query");
        ApiError::InvalidAttendanceQuery(format!("{:#}", e))
    })?;

    let gateway = &state.gateway;
    let mut session = gateway.open().await.map_err(ApiError::FetchAttendance)?;

    let result: DeviceResult<(Vec<AttendanceLog>, Vec<User>)> = async {
        let logs = session.get_attendance().await?;
        let users = session.get_users().await?;
        Ok((logs, users))
    }
    .await;

    let (logs, users) = gateway
        .close(session, result)
        .await
        .map_err(ApiError::FetchAttendance)?;

    let names: HashMap<&str, &str> = users
        .iter()
        .map(|u| (u.user_id.as_str(), u.name.as_str()))
        .collect();

    let attendance: Vec<AttendanceEntry> = logs
        .iter()
        .filter(|log| filter.matches(&log.timestamp))
        .map(|log| AttendanceEntry {
            user_id: log.user_id.clone(),
            name: names
                .get(log.user_id.as_str())
                .copied()
                .unwrap_or("Unknown")
                .to_string(),
            timestamp: format_timestamp(&log.timestamp),
            status: "check".to_string(),
        })
        .collect();

    info!(
        total = logs.len(),
        returned = attendance.len(),
        filter = ?filter,
        "Attendance listed"
    );

    Ok((StatusCode::OK, Json(AttendanceResponse { attendance })).into_response())
}
