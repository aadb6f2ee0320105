// HTTP routes configuration

use crate::core::state::AppState;
use crate::handlers::{attendance, fingerprint, members, root, user};
use axum::{
    routing::{delete, get, post},
    Router,
};
use std::sync::Arc;

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(root::root_handler))

        // Read endpoints
        .route("/members", get(members::members_handler))
        .route("/attendance", get(attendance::attendance_handler))
        .route("/user/fingerprints/{user_id}", get(fingerprint::list_fingerprints_handler))

        // Write endpoints
        .route("/user/create", post(user::create_user_handler))
        .route("/user/delete/{user_id}", delete(user::delete_user_handler))
        .route("/user/enable", post(user::enable_user_handler))
        .route("/user/disable", post(user::disable_user_handler))
        .route(
            "/user/delete_fingerprint/{user_id}",
            delete(fingerprint::delete_fingerprints_handler),
        )

        // 404 fallback for all unmatched routes
        .fallback(crate::handlers::fallback::fallback_handler)

        .with_state(state)
}
