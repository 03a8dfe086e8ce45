//! Route definitions for the `/avatar` resource.

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;

use crate::handlers::avatar;
use crate::state::AppState;

/// Routes mounted at `/avatar`.
///
/// ```text
/// GET  /get/{userId}  -> get_avatar
/// POST /upload        -> upload_avatar (requires session, body capped)
/// ```
pub fn router(max_upload_bytes: usize) -> Router<AppState> {
    Router::new()
        .route("/get/{user_id}", get(avatar::get_avatar))
        .route(
            "/upload",
            post(avatar::upload_avatar).layer(DefaultBodyLimit::max(max_upload_bytes)),
        )
}
