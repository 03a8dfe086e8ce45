//! Route definitions for the `/captcha` resource.

use axum::routing::get;
use axum::Router;

use crate::handlers::captcha;
use crate::state::AppState;

/// Routes mounted at `/captcha`.
///
/// ```text
/// GET /getCaptcha  -> get_captcha
/// ```
pub fn router() -> Router<AppState> {
    Router::new().route("/getCaptcha", get(captcha::get_captcha))
}
