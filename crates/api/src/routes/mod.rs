pub mod auth;
pub mod avatar;
pub mod captcha;
pub mod health;

use axum::Router;

use crate::state::AppState;

/// Build the application route tree.
///
/// Route hierarchy:
///
/// ```text
/// /auth/login                  login (public)
/// /auth/register               register (public)
/// /auth/logout                 logout (requires session)
///
/// /avatar/get/{userId}         fetch avatar as WebP (public)
/// /avatar/upload               replace own avatar (requires session)
///
/// /captcha/getCaptcha          verification code for the caller's IP
/// ```
pub fn app_routes(max_avatar_bytes: usize) -> Router<AppState> {
    Router::new()
        .nest("/auth", auth::router())
        .nest("/avatar", avatar::router(max_avatar_bytes))
        .nest("/captcha", captcha::router())
}
