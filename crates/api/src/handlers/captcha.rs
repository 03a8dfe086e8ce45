//! Handler for the `/captcha` resource.

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::error::AppResult;
use crate::middleware::client_ip::ClientIp;
use crate::response::Success;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct CaptchaResponse {
    /// The new code, or the caller's request count when a code is already
    /// live for its IP.
    pub code: String,
}

/// GET /captcha/getCaptcha
pub async fn get_captcha(
    State(state): State<AppState>,
    ClientIp(ip): ClientIp,
) -> AppResult<Json<Success<CaptchaResponse>>> {
    let outcome = state.captcha.request(&ip)?;
    Ok(Json(Success::new(CaptchaResponse {
        code: outcome.value().to_string(),
    })))
}
