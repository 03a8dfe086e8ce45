//! Device-session extractor for Axum handlers.

use aurim_core::token::TokenClaims;
use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;

use crate::error::AppError;
use crate::state::AppState;

/// Header carrying the client id handed out at login.
pub const CLIENT_ID_HEADER: &str = "x-client-id";

/// A caller holding the current token for its device.
///
/// Reads `Authorization: Bearer <token>` and `x-client-id: <client id>`, then
/// requires the token to be valid and still recorded for that client id:
///
/// ```ignore
/// async fn my_handler(session: SessionUser) -> AppResult<Json<()>> {
///     tracing::info!(username = %session.claims.sub, "handling request");
///     Ok(Json(()))
/// }
/// ```
#[derive(Debug, Clone)]
pub struct SessionUser {
    pub claims: TokenClaims,
    pub token: String,
    pub client_id: String,
}

impl FromRequestParts<AppState> for SessionUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| AppError::Unauthorized("Missing Authorization header".into()))?;

        let token = auth_header.strip_prefix("Bearer ").ok_or_else(|| {
            AppError::Unauthorized("Invalid Authorization format. Expected: Bearer <token>".into())
        })?;

        let client_id = parts
            .headers
            .get(CLIENT_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .filter(|v| !v.is_empty())
            .ok_or_else(|| AppError::Unauthorized(format!("Missing {CLIENT_ID_HEADER} header")))?;

        let claims = state.accounts.authenticate(token, client_id)?;

        Ok(SessionUser {
            claims,
            token: token.to_string(),
            client_id: client_id.to_string(),
        })
    }
}
