//! Handlers for the `/auth` resource (login, register, logout).

use aurim_core::accounts::{AuthSession, LoginIdentifier, LoginInput, RegisterInput};
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};
use crate::handlers::blocking;
use crate::middleware::session::SessionUser;
use crate::response::Success;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// Request body for `POST /auth/login`.
///
/// Fields are optional so a missing one answers `BAD_REQUEST` in the usual
/// envelope instead of a deserialization rejection.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    /// `"email"` or `"userid"`.
    pub input_type: Option<String>,
    pub input: Option<String>,
    pub password: Option<String>,
}

/// Request body for `POST /auth/register`.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

/// Returned by login and register.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    pub token: String,
    pub client_id: String,
}

impl From<AuthSession> for TokenPair {
    fn from(session: AuthSession) -> Self {
        Self {
            token: session.token,
            client_id: session.client_id,
        }
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /auth/login
///
/// Authenticate by email or numeric user id. Every success opens a new
/// device session with its own client id.
pub async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginRequest>,
) -> AppResult<Json<Success<TokenPair>>> {
    let (Some(input_type), Some(input), Some(password)) = (body.input_type, body.input, body.password)
    else {
        return Err(AppError::BadRequest(
            "Required fields: inputType, input, password".into(),
        ));
    };

    let identifier = LoginIdentifier::parse(&input_type, &input)?;
    let accounts = state.accounts.clone();
    let session = blocking(move || {
        accounts.login(LoginInput {
            identifier,
            password,
        })
    })
    .await?;

    Ok(Json(Success::new(session.into())))
}

/// POST /auth/register
pub async fn register(
    State(state): State<AppState>,
    Json(body): Json<RegisterRequest>,
) -> AppResult<Json<Success<TokenPair>>> {
    let (Some(username), Some(email), Some(password)) = (body.username, body.email, body.password)
    else {
        return Err(AppError::BadRequest(
            "Required fields: username, email, password".into(),
        ));
    };

    let accounts = state.accounts.clone();
    let session = blocking(move || {
        accounts.register(RegisterInput {
            username,
            email,
            password,
        })
    })
    .await?;

    Ok(Json(Success::new(session.into())))
}

/// POST /auth/logout
///
/// Ends the caller's device session. Other devices stay logged in.
pub async fn logout(State(state): State<AppState>, session: SessionUser) -> AppResult<StatusCode> {
    state.accounts.logout(&session.token, &session.client_id)?;
    Ok(StatusCode::NO_CONTENT)
}
