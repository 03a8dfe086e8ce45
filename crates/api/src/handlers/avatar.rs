//! Handlers for the `/avatar` resource.

use aurim_core::image_codec::ImageFormat;
use axum::extract::multipart::MultipartError;
use axum::extract::{Multipart, Path, State};
use axum::http::header::CONTENT_TYPE;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::error::{AppError, AppResult};
use crate::handlers::blocking;
use crate::middleware::session::SessionUser;
use crate::response::Success;
use crate::state::AppState;

/// Multipart part carrying the image.
pub const AVATAR_FIELD: &str = "avatar";

#[derive(Debug, Serialize)]
pub struct UploadedAvatar {
    pub url: String,
}

fn multipart_error(err: MultipartError) -> AppError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge
    } else {
        AppError::BadRequest(err.body_text())
    }
}

/// GET /avatar/get/{userId}
///
/// Always answers WebP. No avatar is a bare 404.
pub async fn get_avatar(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> AppResult<Response> {
    let avatars = state.avatars.clone();
    let found = blocking(move || Ok(avatars.load_webp(&user_id)?)).await?;

    Ok(match found {
        Some(bytes) => ([(CONTENT_TYPE, ImageFormat::WebP.media_type())], bytes).into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    })
}

/// POST /avatar/upload
///
/// Accepts a multipart form with a required `avatar` part. Any previous
/// avatar of the caller is replaced by a WebP copy of the upload.
pub async fn upload_avatar(
    State(state): State<AppState>,
    session: SessionUser,
    mut multipart: Multipart,
) -> AppResult<Json<Success<UploadedAvatar>>> {
    let mut upload: Option<Vec<u8>> = None;

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() == Some(AVATAR_FIELD) {
            let data = field.bytes().await.map_err(multipart_error)?;
            upload = Some(data.to_vec());
        }
    }

    let data = upload
        .filter(|data| !data.is_empty())
        .ok_or_else(|| AppError::BadRequest(format!("Missing or empty '{AVATAR_FIELD}' part")))?;

    let owner = state.accounts.resolve_owner(&session.claims)?;
    let owner_id = owner.id.to_string();

    let avatars = state.avatars.clone();
    let id = owner_id.clone();
    blocking(move || Ok(avatars.replace(&id, &data)?)).await?;

    tracing::info!(user_id = owner.id, "Avatar uploaded");

    Ok(Json(Success::new(UploadedAvatar {
        url: format!("{}/avatar/get/{owner_id}", state.config.public_base_url),
    })))
}
