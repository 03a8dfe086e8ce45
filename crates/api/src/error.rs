use aurim_core::error::{AuthError, CoreError};
use aurim_core::image_codec::ImageError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

/// Application-level error type for HTTP handlers.
///
/// Wraps [`CoreError`] for domain errors and adds HTTP-specific variants.
/// Every variant renders as `{"status": "error", "reason": ...}`.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// A domain-level error from `aurim_core`.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Missing or malformed request input.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Credentials were not presented at all.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Payload too large")]
    PayloadTooLarge,

    /// An internal error with a human-readable message.
    #[error("Internal error: {0}")]
    InternalError(String),
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    /// HTTP status and reason string for this error.
    pub fn status_and_reason(&self) -> (StatusCode, &'static str) {
        match self {
            AppError::Core(core) => (core_status(core), core.reason()),
            AppError::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            AppError::Unauthorized(_) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
            AppError::PayloadTooLarge => (StatusCode::PAYLOAD_TOO_LARGE, "PAYLOAD_TOO_LARGE"),
            AppError::InternalError(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        }
    }
}

fn core_status(err: &CoreError) -> StatusCode {
    match err {
        CoreError::Validation(_) | CoreError::InvalidIdentifier(_) => StatusCode::BAD_REQUEST,
        CoreError::Auth(AuthError::AccountBanned) => StatusCode::FORBIDDEN,
        CoreError::Auth(_) => StatusCode::UNAUTHORIZED,
        CoreError::Conflict(_) => StatusCode::CONFLICT,
        CoreError::NotFound { .. } => StatusCode::NOT_FOUND,
        CoreError::Image(ImageError::UnrecognizedFormat) => StatusCode::BAD_REQUEST,
        CoreError::Image(ImageError::Decode { .. }) => StatusCode::UNPROCESSABLE_ENTITY,
        CoreError::Image(_) | CoreError::Storage(_) | CoreError::Internal(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, reason) = self.status_and_reason();

        if status.is_server_error() {
            tracing::error!(error = %self, reason, "Request failed");
        } else {
            tracing::debug!(error = %self, reason, "Request rejected");
        }

        let body = json!({
            "status": "error",
            "reason": reason,
        });

        (status, axum::Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use aurim_core::error::ConflictError;

    use super::*;

    fn mapped(err: impl Into<AppError>) -> (StatusCode, &'static str) {
        err.into().status_and_reason()
    }

    #[test]
    fn auth_errors_are_401_except_banned() {
        assert_eq!(
            mapped(CoreError::from(AuthError::InvalidCredentials)),
            (StatusCode::UNAUTHORIZED, "INVALID_CREDENTIALS")
        );
        assert_eq!(
            mapped(CoreError::from(AuthError::StaleSession)),
            (StatusCode::UNAUTHORIZED, "INVALID_TOKEN")
        );
        assert_eq!(
            mapped(CoreError::from(AuthError::AccountBanned)),
            (StatusCode::FORBIDDEN, "ACCOUNT_BANNED")
        );
    }

    #[test]
    fn domain_kinds_keep_their_reason() {
        assert_eq!(
            mapped(CoreError::from(ConflictError::DuplicateEmail)),
            (StatusCode::CONFLICT, "DUPLICATE_EMAIL")
        );
        assert_eq!(
            mapped(CoreError::Image(ImageError::UnrecognizedFormat)),
            (StatusCode::BAD_REQUEST, "UNRECOGNIZED_FORMAT")
        );
        assert_eq!(
            mapped(CoreError::InvalidIdentifier("../x".into())),
            (StatusCode::BAD_REQUEST, "INVALID_IDENTIFIER")
        );
        assert_eq!(
            mapped(CoreError::Storage("disk full at /srv/avatars/1.webp".into())),
            (StatusCode::INTERNAL_SERVER_ERROR, "STORAGE_ERROR")
        );
    }

    #[test]
    fn internal_detail_is_flattened() {
        assert_eq!(
            mapped(CoreError::Internal("connection refused".into())),
            (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR")
        );
        assert_eq!(
            mapped(AppError::InternalError("join error".into())),
            (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR")
        );
    }
}
