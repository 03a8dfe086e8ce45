use crate::avatar::AvatarError;
use crate::image_codec::ImageError;
use crate::kv::StoreError;
use crate::token::TokenError;

/// Authentication failures. Never retried automatically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Account is banned")]
    AccountBanned,

    #[error("Token expired")]
    TokenExpired,

    #[error("Token signature does not verify")]
    BadSignature,

    #[error("Token is malformed")]
    MalformedToken,

    #[error("Token uses an unsupported encoding")]
    UnsupportedToken,

    /// The token is genuine but no longer the one recorded for this client.
    #[error("Token is not the current session for this client")]
    StaleSession,
}

/// Uniqueness violations on account creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ConflictError {
    #[error("Username is already taken")]
    DuplicateUsername,

    #[error("Email is already registered")]
    DuplicateEmail,
}

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Conflict(#[from] ConflictError),

    #[error(transparent)]
    Image(#[from] ImageError),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Invalid identifier: {0:?}")]
    InvalidIdentifier(String),

    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Convenience alias for fallible core operations.
pub type CoreResult<T> = Result<T, CoreError>;

impl CoreError {
    /// Short machine-oriented reason suitable for a response body.
    ///
    /// Internal failures collapse to `INTERNAL_ERROR`; every catalogued kind
    /// keeps its own reason.
    pub fn reason(&self) -> &'static str {
        match self {
            CoreError::Validation(_) => "VALIDATION_ERROR",
            CoreError::Auth(auth) => match auth {
                AuthError::InvalidCredentials => "INVALID_CREDENTIALS",
                AuthError::AccountBanned => "ACCOUNT_BANNED",
                AuthError::TokenExpired => "TOKEN_EXPIRED",
                AuthError::BadSignature => "INVALID_SIGNATURE",
                AuthError::MalformedToken
                | AuthError::UnsupportedToken
                | AuthError::StaleSession => "INVALID_TOKEN",
            },
            CoreError::Conflict(ConflictError::DuplicateUsername) => "DUPLICATE_USERNAME",
            CoreError::Conflict(ConflictError::DuplicateEmail) => "DUPLICATE_EMAIL",
            CoreError::Image(image) => image.reason(),
            CoreError::Storage(_) => "STORAGE_ERROR",
            CoreError::InvalidIdentifier(_) => "INVALID_IDENTIFIER",
            CoreError::NotFound { .. } => "NOT_FOUND",
            CoreError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl From<TokenError> for CoreError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Expired => CoreError::Auth(AuthError::TokenExpired),
            TokenError::BadSignature => CoreError::Auth(AuthError::BadSignature),
            TokenError::Malformed => CoreError::Auth(AuthError::MalformedToken),
            TokenError::UnsupportedVariant => CoreError::Auth(AuthError::UnsupportedToken),
            TokenError::Signing(msg) => CoreError::Internal(format!("Token signing failed: {msg}")),
        }
    }
}

impl From<AvatarError> for CoreError {
    fn from(err: AvatarError) -> Self {
        match err {
            AvatarError::InvalidIdentifier(id) => CoreError::InvalidIdentifier(id),
            AvatarError::Image(image) => CoreError::Image(image),
            storage @ AvatarError::Storage { .. } => CoreError::Storage(storage.to_string()),
        }
    }
}

impl From<StoreError> for CoreError {
    fn from(err: StoreError) -> Self {
        CoreError::Internal(err.to_string())
    }
}

impl From<validator::ValidationErrors> for CoreError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut fields: Vec<String> = errors
            .field_errors()
            .keys()
            .map(|field| field.to_string())
            .collect();
        fields.sort_unstable();
        CoreError::Validation(format!("Invalid fields: {}", fields.join(", ")))
    }
}
