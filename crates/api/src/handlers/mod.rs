//! Request handlers.
//!
//! Each submodule provides the async handlers for one resource. Work that
//! burns CPU (password hashing, image transcoding) or touches the disk runs
//! through [`blocking`] so it never stalls the async runtime.

pub mod auth;
pub mod avatar;
pub mod captcha;

use aurim_core::error::CoreError;

use crate::error::{AppError, AppResult};

/// Run a fallible core call on the blocking thread pool.
pub(crate) async fn blocking<T, F>(task: F) -> AppResult<T>
where
    F: FnOnce() -> Result<T, CoreError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(task)
        .await
        .map_err(|e| AppError::InternalError(format!("Blocking task failed: {e}")))?
        .map_err(AppError::from)
}
