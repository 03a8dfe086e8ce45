//! Shared success envelope for API handlers.
//!
//! Successful JSON responses are `{"status": "success", ...fields}`; the
//! payload's fields sit next to `status` rather than under a nested key.

use serde::Serialize;

/// `{ "status": "success", ...T }` response envelope.
///
/// ```ignore
/// Ok(Json(Success::new(TokenPair { token, client_id })))
/// ```
#[derive(Debug, Serialize)]
pub struct Success<T: Serialize> {
    status: &'static str,
    #[serde(flatten)]
    pub data: T,
}

impl<T: Serialize> Success<T> {
    pub fn new(data: T) -> Self {
        Self {
            status: "success",
            data,
        }
    }
}
