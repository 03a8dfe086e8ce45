//! Ephemeral per-key codes and counters.
//!
//! Two collections are in use: [`VERIFICATION_CODE_COLLECTION`] holds the
//! verification code issued to each client IP, and
//! [`ACCOUNT_OPERATION_COLLECTION`] counts account-type requests per IP.
//! Both share a [`RATE_WINDOW`] time-to-live that is armed on the whole
//! collection rather than per key, so touching any key restarts the window
//! for every key in that collection.

use std::sync::Arc;
use std::time::Duration;

use crate::ids::random_alphanumeric;
use crate::kv::{KvStore, StoreError};

pub const VERIFICATION_CODE_COLLECTION: &str = "captchaRecord";
pub const ACCOUNT_OPERATION_COLLECTION: &str = "countOfAccountTypeOperationRequests";

/// Collection-wide time-to-live (2 minutes).
pub const RATE_WINDOW: Duration = Duration::from_secs(120);

/// Length of generated verification codes.
pub const VERIFICATION_CODE_LEN: usize = 4;

#[derive(Clone)]
pub struct RateCounter {
    kv: Arc<dyn KvStore>,
    collection: String,
    window: Duration,
    code_len: usize,
}

impl RateCounter {
    pub fn new(kv: Arc<dyn KvStore>, collection: impl Into<String>, window: Duration) -> Self {
        Self {
            kv,
            collection: collection.into(),
            window,
            code_len: VERIFICATION_CODE_LEN,
        }
    }

    /// Counter over the verification-code collection.
    pub fn verification_codes(kv: Arc<dyn KvStore>) -> Self {
        Self::new(kv, VERIFICATION_CODE_COLLECTION, RATE_WINDOW)
    }

    /// Counter over the account-operation request collection.
    pub fn account_operations(kv: Arc<dyn KvStore>) -> Self {
        Self::new(kv, ACCOUNT_OPERATION_COLLECTION, RATE_WINDOW)
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    pub fn has_entry(&self, key: &str) -> Result<bool, StoreError> {
        self.kv.contains(&self.collection, key)
    }

    /// Mint and store a fresh code for `key`.
    ///
    /// The collection window is armed only if none is running yet.
    pub fn issue_code(&self, key: &str) -> Result<String, StoreError> {
        let code = random_alphanumeric(self.code_len);
        self.kv.put(&self.collection, key, &code)?;
        if self.kv.time_to_live(&self.collection)?.is_none() {
            self.kv.expire(&self.collection, self.window)?;
        }
        tracing::debug!(collection = %self.collection, key, "Verification code issued");
        Ok(code)
    }

    /// Whatever is currently stored for `key`.
    pub fn read_entry(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.kv.get(&self.collection, key)
    }

    /// Add one to the counter at `key` and re-arm the collection window.
    ///
    /// A missing or non-numeric value counts as zero.
    pub fn increment(&self, key: &str) -> Result<i64, StoreError> {
        let current = self
            .kv
            .get(&self.collection, key)?
            .and_then(|value| value.trim().parse::<i64>().ok())
            .unwrap_or(0);
        let next = current.saturating_add(1);
        self.kv.put(&self.collection, key, &next.to_string())?;
        self.kv.expire(&self.collection, self.window)?;
        Ok(next)
    }

    pub fn forget(&self, key: &str) -> Result<bool, StoreError> {
        self.kv.delete(&self.collection, key)
    }
}
