//! Per-user device → token bookkeeping.
//!
//! Each user owns one collection named `userLoginInfo:<username>` whose
//! fields are client ids and whose values are the last token issued to that
//! client. A presented token is only honoured if it equals the stored value
//! for the presenting client, so tokens superseded by a newer login on the
//! same device stop working even though their signature is still valid.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use crate::kv::{KvStore, StoreError};

/// Collection name prefix; the username is appended.
pub const SESSION_COLLECTION_PREFIX: &str = "userLoginInfo:";

#[derive(Clone)]
pub struct SessionStore {
    kv: Arc<dyn KvStore>,
}

impl SessionStore {
    pub fn new(kv: Arc<dyn KvStore>) -> Self {
        Self { kv }
    }

    fn collection(subject: &str) -> String {
        format!("{SESSION_COLLECTION_PREFIX}{subject}")
    }

    /// Upsert the token recorded for `device_id`.
    pub fn record(&self, subject: &str, device_id: &str, token: &str) -> Result<(), StoreError> {
        self.kv.put(&Self::collection(subject), device_id, token)?;
        tracing::debug!(subject, device_id, "Session recorded");
        Ok(())
    }

    pub fn record_many(
        &self,
        subject: &str,
        device_tokens: &HashMap<String, String>,
    ) -> Result<(), StoreError> {
        self.kv.put_all(&Self::collection(subject), device_tokens)
    }

    pub fn lookup(&self, subject: &str, device_id: &str) -> Result<Option<String>, StoreError> {
        self.kv.get(&Self::collection(subject), device_id)
    }

    pub fn all(&self, subject: &str) -> Result<HashMap<String, String>, StoreError> {
        self.kv.get_all(&Self::collection(subject))
    }

    /// Drop one device's entry. Returns `true` if it existed.
    pub fn forget(&self, subject: &str, device_id: &str) -> Result<bool, StoreError> {
        self.kv.delete(&Self::collection(subject), device_id)
    }

    /// Arm a time-to-live on every device session of `subject` at once.
    pub fn expire_after(&self, subject: &str, seconds: u64) -> Result<(), StoreError> {
        self.kv
            .expire(&Self::collection(subject), Duration::from_secs(seconds))?;
        Ok(())
    }

    /// Whether `presented` is the current token for this exact device.
    pub fn is_current(
        &self,
        subject: &str,
        device_id: &str,
        presented: &str,
    ) -> Result<bool, StoreError> {
        Ok(self.lookup(subject, device_id)?.as_deref() == Some(presented))
    }
}
