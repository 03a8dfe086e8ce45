//! Narrow key-value interface over named collections of string fields.
//!
//! Sessions and rate counters only need hash-table style access: a
//! collection name, a field, a string value, and a time-to-live that applies
//! to the whole collection. [`MemoryKvStore`] implements that contract in
//! process; an external store adapter implements the same trait.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use mockable::Clock;

use crate::types::Timestamp;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Key-value backend error: {0}")]
    Backend(String),
}

/// Hash-table style store. Each call is atomic for its collection; there
/// are no multi-call transactions.
pub trait KvStore: Send + Sync {
    fn get(&self, collection: &str, field: &str) -> Result<Option<String>, StoreError>;

    fn get_all(&self, collection: &str) -> Result<HashMap<String, String>, StoreError>;

    fn contains(&self, collection: &str, field: &str) -> Result<bool, StoreError> {
        Ok(self.get(collection, field)?.is_some())
    }

    fn put(&self, collection: &str, field: &str, value: &str) -> Result<(), StoreError>;

    fn put_all(
        &self,
        collection: &str,
        entries: &HashMap<String, String>,
    ) -> Result<(), StoreError>;

    /// Remove one field. Returns `true` if it was present.
    fn delete(&self, collection: &str, field: &str) -> Result<bool, StoreError>;

    /// Set a time-to-live on the whole collection, replacing any previous
    /// one. Returns `false` (and does nothing) if the collection is absent.
    fn expire(&self, collection: &str, ttl: Duration) -> Result<bool, StoreError>;

    /// Remaining time-to-live, or `None` if the collection is absent or has
    /// no expiry armed.
    fn time_to_live(&self, collection: &str) -> Result<Option<Duration>, StoreError>;
}

#[derive(Debug, Default)]
struct Collection {
    fields: HashMap<String, String>,
    expires_at: Option<Timestamp>,
}

/// In-process [`KvStore`] with lazily evaluated collection expiry.
///
/// An emptied collection disappears together with its expiry, matching the
/// hash semantics of common external stores.
pub struct MemoryKvStore {
    clock: Arc<dyn Clock>,
    collections: Mutex<HashMap<String, Collection>>,
}

impl MemoryKvStore {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            collections: Mutex::new(HashMap::new()),
        }
    }

    /// Run `f` against the live collections after dropping expired ones.
    fn with_live<R>(&self, f: impl FnOnce(&mut HashMap<String, Collection>) -> R) -> R {
        let now = self.clock.utc();
        let mut collections = self
            .collections
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        collections.retain(|_, c| c.expires_at.map_or(true, |deadline| deadline > now));
        f(&mut collections)
    }
}

impl KvStore for MemoryKvStore {
    fn get(&self, collection: &str, field: &str) -> Result<Option<String>, StoreError> {
        Ok(self.with_live(|all| {
            all.get(collection)
                .and_then(|c| c.fields.get(field))
                .cloned()
        }))
    }

    fn get_all(&self, collection: &str) -> Result<HashMap<String, String>, StoreError> {
        Ok(self.with_live(|all| {
            all.get(collection)
                .map(|c| c.fields.clone())
                .unwrap_or_default()
        }))
    }

    fn put(&self, collection: &str, field: &str, value: &str) -> Result<(), StoreError> {
        self.with_live(|all| {
            all.entry(collection.to_string())
                .or_default()
                .fields
                .insert(field.to_string(), value.to_string());
        });
        Ok(())
    }

    fn put_all(
        &self,
        collection: &str,
        entries: &HashMap<String, String>,
    ) -> Result<(), StoreError> {
        if entries.is_empty() {
            return Ok(());
        }
        self.with_live(|all| {
            let target = all.entry(collection.to_string()).or_default();
            for (field, value) in entries {
                target.fields.insert(field.clone(), value.clone());
            }
        });
        Ok(())
    }

    fn delete(&self, collection: &str, field: &str) -> Result<bool, StoreError> {
        Ok(self.with_live(|all| {
            let Some(target) = all.get_mut(collection) else {
                return false;
            };
            let removed = target.fields.remove(field).is_some();
            if target.fields.is_empty() {
                all.remove(collection);
            }
            removed
        }))
    }

    fn expire(&self, collection: &str, ttl: Duration) -> Result<bool, StoreError> {
        let ttl = chrono::Duration::from_std(ttl)
            .map_err(|e| StoreError::Backend(format!("TTL out of range: {e}")))?;
        let deadline = self.clock.utc() + ttl;
        Ok(self.with_live(|all| match all.get_mut(collection) {
            Some(target) => {
                target.expires_at = Some(deadline);
                true
            }
            None => false,
        }))
    }

    fn time_to_live(&self, collection: &str) -> Result<Option<Duration>, StoreError> {
        let now = self.clock.utc();
        Ok(self.with_live(|all| {
            all.get(collection)
                .and_then(|c| c.expires_at)
                .and_then(|deadline| (deadline - now).to_std().ok())
        }))
    }
}
