//! Controllable time source.
//!
//! Token expiry, key-value TTLs and id generation read the current time
//! through an injected [`mockable::Clock`]. Production wiring passes
//! [`mockable::DefaultClock`]; tests pass a [`ManualClock`] and move time
//! forward deterministically.

use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Local, Utc};
use mockable::Clock;

use crate::types::Timestamp;

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock(Mutex<Timestamp>);

impl ManualClock {
    pub fn new(start: Timestamp) -> Self {
        Self(Mutex::new(start))
    }

    /// Start at the current wall-clock time.
    pub fn starting_now() -> Self {
        Self::new(Utc::now())
    }

    pub fn set(&self, at: Timestamp) {
        *self.lock_clock() = at;
    }

    pub fn advance(&self, by: chrono::Duration) {
        *self.lock_clock() += by;
    }

    fn lock_clock(&self) -> MutexGuard<'_, Timestamp> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Clock for ManualClock {
    fn local(&self) -> DateTime<Local> {
        self.utc().with_timezone(&Local)
    }

    fn utc(&self) -> DateTime<Utc> {
        *self.lock_clock()
    }
}
