//! Account id generation and random opaque strings.

use std::sync::{Arc, Mutex, PoisonError};

use mockable::Clock;
use rand::Rng;

use crate::error::CoreError;
use crate::types::DbId;

// ---------------------------------------------------------------------------
// Snowflake ids
// ---------------------------------------------------------------------------

/// Custom epoch (2010-11-04T01:42:54.657Z) shared by most snowflake layouts.
pub const SNOWFLAKE_EPOCH_MS: i64 = 1_288_834_974_657;

const WORKER_ID_BITS: u32 = 5;
const DATACENTER_ID_BITS: u32 = 5;
const SEQUENCE_BITS: u32 = 12;

const MAX_NODE_ID: i64 = (1 << WORKER_ID_BITS) - 1;
const SEQUENCE_MASK: i64 = (1 << SEQUENCE_BITS) - 1;

const WORKER_ID_SHIFT: u32 = SEQUENCE_BITS;
const DATACENTER_ID_SHIFT: u32 = SEQUENCE_BITS + WORKER_ID_BITS;
const TIMESTAMP_SHIFT: u32 = SEQUENCE_BITS + WORKER_ID_BITS + DATACENTER_ID_BITS;

#[derive(Debug, Default)]
struct SnowflakeState {
    last_ms: i64,
    sequence: i64,
}

/// Time-ordered 64-bit id generator.
///
/// Layout: 41-bit milliseconds since [`SNOWFLAKE_EPOCH_MS`], 5-bit datacenter,
/// 5-bit worker, 12-bit per-millisecond sequence. When the sequence wraps or
/// the clock steps backwards the generator borrows the next millisecond
/// instead of blocking.
pub struct SnowflakeIds {
    datacenter_id: i64,
    worker_id: i64,
    clock: Arc<dyn Clock>,
    state: Mutex<SnowflakeState>,
}

impl SnowflakeIds {
    pub fn new(datacenter_id: i64, worker_id: i64, clock: Arc<dyn Clock>) -> Result<Self, CoreError> {
        for (name, value) in [("datacenter_id", datacenter_id), ("worker_id", worker_id)] {
            if !(0..=MAX_NODE_ID).contains(&value) {
                return Err(CoreError::Validation(format!(
                    "{name} must be between 0 and {MAX_NODE_ID}, got {value}"
                )));
            }
        }
        Ok(Self {
            datacenter_id,
            worker_id,
            clock,
            state: Mutex::new(SnowflakeState::default()),
        })
    }

    pub fn next_id(&self) -> DbId {
        let now_ms = self.clock.utc().timestamp_millis();
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);

        let mut ms = now_ms.max(state.last_ms);
        if ms == state.last_ms {
            state.sequence = (state.sequence + 1) & SEQUENCE_MASK;
            if state.sequence == 0 {
                ms += 1;
            }
        } else {
            state.sequence = 0;
        }
        state.last_ms = ms;

        ((ms - SNOWFLAKE_EPOCH_MS) << TIMESTAMP_SHIFT)
            | (self.datacenter_id << DATACENTER_ID_SHIFT)
            | (self.worker_id << WORKER_ID_SHIFT)
            | state.sequence
    }
}

// ---------------------------------------------------------------------------
// Random strings
// ---------------------------------------------------------------------------

/// Random ASCII alphanumeric string of the given length.
pub fn random_alphanumeric(len: usize) -> String {
    rand::rng()
        .sample_iter(&rand::distr::Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;
    use crate::clock::ManualClock;

    fn generator(clock: Arc<ManualClock>) -> SnowflakeIds {
        SnowflakeIds::new(1, 1, clock).expect("valid node ids")
    }

    #[test]
    fn ids_are_unique_and_increasing_within_one_millisecond() {
        let ids = generator(Arc::new(ManualClock::starting_now()));
        let batch: Vec<DbId> = (0..5000).map(|_| ids.next_id()).collect();

        assert!(batch.windows(2).all(|w| w[0] < w[1]));
        let unique: HashSet<_> = batch.iter().collect();
        assert_eq!(unique.len(), batch.len());
    }

    #[test]
    fn ids_survive_clock_regression() {
        let clock = Arc::new(ManualClock::starting_now());
        let ids = generator(clock.clone());
        let first = ids.next_id();
        clock.advance(chrono::Duration::seconds(-10));
        let second = ids.next_id();
        assert!(second > first);
    }

    #[test]
    fn node_bits_are_embedded() {
        let ids = generator(Arc::new(ManualClock::starting_now()));
        let id = ids.next_id();
        assert_eq!((id >> DATACENTER_ID_SHIFT) & MAX_NODE_ID, 1);
        assert_eq!((id >> WORKER_ID_SHIFT) & MAX_NODE_ID, 1);
        assert!(id > 0);
    }

    #[test]
    fn rejects_out_of_range_node() {
        let clock = Arc::new(ManualClock::starting_now());
        assert!(SnowflakeIds::new(32, 0, clock.clone()).is_err());
        assert!(SnowflakeIds::new(0, -1, clock).is_err());
    }

    #[test]
    fn random_alphanumeric_has_requested_shape() {
        let value = random_alphanumeric(64);
        assert_eq!(value.len(), 64);
        assert!(value.chars().all(|c| c.is_ascii_alphanumeric()));
        assert!(random_alphanumeric(0).is_empty());
    }
}
