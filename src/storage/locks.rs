//! Row-lock table shared by all transactions of one store
//!
//! One async mutex per key. A transaction keeps the owned guard until it
//! commits, rolls back or is dropped; entries nobody holds are pruned on
//! release so the table only grows with contention, not with key count.

use crate::errors::{StoreError, StoreResult};
use crate::storage::keys::display_key;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, OwnedMutexGuard};

pub type RowGuard = OwnedMutexGuard<()>;

#[derive(Debug)]
pub struct RowLocks {
    table: DashMap<Vec<u8>, Arc<Mutex<()>>>,
    timeout: Duration,
}

impl RowLocks {
    pub fn new(timeout: Duration) -> Self {
        Self {
            table: DashMap::new(),
            timeout,
        }
    }

    /// Wait for the lock on `key`, at most the configured timeout.
    pub async fn acquire(&self, key: &[u8]) -> StoreResult<RowGuard> {
        // Clone the Arc out before awaiting; a dashmap shard guard must not
        // be held across an await point.
        let mutex = self
            .table
            .entry(key.to_vec())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();

        match tokio::time::timeout(self.timeout, mutex.lock_owned()).await {
            Ok(guard) => Ok(guard),
            Err(_) => Err(StoreError::LockTimeout {
                key: display_key(key),
                waited_ms: self.timeout.as_millis() as u64,
            }),
        }
    }

    /// Release a guard and drop the table entry if no one else references it.
    pub fn release(&self, key: &[u8], guard: RowGuard) {
        drop(guard);
        self.table.remove_if(key, |_, mutex| Arc::strong_count(mutex) == 1);
    }

    /// Number of keys with a live lock entry
    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}
