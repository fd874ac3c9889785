//! Transactional persistence for accounts and spin history
//!
//! `Store` hands out `StoreTx` units of work. A transaction sees its own
//! buffered writes, takes row locks on everything it reads for update or
//! writes, and becomes visible to others only through `commit`.

pub mod keys;
pub mod locks;
pub mod rocks;

pub use rocks::RocksStore;

use crate::common::types::{NewSpin, SpinRecord, User};
use crate::errors::StoreResult;
use async_trait::async_trait;
use uuid::Uuid;

#[async_trait]
pub trait Store: Send + Sync {
    /// Open a new unit of work
    async fn begin(&self) -> StoreResult<Box<dyn StoreTx>>;

    /// Committed spins of one user, newest first
    async fn list_spins(&self, user_id: &Uuid, limit: usize, offset: usize) -> StoreResult<Vec<SpinRecord>>;
}

/// One unit of work. Dropping it without `commit` discards every write and
/// releases its locks.
#[async_trait]
pub trait StoreTx: Send {
    /// Plain read; sees this transaction's own writes.
    async fn get_user(&mut self, login: &str) -> StoreResult<Option<User>>;

    /// Read under the account's row lock, held until the transaction ends.
    /// The lock is taken even when the user does not exist.
    async fn get_user_for_update(&mut self, login: &str) -> StoreResult<Option<User>>;

    /// Overwrite the balance; returns the number of rows affected (0 or 1).
    async fn update_balance(&mut self, login: &str, balance: i64) -> StoreResult<u64>;

    /// Fails with `StoreError::Constraint` when the login is taken.
    async fn insert_user(&mut self, user: &User) -> StoreResult<()>;

    /// Assigns id and creation time.
    async fn insert_spin(&mut self, spin: NewSpin) -> StoreResult<SpinRecord>;

    async fn commit(self: Box<Self>) -> StoreResult<()>;

    async fn rollback(self: Box<Self>) -> StoreResult<()>;
}
