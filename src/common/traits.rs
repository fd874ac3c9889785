//! Shared traits and interfaces
//!
//! Capability contracts for the wallet and spin-history collaborators. Every
//! mutating operation takes the caller's `TxScope` and either joins the
//! transaction already in it or runs as its own unit of work.

use crate::common::types::{NewSpin, NewUser, Page, SpinRecord, User};
use crate::errors::WalletResult;
use crate::transaction::TxScope;
use async_trait::async_trait;
use uuid::Uuid;

/// Balance bookkeeping for accounts
#[async_trait]
pub trait Ledger: Send + Sync {
    /// Read the balance under the account's row lock, so concurrent
    /// mutations of the same account serialize behind this transaction.
    async fn get_balance(&self, scope: &mut TxScope, login: &str) -> WalletResult<i64>;

    /// Overwrite the balance. `UserNotFound` when no row was affected.
    async fn set_balance(&self, scope: &mut TxScope, login: &str, balance: i64) -> WalletResult<()>;

    /// `UserAlreadyExists` when the login is taken
    async fn create_user(&self, scope: &mut TxScope, user: NewUser) -> WalletResult<User>;

    async fn find_user(&self, scope: &mut TxScope, login: &str) -> WalletResult<Option<User>>;
}

/// Append-only spin history
#[async_trait]
pub trait SpinLog: Send + Sync {
    async fn record_spin(&self, scope: &mut TxScope, spin: NewSpin) -> WalletResult<SpinRecord>;

    /// Committed spins of one user, newest first
    async fn spin_history(&self, user_id: &Uuid, page: Page) -> WalletResult<Vec<SpinRecord>>;
}
