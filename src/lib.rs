//! SlotVault - transactional wallet and slot machine engine
//!
//! Accounts hold a balance in minor currency units. Deposits, withdrawals
//! and spins each run as one unit of work over a RocksDB store: a spin reads
//! the balance under a row lock, draws a combination from a CSPRNG, writes
//! the new balance and appends a spin record, and either all of it commits
//! or none of it does.

pub mod api;
pub mod common;
pub mod config;
pub mod errors;
pub mod factory;
pub mod games;
pub mod history;
pub mod ledger;
pub mod logging;
pub mod metrics;
pub mod services;
pub mod storage;
pub mod transaction;

pub use common::types::{NewSpin, NewUser, Page, SpinRecord, User};
pub use config::SlotVaultConfig;
pub use errors::{StoreError, StoreResult, WalletError, WalletResult};
pub use factory::{SlotVault, SlotVaultFactory};
pub use transaction::{TxRunner, TxScope};
