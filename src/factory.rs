//! Wiring of the store, ledger, spin log and services
//!
//! Centralizes the initialization shared by the server binary and the tests.

use crate::{
    common::traits::{Ledger, SpinLog},
    config::SlotVaultConfig,
    errors::StoreResult,
    games::{CombinationSource, OsRngSource, SlotMachine},
    history::StoreSpinLog,
    ledger::StoreLedger,
    services::{AuthService, GameService, WalletService},
    storage::{RocksStore, Store},
    transaction::TxRunner,
};
use std::sync::Arc;

/// Fully wired engine
#[derive(Clone)]
pub struct SlotVault {
    pub store: RocksStore,
    pub runner: TxRunner,
    pub wallet: WalletService,
    pub game: GameService,
}

pub struct SlotVaultFactory;

impl SlotVaultFactory {
    /// Open the configured database and wire services over it with the
    /// operating-system random source.
    pub fn create(config: &SlotVaultConfig) -> StoreResult<SlotVault> {
        Self::create_with_source(config, Arc::new(OsRngSource))
    }

    /// Same as `create` with a caller-supplied combination source.
    pub fn create_with_source(
        config: &SlotVaultConfig,
        source: Arc<dyn CombinationSource>,
    ) -> StoreResult<SlotVault> {
        let store = RocksStore::open(&config.storage)?;
        Ok(Self::wire(store, config, source))
    }

    pub fn wire(store: RocksStore, config: &SlotVaultConfig, source: Arc<dyn CombinationSource>) -> SlotVault {
        let shared: Arc<dyn Store> = Arc::new(store.clone());
        let runner = TxRunner::new(shared).with_deadline(config.transaction_timeout());

        let ledger: Arc<dyn Ledger> = Arc::new(StoreLedger::new(runner.clone()));
        let spin_log: Arc<dyn SpinLog> = Arc::new(StoreSpinLog::new(runner.clone()));
        let auth = AuthService::new(&config.auth);

        let wallet = WalletService::new(ledger.clone(), auth, runner.clone());
        let game = GameService::new(ledger, spin_log, SlotMachine::with_source(source), runner.clone());

        SlotVault {
            store,
            runner,
            wallet,
            game,
        }
    }
}
