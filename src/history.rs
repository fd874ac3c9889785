//! Spin history backed by the store

use crate::common::traits::SpinLog;
use crate::common::types::{NewSpin, Page, SpinRecord};
use crate::errors::{WalletError, WalletResult};
use crate::storage::Store;
use crate::transaction::{TxRunner, TxScope};
use async_trait::async_trait;
use std::sync::Arc;
use uuid::Uuid;

pub struct StoreSpinLog {
    runner: TxRunner,
    store: Arc<dyn Store>,
}

impl StoreSpinLog {
    pub fn new(runner: TxRunner) -> Self {
        let store = runner.store().clone();
        Self { runner, store }
    }
}

#[async_trait]
impl SpinLog for StoreSpinLog {
    async fn record_spin(&self, scope: &mut TxScope, spin: NewSpin) -> WalletResult<SpinRecord> {
        self.runner
            .run(scope, move |scope| {
                Box::pin(async move {
                    let user_id = spin.user_id;
                    scope
                        .tx()?
                        .insert_spin(spin)
                        .await
                        .map_err(|e| WalletError::Store {
                            context: format!("record spin for user {}", user_id),
                            source: e,
                        })
                })
            })
            .await
    }

    async fn spin_history(&self, user_id: &Uuid, page: Page) -> WalletResult<Vec<SpinRecord>> {
        self.store
            .list_spins(user_id, page.limit, page.offset)
            .await
            .map_err(|e| WalletError::Store {
                context: format!("spin history for user {}", user_id),
                source: e,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StorageConfig;
    use crate::games::SpinOutcome;
    use crate::storage::RocksStore;
    use tempfile::TempDir;

    fn setup() -> (TempDir, StoreSpinLog) {
        let temp_dir = TempDir::new().unwrap();
        let config = StorageConfig {
            data_directory: temp_dir.path().display().to_string(),
            sync_writes: false,
            ..Default::default()
        };
        let store: Arc<dyn Store> = Arc::new(RocksStore::open(&config).unwrap());
        (temp_dir, StoreSpinLog::new(TxRunner::new(store)))
    }

    fn spin(user_id: Uuid, bet: i64, result: SpinOutcome) -> NewSpin {
        NewSpin {
            user_id,
            combination: "4,4,4".to_string(),
            result,
            bet_amount: bet,
            win_amount: result.payout(bet).unwrap(),
        }
    }

    #[tokio::test]
    async fn test_recorded_spin_gets_identity() {
        let (_dir, log) = setup();
        let user_id = Uuid::new_v4();

        let record = log
            .record_spin(&mut TxScope::new(), spin(user_id, 10, SpinOutcome::SuperWin))
            .await
            .unwrap();

        assert_eq!(record.user_id, user_id);
        assert_eq!(record.win_amount, 100);

        let history = log.spin_history(&user_id, Page::default()).await.unwrap();
        assert_eq!(history, vec![record]);
    }

    #[tokio::test]
    async fn test_history_pages_newest_first() {
        let (_dir, log) = setup();
        let user_id = Uuid::new_v4();

        for bet in 1..=4 {
            log.record_spin(&mut TxScope::new(), spin(user_id, bet, SpinOutcome::Lose))
                .await
                .unwrap();
        }

        let page = log.spin_history(&user_id, Page::new(2, 0)).await.unwrap();
        assert_eq!(page.iter().map(|s| s.bet_amount).collect::<Vec<_>>(), vec![4, 3]);

        let page = log.spin_history(&user_id, Page::new(2, 2)).await.unwrap();
        assert_eq!(page.iter().map(|s| s.bet_amount).collect::<Vec<_>>(), vec![2, 1]);

        assert!(log.spin_history(&Uuid::new_v4(), Page::default()).await.unwrap().is_empty());
    }
}
