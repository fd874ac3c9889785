//! Wallet ledger over the transactional store

use crate::common::traits::Ledger;
use crate::common::types::{NewUser, User};
use crate::errors::{StoreError, WalletError, WalletResult};
use crate::transaction::{TxRunner, TxScope};
use async_trait::async_trait;
use tracing::debug;

pub struct StoreLedger {
    runner: TxRunner,
}

impl StoreLedger {
    pub fn new(runner: TxRunner) -> Self {
        Self { runner }
    }
}

#[async_trait]
impl Ledger for StoreLedger {
    async fn get_balance(&self, scope: &mut TxScope, login: &str) -> WalletResult<i64> {
        let login = login.to_string();
        self.runner
            .run(scope, move |scope| {
                Box::pin(async move {
                    let user = scope
                        .tx()?
                        .get_user_for_update(&login)
                        .await
                        .map_err(|e| e.context("get balance", &login))?;

                    match user {
                        Some(user) => Ok(user.balance),
                        None => Err(WalletError::UserNotFound { login }),
                    }
                })
            })
            .await
    }

    async fn set_balance(&self, scope: &mut TxScope, login: &str, balance: i64) -> WalletResult<()> {
        let login = login.to_string();
        self.runner
            .run(scope, move |scope| {
                Box::pin(async move {
                    let rows = scope
                        .tx()?
                        .update_balance(&login, balance)
                        .await
                        .map_err(|e| e.context("set balance", &login))?;

                    if rows == 0 {
                        return Err(WalletError::UserNotFound { login });
                    }
                    debug!(login = %login, balance, "balance updated");
                    Ok(())
                })
            })
            .await
    }

    async fn create_user(&self, scope: &mut TxScope, user: NewUser) -> WalletResult<User> {
        self.runner
            .run(scope, move |scope| {
                Box::pin(async move {
                    let tx = scope.tx()?;
                    let login = user.login.clone();

                    // Locks the login even when absent, so two registrations of
                    // the same login serialize and the second sees the first.
                    let existing = tx
                        .get_user_for_update(&login)
                        .await
                        .map_err(|e| e.context("create user", &login))?;
                    if existing.is_some() {
                        return Err(WalletError::UserAlreadyExists { login });
                    }

                    let user = user.into_user();
                    match tx.insert_user(&user).await {
                        Ok(()) => {}
                        Err(StoreError::Constraint(_)) => return Err(WalletError::UserAlreadyExists { login }),
                        Err(e) => return Err(e.context("create user", &login)),
                    }

                    debug!(login = %login, user_id = %user.id, "user created");
                    Ok(user)
                })
            })
            .await
    }

    async fn find_user(&self, scope: &mut TxScope, login: &str) -> WalletResult<Option<User>> {
        let login = login.to_string();
        self.runner
            .run(scope, move |scope| {
                Box::pin(async move {
                    scope
                        .tx()?
                        .get_user(&login)
                        .await
                        .map_err(|e| e.context("find user", &login))
                })
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StorageConfig;
    use crate::storage::{RocksStore, Store};
    use std::sync::Arc;
    use tempfile::TempDir;

    fn setup() -> (TempDir, RocksStore, TxRunner, StoreLedger) {
        let temp_dir = TempDir::new().unwrap();
        let config = StorageConfig {
            data_directory: temp_dir.path().display().to_string(),
            sync_writes: false,
            lock_timeout_ms: 200,
            ..Default::default()
        };
        let store = RocksStore::open(&config).unwrap();
        let runner = TxRunner::new(Arc::new(store.clone()) as Arc<dyn Store>);
        let ledger = StoreLedger::new(runner.clone());
        (temp_dir, store, runner, ledger)
    }

    fn new_user(login: &str, balance: i64) -> NewUser {
        NewUser {
            login: login.to_string(),
            password_hash: "hash".to_string(),
            first_name: "First".to_string(),
            last_name: "Last".to_string(),
            balance,
        }
    }

    #[tokio::test]
    async fn test_create_and_read_balance() {
        let (_dir, store, _runner, ledger) = setup();

        let user = ledger.create_user(&mut TxScope::new(), new_user("alice", 100)).await.unwrap();
        assert_eq!(user.login, "alice");

        assert_eq!(ledger.get_balance(&mut TxScope::new(), "alice").await.unwrap(), 100);
        assert_eq!(store.load_user("alice").unwrap().unwrap().id, user.id);
        assert_eq!(store.held_locks(), 0);
    }

    #[tokio::test]
    async fn test_duplicate_login_rejected() {
        let (_dir, _store, _runner, ledger) = setup();

        ledger.create_user(&mut TxScope::new(), new_user("bob", 0)).await.unwrap();
        let err = ledger.create_user(&mut TxScope::new(), new_user("bob", 5)).await.unwrap_err();
        assert!(matches!(err, WalletError::UserAlreadyExists { ref login } if login == "bob"));
    }

    #[tokio::test]
    async fn test_missing_user() {
        let (_dir, _store, _runner, ledger) = setup();

        let err = ledger.get_balance(&mut TxScope::new(), "ghost").await.unwrap_err();
        assert!(matches!(err, WalletError::UserNotFound { .. }));

        let err = ledger.set_balance(&mut TxScope::new(), "ghost", 10).await.unwrap_err();
        assert!(matches!(err, WalletError::UserNotFound { .. }));

        assert!(ledger.find_user(&mut TxScope::new(), "ghost").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_ambient_transaction_rolls_back_together() {
        let (_dir, store, runner, ledger) = setup();
        ledger.create_user(&mut TxScope::new(), new_user("carol", 50)).await.unwrap();

        let ledger = Arc::new(ledger);
        let inner = ledger.clone();
        let result: WalletResult<()> = runner
            .run(&mut TxScope::new(), move |scope| {
                Box::pin(async move {
                    inner.set_balance(scope, "carol", 10).await?;
                    assert_eq!(inner.get_balance(scope, "carol").await?, 10);
                    Err(WalletError::InvalidAmount(0))
                })
            })
            .await;

        assert!(result.is_err());
        assert_eq!(store.load_user("carol").unwrap().unwrap().balance, 50);
    }
}
