//! Unit-of-work runner
//!
//! `TxRunner::run` executes a piece of work inside a store transaction. The
//! transaction lives in a `TxScope` that is threaded through the call chain:
//! when the scope already holds one, the work joins it; otherwise the runner
//! opens one, becomes its owner and is the only party that commits or rolls
//! it back.

use crate::errors::{StoreError, StoreResult};
use crate::storage::{Store, StoreTx};
use futures::future::BoxFuture;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, warn};

/// Holder for the ambient transaction of one call chain
#[derive(Default)]
pub struct TxScope {
    tx: Option<Box<dyn StoreTx>>,
}

impl TxScope {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_active(&self) -> bool {
        self.tx.is_some()
    }

    /// The active transaction, `StoreError::NoTransaction` outside a run.
    pub fn tx(&mut self) -> StoreResult<&mut dyn StoreTx> {
        match self.tx.as_mut() {
            Some(tx) => Ok(tx.as_mut()),
            None => Err(StoreError::NoTransaction),
        }
    }
}

impl fmt::Debug for TxScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TxScope").field("active", &self.is_active()).finish()
    }
}

/// Puts a fresh transaction into the scope and takes it back out however the
/// owning call ends. If the owner's future is dropped mid-flight the
/// transaction is dropped with it, which discards its writes.
struct OwnerGuard<'a> {
    scope: &'a mut TxScope,
}

impl<'a> OwnerGuard<'a> {
    fn install(scope: &'a mut TxScope, tx: Box<dyn StoreTx>) -> Self {
        scope.tx = Some(tx);
        Self { scope }
    }

    fn scope(&mut self) -> &mut TxScope {
        &mut *self.scope
    }

    fn take(&mut self) -> Option<Box<dyn StoreTx>> {
        self.scope.tx.take()
    }
}

impl Drop for OwnerGuard<'_> {
    fn drop(&mut self) {
        self.scope.tx.take();
    }
}

#[derive(Clone)]
pub struct TxRunner {
    store: Arc<dyn Store>,
    deadline: Option<Duration>,
}

impl TxRunner {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store, deadline: None }
    }

    /// Bound how long an owned unit of work may run before it is rolled back.
    pub fn with_deadline(mut self, deadline: Option<Duration>) -> Self {
        self.deadline = deadline;
        self
    }

    pub fn store(&self) -> &Arc<dyn Store> {
        &self.store
    }

    /// Run `work` inside the scope's transaction, opening one if needed.
    ///
    /// As owner: success commits (a commit failure is returned instead of
    /// the value), failure rolls back and returns the work's own error even
    /// when the rollback itself fails. As a joined participant: the result
    /// is passed through and the transaction is left alone.
    pub async fn run<T, E, F>(&self, scope: &mut TxScope, work: F) -> Result<T, E>
    where
        F: for<'s> FnOnce(&'s mut TxScope) -> BoxFuture<'s, Result<T, E>> + Send,
        T: Send,
        E: From<StoreError> + fmt::Display + Send,
    {
        if scope.is_active() {
            return work(scope).await;
        }

        let tx = self.store.begin().await?;
        let mut guard = OwnerGuard::install(scope, tx);

        let outcome = match self.deadline {
            Some(limit) => match tokio::time::timeout(limit, work(guard.scope())).await {
                Ok(result) => result,
                Err(_) => {
                    let ms = limit.as_millis() as u64;
                    warn!(deadline_ms = ms, "transaction deadline exceeded, rolling back");
                    Err(StoreError::Deadline { ms }.into())
                }
            },
            None => work(guard.scope()).await,
        };

        let tx = match guard.take() {
            Some(tx) => tx,
            None => return Err(StoreError::NoTransaction.into()),
        };
        drop(guard);

        match outcome {
            Ok(value) => {
                tx.commit().await?;
                Ok(value)
            }
            Err(err) => {
                if let Err(rollback_err) = tx.rollback().await {
                    error!(
                        error = %rollback_err,
                        cause = %err,
                        "rollback failed after unit of work error"
                    );
                }
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::types::{NewSpin, SpinRecord, User};
    use crate::errors::{WalletError, WalletResult};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use uuid::Uuid;

    /// In-memory store that counts lifecycle calls and can be told to fail.
    #[derive(Default)]
    struct CountingStore {
        begins: AtomicUsize,
        commits: AtomicUsize,
        rollbacks: AtomicUsize,
        drops: AtomicUsize,
        fail_commit: AtomicBool,
        fail_rollback: AtomicBool,
    }

    struct CountingTx {
        store: Arc<CountingStore>,
        finished: bool,
    }

    #[async_trait]
    impl Store for Arc<CountingStore> {
        async fn begin(&self) -> StoreResult<Box<dyn StoreTx>> {
            self.begins.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(CountingTx {
                store: self.clone(),
                finished: false,
            }))
        }

        async fn list_spins(&self, _: &Uuid, _: usize, _: usize) -> StoreResult<Vec<SpinRecord>> {
            Ok(vec![])
        }
    }

    #[async_trait]
    impl StoreTx for CountingTx {
        async fn get_user(&mut self, _: &str) -> StoreResult<Option<User>> {
            Ok(None)
        }

        async fn get_user_for_update(&mut self, _: &str) -> StoreResult<Option<User>> {
            Ok(None)
        }

        async fn update_balance(&mut self, _: &str, _: i64) -> StoreResult<u64> {
            Ok(0)
        }

        async fn insert_user(&mut self, _: &User) -> StoreResult<()> {
            Ok(())
        }

        async fn insert_spin(&mut self, _: NewSpin) -> StoreResult<SpinRecord> {
            Err(StoreError::Unavailable("not supported".into()))
        }

        async fn commit(self: Box<Self>) -> StoreResult<()> {
            let mut tx = self;
            tx.finished = true;
            tx.store.commits.fetch_add(1, Ordering::SeqCst);
            if tx.store.fail_commit.load(Ordering::SeqCst) {
                return Err(StoreError::Unavailable("commit refused".into()));
            }
            Ok(())
        }

        async fn rollback(self: Box<Self>) -> StoreResult<()> {
            let mut tx = self;
            tx.finished = true;
            tx.store.rollbacks.fetch_add(1, Ordering::SeqCst);
            if tx.store.fail_rollback.load(Ordering::SeqCst) {
                return Err(StoreError::Unavailable("rollback refused".into()));
            }
            Ok(())
        }
    }

    impl Drop for CountingTx {
        fn drop(&mut self) {
            if !self.finished {
                self.store.drops.fetch_add(1, Ordering::SeqCst);
            }
        }
    }

    fn runner() -> (Arc<CountingStore>, TxRunner) {
        let store = Arc::new(CountingStore::default());
        let runner = TxRunner::new(Arc::new(store.clone()));
        (store, runner)
    }

    fn counts(store: &CountingStore) -> (usize, usize, usize) {
        (
            store.begins.load(Ordering::SeqCst),
            store.commits.load(Ordering::SeqCst),
            store.rollbacks.load(Ordering::SeqCst),
        )
    }

    async fn nested_ok(runner: TxRunner, scope: &mut TxScope) -> WalletResult<u32> {
        let inner = runner.clone();
        runner
            .run(scope, move |scope| {
                Box::pin(async move {
                    assert!(scope.is_active());
                    let a = inner
                        .run(scope, |_| Box::pin(async { Ok::<u32, WalletError>(1) }))
                        .await?;
                    let b = inner
                        .run(scope, |scope| {
                            Box::pin(async move {
                                scope.tx()?;
                                Ok::<u32, WalletError>(2)
                            })
                        })
                        .await?;
                    Ok(a + b)
                })
            })
            .await
    }

    #[tokio::test]
    async fn test_nested_runs_share_one_transaction() {
        let (store, runner) = runner();
        let mut scope = TxScope::new();

        let value = nested_ok(runner, &mut scope).await.unwrap();

        assert_eq!(value, 3);
        assert_eq!(counts(&store), (1, 1, 0));
        assert!(!scope.is_active());
    }

    #[tokio::test]
    async fn test_inner_failure_rolls_back_once() {
        let (store, runner) = runner();
        let mut scope = TxScope::new();
        let inner = runner.clone();

        let result: WalletResult<()> = runner
            .run(&mut scope, move |scope| {
                Box::pin(async move {
                    inner
                        .run(scope, |_| {
                            Box::pin(async { Err::<(), _>(WalletError::InvalidAmount(-1)) })
                        })
                        .await
                })
            })
            .await;

        assert!(matches!(result, Err(WalletError::InvalidAmount(-1))));
        assert_eq!(counts(&store), (1, 0, 1));
    }

    #[tokio::test]
    async fn test_failed_rollback_keeps_original_error() {
        let (store, runner) = runner();
        store.fail_rollback.store(true, Ordering::SeqCst);
        let mut scope = TxScope::new();

        let result: WalletResult<()> = runner
            .run(&mut scope, |_| {
                Box::pin(async {
                    Err(WalletError::InsufficientFunds {
                        balance: 1,
                        requested: 2,
                    })
                })
            })
            .await;

        assert!(matches!(result, Err(WalletError::InsufficientFunds { .. })));
        assert_eq!(counts(&store), (1, 0, 1));
    }

    #[tokio::test]
    async fn test_commit_failure_is_returned() {
        let (store, runner) = runner();
        store.fail_commit.store(true, Ordering::SeqCst);
        let mut scope = TxScope::new();

        let result: WalletResult<u32> = runner.run(&mut scope, |_| Box::pin(async { Ok(7) })).await;

        match result {
            Err(err) => assert!(matches!(err.store_error(), Some(StoreError::Unavailable(_)))),
            Ok(v) => panic!("expected commit failure, got {}", v),
        }
        assert_eq!(counts(&store), (1, 1, 0));
    }

    #[tokio::test]
    async fn test_deadline_rolls_back() {
        let (store, runner) = runner();
        let runner = runner.with_deadline(Some(Duration::from_millis(20)));
        let mut scope = TxScope::new();

        let result: WalletResult<()> = runner
            .run(&mut scope, |_| {
                Box::pin(async {
                    tokio::time::sleep(Duration::from_secs(5)).await;
                    Ok(())
                })
            })
            .await;

        let err = result.unwrap_err();
        assert!(matches!(err.store_error(), Some(StoreError::Deadline { ms: 20 })));
        assert_eq!(counts(&store), (1, 0, 1));
        assert!(!scope.is_active());
    }

    #[tokio::test]
    async fn test_cancelled_owner_discards_transaction() {
        let (store, runner) = runner();
        let mut scope = TxScope::new();

        let pending = runner.run(&mut scope, |_| {
            Box::pin(async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok::<(), WalletError>(())
            })
        });
        let timed_out = tokio::time::timeout(Duration::from_millis(20), pending).await;

        assert!(timed_out.is_err());
        assert_eq!(counts(&store), (1, 0, 0));
        assert_eq!(store.drops.load(Ordering::SeqCst), 1);
        assert!(!scope.is_active());
    }

    #[tokio::test]
    async fn test_scope_without_transaction() {
        let mut scope = TxScope::new();
        assert!(matches!(scope.tx(), Err(StoreError::NoTransaction)));
    }
}
