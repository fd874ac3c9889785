//! RocksDB-backed store
//!
//! Transactions buffer their writes in memory and apply them with a single
//! atomic `WriteBatch` at commit. Isolation for accounts comes from the
//! row-lock table: every key a transaction reads for update or writes stays
//! locked until the transaction ends.

use crate::common::types::{NewSpin, SpinRecord, User};
use crate::config::{CompressionType, StorageConfig};
use crate::errors::{StoreError, StoreResult};
use crate::storage::keys::{spin_key, spin_prefix, user_key};
use crate::storage::locks::{RowGuard, RowLocks};
use crate::storage::{Store, StoreTx};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rocksdb::{Direction, IteratorMode, Options, WriteBatch, WriteOptions, DB};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};
use uuid::Uuid;

#[derive(Clone)]
pub struct RocksStore {
    inner: Arc<Inner>,
}

struct Inner {
    db: DB,
    locks: RowLocks,
    clock: SpinClock,
    sync_writes: bool,
    read_only: bool,
}

impl RocksStore {
    pub fn open(config: &StorageConfig) -> StoreResult<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.set_write_buffer_size(config.write_buffer_size_mb * 1024 * 1024);
        opts.set_compression_type(compression(config.compression_type));

        let db = DB::open(&opts, &config.data_directory).map_err(|source| StoreError::Open {
            path: config.data_directory.clone(),
            source,
        })?;

        info!(
            path = %config.data_directory,
            sync_writes = config.sync_writes,
            lock_timeout_ms = config.lock_timeout_ms,
            "opened store"
        );

        Ok(Self::from_db(db, config, false))
    }

    /// Open an existing database for inspection. Commits fail with
    /// `StoreError::Unavailable`.
    pub fn open_read_only<P: AsRef<Path>>(path: P) -> StoreResult<Self> {
        let path = path.as_ref();
        let opts = Options::default();
        let db = DB::open_for_read_only(&opts, path, false).map_err(|source| StoreError::Open {
            path: path.display().to_string(),
            source,
        })?;

        let config = StorageConfig {
            data_directory: path.display().to_string(),
            ..Default::default()
        };
        Ok(Self::from_db(db, &config, true))
    }

    fn from_db(db: DB, config: &StorageConfig, read_only: bool) -> Self {
        Self {
            inner: Arc::new(Inner {
                db,
                locks: RowLocks::new(Duration::from_millis(config.lock_timeout_ms)),
                clock: SpinClock::default(),
                sync_writes: config.sync_writes,
                read_only,
            }),
        }
    }

    /// Committed read outside any transaction
    pub fn load_user(&self, login: &str) -> StoreResult<Option<User>> {
        self.inner.read(&user_key(login), "user")
    }

    /// Keys with a live row-lock entry
    pub fn held_locks(&self) -> usize {
        self.inner.locks.len()
    }
}

impl Inner {
    fn read<T: DeserializeOwned>(&self, key: &[u8], what: &'static str) -> StoreResult<Option<T>> {
        match self.db.get(key) {
            Ok(Some(bytes)) => decode(&bytes, what).map(Some),
            Ok(None) => Ok(None),
            Err(source) => Err(StoreError::Backend { op: "get", source }),
        }
    }
}

fn compression(kind: CompressionType) -> rocksdb::DBCompressionType {
    match kind {
        CompressionType::None => rocksdb::DBCompressionType::None,
        CompressionType::Snappy => rocksdb::DBCompressionType::Snappy,
        CompressionType::Lz4 => rocksdb::DBCompressionType::Lz4,
        CompressionType::Zstd => rocksdb::DBCompressionType::Zstd,
    }
}

fn encode<T: Serialize>(value: &T, what: &'static str) -> StoreResult<Vec<u8>> {
    bincode::serialize(value).map_err(|e| StoreError::Codec {
        what,
        reason: e.to_string(),
    })
}

fn decode<T: DeserializeOwned>(bytes: &[u8], what: &'static str) -> StoreResult<T> {
    bincode::deserialize(bytes).map_err(|e| StoreError::Codec {
        what,
        reason: e.to_string(),
    })
}

/// Strictly increasing microsecond timestamps for spin records, so two
/// spins of one user never share a creation time.
#[derive(Debug, Default)]
struct SpinClock {
    last_micros: AtomicI64,
}

impl SpinClock {
    fn next(&self) -> i64 {
        let now = Utc::now().timestamp_micros();
        let prev = match self
            .last_micros
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| Some(now.max(last + 1)))
        {
            Ok(prev) | Err(prev) => prev,
        };
        now.max(prev + 1)
    }
}

#[async_trait]
impl Store for RocksStore {
    async fn begin(&self) -> StoreResult<Box<dyn StoreTx>> {
        Ok(Box::new(RocksTx {
            store: self.inner.clone(),
            writes: BTreeMap::new(),
            guards: HashMap::new(),
            finished: false,
        }))
    }

    async fn list_spins(&self, user_id: &Uuid, limit: usize, offset: usize) -> StoreResult<Vec<SpinRecord>> {
        let prefix = spin_prefix(user_id);
        let mut spins = Vec::with_capacity(limit.min(128));

        let iter = self
            .inner
            .db
            .iterator(IteratorMode::From(prefix.as_slice(), Direction::Forward));

        for item in iter.skip(offset) {
            let (key, value) = item.map_err(|source| StoreError::Backend { op: "iterate", source })?;
            if !key.starts_with(&prefix) || spins.len() >= limit {
                break;
            }
            spins.push(decode::<SpinRecord>(&value, "spin")?);
        }

        Ok(spins)
    }
}

pub struct RocksTx {
    store: Arc<Inner>,
    writes: BTreeMap<Vec<u8>, Vec<u8>>,
    guards: HashMap<Vec<u8>, RowGuard>,
    finished: bool,
}

impl RocksTx {
    async fn lock(&mut self, key: &[u8]) -> StoreResult<()> {
        if self.guards.contains_key(key) {
            return Ok(());
        }
        let guard = self.store.locks.acquire(key).await?;
        self.guards.insert(key.to_vec(), guard);
        Ok(())
    }

    fn read<T: DeserializeOwned>(&self, key: &[u8], what: &'static str) -> StoreResult<Option<T>> {
        match self.writes.get(key) {
            Some(bytes) => decode(bytes, what).map(Some),
            None => self.store.read(key, what),
        }
    }

    fn put<T: Serialize>(&mut self, key: Vec<u8>, value: &T, what: &'static str) -> StoreResult<()> {
        let bytes = encode(value, what)?;
        self.writes.insert(key, bytes);
        Ok(())
    }

    fn release_locks(&mut self) {
        for (key, guard) in self.guards.drain() {
            self.store.locks.release(&key, guard);
        }
    }
}

#[async_trait]
impl StoreTx for RocksTx {
    async fn get_user(&mut self, login: &str) -> StoreResult<Option<User>> {
        self.read(&user_key(login), "user")
    }

    async fn get_user_for_update(&mut self, login: &str) -> StoreResult<Option<User>> {
        let key = user_key(login);
        self.lock(&key).await?;
        self.read(&key, "user")
    }

    async fn update_balance(&mut self, login: &str, balance: i64) -> StoreResult<u64> {
        let key = user_key(login);
        self.lock(&key).await?;

        let Some(mut user) = self.read::<User>(&key, "user")? else {
            return Ok(0);
        };
        user.balance = balance;
        self.put(key, &user, "user")?;
        Ok(1)
    }

    async fn insert_user(&mut self, user: &User) -> StoreResult<()> {
        let key = user_key(&user.login);
        self.lock(&key).await?;

        if self.read::<User>(&key, "user")?.is_some() {
            return Err(StoreError::Constraint(format!("login {:?} is already taken", user.login)));
        }
        self.put(key, user, "user")
    }

    async fn insert_spin(&mut self, spin: NewSpin) -> StoreResult<SpinRecord> {
        let id = Uuid::new_v4();
        let micros = self.store.clock.next();
        let created_at = DateTime::<Utc>::from_timestamp_micros(micros).ok_or_else(|| StoreError::Codec {
            what: "spin timestamp",
            reason: format!("{} is out of range", micros),
        })?;

        let record = SpinRecord {
            id,
            user_id: spin.user_id,
            combination: spin.combination,
            result: spin.result,
            bet_amount: spin.bet_amount,
            win_amount: spin.win_amount,
            created_at,
        };

        // Spin keys are fresh, nobody else can contend for them.
        self.put(spin_key(&record.user_id, micros as u64, &id), &record, "spin")?;
        Ok(record)
    }

    async fn commit(self: Box<Self>) -> StoreResult<()> {
        let mut tx = self;
        tx.finished = true;

        if tx.writes.is_empty() {
            tx.release_locks();
            return Ok(());
        }
        if tx.store.read_only {
            tx.release_locks();
            return Err(StoreError::Unavailable("store was opened read-only".to_string()));
        }

        let mut batch = WriteBatch::default();
        for (key, value) in std::mem::take(&mut tx.writes) {
            batch.put(key, value);
        }

        let mut write_opts = WriteOptions::default();
        write_opts.set_sync(tx.store.sync_writes);

        let result = tx
            .store
            .db
            .write_opt(batch, &write_opts)
            .map_err(|source| StoreError::Backend { op: "commit", source });
        tx.release_locks();
        result
    }

    async fn rollback(self: Box<Self>) -> StoreResult<()> {
        let mut tx = self;
        tx.finished = true;
        tx.writes.clear();
        tx.release_locks();
        Ok(())
    }
}

impl Drop for RocksTx {
    fn drop(&mut self) {
        if !self.finished && (!self.writes.is_empty() || !self.guards.is_empty()) {
            debug!(
                pending_writes = self.writes.len(),
                held_locks = self.guards.len(),
                "transaction dropped before completion, discarding"
            );
        }
        self.writes.clear();
        self.release_locks();
    }
}
