//! Watermark persistence.
//!
//! [`WatermarkStore`] wraps a [`WatermarkBackend`] and serializes every read
//! and write per account key. Different accounts never wait on each other.

mod memory;
mod sqlite;

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use crate::models::{format_timestamp, parse_timestamp, Watermark};

pub use memory::MemoryWatermarks;
pub use sqlite::SqliteWatermarks;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Stored watermark for {account_key} is not a timestamp: {value:?}")]
    CorruptValue { account_key: String, value: String },
}

/// Raw key/value surface holding one ISO-8601 string per account key
pub trait WatermarkBackend: Send + Sync {
    fn load(&self, account_key: &str) -> Result<Option<String>, StoreError>;
    fn save(&self, account_key: &str, value: &str) -> Result<(), StoreError>;
    fn remove(&self, account_key: &str) -> Result<(), StoreError>;
}

pub struct WatermarkStore {
    backend: Box<dyn WatermarkBackend>,
    locks: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl WatermarkStore {
    pub fn new(backend: impl WatermarkBackend + 'static) -> Self {
        Self {
            backend: Box::new(backend),
            locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn in_memory() -> Self {
        Self::new(MemoryWatermarks::new())
    }

    /// Open (or create) the SQLite database at `path`
    pub fn open_sqlite<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        Ok(Self::new(SqliteWatermarks::open(path)?))
    }

    /// Take exclusive access to one account's watermark.
    ///
    /// Held for the whole read-compare-write sequence of a cycle.
    pub async fn lock(&self, account_key: &str) -> WatermarkGuard<'_> {
        let lock = {
            let mut locks = self.locks.lock();
            locks
                .entry(account_key.to_string())
                .or_insert_with(|| Arc::new(AsyncMutex::new(())))
                .clone()
        };

        WatermarkGuard {
            store: self,
            account_key: account_key.to_string(),
            _lock: lock.lock_owned().await,
        }
    }

    /// Forget an account's cursor; its next cycle starts from the sentinel
    pub async fn reset(&self, account_key: &str) -> Result<(), StoreError> {
        let guard = self.lock(account_key).await;
        guard.store.backend.remove(&guard.account_key)
    }
}

pub struct WatermarkGuard<'a> {
    store: &'a WatermarkStore,
    account_key: String,
    _lock: OwnedMutexGuard<()>,
}

impl WatermarkGuard<'_> {
    pub fn account_key(&self) -> &str {
        &self.account_key
    }

    /// Current cursor, or the sentinel if nothing has been stored yet
    pub fn get(&self) -> Result<Watermark, StoreError> {
        match self.store.backend.load(&self.account_key)? {
            None => Ok(Watermark::sentinel(self.account_key.clone())),
            Some(value) => {
                let last_seen_at =
                    parse_timestamp(&value).map_err(|_| StoreError::CorruptValue {
                        account_key: self.account_key.clone(),
                        value,
                    })?;
                Ok(Watermark::new(self.account_key.clone(), last_seen_at))
            }
        }
    }

    /// Persist `next` if it moves the cursor forward. Returns whether a write happened.
    pub fn advance(&self, next: &Watermark) -> Result<bool, StoreError> {
        let current = self.get()?;
        if next.last_seen_at <= current.last_seen_at {
            return Ok(false);
        }
        self.store
            .backend
            .save(&self.account_key, &format_timestamp(&next.last_seen_at))?;
        Ok(true)
    }
}
