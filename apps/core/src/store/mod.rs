//! Record store collaborators.
//!
//! The engine only depends on [`DataStore`]. Concrete stores read from a JSON
//! file, a SQLite database, or memory; [`CachedStore`] adds the read-through
//! TTL cache shared by concurrent queries.

pub mod json;
pub mod sqlite;

use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};
use tracing::{debug, info};

use crate::error::AppError;
use crate::models::Record;

pub use json::JsonFileStore;
pub use sqlite::SqliteStore;

/// Source of citizen records.
///
/// An empty result is a valid answer. Errors are reserved for I/O failures and
/// abort the query pipeline.
#[async_trait]
pub trait DataStore: Send + Sync + 'static {
    async fn load_records(&self) -> Result<Vec<Record>, AppError>;

    /// Drops any cached state so the next load hits the backing store.
    fn invalidate(&self) {}
}

#[async_trait]
impl<T: DataStore + ?Sized> DataStore for Arc<T> {
    async fn load_records(&self) -> Result<Vec<Record>, AppError> {
        (**self).load_records().await
    }

    fn invalidate(&self) {
        (**self).invalidate()
    }
}

/// Fixed record set held in memory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    records: Arc<Vec<Record>>,
}

impl InMemoryStore {
    pub fn new(records: Vec<Record>) -> Self {
        Self {
            records: Arc::new(records),
        }
    }
}

#[async_trait]
impl DataStore for InMemoryStore {
    async fn load_records(&self) -> Result<Vec<Record>, AppError> {
        Ok(self.records.as_ref().clone())
    }
}

struct CacheEntry {
    loaded_at: Instant,
    records: Arc<Vec<Record>>,
}

/// Read-through cache in front of another store.
///
/// Records are reused until `ttl` elapses or [`DataStore::invalidate`] is called.
/// A load that was in flight when `invalidate` ran is returned to its caller
/// but never cached.
pub struct CachedStore<S> {
    inner: S,
    ttl: Duration,
    slot: Mutex<Option<CacheEntry>>,
    generation: AtomicU64,
}

impl<S: DataStore> CachedStore<S> {
    pub fn new(inner: S, ttl: Duration) -> Self {
        Self {
            inner,
            ttl,
            slot: Mutex::new(None),
            generation: AtomicU64::new(0),
        }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    fn slot(&self) -> MutexGuard<'_, Option<CacheEntry>> {
        // A poisoned slot only ever holds a complete entry or None.
        self.slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn fresh(&self) -> Option<Arc<Vec<Record>>> {
        self.slot()
            .as_ref()
            .filter(|entry| entry.loaded_at.elapsed() < self.ttl)
            .map(|entry| Arc::clone(&entry.records))
    }
}

#[async_trait]
impl<S: DataStore> DataStore for CachedStore<S> {
    async fn load_records(&self) -> Result<Vec<Record>, AppError> {
        if let Some(records) = self.fresh() {
            debug!("Record cache hit ({} records)", records.len());
            return Ok(records.as_ref().clone());
        }

        let generation = self.generation.load(Ordering::SeqCst);
        let records = self.inner.load_records().await?;

        let mut slot = self.slot();
        if self.generation.load(Ordering::SeqCst) == generation {
            info!("Record cache refreshed with {} records", records.len());
            *slot = Some(CacheEntry {
                loaded_at: Instant::now(),
                records: Arc::new(records.clone()),
            });
        } else {
            debug!("Cache invalidated during load; not caching {} records", records.len());
        }
        Ok(records)
    }

    fn invalidate(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        *self.slot() = None;
        self.inner.invalidate();
    }
}
