//! Record store trait and in-memory implementation.

use async_trait::async_trait;
use chrono::Utc;
use minter_core::{CollectionKey, KeyRecord, NewKeyRecord, PersistenceError};
use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, RwLock};

/// Result type for record store operations.
pub type StorageResult<T> = Result<T, PersistenceError>;

/// Append-only store of cached key records.
///
/// The number of records stored for a collection is what the cache treats
/// as "already fetched", so implementations must not de-duplicate by key.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Append one record. No internal retry.
    async fn insert(&self, record: &NewKeyRecord) -> StorageResult<KeyRecord>;

    /// Number of records stored for the collection (0 if none).
    async fn count(&self, collection: &CollectionKey) -> StorageResult<u64>;

    /// Every stored record for the collection, in insertion order.
    async fn list(&self, collection: &CollectionKey) -> StorageResult<Vec<KeyRecord>>;

    /// Check if the store is reachable.
    async fn health_check(&self) -> StorageResult<()> {
        Ok(())
    }
}

#[async_trait]
impl<T: RecordStore + ?Sized> RecordStore for Arc<T> {
    async fn insert(&self, record: &NewKeyRecord) -> StorageResult<KeyRecord> {
        (**self).insert(record).await
    }

    async fn count(&self, collection: &CollectionKey) -> StorageResult<u64> {
        (**self).count(collection).await
    }

    async fn list(&self, collection: &CollectionKey) -> StorageResult<Vec<KeyRecord>> {
        (**self).list(collection).await
    }

    async fn health_check(&self) -> StorageResult<()> {
        (**self).health_check().await
    }
}

// ============================================================================
// IN-MEMORY STORE
// ============================================================================

/// Process-local record store. Contents are lost on restart.
#[derive(Debug, Default)]
pub struct InMemoryRecordStore {
    records: RwLock<HashMap<CollectionKey, Vec<KeyRecord>>>,
    next_id: AtomicI64,
}

impl InMemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total records across all collections.
    pub fn total_records(&self) -> usize {
        self.records
            .read()
            .map(|records| records.values().map(Vec::len).sum())
            .unwrap_or(0)
    }
}

#[async_trait]
impl RecordStore for InMemoryRecordStore {
    async fn insert(&self, record: &NewKeyRecord) -> StorageResult<KeyRecord> {
        record.validate()?;

        let stored = KeyRecord {
            record_id: self.next_id.fetch_add(1, Ordering::Relaxed) + 1,
            collection: record.collection,
            key_string: record.key_string.clone(),
            payload: record.payload.clone(),
            count: record.count,
            created_at: Utc::now(),
        };

        let mut records = self
            .records
            .write()
            .map_err(|_| PersistenceError::LockPoisoned)?;
        records
            .entry(record.collection)
            .or_default()
            .push(stored.clone());
        Ok(stored)
    }

    async fn count(&self, collection: &CollectionKey) -> StorageResult<u64> {
        let records = self
            .records
            .read()
            .map_err(|_| PersistenceError::LockPoisoned)?;
        Ok(records.get(collection).map_or(0, |r| r.len() as u64))
    }

    async fn list(&self, collection: &CollectionKey) -> StorageResult<Vec<KeyRecord>> {
        let records = self
            .records
            .read()
            .map_err(|_| PersistenceError::LockPoisoned)?;
        Ok(records.get(collection).cloned().unwrap_or_default())
    }
}
