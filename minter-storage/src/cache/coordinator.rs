//! Incremental backfill of a remote collection into the record store.
//!
//! Each call compares the remote total with the local record count and
//! fetches only the difference, page by page. Page fetch failures abort the
//! run; individual insert failures are logged and collected in the report.

use std::num::NonZeroU64;
use std::sync::Arc;

use dashmap::DashMap;
use minter_core::{
    plan_backfill, CollectionKey, KeyRecord, NewKeyRecord, PersistenceError,
    DEFAULT_MAX_PAGE_SIZE,
};
use tokio::sync::Mutex;

use super::report::{BackfillError, BackfillReport, InsertFailure};
use crate::record_store::RecordStore;
use crate::remote::RemoteCollectionClient;

/// Configuration for the collection cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheConfig {
    /// Maximum items requested per page.
    pub max_page_size: NonZeroU64,
    /// Hold a per-collection lock for the whole backfill.
    pub serialize_per_collection: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_page_size: DEFAULT_MAX_PAGE_SIZE,
            serialize_per_collection: false,
        }
    }
}

impl CacheConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load from `MINTER_CACHE_PAGE_SIZE` and `MINTER_CACHE_SERIALIZE`.
    /// Unparsable values fall back to the defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let max_page_size = std::env::var("MINTER_CACHE_PAGE_SIZE")
            .ok()
            .and_then(|v| v.trim().parse::<u64>().ok())
            .and_then(NonZeroU64::new)
            .unwrap_or(defaults.max_page_size);
        let serialize_per_collection = std::env::var("MINTER_CACHE_SERIALIZE")
            .ok()
            .and_then(|v| v.trim().parse::<bool>().ok())
            .unwrap_or(defaults.serialize_per_collection);

        Self {
            max_page_size,
            serialize_per_collection,
        }
    }

    pub fn with_max_page_size(mut self, size: NonZeroU64) -> Self {
        self.max_page_size = size;
        self
    }

    pub fn with_serialization(mut self, enabled: bool) -> Self {
        self.serialize_per_collection = enabled;
        self
    }
}

/// Keeps the local record store in step with a remote collection.
pub struct CollectionCache<S, R>
where
    S: RecordStore + ?Sized,
    R: RemoteCollectionClient + ?Sized,
{
    store: Arc<S>,
    remote: Arc<R>,
    config: CacheConfig,
    locks: DashMap<CollectionKey, Arc<Mutex<()>>>,
}

impl<S, R> CollectionCache<S, R>
where
    S: RecordStore + ?Sized,
    R: RemoteCollectionClient + ?Sized,
{
    pub fn new(store: Arc<S>, remote: Arc<R>, config: CacheConfig) -> Self {
        Self {
            store,
            remote,
            config,
            locks: DashMap::new(),
        }
    }

    pub fn with_defaults(store: Arc<S>, remote: Arc<R>) -> Self {
        Self::new(store, remote, CacheConfig::default())
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Collections whose backfill lock is currently held or awaited.
    pub fn active_locks(&self) -> usize {
        self.locks.len()
    }

    /// Fetch whatever the local store is missing for `collection`.
    ///
    /// With `serialize_per_collection` off, concurrent calls for the same
    /// collection may each fetch and insert the same delta.
    pub async fn ensure_cached(
        &self,
        collection: &CollectionKey,
    ) -> Result<BackfillReport, BackfillError> {
        if !self.config.serialize_per_collection {
            return self.backfill(collection).await;
        }

        let lock = self.locks.entry(*collection).or_default().clone();
        let result = {
            let _guard = lock.lock().await;
            self.backfill(collection).await
        };

        // Ids come from clients; drop the entry once nobody else waits on it.
        drop(lock);
        self.locks
            .remove_if(collection, |_, lock| Arc::strong_count(lock) == 1);
        result
    }

    /// Every locally cached record for `collection`.
    pub async fn cached_records(
        &self,
        collection: &CollectionKey,
    ) -> Result<Vec<KeyRecord>, PersistenceError> {
        self.store.list(collection).await
    }

    async fn backfill(&self, collection: &CollectionKey) -> Result<BackfillReport, BackfillError> {
        let metadata = self
            .remote
            .fetch_metadata(collection)
            .await
            .map_err(|source| BackfillError::Metadata {
                collection: *collection,
                source,
            })?;

        let local_before = self
            .store
            .count(collection)
            .await
            .map_err(|source| BackfillError::Count {
                collection: *collection,
                source,
            })?;

        let missing = to_i64(metadata.total_item_count).saturating_sub(to_i64(local_before));
        let plan = plan_backfill(missing, self.config.max_page_size);

        tracing::debug!(
            collection = %collection,
            remote_total = metadata.total_item_count,
            local_before,
            missing,
            pages = plan.len(),
            "Planned backfill"
        );

        let mut report = BackfillReport::new(
            *collection,
            metadata.total_item_count,
            local_before,
            missing,
            plan.clone(),
        );

        for page in plan {
            let items = match self.remote.fetch_page(collection, page).await {
                Ok(items) => items,
                Err(source) => {
                    tracing::warn!(
                        collection = %collection,
                        offset = page.offset,
                        size = page.size,
                        error = %source,
                        "Page fetch failed, aborting backfill"
                    );
                    return Err(BackfillError::Page {
                        collection: *collection,
                        page,
                        partial: Box::new(report),
                        source,
                    });
                }
            };

            let limit = usize::try_from(page.size).unwrap_or(usize::MAX);
            if items.len() > limit {
                tracing::warn!(
                    collection = %collection,
                    offset = page.offset,
                    requested = page.size,
                    received = items.len(),
                    "Remote returned more items than requested, truncating"
                );
            }

            report.fetched_pages += 1;
            for (item_index, item) in items.into_iter().take(limit).enumerate() {
                report.fetched_items += 1;
                let record = NewKeyRecord::from_item(*collection, item);
                match self.store.insert(&record).await {
                    Ok(_) => report.inserted += 1,
                    Err(err) => {
                        tracing::warn!(
                            collection = %collection,
                            offset = page.offset,
                            item_index,
                            key = %record.key_string,
                            error = %err,
                            "Failed to cache key record"
                        );
                        report.failures.push(InsertFailure {
                            page,
                            item_index,
                            key_string: record.key_string,
                            reason: err.to_string(),
                        });
                    }
                }
            }
        }

        tracing::info!(
            collection = %collection,
            inserted = report.inserted,
            failed = report.failed(),
            pages = report.fetched_pages,
            "Backfill complete"
        );

        Ok(report)
    }
}

fn to_i64(n: u64) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}
