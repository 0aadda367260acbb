//! Shared application state for Axum routers.

use std::sync::Arc;

use minter_ipfs::IpfsProvider;
use minter_storage::{
    CacheConfig, CollectionCache, InMemoryRecordStore, RecordStore, RemoteCollectionClient,
};

use crate::config::{MinterConfig, StoreConfig};
use crate::db::PgRecordStore;
use crate::error::{ApiError, ApiResult};
use crate::remote::BetterCallDevClient;

/// Collection cache over whichever store and remote were configured.
pub type ApiCache = CollectionCache<dyn RecordStore, dyn RemoteCollectionClient>;

/// Application-wide state shared across all routes.
#[derive(Clone)]
pub struct AppState {
    /// Backfill coordinator for cached collections.
    pub cache: Arc<ApiCache>,
    /// Record store behind the cache; also used by readiness checks.
    pub store: Arc<dyn RecordStore>,
    /// Upload facade over the selected IPFS backend.
    pub ipfs: Arc<IpfsProvider>,
    pub start_time: std::time::Instant,
}

crate::impl_from_ref!(Arc<ApiCache>, cache);
crate::impl_from_ref!(Arc<dyn RecordStore>, store);
crate::impl_from_ref!(Arc<IpfsProvider>, ipfs);
crate::impl_from_ref!(std::time::Instant, start_time);

impl AppState {
    pub fn new(
        store: Arc<dyn RecordStore>,
        remote: Arc<dyn RemoteCollectionClient>,
        cache_config: CacheConfig,
        ipfs: IpfsProvider,
    ) -> Self {
        let cache = CollectionCache::new(store.clone(), remote, cache_config);
        Self {
            cache: Arc::new(cache),
            store,
            ipfs: Arc::new(ipfs),
            start_time: std::time::Instant::now(),
        }
    }

    /// Build every collaborator from the resolved startup configuration.
    pub async fn from_config(config: &MinterConfig) -> ApiResult<Self> {
        let store: Arc<dyn RecordStore> = match &config.store {
            StoreConfig::InMemory => {
                tracing::info!("Using in-memory record store");
                Arc::new(InMemoryRecordStore::new())
            }
            StoreConfig::Postgres(db) => {
                tracing::info!(host = %db.host, dbname = %db.dbname, "Using PostgreSQL record store");
                let store = PgRecordStore::from_config(db)?;
                store.ensure_schema().await?;
                Arc::new(store)
            }
        };

        let remote = BetterCallDevClient::new(config.remote.clone())?;
        let ipfs = IpfsProvider::from_config(&config.ipfs).map_err(|e| {
            ApiError::internal_error(format!("Failed to initialize IPFS provider: {}", e))
        })?;

        Ok(Self::new(store, Arc::new(remote), config.cache, ipfs))
    }
}
