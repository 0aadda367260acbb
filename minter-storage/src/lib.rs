//! Minter Storage - Record Store, Remote Client and Collection Cache
//!
//! Trait seams for the two leaf collaborators of the cache (where records are
//! persisted and where they are fetched from) and the coordinator that keeps
//! them in step.

pub mod cache;
pub mod record_store;
pub mod remote;

pub use cache::{BackfillError, BackfillReport, CacheConfig, CollectionCache, InsertFailure};
pub use record_store::{InMemoryRecordStore, RecordStore, StorageResult};
pub use remote::{RemoteCollectionClient, RemoteResult};
