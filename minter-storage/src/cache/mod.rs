//! Incremental cache of remote paginated collections.
//!
//! The local record count is the only progress marker: a collection is
//! "caught up" when the store holds as many records as the remote reports.
//! Records are never de-duplicated, so the count keeps its meaning even when
//! the remote serves the same key twice.

pub mod coordinator;
pub mod report;

pub use coordinator::{CacheConfig, CollectionCache};
pub use report::{BackfillError, BackfillReport, InsertFailure};
