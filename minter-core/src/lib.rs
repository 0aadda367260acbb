//! Minter Core - Domain Types
//!
//! Collection identity, cached key records, the error taxonomy shared by
//! every crate, and the pure backfill planner. No I/O lives here.

pub mod error;
pub mod network;
pub mod planner;
pub mod record;

use chrono::{DateTime, Utc};

pub use error::{
    ConfigError, MinterError, PersistenceError, UploadError, UpstreamError, ValidationError,
};
pub use network::{CollectionId, CollectionKey, Network};
pub use planner::{plan_backfill, BackfillPlan, PageRequest, DEFAULT_MAX_PAGE_SIZE};
pub use record::{CollectionItem, CollectionMetadata, KeyRecord, NewKeyRecord};

/// Timestamp type using UTC timezone.
pub type Timestamp = DateTime<Utc>;
