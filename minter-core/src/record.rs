//! Cached key records and the remote items they are built from.

use crate::error::PersistenceError;
use crate::network::CollectionKey;
use crate::Timestamp;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// One item of a remote collection page, as handed to the cache.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionItem {
    /// Logical key. Empty when the remote omitted it.
    pub key_string: String,
    /// Opaque payload (the remote item's `data` object).
    pub payload: JsonValue,
    /// Occurrence/weight count attached by the remote.
    pub count: i64,
}

/// Collection metadata as reported by the remote at call time. Never cached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionMetadata {
    pub total_item_count: u64,
}

/// A record waiting to be appended to the store.
#[derive(Debug, Clone, PartialEq)]
pub struct NewKeyRecord {
    pub collection: CollectionKey,
    pub key_string: String,
    pub payload: JsonValue,
    pub count: i64,
}

impl NewKeyRecord {
    pub fn from_item(collection: CollectionKey, item: CollectionItem) -> Self {
        Self {
            collection,
            key_string: item.key_string,
            payload: item.payload,
            count: item.count,
        }
    }

    /// Store-level constraint shared by every record store implementation.
    pub fn validate(&self) -> Result<(), PersistenceError> {
        if self.key_string.is_empty() {
            return Err(PersistenceError::ConstraintViolation {
                constraint: "key_string".to_string(),
                reason: "must not be empty".to_string(),
            });
        }
        Ok(())
    }
}

/// A persisted record. Append-only: never updated or deleted here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyRecord {
    pub record_id: i64,
    pub collection: CollectionKey,
    pub key_string: String,
    pub payload: JsonValue,
    pub count: i64,
    pub created_at: Timestamp,
}
