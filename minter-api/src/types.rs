//! Response bodies shared by the route modules.

use minter_core::KeyRecord;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// One cached key as returned by the collection query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct CachedKeyResponse {
    /// The remote item's `data` object, verbatim.
    #[cfg_attr(feature = "openapi", schema(value_type = Object))]
    pub data: JsonValue,
    pub count: i64,
}

impl From<KeyRecord> for CachedKeyResponse {
    fn from(record: KeyRecord) -> Self {
        Self {
            data: record.payload,
            count: record.count,
        }
    }
}

/// Body of `GET /`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct StatusResponse {
    pub status: String,
}

impl StatusResponse {
    pub fn ok() -> Self {
        Self {
            status: "OK".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use minter_core::CollectionKey;
    use serde_json::json;

    #[test]
    fn test_cached_key_from_record_drops_bookkeeping() {
        let record = KeyRecord {
            record_id: 42,
            collection: CollectionKey::parse("mainnet", "1").unwrap(),
            key_string: "k".to_string(),
            payload: json!({"key_string": "k", "value": 3}),
            count: 2,
            created_at: Utc::now(),
        };
        let body = serde_json::to_value(CachedKeyResponse::from(record)).unwrap();
        assert_eq!(body, json!({"data": {"key_string": "k", "value": 3}, "count": 2}));
    }

    #[test]
    fn test_status_ok() {
        assert_eq!(
            serde_json::to_value(StatusResponse::ok()).unwrap(),
            json!({"status": "OK"})
        );
    }
}
