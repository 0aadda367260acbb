//! PostgreSQL Record Store
//!
//! Connection pooling via deadpool-postgres and a [`RecordStore`]
//! implementation over the `bigmap_key` table. The table is created at
//! startup if it does not exist; there is no migration system.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use deadpool_postgres::{Config, ManagerConfig, Pool, RecyclingMethod, Runtime};
use minter_core::{CollectionKey, KeyRecord, NewKeyRecord, PersistenceError, Timestamp};
use minter_storage::{RecordStore, StorageResult};
use tokio_postgres::error::SqlState;
use tokio_postgres::NoTls;

use crate::error::{ApiError, ApiResult};
use crate::telemetry::metrics;

// ============================================================================
// DATABASE CONFIGURATION
// ============================================================================

/// Database connection configuration.
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// PostgreSQL host
    pub host: String,
    /// PostgreSQL port
    pub port: u16,
    /// Database name
    pub dbname: String,
    /// Database user
    pub user: String,
    /// Database password
    pub password: String,
    /// Maximum pool size
    pub max_size: usize,
    /// Connection timeout
    pub timeout: Duration,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 5432,
            dbname: "minter".to_string(),
            user: "postgres".to_string(),
            password: "".to_string(),
            max_size: 16,
            timeout: Duration::from_secs(30),
        }
    }
}

impl DbConfig {
    /// Create a new database configuration from environment variables.
    pub fn from_env() -> Self {
        Self {
            host: std::env::var("MINTER_DB_HOST").unwrap_or_else(|_| "localhost".to_string()),
            port: std::env::var("MINTER_DB_PORT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(5432),
            dbname: std::env::var("MINTER_DB_NAME").unwrap_or_else(|_| "minter".to_string()),
            user: std::env::var("MINTER_DB_USER").unwrap_or_else(|_| "postgres".to_string()),
            password: std::env::var("MINTER_DB_PASSWORD").unwrap_or_default(),
            max_size: std::env::var("MINTER_DB_POOL_SIZE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(16),
            timeout: Duration::from_secs(
                std::env::var("MINTER_DB_TIMEOUT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(30),
            ),
        }
    }

    /// Create a connection pool from this configuration.
    pub fn create_pool(&self) -> ApiResult<Pool> {
        let mut cfg = Config::new();
        cfg.host = Some(self.host.clone());
        cfg.port = Some(self.port);
        cfg.dbname = Some(self.dbname.clone());
        cfg.user = Some(self.user.clone());
        cfg.password = Some(self.password.clone());
        cfg.connect_timeout = Some(self.timeout);

        cfg.manager = Some(ManagerConfig {
            recycling_method: RecyclingMethod::Fast,
        });
        cfg.pool = Some(deadpool_postgres::PoolConfig::new(self.max_size));

        let pool = cfg
            .create_pool(Some(Runtime::Tokio1), NoTls)
            .map_err(|e| ApiError::database_error(format!("Failed to create pool: {}", e)))?;

        Ok(pool)
    }
}

// ============================================================================
// SCHEMA
// ============================================================================

const CREATE_BIGMAP_KEY_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS bigmap_key (
    id          BIGSERIAL PRIMARY KEY,
    network     TEXT        NOT NULL,
    bigmap_id   BIGINT      NOT NULL,
    key_string  TEXT        NOT NULL CHECK (key_string <> ''),
    payload     JSONB       NOT NULL,
    count       BIGINT      NOT NULL,
    created_at  TIMESTAMPTZ NOT NULL DEFAULT now()
)
"#;

const CREATE_BIGMAP_KEY_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS bigmap_key_collection_idx ON bigmap_key (network, bigmap_id)";

// ============================================================================
// POSTGRES RECORD STORE
// ============================================================================

/// Record store backed by a PostgreSQL connection pool.
#[derive(Clone)]
pub struct PgRecordStore {
    pool: Pool,
}

impl PgRecordStore {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    pub fn from_config(config: &DbConfig) -> ApiResult<Self> {
        Ok(Self::new(config.create_pool()?))
    }

    /// Create the `bigmap_key` table and its index if they are missing.
    pub async fn ensure_schema(&self) -> ApiResult<()> {
        let conn = self.pool.get().await?;
        conn.batch_execute(CREATE_BIGMAP_KEY_TABLE).await?;
        conn.batch_execute(CREATE_BIGMAP_KEY_INDEX).await?;
        tracing::info!("bigmap_key schema ready");
        Ok(())
    }

    async fn get_conn(&self) -> StorageResult<deadpool_postgres::Object> {
        self.pool.get().await.map_err(|e| {
            tracing::error!("Connection pool error: {:?}", e);
            PersistenceError::QueryFailed {
                reason: format!("Failed to acquire database connection: {}", e),
            }
        })
    }
}

/// Check violations surface as constraint errors, everything else as a
/// failure of the operation that raised it.
fn insert_error(err: tokio_postgres::Error) -> PersistenceError {
    if err.code() == Some(&SqlState::CHECK_VIOLATION) {
        return PersistenceError::ConstraintViolation {
            constraint: "key_string".to_string(),
            reason: err.to_string(),
        };
    }
    tracing::error!("Database error: {:?}", err);
    PersistenceError::InsertFailed {
        reason: err.to_string(),
    }
}

fn query_error(err: tokio_postgres::Error) -> PersistenceError {
    tracing::error!("Database error: {:?}", err);
    PersistenceError::QueryFailed {
        reason: err.to_string(),
    }
}

fn record_operation<T>(operation: &str, start: Instant, result: &StorageResult<T>) {
    if let Some(metrics) = metrics::get() {
        metrics.record_db_operation(
            operation,
            "bigmap_key",
            result.is_ok(),
            start.elapsed().as_secs_f64(),
        );
    }
}

#[async_trait]
impl RecordStore for PgRecordStore {
    async fn insert(&self, record: &NewKeyRecord) -> StorageResult<KeyRecord> {
        record.validate()?;
        let start = Instant::now();

        let result: StorageResult<KeyRecord> = async {
            let conn = self.get_conn().await?;
            let row = conn
                .query_one(
                    "INSERT INTO bigmap_key (network, bigmap_id, key_string, payload, count) \
                     VALUES ($1, $2, $3, $4, $5) RETURNING id, created_at",
                    &[
                        &record.collection.network.as_str(),
                        &record.collection.collection_id.get(),
                        &record.key_string,
                        &record.payload,
                        &record.count,
                    ],
                )
                .await
                .map_err(insert_error)?;

            let record_id: i64 = row.get(0);
            let created_at: Timestamp = row.get(1);
            Ok(KeyRecord {
                record_id,
                collection: record.collection,
                key_string: record.key_string.clone(),
                payload: record.payload.clone(),
                count: record.count,
                created_at,
            })
        }
        .await;

        record_operation("insert", start, &result);
        result
    }

    async fn count(&self, collection: &CollectionKey) -> StorageResult<u64> {
        let start = Instant::now();

        let result: StorageResult<u64> = async {
            let conn = self.get_conn().await?;
            let row = conn
                .query_one(
                    "SELECT COUNT(*) FROM bigmap_key WHERE network = $1 AND bigmap_id = $2",
                    &[&collection.network.as_str(), &collection.collection_id.get()],
                )
                .await
                .map_err(query_error)?;
            let count: i64 = row.get(0);
            Ok(u64::try_from(count).unwrap_or(0))
        }
        .await;

        record_operation("count", start, &result);
        result
    }

    async fn list(&self, collection: &CollectionKey) -> StorageResult<Vec<KeyRecord>> {
        let start = Instant::now();

        let result: StorageResult<Vec<KeyRecord>> = async {
            let conn = self.get_conn().await?;
            let rows = conn
                .query(
                    "SELECT id, key_string, payload, count, created_at FROM bigmap_key \
                     WHERE network = $1 AND bigmap_id = $2 ORDER BY id",
                    &[&collection.network.as_str(), &collection.collection_id.get()],
                )
                .await
                .map_err(query_error)?;

            Ok(rows
                .iter()
                .map(|row| KeyRecord {
                    record_id: row.get(0),
                    collection: *collection,
                    key_string: row.get(1),
                    payload: row.get(2),
                    count: row.get(3),
                    created_at: row.get(4),
                })
                .collect())
        }
        .await;

        record_operation("list", start, &result);
        result
    }

    async fn health_check(&self) -> StorageResult<()> {
        let conn = self.get_conn().await?;
        conn.query_one("SELECT 1", &[]).await.map_err(query_error)?;
        Ok(())
    }
}
