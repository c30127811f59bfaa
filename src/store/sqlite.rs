//! SQLite Block Store
//!
//! Persists serialized blocks in a single SQLite table keyed by height.
//!
//! # Storage
//! - `blocks(height INTEGER PRIMARY KEY, value BLOB NOT NULL)`
//! - One row per block; the value is the block's JSON bytes

use super::{BlockStore, StoreError, StoreResult};
use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;
use tracing::info;

const CREATE_TABLE: &str =
    "CREATE TABLE IF NOT EXISTS blocks (height INTEGER PRIMARY KEY, value BLOB NOT NULL)";

/// SQLite-backed block store
///
/// Cloning is cheap; clones share the same connection pool.
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open (or create) the database at `url` and make sure the table exists
    ///
    /// # Arguments
    /// * `url` - SQLite connection URL (e.g., "sqlite://chaindata.db" or "sqlite::memory:")
    /// * `max_connections` - Upper bound on pooled connections
    ///
    /// In-memory databases are private to a connection, so a `:memory:` URL
    /// is always opened with a single connection.
    pub async fn connect(url: &str, max_connections: u32) -> StoreResult<Self> {
        let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);
        let max_connections = if url.contains(":memory:") {
            1
        } else {
            max_connections.max(1)
        };

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await?;

        sqlx::query(CREATE_TABLE).execute(&pool).await?;
        info!("Block store opened at {}", url);

        Ok(Self { pool })
    }
}

fn to_row_key(key: u64) -> StoreResult<i64> {
    i64::try_from(key).map_err(|_| StoreError::KeyOutOfRange(key))
}

#[async_trait]
impl BlockStore for SqliteStore {
    async fn get(&self, key: u64) -> StoreResult<Option<Vec<u8>>> {
        let row: Option<(Vec<u8>,)> = sqlx::query_as("SELECT value FROM blocks WHERE height = ?")
            .bind(to_row_key(key)?)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|(value,)| value))
    }

    async fn put(&self, key: u64, value: Vec<u8>) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO blocks (height, value) VALUES (?, ?) \
             ON CONFLICT(height) DO UPDATE SET value = excluded.value",
        )
        .bind(to_row_key(key)?)
        .bind(value)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn scan(&self) -> StoreResult<Vec<(u64, Vec<u8>)>> {
        let rows: Vec<(i64, Vec<u8>)> =
            sqlx::query_as("SELECT height, value FROM blocks ORDER BY height")
                .fetch_all(&self.pool)
                .await?;

        rows.into_iter()
            .map(|(height, value)| {
                u64::try_from(height)
                    .map(|key| (key, value))
                    .map_err(|_| StoreError::InvalidKey(height))
            })
            .collect()
    }

    async fn count(&self) -> StoreResult<u64> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM blocks")
            .fetch_one(&self.pool)
            .await?;

        u64::try_from(count).map_err(|_| StoreError::InvalidKey(count))
    }
}
