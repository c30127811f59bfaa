//! Block Store Module
//!
//! This module defines the key-value boundary the chain persists blocks through.
//! Keys are block heights; values are the serialized block bytes. The store
//! never interprets values.
//!
//! Two backends are provided:
//! - `MemoryStore`: BTreeMap-backed, for tests and embedding
//! - `SqliteStore`: sqlx/SQLite-backed, for the running node

mod error;
mod memory;
mod sqlite;

pub use error::{StoreError, StoreResult};
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use async_trait::async_trait;

/// Key-value store keyed by a monotonically increasing integer
#[async_trait]
pub trait BlockStore: Send + Sync {
    /// Read the value stored under `key`, or `None` if there is none
    async fn get(&self, key: u64) -> StoreResult<Option<Vec<u8>>>;

    /// Write `value` under `key`, replacing any previous value
    async fn put(&self, key: u64, value: Vec<u8>) -> StoreResult<()>;

    /// Every entry in ascending key order
    async fn scan(&self) -> StoreResult<Vec<(u64, Vec<u8>)>>;

    /// Number of stored entries
    ///
    /// Defaults to a full scan. Backends that can count cheaply should override.
    async fn count(&self) -> StoreResult<u64> {
        Ok(self.scan().await?.len() as u64)
    }
}
