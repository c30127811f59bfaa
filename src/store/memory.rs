use super::{BlockStore, StoreResult};
use async_trait::async_trait;
use std::collections::BTreeMap;
use tokio::sync::RwLock;

/// In-memory block store
///
/// Entries live in a BTreeMap so scans come back in key order.
#[derive(Default)]
pub struct MemoryStore {
    entries: RwLock<BTreeMap<u64, Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remove every entry
    pub async fn clear(&self) {
        self.entries.write().await.clear();
    }
}

#[async_trait]
impl BlockStore for MemoryStore {
    async fn get(&self, key: u64) -> StoreResult<Option<Vec<u8>>> {
        let entries = self.entries.read().await;
        Ok(entries.get(&key).cloned())
    }

    async fn put(&self, key: u64, value: Vec<u8>) -> StoreResult<()> {
        let mut entries = self.entries.write().await;
        entries.insert(key, value);
        Ok(())
    }

    async fn scan(&self) -> StoreResult<Vec<(u64, Vec<u8>)>> {
        let entries = self.entries.read().await;
        Ok(entries.iter().map(|(k, v)| (*k, v.clone())).collect())
    }

    async fn count(&self) -> StoreResult<u64> {
        Ok(self.entries.read().await.len() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_scan_is_key_ordered() {
        let store = MemoryStore::new();
        store.put(2, b"two".to_vec()).await.unwrap();
        store.put(0, b"zero".to_vec()).await.unwrap();
        store.put(1, b"one".to_vec()).await.unwrap();

        let keys: Vec<u64> = store.scan().await.unwrap().into_iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec![0, 1, 2]);
        assert_eq!(store.count().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_put_replaces_and_get_missing_is_none() {
        let store = MemoryStore::new();
        store.put(0, b"old".to_vec()).await.unwrap();
        store.put(0, b"new".to_vec()).await.unwrap();

        assert_eq!(store.get(0).await.unwrap(), Some(b"new".to_vec()));
        assert_eq!(store.get(9).await.unwrap(), None);
        assert_eq!(store.count().await.unwrap(), 1);
    }
}
