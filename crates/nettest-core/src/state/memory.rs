// # Memory State Stores
//
// In-memory implementations of StatusStore and AddressCache.
//
// ## Purpose
//
// Useful for tests and for embedding the watchdog in a long-lived process
// that keeps its own state. Nothing survives a restart: the first run after
// one treats every address as new and re-discovers the WAN address.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::Error;
use crate::model::{DynamicAddressRecord, StatusSnapshot};
use crate::traits::state_store::{AddressCache, StatusStore};

/// In-memory status store
///
/// Clones share the same snapshot, so a test can keep a handle and
/// inspect what a run saved.
#[derive(Debug, Clone, Default)]
pub struct MemoryStatusStore {
    inner: Arc<RwLock<Option<StatusSnapshot>>>,
    saves: Arc<std::sync::atomic::AtomicUsize>,
}

impl MemoryStatusStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store that already holds `snapshot`
    pub fn with_snapshot(snapshot: StatusSnapshot) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Some(snapshot))),
            saves: Default::default(),
        }
    }

    /// The last saved snapshot, if any
    pub async fn snapshot(&self) -> Option<StatusSnapshot> {
        self.inner.read().await.clone()
    }

    /// Number of completed saves
    pub fn save_count(&self) -> usize {
        self.saves.load(std::sync::atomic::Ordering::SeqCst)
    }
}

#[async_trait]
impl StatusStore for MemoryStatusStore {
    async fn load(&self) -> StatusSnapshot {
        self.inner
            .read()
            .await
            .clone()
            .map(StatusSnapshot::validated)
            .unwrap_or_default()
    }

    async fn save(&self, snapshot: &StatusSnapshot) -> Result<(), Error> {
        *self.inner.write().await = Some(snapshot.clone());
        self.saves.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        Ok(())
    }
}

/// In-memory dynamic address cache
#[derive(Debug, Clone, Default)]
pub struct MemoryAddressCache {
    inner: Arc<RwLock<Option<DynamicAddressRecord>>>,
}

impl MemoryAddressCache {
    /// Create an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a cache that already holds `record`
    pub fn with_record(record: DynamicAddressRecord) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Some(record))),
        }
    }

    /// Forget the cached record
    pub async fn clear(&self) {
        *self.inner.write().await = None;
    }
}

#[async_trait]
impl AddressCache for MemoryAddressCache {
    async fn load(&self) -> Option<DynamicAddressRecord> {
        self.inner.read().await.clone()
    }

    async fn save(&self, record: &DynamicAddressRecord) -> Result<(), Error> {
        *self.inner.write().await = Some(record.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::net::Ipv4Addr;

    #[tokio::test]
    async fn test_memory_status_store_basic() {
        let store = MemoryStatusStore::new();
        assert!(store.load().await.is_empty());
        assert_eq!(store.save_count(), 0);

        let snapshot = StatusSnapshot::new(Utc::now());
        let observer = store.clone();
        store.save(&snapshot).await.unwrap();

        assert_eq!(observer.snapshot().await, Some(snapshot));
        assert_eq!(observer.save_count(), 1);
    }

    #[tokio::test]
    async fn test_memory_address_cache_basic() {
        let cache = MemoryAddressCache::new();
        assert!(cache.load().await.is_none());

        let record = DynamicAddressRecord::new(Ipv4Addr::new(198, 51, 100, 4), Utc::now());
        cache.save(&record).await.unwrap();
        assert_eq!(cache.load().await, Some(record));

        cache.clear().await;
        assert!(cache.load().await.is_none());
    }
}
