//! Locker name resolution
//!
//! Maps the human-entered locker names in a sheet to stable ids, creating
//! lockers on first sight. The cache is preloaded once per sync and the
//! planner calls `resolve` strictly sequentially, so later rows see lockers
//! created by earlier rows of the same run.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use crate::error::Result;
use crate::store::LockerStore;

/// Name-to-id cache over a [`LockerStore`], scoped to one warehouse and one
/// sync invocation
///
/// Not shareable across tasks: `resolve` takes `&mut self` and the single
/// cache instance must only be used from the sync's own sequential loop.
pub struct LockerResolver {
    warehouse_id: i64,
    store: Arc<dyn LockerStore>,
    cache: HashMap<String, i64>,
}

impl LockerResolver {
    /// Build the cache from the warehouse's current lockers
    pub async fn preload(store: Arc<dyn LockerStore>, warehouse_id: i64) -> Result<Self> {
        let lockers = store.list(warehouse_id).await?;
        let cache = lockers
            .into_iter()
            .map(|l| (l.name, l.id))
            .collect::<HashMap<_, _>>();
        debug!(warehouse_id, lockers = cache.len(), "locker cache preloaded");
        Ok(Self {
            warehouse_id,
            store,
            cache,
        })
    }

    /// Resolve a name to its locker id, creating the locker on a cache miss
    pub async fn resolve(&mut self, name: &str) -> Result<i64> {
        let name = name.trim();
        if let Some(id) = self.cache.get(name) {
            return Ok(*id);
        }
        let id = self.store.create(self.warehouse_id, name).await?;
        debug!(warehouse_id = self.warehouse_id, name, id, "locker created");
        self.cache.insert(name.to_string(), id);
        Ok(id)
    }

    /// Cache-only lookup; never creates. Used by dry runs.
    pub fn peek(&self, name: &str) -> Option<i64> {
        self.cache.get(name.trim()).copied()
    }

    /// Locker names currently known, id-keyed; used when encoding records
    /// back into sheet rows
    pub fn names_by_id(&self) -> HashMap<i64, String> {
        self.cache
            .iter()
            .map(|(name, id)| (*id, name.clone()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)] // Test code - unwrap is acceptable
mod tests {
    use super::*;
    use crate::model::Locker;
    use crate::store::MemoryStore;

    #[tokio::test]
    async fn test_preload_then_hit() {
        let store = Arc::new(MemoryStore::new());
        store.insert_locker(Locker {
            id: 11,
            warehouse_id: 1,
            name: "Shelf-1".to_string(),
        });
        let mut resolver = LockerResolver::preload(store.clone(), 1).await.unwrap();
        assert_eq!(resolver.resolve("Shelf-1").await.unwrap(), 11);
        assert_eq!(store.lockers().len(), 1);
    }

    #[tokio::test]
    async fn test_miss_creates_once_then_reuses() {
        let store = Arc::new(MemoryStore::new());
        let mut resolver = LockerResolver::preload(store.clone(), 1).await.unwrap();

        let first = resolver.resolve("Shelf-3").await.unwrap();
        let second = resolver.resolve("Shelf-3").await.unwrap();
        assert_eq!(first, second);
        assert_eq!(store.lockers().len(), 1);
        assert_eq!(store.lockers()[0].name, "Shelf-3");
    }

    #[tokio::test]
    async fn test_resolve_trims_whitespace() {
        let store = Arc::new(MemoryStore::new());
        let mut resolver = LockerResolver::preload(store.clone(), 1).await.unwrap();
        let id = resolver.resolve("Shelf-9").await.unwrap();
        assert_eq!(resolver.resolve(" Shelf-9 ").await.unwrap(), id);
        assert_eq!(store.lockers().len(), 1);
    }

    #[tokio::test]
    async fn test_peek_never_creates() {
        let store = Arc::new(MemoryStore::new());
        let resolver = LockerResolver::preload(store.clone(), 1).await.unwrap();
        assert_eq!(resolver.peek("Unknown"), None);
        assert!(store.lockers().is_empty());
    }

    #[tokio::test]
    async fn test_cache_scoped_to_warehouse() {
        let store = Arc::new(MemoryStore::new());
        store.insert_locker(Locker {
            id: 5,
            warehouse_id: 2,
            name: "Shelf-1".to_string(),
        });
        let resolver = LockerResolver::preload(store, 1).await.unwrap();
        assert!(resolver.is_empty());
    }
}
