//! The mem item cache implementation provided by tilefetch.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tilefetch_api::{
    builder::Builder, config::Config, BoxFut, DynItemCache,
    DynItemCacheFactory, ItemCache, ItemCacheFactory, ItemData, ItemId,
    TfResult,
};
use tokio::sync::RwLock;

/// MemItemCache configuration types.
pub mod config {
    /// Configuration parameters for
    /// [MemItemCacheFactory](super::MemItemCacheFactory).
    #[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
    #[serde(rename_all = "camelCase", default)]
    pub struct MemItemCacheConfig {
        /// Maximum number of item entries held at once. When the bound is
        /// exceeded the oldest inserted entries are dropped first.
        /// Default: 1024.
        pub capacity: usize,
    }

    impl Default for MemItemCacheConfig {
        fn default() -> Self {
            Self { capacity: 1024 }
        }
    }

    /// Module-level configuration for MemItemCache.
    #[derive(
        Debug, Default, Clone, serde::Serialize, serde::Deserialize,
    )]
    #[serde(rename_all = "camelCase")]
    pub struct MemItemCacheModConfig {
        /// MemItemCache configuration.
        #[serde(default)]
        pub mem_item_cache: MemItemCacheConfig,
    }

    impl tilefetch_api::config::ModConfig for MemItemCacheModConfig {}
}

use config::*;

/// The mem item cache implementation provided by tilefetch.
#[derive(Debug)]
pub struct MemItemCacheFactory {}

impl MemItemCacheFactory {
    /// Construct a new MemItemCacheFactory.
    pub fn create() -> DynItemCacheFactory {
        let out: DynItemCacheFactory = Arc::new(MemItemCacheFactory {});
        out
    }
}

impl ItemCacheFactory for MemItemCacheFactory {
    fn default_config(&self, config: &mut Config) -> TfResult<()> {
        config.set_module_config(&MemItemCacheModConfig::default())?;
        Ok(())
    }

    fn create(
        &self,
        builder: Arc<Builder>,
    ) -> BoxFut<'static, TfResult<DynItemCache>> {
        Box::pin(async move {
            let config: MemItemCacheModConfig =
                builder.config.get_module_config()?;
            let out: DynItemCache =
                Arc::new(MemItemCache::new(config.mem_item_cache));
            Ok(out)
        })
    }
}

#[derive(Debug, Default)]
struct Inner {
    items: HashMap<ItemId, Arc<ItemData>>,
    // insertion order, oldest at the front
    order: VecDeque<ItemId>,
}

/// Bounded in-memory item cache.
///
/// Entries are `Arc`-shared, so dropping one here never invalidates data
/// held by an in-flight fan-out or an earlier lookup.
#[derive(Debug)]
struct MemItemCache {
    capacity: usize,
    inner: RwLock<Inner>,
}

impl MemItemCache {
    fn new(config: MemItemCacheConfig) -> Self {
        Self {
            capacity: config.capacity,
            inner: Default::default(),
        }
    }
}

impl ItemCache for MemItemCache {
    fn get(
        &self,
        item: ItemId,
    ) -> BoxFut<'_, TfResult<Option<Arc<ItemData>>>> {
        Box::pin(async move {
            Ok(self.inner.read().await.items.get(&item).cloned())
        })
    }

    fn put_all(
        &self,
        items: Vec<Arc<ItemData>>,
    ) -> BoxFut<'_, TfResult<()>> {
        Box::pin(async move {
            let mut lock = self.inner.write().await;
            for data in items {
                let item = data.item.clone();
                if lock.items.insert(item.clone(), data).is_none() {
                    lock.order.push_back(item);
                }
            }
            while lock.items.len() > self.capacity {
                match lock.order.pop_front() {
                    Some(oldest) => {
                        lock.items.remove(&oldest);
                    }
                    None => break,
                }
            }
            Ok(())
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use tilefetch_test_utils::{collection::test_item, source::page_data};

    fn cache_with_capacity(capacity: usize) -> MemItemCache {
        MemItemCache::new(MemItemCacheConfig { capacity })
    }

    #[tokio::test]
    async fn get_returns_what_put_stored() {
        let cache = cache_with_capacity(16);
        let page = test_item(0).page();
        let items = page_data(&page);

        assert!(cache.get(test_item(0)).await.unwrap().is_none());

        cache.put_all(items.clone()).await.unwrap();

        for data in items {
            let got = cache.get(data.item.clone()).await.unwrap().unwrap();
            assert_eq!(data, got);
        }
    }

    #[tokio::test]
    async fn overwrite_does_not_grow_the_cache() {
        let cache = cache_with_capacity(16);
        let page = test_item(0).page();

        cache.put_all(page_data(&page)).await.unwrap();
        cache.put_all(page_data(&page)).await.unwrap();

        let lock = cache.inner.read().await;
        assert_eq!(8, lock.items.len());
        assert_eq!(8, lock.order.len());
    }

    #[tokio::test]
    async fn eviction_drops_oldest_insertions_first() {
        let cache = cache_with_capacity(8);
        let first = test_item(0).page();
        let second = test_item(8).page();

        cache.put_all(page_data(&first)).await.unwrap();
        cache.put_all(page_data(&second)).await.unwrap();

        // the first page was evicted wholesale
        assert!(cache.get(test_item(0)).await.unwrap().is_none());
        assert!(cache.get(test_item(8)).await.unwrap().is_some());
        assert_eq!(8, cache.inner.read().await.items.len());
    }

    #[tokio::test]
    async fn evicted_data_stays_valid_for_existing_holders() {
        let cache = cache_with_capacity(8);
        let first = test_item(0).page();

        cache.put_all(page_data(&first)).await.unwrap();
        let held = cache.get(test_item(3)).await.unwrap().unwrap();

        cache.put_all(page_data(&test_item(8).page())).await.unwrap();

        assert!(cache.get(test_item(3)).await.unwrap().is_none());
        assert_eq!(test_item(3), held.item);
    }

    #[tokio::test]
    async fn factory_applies_configured_capacity() {
        let builder = Arc::new(
            crate::default_builder().with_default_config().unwrap(),
        );
        builder
            .config
            .set_module_config(&MemItemCacheModConfig {
                mem_item_cache: MemItemCacheConfig { capacity: 8 },
            })
            .unwrap();

        let cache = builder
            .item_cache
            .create(builder.clone())
            .await
            .unwrap();

        cache.put_all(page_data(&test_item(0).page())).await.unwrap();
        cache.put_all(page_data(&test_item(8).page())).await.unwrap();
        assert!(cache.get(test_item(0)).await.unwrap().is_none());
        assert!(cache.get(test_item(15)).await.unwrap().is_some());
    }
}
