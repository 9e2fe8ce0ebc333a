//! Tilefetch item cache types.
//!
//! Data is cached at the item level. Any completed page fetch returns data
//! for multiple items, and each item's data is stored individually so
//! partial pages can be displayed and invalidated at item granularity.

use crate::*;
use std::sync::Arc;

/// Trait for implementing a bounded item-level result cache.
///
/// Implementations must be safe for concurrent access from the coordinator's
/// bookkeeping path (lookups) and the fetch completion path (inserts).
/// Entries are shared as `Arc<ItemData>`, so evicting an entry only drops
/// the cache's own reference and can never invalidate data that is mid
/// fan-out.
pub trait ItemCache: 'static + Send + Sync + std::fmt::Debug {
    /// Look up previously fetched data for an item.
    fn get(
        &self,
        item: ItemId,
    ) -> BoxFut<'_, TfResult<Option<Arc<ItemData>>>>;

    /// Insert or overwrite data for the given items.
    ///
    /// An insert that completes before a lookup begins is visible to that
    /// lookup.
    fn put_all(&self, items: Vec<Arc<ItemData>>) -> BoxFut<'_, TfResult<()>>;
}

/// Trait object [ItemCache].
pub type DynItemCache = Arc<dyn ItemCache>;

/// A factory for creating ItemCache instances.
pub trait ItemCacheFactory: 'static + Send + Sync + std::fmt::Debug {
    /// Help the builder construct a default config from the chosen
    /// module factories.
    fn default_config(&self, config: &mut config::Config) -> TfResult<()>;

    /// Construct an ItemCache instance.
    fn create(
        &self,
        builder: Arc<builder::Builder>,
    ) -> BoxFut<'static, TfResult<DynItemCache>>;
}

/// Trait object [ItemCacheFactory].
pub type DynItemCacheFactory = Arc<dyn ItemCacheFactory>;
