//! Tilefetch fetch coordinator types.

use crate::*;
use std::sync::Arc;

/// Callback through which fetch progress for one requested item is
/// delivered.
///
/// A handler registered with [Fetcher::request_item] may be invoked zero,
/// one, or two times: once immediately with `None` when the item is not yet
/// available (show a placeholder), and later at most once with the fetched
/// data. Deliveries can arrive after the caller has stopped caring about an
/// item (view recycling), so the caller must compare the delivered [ItemId]
/// against whatever identity it currently cares about before acting.
pub type DynItemHandler =
    Arc<dyn Fn(ItemId, Option<Arc<ItemData>>) + 'static + Send + Sync>;

/// Trait for implementing the fetch coordinator.
///
/// The coordinator maps item requests to page-sized batch fetches,
/// deduplicates so at most one fetch is in flight per page, caches
/// completed results per item, and fans each page's results out to every
/// caller waiting on any item of that page.
pub trait Fetcher: 'static + Send + Sync + std::fmt::Debug {
    /// Request data for one item.
    ///
    /// On a cache hit the handler is invoked with the data and no fetch
    /// work is involved. On a miss the handler is invoked with `None`, then
    /// registered for the eventual completion of the owning page's fetch;
    /// a new page fetch is only scheduled if none is pending or running for
    /// that page. Never blocks on fetch latency.
    fn request_item(
        &self,
        item: ItemId,
        handler: DynItemHandler,
    ) -> BoxFut<'_, TfResult<()>>;

    /// Withdraw this caller's interest in an item.
    ///
    /// Removes all handlers registered for the item. Does not interrupt a
    /// running page fetch: the cost of a started batch is sunk, and other
    /// items of the same page may still be wanted. A page fetch that has
    /// not yet started may be dropped once no interest remains for any of
    /// its items.
    fn withdraw_interest(&self, item: ItemId) -> BoxFut<'_, TfResult<()>>;
}

/// Trait object [Fetcher].
pub type DynFetcher = Arc<dyn Fetcher>;

/// A factory for creating Fetcher instances.
pub trait FetcherFactory: 'static + Send + Sync + std::fmt::Debug {
    /// Help the builder construct a default config from the chosen
    /// module factories.
    fn default_config(&self, config: &mut config::Config) -> TfResult<()>;

    /// Construct a Fetcher instance.
    fn create(
        &self,
        builder: Arc<builder::Builder>,
        item_cache: DynItemCache,
        page_source: DynPageSource,
    ) -> BoxFut<'static, TfResult<DynFetcher>>;
}

/// Trait object [FetcherFactory].
pub type DynFetcherFactory = Arc<dyn FetcherFactory>;
