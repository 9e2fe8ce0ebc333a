//! Tilefetch page source types.

use crate::*;
use std::sync::Arc;

/// Trait for implementing the backing fetch of one page of items.
///
/// The contract is batch-or-nothing: after an unspecified but bounded
/// latency a call either produces exactly one [ItemData] per entry of
/// `page.item_ids()`, in ascending index order, or returns an error and
/// produces nothing. There is no partial or streamed delivery.
///
/// The error channel is the extension point for real, fallible backends.
/// The coordinator treats a failed page as "no delivery": nothing is cached
/// and registered interest stays in place for a later retry by re-request.
pub trait PageSource: 'static + Send + Sync + std::fmt::Debug {
    /// Fetch the data for every item of the given page.
    fn fetch_page(
        &self,
        page: PageId,
    ) -> BoxFut<'_, TfResult<Vec<Arc<ItemData>>>>;
}

/// Trait object [PageSource].
pub type DynPageSource = Arc<dyn PageSource>;

/// A factory for creating PageSource instances.
pub trait PageSourceFactory: 'static + Send + Sync + std::fmt::Debug {
    /// Help the builder construct a default config from the chosen
    /// module factories.
    fn default_config(&self, config: &mut config::Config) -> TfResult<()>;

    /// Construct a PageSource instance.
    fn create(
        &self,
        builder: Arc<builder::Builder>,
    ) -> BoxFut<'static, TfResult<DynPageSource>>;
}

/// Trait object [PageSourceFactory].
pub type DynPageSourceFactory = Arc<dyn PageSourceFactory>;
