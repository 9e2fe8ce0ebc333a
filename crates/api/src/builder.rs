//! Builder-related types.

use crate::*;
use std::sync::Arc;

/// The general tilefetch builder.
/// This contains both configuration and factory instances,
/// allowing construction of runtime module instances.
#[derive(Debug)]
pub struct Builder {
    /// The module configuration to be used when building modules.
    /// This can be loaded from disk or modified before freezing the builder.
    pub config: config::Config,

    /// The [ItemCacheFactory] to be used for creating
    /// [ItemCache] instances.
    pub item_cache: DynItemCacheFactory,

    /// The [PageSourceFactory] to be used for creating
    /// [PageSource] instances.
    pub page_source: DynPageSourceFactory,

    /// The [FetcherFactory] to be used for creating
    /// [Fetcher] instances.
    pub fetcher: DynFetcherFactory,
}

impl Builder {
    /// Construct a default config given the configured module factories.
    /// Note, this should be called before freezing the Builder instance
    /// in an Arc<>.
    pub fn set_default_config(&mut self) -> TfResult<()> {
        let Self {
            config,
            item_cache,
            page_source,
            fetcher,
        } = self;

        item_cache.default_config(config)?;
        page_source.default_config(config)?;
        fetcher.default_config(config)?;

        Ok(())
    }

    /// Chaining version of [Builder::set_default_config].
    pub fn with_default_config(mut self) -> TfResult<Self> {
        self.set_default_config()?;
        Ok(self)
    }

    /// Freeze the builder into an `Arc<>` for module creation.
    pub fn build(self) -> Arc<Self> {
        Arc::new(self)
    }
}
