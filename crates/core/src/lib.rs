#![deny(missing_docs)]
//! Tilefetch paged prefetching coordination core.
//!
//! A scrollable tiled UI shows many items whose data is expensive to fetch
//! and is only available in fixed-size batches ("pages"). This crate
//! provides the fetch coordination for that situation: item requests are
//! mapped to the page fetch that produces them, concurrent requests
//! coalesce onto at most one in-flight fetch per page, completed results
//! are cached per item, and one page's results fan out to every caller
//! waiting on any item of that page. Pending page fetches are serviced
//! newest-first, biasing a constrained worker pool toward whatever is on
//! screen now.
//!
//! The module traits live in the tilefetch_api crate; this crate provides
//! the production implementations behind factory types, wired together
//! through a [Builder].

use tilefetch_api::{builder::Builder, config::Config};

/// Construct a production-ready default builder.
///
/// - `item_cache` - The default item cache is
///   [factories::MemItemCacheFactory].
/// - `page_source` - The default page source is the simulated-latency
///   [factories::SimPageSourceFactory], a stand-in to be replaced with a
///   real backing fetch.
/// - `fetcher` - The default fetcher is [factories::CoreFetcherFactory].
pub fn default_builder() -> Builder {
    Builder {
        config: Config::default(),
        item_cache: factories::MemItemCacheFactory::create(),
        page_source: factories::SimPageSourceFactory::create(),
        fetcher: factories::CoreFetcherFactory::create(),
    }
}

pub mod factories;

pub mod op_stack;
