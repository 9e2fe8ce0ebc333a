//! Factories for generating instances of tilefetch modules.

pub mod core_fetcher;
pub use core_fetcher::CoreFetcherFactory;

pub mod mem_item_cache;
pub use mem_item_cache::MemItemCacheFactory;

pub mod sim_page_source;
pub use sim_page_source::SimPageSourceFactory;
