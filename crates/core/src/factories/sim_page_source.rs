//! A simulated-latency page source provided by tilefetch.
//!
//! This is a stand-in for a real paged network call, useful for demos and
//! load-shaping experiments. Given a page id it sleeps for a configured
//! latency (plus random jitter) and then produces one payload per item of
//! the page, stamped with the fetch's start and end time.

use rand::Rng;
use std::sync::Arc;
use std::time::Duration;
use tilefetch_api::{
    builder::Builder, config::Config, BoxFut, DynPageSource,
    DynPageSourceFactory, ItemData, PageId, PageSource, PageSourceFactory,
    TfResult, Timestamp,
};

/// SimPageSource configuration types.
pub mod config {
    /// Configuration parameters for
    /// [SimPageSourceFactory](super::SimPageSourceFactory).
    #[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
    #[serde(rename_all = "camelCase", default)]
    pub struct SimPageSourceConfig {
        /// Base latency applied to every page fetch, in milliseconds.
        /// Default: 1000.
        pub latency_ms: u32,

        /// Upper bound of the uniform random jitter added on top of the
        /// base latency, in milliseconds. Default: 250.
        pub jitter_ms: u32,

        /// Number of random payload bytes generated per item.
        /// Default: 32.
        pub payload_len: usize,
    }

    impl Default for SimPageSourceConfig {
        fn default() -> Self {
            Self {
                latency_ms: 1000,
                jitter_ms: 250,
                payload_len: 32,
            }
        }
    }

    /// Module-level configuration for SimPageSource.
    #[derive(
        Debug, Default, Clone, serde::Serialize, serde::Deserialize,
    )]
    #[serde(rename_all = "camelCase")]
    pub struct SimPageSourceModConfig {
        /// SimPageSource configuration.
        #[serde(default)]
        pub sim_page_source: SimPageSourceConfig,
    }

    impl tilefetch_api::config::ModConfig for SimPageSourceModConfig {}
}

use config::*;

/// A simulated-latency page source module.
#[derive(Debug)]
pub struct SimPageSourceFactory {}

impl SimPageSourceFactory {
    /// Construct a new SimPageSourceFactory.
    pub fn create() -> DynPageSourceFactory {
        let out: DynPageSourceFactory = Arc::new(SimPageSourceFactory {});
        out
    }
}

impl PageSourceFactory for SimPageSourceFactory {
    fn default_config(&self, config: &mut Config) -> TfResult<()> {
        config.set_module_config(&SimPageSourceModConfig::default())?;
        Ok(())
    }

    fn create(
        &self,
        builder: Arc<Builder>,
    ) -> BoxFut<'static, TfResult<DynPageSource>> {
        Box::pin(async move {
            let config: SimPageSourceModConfig =
                builder.config.get_module_config()?;
            let out: DynPageSource =
                Arc::new(SimPageSource::new(config.sim_page_source));
            Ok(out)
        })
    }
}

#[derive(Debug)]
struct SimPageSource {
    config: SimPageSourceConfig,
}

impl SimPageSource {
    fn new(config: SimPageSourceConfig) -> Self {
        Self { config }
    }
}

impl PageSource for SimPageSource {
    fn fetch_page(
        &self,
        page: PageId,
    ) -> BoxFut<'_, TfResult<Vec<Arc<ItemData>>>> {
        Box::pin(async move {
            let started_at = Timestamp::now();

            let jitter = match self.config.jitter_ms {
                0 => 0,
                j => rand::thread_rng().gen_range(0..j),
            };
            tokio::time::sleep(Duration::from_millis(
                (self.config.latency_ms + jitter) as u64,
            ))
            .await;

            let completed_at = Timestamp::now();
            tracing::debug!(%page, "simulated page data fetched");

            Ok(page
                .item_ids()
                .into_iter()
                .map(|item| {
                    let mut payload = vec![0_u8; self.config.payload_len];
                    rand::thread_rng().fill(&mut payload[..]);
                    Arc::new(ItemData {
                        item,
                        page: page.clone(),
                        fetch_started_at: started_at,
                        fetch_completed_at: completed_at,
                        payload: payload.into(),
                    })
                })
                .collect())
        })
    }
}
