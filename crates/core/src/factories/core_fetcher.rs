//! Fetcher is the tilefetch module coordinating item requests into page
//! fetches.
//!
//! It consists of multiple parts:
//! - State object that tracks per-item completion handlers in memory
//! - A LIFO [OpStack] whose workers execute page fetch ops, newest first
//! - An outcome task that processes finished page fetches by
//!     - persisting fetched data to the item cache
//!     - draining and invoking the handlers registered for the page's items
//!
//! ### State object CoreFetcher
//!
//! - Exposes [tilefetch_api::Fetcher::request_item], which consults the
//!   item cache and on a miss registers the caller's handler under the item
//!   id. Handler lists are keyed by item so that one page completion can
//!   fan out to every caller waiting on any item of that page.
//! - All handler-map mutations and all "does a fetch for this page already
//!   exist" checks run under one lock, so two callers can never race to
//!   create duplicate ops for the same page.
//! - A request that joins an existing op re-checks the cache after
//!   registering, covering the window in which that op completed and fanned
//!   out before the registration landed.
//!
//! ### Page fetch ops
//!
//! A [PageFetchOp] is pushed onto the stack only when no pending or running
//! op covers the requested page; a request that finds a still-pending op
//! moves it back to the top of the stack instead. Ops report through an
//! outcome channel rather than holding any reference back to the fetcher.
//!
//! ### Outcome task
//!
//! - Fetched page data is written to the item cache.
//! - Each item's handler list is then drained as a unit and invoked in
//!   registration order. Cancelled or failed pages write nothing and leave
//!   registrations in place for a later re-request.

use crate::op_stack::OpStack;
use page_op::{PageFetchOp, PageOutcome};
use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};
use tilefetch_api::{
    builder::Builder, config::Config, BoxFut, DynFetcher, DynFetcherFactory,
    DynItemCache, DynItemHandler, DynPageSource, Fetcher, FetcherFactory,
    ItemId, TfResult,
};
use tokio::{
    sync::mpsc::{channel, Receiver, Sender},
    task::JoinHandle,
};

mod page_op;

/// CoreFetcher configuration types.
pub mod config {
    /// Configuration parameters for
    /// [CoreFetcherFactory](super::CoreFetcherFactory).
    #[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
    #[serde(rename_all = "camelCase", default)]
    pub struct CoreFetcherConfig {
        /// How many page fetches can run concurrently. Pending fetches
        /// beyond this width wait on the stack. Default: 1.
        pub concurrency: u8,

        /// Capacity of the channel carrying finished page fetch outcomes
        /// back to the bookkeeping task. Default: 1024.
        pub outcome_channel_size: usize,
    }

    impl Default for CoreFetcherConfig {
        fn default() -> Self {
            Self {
                concurrency: 1,
                outcome_channel_size: 1024,
            }
        }
    }

    /// Module-level configuration for CoreFetcher.
    #[derive(
        Debug, Default, Clone, serde::Serialize, serde::Deserialize,
    )]
    #[serde(rename_all = "camelCase")]
    pub struct CoreFetcherModConfig {
        /// CoreFetcher configuration.
        #[serde(default)]
        pub core_fetcher: CoreFetcherConfig,
    }

    impl tilefetch_api::config::ModConfig for CoreFetcherModConfig {}
}

use config::*;

/// A production-ready fetcher module.
#[derive(Debug)]
pub struct CoreFetcherFactory {}

impl CoreFetcherFactory {
    /// Construct a new CoreFetcherFactory.
    pub fn create() -> DynFetcherFactory {
        Arc::new(Self {})
    }
}

impl FetcherFactory for CoreFetcherFactory {
    fn default_config(&self, config: &mut Config) -> TfResult<()> {
        config.set_module_config(&CoreFetcherModConfig::default())?;
        Ok(())
    }

    fn create(
        &self,
        builder: Arc<Builder>,
        item_cache: DynItemCache,
        page_source: DynPageSource,
    ) -> BoxFut<'static, TfResult<DynFetcher>> {
        Box::pin(async move {
            let config: CoreFetcherModConfig =
                builder.config.get_module_config()?;
            let out: DynFetcher = Arc::new(CoreFetcher::new(
                config.core_fetcher,
                item_cache,
                page_source,
            ));
            Ok(out)
        })
    }
}

struct State {
    // registration order within each entry is delivery order
    handlers: HashMap<ItemId, Vec<DynItemHandler>>,
}

struct CoreFetcher {
    state: Arc<Mutex<State>>,
    stack: OpStack<PageFetchOp>,
    item_cache: DynItemCache,
    page_source: DynPageSource,
    outcome_tx: Sender<PageOutcome>,
    outcome_task: JoinHandle<()>,
}

impl std::fmt::Debug for CoreFetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoreFetcher")
            .field("stack", &self.stack)
            .finish()
    }
}

impl CoreFetcher {
    fn new(
        config: CoreFetcherConfig,
        item_cache: DynItemCache,
        page_source: DynPageSource,
    ) -> Self {
        let (outcome_tx, outcome_rx) =
            channel::<PageOutcome>(config.outcome_channel_size.max(1));

        let state = Arc::new(Mutex::new(State {
            handlers: HashMap::new(),
        }));

        let outcome_task = tokio::task::spawn(CoreFetcher::outcome_task(
            state.clone(),
            item_cache.clone(),
            outcome_rx,
        ));

        Self {
            state,
            stack: OpStack::new(config.concurrency as usize),
            item_cache,
            page_source,
            outcome_tx,
            outcome_task,
        }
    }

    async fn outcome_task(
        state: Arc<Mutex<State>>,
        item_cache: DynItemCache,
        mut outcome_rx: Receiver<PageOutcome>,
    ) {
        while let Some(outcome) = outcome_rx.recv().await {
            match outcome {
                PageOutcome::Fetched { page, items } => {
                    if let Err(err) =
                        item_cache.put_all(items.clone()).await
                    {
                        tracing::warn!(
                            %page,
                            ?err,
                            "could not cache fetched page data"
                        );
                    }

                    // Read-and-clear each item's registrations as a unit,
                    // then invoke outside the lock in registration order.
                    let mut deliveries = Vec::new();
                    {
                        let mut lock = state.lock().unwrap();
                        for data in items {
                            if let Some(handlers) =
                                lock.handlers.remove(&data.item)
                            {
                                deliveries.push((data, handlers));
                            }
                        }
                    }
                    let delivered = deliveries.len();
                    for (data, handlers) in deliveries {
                        for handler in handlers {
                            handler(data.item.clone(), Some(data.clone()));
                        }
                    }
                    tracing::debug!(
                        %page,
                        delivered,
                        "page fetched and fanned out"
                    );
                }
                PageOutcome::Cancelled { page } => {
                    // No cache writes, no deliveries. Registrations for the
                    // page stay until a later request triggers a new fetch.
                    tracing::debug!(%page, "page fetch cancelled");
                }
                PageOutcome::Failed { page, err } => {
                    // A failing page must not corrupt bookkeeping for other
                    // pages; its registrations also stay for a re-request.
                    tracing::warn!(%page, ?err, "page fetch failed");
                }
            }
        }
    }
}

impl Fetcher for CoreFetcher {
    fn request_item(
        &self,
        item: ItemId,
        handler: DynItemHandler,
    ) -> BoxFut<'_, TfResult<()>> {
        Box::pin(async move {
            if let Some(data) = self.item_cache.get(item.clone()).await? {
                tracing::debug!(%item, "item data found in cache");
                handler(item, Some(data));
                return Ok(());
            }

            // Not yet available; the caller shows a placeholder meanwhile.
            handler(item.clone(), None);

            let page = item.page();
            let joined_existing = {
                let mut lock = self.state.lock().unwrap();
                lock.handlers
                    .entry(item.clone())
                    .or_default()
                    .push(handler);

                // The existence check and the push must not interleave
                // with other bookkeeping, or two callers could race to
                // create duplicate ops for one page.
                if self.stack.contains(&page) {
                    // fresh interest bumps a still-pending fetch to the top
                    self.stack.reschedule(&page);
                    true
                } else {
                    self.stack.push(Arc::new(PageFetchOp::new(
                        page,
                        self.page_source.clone(),
                        self.outcome_tx.clone(),
                    )));
                    false
                }
            };

            // The joined op may have completed and fanned out between the
            // cache miss above and the registration. Re-check the cache so
            // the handler cannot be stranded waiting on a fetch that has
            // already delivered.
            if joined_existing {
                if let Some(data) =
                    self.item_cache.get(item.clone()).await?
                {
                    let handlers = self
                        .state
                        .lock()
                        .unwrap()
                        .handlers
                        .remove(&item);
                    for handler in handlers.into_iter().flatten() {
                        handler(item.clone(), Some(data.clone()));
                    }
                }
            }

            Ok(())
        })
    }

    fn withdraw_interest(&self, item: ItemId) -> BoxFut<'_, TfResult<()>> {
        Box::pin(async move {
            let page = item.page();

            let cancelled = {
                let mut lock = self.state.lock().unwrap();
                lock.handlers.remove(&item);

                // A fetch that has started is a sunk cost and keeps going;
                // its results may still serve other callers or the cache.
                // A pending one can be dropped once no interest remains
                // for any item of its page.
                let page_still_wanted = page
                    .item_ids()
                    .iter()
                    .any(|i| lock.handlers.contains_key(i));
                if page_still_wanted {
                    None
                } else {
                    self.stack.cancel_pending(&page)
                }
            };

            if let Some(op) = cancelled {
                op.cancel();
                tracing::debug!(%page, "dropped pending page fetch");
            }

            Ok(())
        })
    }
}

impl Drop for CoreFetcher {
    fn drop(&mut self) {
        self.outcome_task.abort();
    }
}
