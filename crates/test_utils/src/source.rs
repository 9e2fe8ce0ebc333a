//! Deterministic page sources for driving fetcher tests.

use std::sync::{Arc, Mutex};
use std::time::Duration;
use tilefetch_api::{
    builder::Builder, config::Config, BoxFut, DynPageSource,
    DynPageSourceFactory, ItemData, PageId, PageSource, PageSourceFactory,
    TfError, TfResult, Timestamp,
};
use tokio::sync::Semaphore;

/// Produce a full page of plausible item data for the given page id.
pub fn page_data(page: &PageId) -> Vec<Arc<ItemData>> {
    let started = Timestamp::now();
    let completed = started + Duration::from_micros(1);
    page.item_ids()
        .into_iter()
        .map(|item| {
            Arc::new(ItemData {
                item,
                page: page.clone(),
                fetch_started_at: started,
                fetch_completed_at: completed,
                payload: crate::random_bytes(8).into(),
            })
        })
        .collect()
}

/// A page source that answers immediately, recording every fetched page.
#[derive(Debug, Default)]
pub struct InstantPageSource {
    /// Pages fetched so far, in completion order.
    pub fetched: Mutex<Vec<PageId>>,
}

impl InstantPageSource {
    /// Construct a new InstantPageSource.
    pub fn create() -> Arc<Self> {
        Arc::new(Self::default())
    }
}

impl PageSource for InstantPageSource {
    fn fetch_page(
        &self,
        page: PageId,
    ) -> BoxFut<'_, TfResult<Vec<Arc<ItemData>>>> {
        Box::pin(async move {
            self.fetched.lock().unwrap().push(page.clone());
            Ok(page_data(&page))
        })
    }
}

/// A page source whose fetches block until explicitly released, recording
/// the order in which they started.
#[derive(Debug)]
pub struct GatedPageSource {
    /// Pages whose fetch has started, in start order.
    pub started: Mutex<Vec<PageId>>,
    gate: Semaphore,
}

impl GatedPageSource {
    /// Construct a new GatedPageSource with the gate closed.
    pub fn create() -> Arc<Self> {
        Arc::new(Self {
            started: Mutex::new(Vec::new()),
            gate: Semaphore::new(0),
        })
    }

    /// Allow `n` blocked or future fetches to complete.
    pub fn release(&self, n: usize) {
        self.gate.add_permits(n);
    }
}

impl PageSource for GatedPageSource {
    fn fetch_page(
        &self,
        page: PageId,
    ) -> BoxFut<'_, TfResult<Vec<Arc<ItemData>>>> {
        Box::pin(async move {
            self.started.lock().unwrap().push(page.clone());
            self.gate
                .acquire()
                .await
                .map_err(|err| TfError::other_src("gate closed", err))?
                .forget();
            Ok(page_data(&page))
        })
    }
}

/// A page source that always fails, counting the attempts made.
#[derive(Debug, Default)]
pub struct FailingPageSource {
    /// Number of fetch attempts made so far.
    pub attempts: Mutex<usize>,
}

impl FailingPageSource {
    /// Construct a new FailingPageSource.
    pub fn create() -> Arc<Self> {
        Arc::new(Self::default())
    }
}

impl PageSource for FailingPageSource {
    fn fetch_page(
        &self,
        page: PageId,
    ) -> BoxFut<'_, TfResult<Vec<Arc<ItemData>>>> {
        Box::pin(async move {
            *self.attempts.lock().unwrap() += 1;
            Err(TfError::other(format!("simulated failure for {page}")))
        })
    }
}

/// Wrap a premade page source in a factory, for wiring test sources into a
/// [Builder].
#[derive(Debug)]
pub struct TestPageSourceFactory {
    source: DynPageSource,
}

impl TestPageSourceFactory {
    /// Construct a factory that always yields the given source.
    pub fn create(source: DynPageSource) -> DynPageSourceFactory {
        Arc::new(Self { source })
    }
}

impl PageSourceFactory for TestPageSourceFactory {
    fn default_config(&self, _config: &mut Config) -> TfResult<()> {
        Ok(())
    }

    fn create(
        &self,
        _builder: Arc<Builder>,
    ) -> BoxFut<'static, TfResult<DynPageSource>> {
        let source = self.source.clone();
        Box::pin(async move { Ok(source) })
    }
}
