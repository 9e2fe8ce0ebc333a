use crate::op_stack::StackOp;
use std::sync::{Arc, Mutex};
use tilefetch_api::{
    BoxFut, DynPageSource, ItemData, PageId, TfError,
};
use tokio::sync::mpsc::Sender;

/// Lifecycle of one page fetch op.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageOpState {
    /// Queued on the stack, not yet started.
    Pending,
    /// Executing on a scheduler worker.
    Running,
    /// Cancelled before producing results.
    Cancelled,
    /// Finished and reported its results.
    Completed,
}

/// The reported outcome of one page fetch op.
#[derive(Debug)]
pub enum PageOutcome {
    /// The fetch completed, producing one entry per item of the page in
    /// ascending index order.
    Fetched {
        /// The fetched page.
        page: PageId,
        /// The produced data.
        items: Vec<Arc<ItemData>>,
    },
    /// The op was cancelled before producing results.
    Cancelled {
        /// The cancelled page.
        page: PageId,
    },
    /// The backing source failed; nothing was produced.
    Failed {
        /// The failed page.
        page: PageId,
        /// The source's error.
        err: TfError,
    },
}

/// One outstanding page fetch.
///
/// Identified by its [PageId] for deduplication. Reports its outcome
/// through a channel owned by the fetcher's bookkeeping task rather than
/// holding any reference back to the fetcher.
#[derive(Debug)]
pub struct PageFetchOp {
    page: PageId,
    source: DynPageSource,
    outcome_tx: Sender<PageOutcome>,
    state: Mutex<PageOpState>,
}

impl PageFetchOp {
    pub fn new(
        page: PageId,
        source: DynPageSource,
        outcome_tx: Sender<PageOutcome>,
    ) -> Self {
        Self {
            page,
            source,
            outcome_tx,
            state: Mutex::new(PageOpState::Pending),
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> PageOpState {
        *self.state.lock().unwrap()
    }

    /// Mark this op cancelled.
    ///
    /// Never interrupts the backing fetch itself: a pending op simply will
    /// not fetch, while a running op discards its results instead of
    /// reporting them. Returns false once the op has already finished.
    pub fn cancel(&self) -> bool {
        let mut lock = self.state.lock().unwrap();
        match *lock {
            PageOpState::Pending | PageOpState::Running => {
                *lock = PageOpState::Cancelled;
                true
            }
            _ => false,
        }
    }

    async fn report(&self, outcome: PageOutcome) {
        if self.outcome_tx.send(outcome).await.is_err() {
            tracing::warn!(
                page = %self.page,
                "fetcher gone, dropping page fetch outcome"
            );
        }
    }
}

impl StackOp for PageFetchOp {
    type Key = PageId;

    fn key(&self) -> PageId {
        self.page.clone()
    }

    fn run(self: Arc<Self>) -> BoxFut<'static, ()> {
        Box::pin(async move {
            // decide under the lock, report only after it is released
            let started = {
                let mut lock = self.state.lock().unwrap();
                match *lock {
                    PageOpState::Pending => {
                        *lock = PageOpState::Running;
                        true
                    }
                    // cancelled between push and start
                    _ => false,
                }
            };
            if !started {
                self.report(PageOutcome::Cancelled {
                    page: self.page.clone(),
                })
                .await;
                return;
            }

            let outcome =
                match self.source.fetch_page(self.page.clone()).await {
                    Ok(items) => {
                        let mut lock = self.state.lock().unwrap();
                        if *lock == PageOpState::Cancelled {
                            PageOutcome::Cancelled {
                                page: self.page.clone(),
                            }
                        } else {
                            *lock = PageOpState::Completed;
                            PageOutcome::Fetched {
                                page: self.page.clone(),
                                items,
                            }
                        }
                    }
                    Err(err) => PageOutcome::Failed {
                        page: self.page.clone(),
                        err,
                    },
                };

            self.report(outcome).await;
        })
    }
}
