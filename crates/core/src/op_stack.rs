//! A LIFO op scheduler with a bounded worker pool.
//!
//! Runs submitted ops with bounded concurrency (default exactly one at a
//! time) and, whenever a worker frees up, always starts the most recently
//! pushed still-pending op. This biases service toward freshly requested
//! work over stale requests issued before a fast scroll.
//!
//! Selection is strictly last in, first out among pending ops. There is no
//! starvation prevention: an op can wait indefinitely while newer ops keep
//! being pushed ahead of it. That trade of recency over fairness is the
//! point of this scheduler and must not be "fixed".

use std::sync::{Arc, Mutex};
use tilefetch_api::BoxFut;
use tokio::{sync::Notify, task::JoinHandle};

/// Trait implemented by ops that can be scheduled on an [OpStack].
pub trait StackOp: 'static + Send + Sync + std::fmt::Debug {
    /// Identity used for existence checks, rescheduling and cancellation.
    type Key: 'static
        + Clone
        + Eq
        + std::hash::Hash
        + Send
        + Sync
        + std::fmt::Debug;

    /// This op's identity.
    fn key(&self) -> Self::Key;

    /// Execute the op. Called at most once, on a scheduler worker.
    fn run(self: Arc<Self>) -> BoxFut<'static, ()>;
}

#[derive(Debug)]
struct StackState<O: StackOp> {
    // treated as a stack, newest at the end
    pending: Vec<Arc<O>>,
    running: Vec<O::Key>,
}

/// A LIFO op scheduler.
///
/// Workers are tokio tasks, aborted when the stack is dropped. An op that
/// has started always runs to completion; only pending ops can be removed
/// or reordered.
#[derive(Debug)]
pub struct OpStack<O: StackOp> {
    state: Arc<Mutex<StackState<O>>>,
    notify: Arc<Notify>,
    workers: Vec<JoinHandle<()>>,
}

impl<O: StackOp> OpStack<O> {
    /// Construct a new OpStack running up to `width` ops concurrently.
    ///
    /// A width of zero is treated as one.
    pub fn new(width: usize) -> Self {
        let state = Arc::new(Mutex::new(StackState {
            pending: Vec::new(),
            running: Vec::new(),
        }));
        let notify = Arc::new(Notify::new());

        let workers = (0..width.max(1))
            .map(|_| {
                tokio::task::spawn(Self::worker_task(
                    state.clone(),
                    notify.clone(),
                ))
            })
            .collect();

        Self {
            state,
            notify,
            workers,
        }
    }

    /// Push an op onto the top of the stack.
    ///
    /// If a worker is idle the op starts immediately. Otherwise it waits at
    /// the top of the stack, from where the next free worker takes it,
    /// unless newer ops are pushed above it first.
    pub fn push(&self, op: Arc<O>) {
        tracing::debug!(key = ?op.key(), "queue op");
        self.state.lock().unwrap().pending.push(op);
        self.notify.notify_one();
    }

    /// Move a pending op back to the top of the stack, making it the next
    /// one to start when a worker frees up.
    ///
    /// Returns false, with no effect, if no op with the given key is
    /// pending (it may already be running or finished).
    pub fn reschedule(&self, key: &O::Key) -> bool {
        let mut lock = self.state.lock().unwrap();
        match lock.pending.iter().position(|op| op.key() == *key) {
            Some(pos) => {
                let op = lock.pending.remove(pos);
                lock.pending.push(op);
                tracing::debug!(?key, "reschedule op");
                true
            }
            None => false,
        }
    }

    /// Remove a pending op before it starts.
    ///
    /// Returns the removed op, or None if no op with the given key is
    /// pending. An op that is already running is not affected; once
    /// started, an op's own cancellation must be used instead.
    pub fn cancel_pending(&self, key: &O::Key) -> Option<Arc<O>> {
        let mut lock = self.state.lock().unwrap();
        lock.pending
            .iter()
            .position(|op| op.key() == *key)
            .map(|pos| lock.pending.remove(pos))
    }

    /// True if an op with the given key is pending or running.
    pub fn contains(&self, key: &O::Key) -> bool {
        let lock = self.state.lock().unwrap();
        lock.running.iter().any(|k| k == key)
            || lock.pending.iter().any(|op| op.key() == *key)
    }

    /// Number of ops that have not yet started.
    pub fn pending_count(&self) -> usize {
        self.state.lock().unwrap().pending.len()
    }

    /// Number of currently running ops.
    pub fn running_count(&self) -> usize {
        self.state.lock().unwrap().running.len()
    }

    async fn worker_task(
        state: Arc<Mutex<StackState<O>>>,
        notify: Arc<Notify>,
    ) {
        loop {
            let op = {
                let mut lock = state.lock().unwrap();
                match lock.pending.pop() {
                    Some(op) => {
                        lock.running.push(op.key());
                        Some(op)
                    }
                    None => None,
                }
            };

            match op {
                Some(op) => {
                    let key = op.key();
                    tracing::debug!(?key, "run op");
                    op.run().await;
                    let mut lock = state.lock().unwrap();
                    if let Some(pos) =
                        lock.running.iter().position(|k| *k == key)
                    {
                        lock.running.remove(pos);
                    }
                }
                None => notify.notified().await,
            }
        }
    }
}

impl<O: StackOp> Drop for OpStack<O> {
    fn drop(&mut self) {
        for t in self.workers.iter() {
            t.abort();
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::sync::Arc;
    use tilefetch_test_utils::iter_check;
    use tokio::sync::Semaphore;

    #[derive(Debug)]
    struct TestOp {
        key: u32,
        record: Arc<Mutex<Vec<u32>>>,
        gate: Option<Arc<Semaphore>>,
    }

    impl TestOp {
        fn instant(key: u32, record: &Arc<Mutex<Vec<u32>>>) -> Arc<Self> {
            Arc::new(Self {
                key,
                record: record.clone(),
                gate: None,
            })
        }

        fn gated(
            key: u32,
            record: &Arc<Mutex<Vec<u32>>>,
            gate: &Arc<Semaphore>,
        ) -> Arc<Self> {
            Arc::new(Self {
                key,
                record: record.clone(),
                gate: Some(gate.clone()),
            })
        }
    }

    impl StackOp for TestOp {
        type Key = u32;

        fn key(&self) -> u32 {
            self.key
        }

        fn run(self: Arc<Self>) -> BoxFut<'static, ()> {
            Box::pin(async move {
                if let Some(gate) = &self.gate {
                    gate.acquire().await.unwrap().forget();
                }
                self.record.lock().unwrap().push(self.key);
            })
        }
    }

    // Pushes happen without an await point in between, so on the
    // current-thread test runtime the worker cannot start until all three
    // ops are stacked.
    #[tokio::test]
    async fn lifo_order_with_idle_worker() {
        let record = Arc::new(Mutex::new(Vec::new()));
        let stack = OpStack::new(1);

        stack.push(TestOp::instant(1, &record));
        stack.push(TestOp::instant(2, &record));
        stack.push(TestOp::instant(3, &record));

        iter_check!({
            if record.lock().unwrap().len() == 3 {
                break;
            }
        });

        assert_eq!(vec![3, 2, 1], *record.lock().unwrap());
    }

    #[tokio::test]
    async fn reschedule_moves_pending_op_to_top() {
        let record = Arc::new(Mutex::new(Vec::new()));
        let gate = Arc::new(Semaphore::new(0));
        let stack = OpStack::new(1);

        // occupy the single worker
        stack.push(TestOp::gated(99, &record, &gate));
        iter_check!({
            if stack.running_count() == 1 {
                break;
            }
        });

        stack.push(TestOp::instant(1, &record));
        stack.push(TestOp::instant(2, &record));
        stack.push(TestOp::instant(3, &record));

        assert!(stack.reschedule(&2));
        // already running, not pending
        assert!(!stack.reschedule(&99));

        gate.add_permits(1);

        iter_check!({
            if record.lock().unwrap().len() == 4 {
                break;
            }
        });

        assert_eq!(vec![99, 2, 3, 1], *record.lock().unwrap());
    }

    #[tokio::test]
    async fn cancel_pending_removes_op_before_start() {
        let record = Arc::new(Mutex::new(Vec::new()));
        let gate = Arc::new(Semaphore::new(0));
        let stack = OpStack::new(1);

        stack.push(TestOp::gated(99, &record, &gate));
        iter_check!({
            if stack.running_count() == 1 {
                break;
            }
        });

        stack.push(TestOp::instant(1, &record));
        stack.push(TestOp::instant(2, &record));

        let cancelled = stack.cancel_pending(&1);
        assert_eq!(1, cancelled.unwrap().key());
        // a running op cannot be cancelled out of the stack
        assert!(stack.cancel_pending(&99).is_none());

        gate.add_permits(1);

        iter_check!({
            if record.lock().unwrap().len() == 2 {
                break;
            }
        });

        assert_eq!(vec![99, 2], *record.lock().unwrap());
        assert_eq!(0, stack.pending_count());
    }

    #[tokio::test]
    async fn contains_sees_pending_and_running() {
        let record = Arc::new(Mutex::new(Vec::new()));
        let gate = Arc::new(Semaphore::new(0));
        let stack = OpStack::new(1);

        assert!(!stack.contains(&7));

        stack.push(TestOp::gated(7, &record, &gate));
        iter_check!({
            if stack.running_count() == 1 {
                break;
            }
        });
        assert!(stack.contains(&7));

        stack.push(TestOp::instant(8, &record));
        assert!(stack.contains(&8));

        gate.add_permits(1);
        iter_check!({
            if record.lock().unwrap().len() == 2 {
                break;
            }
        });
        assert!(!stack.contains(&7));
        assert!(!stack.contains(&8));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn width_allows_parallel_ops() {
        let record = Arc::new(Mutex::new(Vec::new()));
        let gate = Arc::new(Semaphore::new(0));
        let stack = OpStack::new(2);

        stack.push(TestOp::gated(1, &record, &gate));
        stack.push(TestOp::gated(2, &record, &gate));

        iter_check!({
            if stack.running_count() == 2 {
                break;
            }
        });

        gate.add_permits(2);
        iter_check!({
            if record.lock().unwrap().len() == 2 {
                break;
            }
        });
    }
}
