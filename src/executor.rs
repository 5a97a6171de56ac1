//! Dispatch abstraction for delegate callbacks.
//!
//! The reference client this crate's callback surface is modeled on runs
//! every delegate method on a single caller-chosen queue (typically the
//! host application's main thread), so callbacks are strictly ordered
//! relative to one another. A portable Tokio client has no such ambient
//! "main queue", so the equivalent here is an injectable executor: by
//! default callbacks are pushed onto a single mpsc queue drained by one
//! background task, one at a time, in the order they were queued — the same
//! single-worker-queue shape `write.rs`'s `WritePump` uses for outbound
//! frames, mirrored for inbound callback dispatch. A caller embedding this
//! client inside something with its own notion of "the right thread to call
//! back on" can supply a different `Executor`.

use std::future::Future;
use std::pin::Pin;
use tokio::sync::mpsc;

type BoxedFuture = Pin<Box<dyn Future<Output = ()> + Send>>;

/// Runs a boxed future to completion, dispatching delegate notifications.
pub trait Executor: Send + Sync {
    fn execute(&self, future: BoxedFuture);
}

/// The default executor: queues futures onto a single worker task that
/// drains them one at a time, so callbacks queued in order run in that
/// order and never overlap.
#[derive(Clone)]
pub struct TokioExecutor {
    tx: mpsc::UnboundedSender<BoxedFuture>,
}

impl TokioExecutor {
    pub fn new() -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<BoxedFuture>();
        tokio::spawn(async move {
            while let Some(future) = rx.recv().await {
                future.await;
            }
        });
        Self { tx }
    }
}

impl Default for TokioExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for TokioExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokioExecutor").finish_non_exhaustive()
    }
}

impl Executor for TokioExecutor {
    fn execute(&self, future: BoxedFuture) {
        // The receiver only goes away with the worker task, which never
        // exits while this sender (or a clone of it) is alive.
        let _ = self.tx.send(future);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use tokio::sync::Mutex;

    #[tokio::test]
    async fn tokio_executor_runs_the_future() {
        let ran = Arc::new(AtomicBool::new(false));
        let ran_clone = ran.clone();
        let executor = TokioExecutor::new();
        executor.execute(Box::pin(async move {
            ran_clone.store(true, Ordering::SeqCst);
        }));
        tokio::task::yield_now().await;
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        assert!(ran.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn queued_futures_run_in_fifo_order() {
        let order = Arc::new(Mutex::new(Vec::new()));
        let executor = TokioExecutor::new();

        for i in 0..5 {
            let order = order.clone();
            executor.execute(Box::pin(async move {
                order.lock().await.push(i);
            }));
        }

        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        assert_eq!(*order.lock().await, vec![0, 1, 2, 3, 4]);
    }
}
