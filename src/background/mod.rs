//! Background tasks that outlive the response that started them.
//!
//! A stale-while-revalidate refresh is spawned, then the cached response is
//! returned without waiting for it. [`BackgroundTasks`] keeps a handle to every
//! such task so the host can [`settle`](BackgroundTasks::settle) them before
//! shutting down, the same lifetime extension a browser grants a service
//! worker with outstanding work.

use std::future::Future;
use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio::task::{JoinError, JoinSet};
use tracing::warn;

/// Tracker for detached tokio tasks.
///
/// Tasks live in a [`JoinSet`]: finished ones are reaped on every spawn, and
/// dropping the tracker aborts whatever has not been settled.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use std::sync::atomic::{AtomicBool, Ordering};
/// use swcache::background::BackgroundTasks;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let tasks = BackgroundTasks::new();
/// let done = Arc::new(AtomicBool::new(false));
///
/// let flag = Arc::clone(&done);
/// tasks.spawn(async move { flag.store(true, Ordering::SeqCst) });
///
/// assert_eq!(tasks.settle().await, 1);
/// assert!(done.load(Ordering::SeqCst));
/// # }
/// ```
#[derive(Debug, Default)]
pub struct BackgroundTasks {
    tasks: Mutex<JoinSet<()>>,
}

impl BackgroundTasks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawns `task` onto the current tokio runtime and tracks it.
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime.
    pub fn spawn<F>(&self, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let mut tasks = self.lock();
        reap(&mut tasks);
        tasks.spawn(task);
    }

    /// Number of tracked tasks that have not finished yet.
    pub fn pending(&self) -> usize {
        let mut tasks = self.lock();
        reap(&mut tasks);
        tasks.len()
    }

    /// Waits until every tracked task, including ones spawned while waiting,
    /// has completed. Returns how many tasks were awaited.
    pub async fn settle(&self) -> usize {
        let mut settled = 0;
        loop {
            // Swap the set out so the lock is never held across an await.
            let mut batch = std::mem::take(&mut *self.lock());
            if batch.is_empty() {
                return settled;
            }
            while let Some(res) = batch.join_next().await {
                if let Err(e) = res {
                    log_join_error(&e);
                }
                settled += 1;
            }
        }
    }

    fn lock(&self) -> MutexGuard<'_, JoinSet<()>> {
        self.tasks.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn reap(tasks: &mut JoinSet<()>) {
    while let Some(res) = tasks.try_join_next() {
        if let Err(e) = res {
            log_join_error(&e);
        }
    }
}

fn log_join_error(e: &JoinError) {
    warn!(error = %e, panicked = e.is_panic(), "background task did not complete");
}
