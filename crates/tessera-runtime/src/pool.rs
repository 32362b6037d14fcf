//! 共享工作池
//! Shared worker pool
//!
//! Drain loops and remote deliveries run as tasks on the tokio runtime the
//! pool was created on. A semaphore bounds how many agent handlers run at
//! once across the node; a drain loop holds a permit only while a handler is
//! executing, and no task exists at all for an agent with an empty queue.

use crate::config::RuntimeConfig;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use thiserror::Error;
use tokio::runtime::Handle;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::task::JoinHandle;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum PoolError {
    #[error("No tokio runtime available: {0}")]
    NoRuntime(String),

    #[error("Invalid pool size: {0}")]
    InvalidSize(usize),
}

#[derive(Clone)]
pub struct WorkerPool {
    handle: Handle,
    permits: Arc<Semaphore>,
    limit: usize,
    active: Arc<AtomicUsize>,
}

impl WorkerPool {
    /// Binds to the runtime the caller is running on.
    pub fn new(config: &RuntimeConfig) -> Result<Self, PoolError> {
        let handle = Handle::try_current().map_err(|e| PoolError::NoRuntime(e.to_string()))?;
        Self::with_handle(handle, config.max_concurrent_handlers)
    }

    pub fn with_handle(handle: Handle, limit: usize) -> Result<Self, PoolError> {
        if limit == 0 {
            return Err(PoolError::InvalidSize(limit));
        }
        Ok(Self {
            handle,
            permits: Arc::new(Semaphore::new(limit)),
            limit,
            active: Arc::new(AtomicUsize::new(0)),
        })
    }

    /// Starts a drain loop. Counted in [`active`](Self::active) from this call
    /// until the loop returns.
    pub(crate) fn spawn_drain<F>(&self, drain: F) -> JoinHandle<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let guard = ActiveGuard::enter(&self.active);
        self.handle.spawn(async move {
            let _guard = guard;
            drain.await;
        })
    }

    /// Runs a one-off task (outbound delivery) on the pool's runtime.
    pub fn spawn<F>(&self, task: F) -> JoinHandle<F::Output>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        self.handle.spawn(task)
    }

    /// Waits for a handler slot.
    pub(crate) async fn acquire(&self) -> Option<OwnedSemaphorePermit> {
        Arc::clone(&self.permits).acquire_owned().await.ok()
    }

    /// Number of live drain loops.
    pub fn active(&self) -> usize {
        self.active.load(Ordering::Acquire)
    }

    /// Number of handlers executing right now.
    pub fn busy(&self) -> usize {
        self.limit - self.permits.available_permits()
    }

    pub fn limit(&self) -> usize {
        self.limit
    }
}

impl std::fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerPool")
            .field("limit", &self.limit)
            .field("active", &self.active())
            .field("busy", &self.busy())
            .finish()
    }
}

struct ActiveGuard(Arc<AtomicUsize>);

impl ActiveGuard {
    fn enter(counter: &Arc<AtomicUsize>) -> Self {
        counter.fetch_add(1, Ordering::AcqRel);
        Self(Arc::clone(counter))
    }
}

impl Drop for ActiveGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::AcqRel);
    }
}
