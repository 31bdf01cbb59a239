//! Bounded task pool for external API calls.
//!
//! At most `capacity` submitted tasks run at once. Further submissions wait
//! in FIFO order (tokio's semaphore is fair) and are admitted as running
//! tasks finish. The slot is released by a drop guard, so a task that fails
//! or is dropped mid-flight always frees its slot and the queue keeps moving.

use crate::error::{Result, VerbatimError};
use std::future::Future;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{Semaphore, SemaphorePermit};
use tracing::trace;

/// Fixed-capacity concurrency limiter.
#[derive(Debug)]
pub struct TaskPool {
    name: String,
    capacity: usize,
    permits: Semaphore,
    running: AtomicUsize,
    peak: AtomicUsize,
    completed: AtomicU64,
}

/// Holds a pool slot for the duration of one task.
struct Slot<'a> {
    pool: &'a TaskPool,
    _permit: SemaphorePermit<'a>,
}

impl<'a> Slot<'a> {
    fn admit(pool: &'a TaskPool, permit: SemaphorePermit<'a>) -> Self {
        let running = pool.running.fetch_add(1, Ordering::SeqCst) + 1;
        pool.peak.fetch_max(running, Ordering::SeqCst);
        Self {
            pool,
            _permit: permit,
        }
    }
}

impl Drop for Slot<'_> {
    fn drop(&mut self) {
        self.pool.running.fetch_sub(1, Ordering::SeqCst);
        self.pool.completed.fetch_add(1, Ordering::SeqCst);
    }
}

impl TaskPool {
    /// Create a pool. A capacity of zero is raised to one.
    pub fn new(name: impl Into<String>, capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            name: name.into(),
            capacity,
            permits: Semaphore::new(capacity),
            running: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
            completed: AtomicU64::new(0),
        }
    }

    /// Create a shareable pool.
    pub fn shared(name: impl Into<String>, capacity: usize) -> Arc<Self> {
        Arc::new(Self::new(name, capacity))
    }

    /// Run `task` once a slot is free and return its output.
    ///
    /// The outer `Result` only fails if the pool has been closed; the task's
    /// own success or failure is carried in the returned value.
    pub async fn submit<F, Fut>(&self, task: F) -> Result<Fut::Output>
    where
        F: FnOnce() -> Fut,
        Fut: Future,
    {
        let permit = self
            .permits
            .acquire()
            .await
            .map_err(|_| VerbatimError::PoolClosed(self.name.clone()))?;

        let _slot = Slot::admit(self, permit);
        trace!(pool = %self.name, running = self.running(), "task admitted");

        Ok(task().await)
    }

    /// Stop admitting tasks. Queued and future submissions fail.
    pub fn close(&self) {
        self.permits.close();
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Tasks currently running.
    pub fn running(&self) -> usize {
        self.running.load(Ordering::SeqCst)
    }

    /// Highest number of tasks that ever ran at once.
    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    /// Tasks that have finished, successfully or not.
    pub fn completed(&self) -> u64 {
        self.completed.load(Ordering::SeqCst)
    }
}
