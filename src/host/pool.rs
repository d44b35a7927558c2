//! Worker Pool
//!
//! Bounded-parallelism executor shared by every stage. Tasks run on the current Tokio
//! runtime and wait for a semaphore permit before doing any work. The pool counts
//! in-flight tasks so that `shutdown` can stop accepting work, wait a grace period
//! for stragglers and then abort whatever is left.

use crate::host::error::{HostError, HostResult};
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::runtime::Handle;
use tokio::sync::{Notify, Semaphore};
use tokio::task::{AbortHandle, JoinHandle};

/// Outcome of [`WorkerPool::shutdown`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShutdownReport {
    /// Every in-flight task finished inside the grace period
    pub drained: bool,
    /// Tasks force-terminated after the grace period
    pub aborted: usize,
    pub elapsed: Duration,
}

struct PoolInner {
    semaphore: Arc<Semaphore>,
    max_parallelism: usize,
    accepting: AtomicBool,
    in_flight: AtomicUsize,
    idle: Notify,
    aborts: Mutex<Vec<AbortHandle>>,
}

// Travels inside the spawned future so the count drops even if the task is
// aborted before it is first polled.
struct InFlight(Arc<PoolInner>);

impl Drop for InFlight {
    fn drop(&mut self) {
        if self.0.in_flight.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.0.idle.notify_waiters();
        }
    }
}

/// Shared, cloneable handle to the pool
#[derive(Clone)]
pub struct WorkerPool {
    inner: Arc<PoolInner>,
}

impl WorkerPool {
    pub fn new(max_parallelism: usize) -> Self {
        let max_parallelism = max_parallelism.max(1);
        Self {
            inner: Arc::new(PoolInner {
                semaphore: Arc::new(Semaphore::new(max_parallelism)),
                max_parallelism,
                accepting: AtomicBool::new(true),
                in_flight: AtomicUsize::new(0),
                idle: Notify::new(),
                aborts: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Parallelism available to this process, at least 1
    pub fn default_parallelism() -> usize {
        std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1)
    }

    pub fn max_parallelism(&self) -> usize {
        self.inner.max_parallelism
    }

    pub fn in_flight(&self) -> usize {
        self.inner.in_flight.load(Ordering::Acquire)
    }

    pub fn is_accepting(&self) -> bool {
        self.inner.accepting.load(Ordering::Acquire)
    }

    /// Schedule `task`. Fails if the pool is closed or no runtime is running.
    pub fn spawn<F, T>(&self, task: F) -> HostResult<JoinHandle<T>>
    where
        F: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        if !self.is_accepting() {
            return Err(HostError::PoolClosed);
        }
        let runtime = Handle::try_current().map_err(|_| HostError::NoRuntime)?;

        self.inner.in_flight.fetch_add(1, Ordering::AcqRel);
        let guard = InFlight(self.inner.clone());
        // shutdown may have started between the check and the increment
        if !self.is_accepting() {
            drop(guard);
            return Err(HostError::PoolClosed);
        }

        let semaphore = self.inner.semaphore.clone();
        let handle = runtime.spawn(async move {
            let _guard = guard;
            // The semaphore is never closed, so acquire cannot fail
            let _permit = semaphore.acquire().await.ok();
            task.await
        });

        let mut aborts = self.inner.aborts.lock().unwrap_or_else(|p| p.into_inner());
        aborts.retain(|h| !h.is_finished());
        aborts.push(handle.abort_handle());
        Ok(handle)
    }

    /// Wait until no task is in flight
    pub async fn wait_idle(&self) {
        loop {
            // Registered on creation, so a notify between here and the check is kept
            let notified = self.inner.idle.notified();
            if self.in_flight() == 0 {
                return;
            }
            notified.await;
        }
    }

    /// Stop accepting tasks, wait up to `grace` for in-flight ones, abort the rest.
    /// Calling it again returns immediately once the pool is drained.
    pub async fn shutdown(&self, grace: Duration) -> ShutdownReport {
        self.inner.accepting.store(false, Ordering::Release);
        let started = Instant::now();

        let pending = self.in_flight();
        if pending > 0 {
            log::debug!(
                "Worker pool: waiting up to {:?} for {} task(s)",
                grace,
                pending
            );
        }

        match tokio::time::timeout(grace, self.wait_idle()).await {
            Ok(()) => ShutdownReport {
                drained: true,
                aborted: 0,
                elapsed: started.elapsed(),
            },
            Err(_) => {
                let handles = std::mem::take(
                    &mut *self.inner.aborts.lock().unwrap_or_else(|p| p.into_inner()),
                );
                let mut aborted = 0;
                for handle in handles.iter().filter(|h| !h.is_finished()) {
                    handle.abort();
                    aborted += 1;
                }
                log::warn!(
                    "Worker pool: grace period of {:?} elapsed, aborted {} task(s)",
                    grace,
                    aborted
                );
                ShutdownReport {
                    drained: false,
                    aborted,
                    elapsed: started.elapsed(),
                }
            }
        }
    }
}

impl std::fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerPool")
            .field("max_parallelism", &self.inner.max_parallelism)
            .field("in_flight", &self.in_flight())
            .field("accepting", &self.is_accepting())
            .finish()
    }
}
