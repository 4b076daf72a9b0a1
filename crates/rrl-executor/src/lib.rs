//! Worker-pool capability the scheduler dispatches attempts onto.
//!
//! The scheduler's dispatch loop (`rrl-scheduler`) never depends on a
//! concrete pool implementation — only on the `{submit, active_count,
//! is_alive, shutdown_now}` capability defined here, per the "Worker pool
//! abstraction" design note. [`Executor`] is the minimal "spawn a future"
//! seam; [`WorkerPool`] layers `{min, max}` sizing, liveness, and an active
//! count on top of any `Executor`.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::task::JoinHandle;

/// Something that can spawn a future and hand back a join handle.
///
/// Implemented for `tokio::runtime::Handle` so a `WorkerPool` can run on any
/// runtime the caller chooses, including a dedicated one.
pub trait Executor: Clone + Send + Sync + 'static {
    /// Spawns `future`, returning a handle that can be awaited or aborted.
    fn spawn<F>(&self, future: F) -> JoinHandle<F::Output>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static;
}

impl Executor for tokio::runtime::Handle {
    fn spawn<F>(&self, future: F) -> JoinHandle<F::Output>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        tokio::runtime::Handle::spawn(self, future)
    }
}

/// A bounded-concurrency worker pool built on top of an [`Executor`].
///
/// `min` is advisory (idle workers are just idle tokio tasks; there is no
/// per-worker OS thread to pre-warm), `max` is enforced by a semaphore so
/// `active_count()` never exceeds it.
#[derive(Clone)]
pub struct WorkerPool<E: Executor> {
    executor: E,
    min: usize,
    max: usize,
    active: Arc<AtomicUsize>,
    semaphore: Arc<Semaphore>,
    alive: Arc<AtomicBool>,
}

/// Returned when `submit` is called after [`WorkerPool::shutdown_now`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolClosed;

impl std::fmt::Display for PoolClosed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "worker pool has been shut down")
    }
}

impl std::error::Error for PoolClosed {}

impl<E: Executor> WorkerPool<E> {
    /// Creates a pool with the given `{min, max}` sizing.
    ///
    /// # Panics
    ///
    /// Panics if `max < min` or `max == 0`, matching the configuration
    /// invariant `max >= min >= 0, max >= 1`.
    pub fn new(executor: E, min: usize, max: usize) -> Self {
        assert!(max >= min, "worker pool max must be >= min");
        assert!(max >= 1, "worker pool max must be >= 1");
        Self {
            executor,
            min,
            max,
            active: Arc::new(AtomicUsize::new(0)),
            semaphore: Arc::new(Semaphore::new(max)),
            alive: Arc::new(AtomicBool::new(true)),
        }
    }

    /// The configured minimum pool size.
    pub fn min(&self) -> usize {
        self.min
    }

    /// The configured maximum pool size.
    pub fn max(&self) -> usize {
        self.max
    }

    /// Number of attempts currently executing.
    pub fn active_count(&self) -> usize {
        self.active.load(Ordering::Acquire)
    }

    /// Whether the pool still accepts new work.
    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::Acquire)
    }

    /// Submits `task`, blocking (async) until a slot is free.
    ///
    /// Returns the `JoinHandle` so the caller (the main dispatch loop) can
    /// abort the task if it doesn't reach a rendezvous handoff within its
    /// allotted deadline. Returns `Err(PoolClosed)` if the pool has been
    /// shut down or is in the process of shutting down.
    pub async fn submit<F>(&self, task: F) -> Result<JoinHandle<()>, PoolClosed>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        if !self.is_alive() {
            return Err(PoolClosed);
        }
        let Ok(permit) = self.semaphore.clone().acquire_owned().await else {
            return Err(PoolClosed);
        };
        self.active.fetch_add(1, Ordering::AcqRel);
        let active = Arc::clone(&self.active);
        let handle = self.executor.spawn(async move {
            task.await;
            drop(permit);
            active.fetch_sub(1, Ordering::AcqRel);
        });
        Ok(handle)
    }

    /// Stops accepting new work and closes the semaphore so any pending
    /// `submit` calls fail fast. Does not abort tasks already running;
    /// the scheduler's drain coordinator owns that decision (see
    /// `SPEC_FULL.md` §13 on interrupt propagation during drain).
    pub fn shutdown_now(&self) {
        self.alive.store(false, Ordering::Release);
        self.semaphore.close();
    }

    /// Reserves one slot, bounded by `wait`, without yet committing to any
    /// task. Splitting reservation from dispatch lets a caller hold a
    /// worker slot while it goes on to acquire a second resource (e.g. a
    /// rate-limiter ticket) before deciding what to run.
    pub async fn reserve(&self, wait: Duration) -> Result<WorkerReservation<E>, ReserveError> {
        if !self.is_alive() {
            return Err(ReserveError::Closed);
        }
        match tokio::time::timeout(wait, self.semaphore.clone().acquire_owned()).await {
            Ok(Ok(permit)) => Ok(WorkerReservation {
                permit,
                active: Arc::clone(&self.active),
                executor: self.executor.clone(),
            }),
            Ok(Err(_)) => Err(ReserveError::Closed),
            Err(_) => Err(ReserveError::TimedOut),
        }
    }
}

/// Failure to [`WorkerPool::reserve`] a slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReserveError {
    /// The pool has been shut down.
    Closed,
    /// No slot freed up within the requested wait.
    TimedOut,
}

impl std::fmt::Display for ReserveError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReserveError::Closed => write!(f, "worker pool has been shut down"),
            ReserveError::TimedOut => write!(f, "timed out waiting for a worker slot"),
        }
    }
}

impl std::error::Error for ReserveError {}

/// A reserved slot in a [`WorkerPool`], not yet bound to any task.
pub struct WorkerReservation<E: Executor> {
    permit: OwnedSemaphorePermit,
    active: Arc<AtomicUsize>,
    executor: E,
}

impl<E: Executor> WorkerReservation<E> {
    /// Spawns `task` into the reserved slot. The slot is released and the
    /// active count decremented when `task` completes.
    pub fn dispatch<F>(self, task: F) -> JoinHandle<F::Output>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        let WorkerReservation {
            permit,
            active,
            executor,
        } = self;
        active.fetch_add(1, Ordering::AcqRel);
        let active_for_task = Arc::clone(&active);
        executor.spawn(async move {
            let _permit = permit;
            let output = task.await;
            active_for_task.fetch_sub(1, Ordering::AcqRel);
            output
        })
    }
}
