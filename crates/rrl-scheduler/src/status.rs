//! Status snapshot (C10): the observability surface returned by
//! `Scheduler::status`.

use crate::control_state::ControlState;
use std::time::Duration;
use tokio::time::Instant;

/// Liveness of the engine's background tasks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskLiveness {
    pub main_loop_alive: bool,
    pub delay_tier_workers_alive: bool,
    pub worker_pool_alive: bool,
}

impl TaskLiveness {
    pub fn everything_alive(&self) -> bool {
        self.main_loop_alive && self.delay_tier_workers_alive && self.worker_pool_alive
    }
}

/// A read-only projection of the configuration fields most relevant to
/// operators, per spec §4.7.
#[derive(Debug, Clone)]
pub struct ConfigProjection {
    pub service_name: String,
    pub max_attempts: usize,
    pub max_pending_requests: usize,
    pub worker_pool_min: usize,
    pub worker_pool_max: usize,
    pub rate_limiter_bucket_size: u64,
}

/// A snapshot of the engine's state at one point in time.
#[derive(Debug, Clone)]
pub struct SchedulerStatus {
    pub created_at: Instant,
    pub accepting_requests: bool,
    pub control_state_description: String,
    pub liveness: TaskLiveness,
    pub active_worker_count: usize,
    pub in_flight_count: usize,
    pub main_queue_size: usize,
    pub available_tickets_estimation: u64,
    pub config: ConfigProjection,
}

impl SchedulerStatus {
    pub fn everything_alive(&self) -> bool {
        self.liveness.everything_alive()
    }
}

/// Caches a [`SchedulerStatus`] and serves it back while younger than a
/// requested max age, per spec §4.7 `getStatus(maxAgeVirtualMs)`. The
/// critical section is a plain mutex (spec: "a monitor to avoid rebuild
/// duplication").
pub(crate) struct StatusCache {
    cached: std::sync::Mutex<Option<SchedulerStatus>>,
}

impl StatusCache {
    pub(crate) fn new() -> Self {
        Self {
            cached: std::sync::Mutex::new(None),
        }
    }

    /// Returns the cached snapshot if present and younger than
    /// `max_age`, else calls `build` to produce (and cache) a fresh one.
    pub(crate) fn get_or_build(
        &self,
        now: Instant,
        max_age: Duration,
        build: impl FnOnce() -> SchedulerStatus,
    ) -> SchedulerStatus {
        let mut guard = self.cached.lock().unwrap();
        if let Some(status) = guard.as_ref() {
            if now.saturating_duration_since(status.created_at) <= max_age {
                return status.clone();
            }
        }
        let fresh = build();
        *guard = Some(fresh.clone());
        fresh
    }
}

pub(crate) fn control_state_description(state: &ControlState) -> String {
    state.description.clone()
}
