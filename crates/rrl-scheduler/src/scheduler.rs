//! The public engine handle (C9): construction, `start`, the four `submit*`
//! variants, the drain/shutdown coordinator, and `status`.

use crate::config::SchedulerConfig;
use crate::control_state::{ControlState, ControlStateError, ShutdownOptions, SharedControlState};
use crate::delay_queue::{self, DelayTierHandle};
use crate::dispatch;
use crate::entry::{DelayPair, Entry};
use crate::events::{SchedulerEvent, SchedulerEventKind};
use crate::hooks::{self, SchedulerHooks};
use crate::process::ProcessFn;
use crate::rejection::{RejectionError, RejectionReason, SubmitError, ValidationError};
use crate::status::{self, ConfigProjection, SchedulerStatus, StatusCache, TaskLiveness};
use rrl_core::{Clock, EventListener, EventListeners};
use rrl_executor::{Executor, WorkerPool};
use rrl_ratelimiter::{RateLimiter, TokenBucketLimiter, Unlimited};
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;

#[cfg(feature = "metrics")]
use metrics::counter;
#[cfg(feature = "tracing")]
use tracing::{debug, warn};

struct Inner<Req, Resp, Err, Ex: Executor> {
    config: Arc<SchedulerConfig>,
    clock: Clock,
    control_state: SharedControlState,
    in_flight: Arc<AtomicI64>,
    main_queue_depth: Arc<AtomicUsize>,
    main_tx: mpsc::UnboundedSender<Entry<Req, Resp, Err>>,
    main_rx: std::sync::Mutex<Option<mpsc::UnboundedReceiver<Entry<Req, Resp, Err>>>>,
    delay_tiers: Vec<DelayTierHandle<Req, Resp, Err>>,
    delay_rxs: std::sync::Mutex<Vec<Option<mpsc::UnboundedReceiver<Entry<Req, Resp, Err>>>>>,
    worker_pool: WorkerPool<Ex>,
    executor: Ex,
    rate_limiter: Arc<dyn RateLimiter>,
    process_fn: ProcessFn<Req, Resp, Err>,
    hooks: SchedulerHooks<Req, Resp, Err>,
    events: RwLock<EventListeners<SchedulerEvent>>,
    status_cache: StatusCache,
    main_loop_alive: Arc<AtomicBool>,
    delay_tier_workers_alive: Arc<AtomicBool>,
}

/// The `Arc`-backed, freely clonable engine handle (spec §12 "Arc-shared
/// scheduler handle"). `Ex` defaults to `tokio::runtime::Handle` so most
/// callers never need to name it.
pub struct Scheduler<Req, Resp, Err, Ex: Executor = tokio::runtime::Handle> {
    inner: Arc<Inner<Req, Resp, Err, Ex>>,
}

impl<Req, Resp, Err, Ex: Executor> Clone for Scheduler<Req, Resp, Err, Ex> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

fn default_rate_limiter(config: &SchedulerConfig) -> Arc<dyn RateLimiter> {
    if config.rate_limiter_bucket_size == 0 {
        Arc::new(Unlimited::new())
    } else {
        Arc::new(TokenBucketLimiter::new(
            config.rate_limiter_bucket_size,
            config.rate_limiter_refill_rate,
            config.rate_limiter_refill_interval,
        ))
    }
}

impl<Req, Resp, Err, Ex> Scheduler<Req, Resp, Err, Ex>
where
    Req: Send + Sync + 'static,
    Resp: Send + Sync + Clone + 'static,
    Err: Send + 'static,
    Ex: Executor,
{
    /// Builds a scheduler with default hooks and the rate limiter implied by
    /// `config.rate_limiter_bucket_size` (`0` means [`Unlimited`]).
    pub fn new(config: SchedulerConfig, process_fn: ProcessFn<Req, Resp, Err>, executor: Ex) -> Self {
        Self::build(config, process_fn, executor, SchedulerHooks::default(), None)
    }

    /// Builds a scheduler with custom [`SchedulerHooks`].
    pub fn with_hooks(
        config: SchedulerConfig,
        process_fn: ProcessFn<Req, Resp, Err>,
        executor: Ex,
        hooks: SchedulerHooks<Req, Resp, Err>,
    ) -> Self {
        Self::build(config, process_fn, executor, hooks, None)
    }

    /// Builds a scheduler with a caller-supplied [`RateLimiter`], overriding
    /// the one the configuration would otherwise imply.
    pub fn with_rate_limiter(
        config: SchedulerConfig,
        process_fn: ProcessFn<Req, Resp, Err>,
        executor: Ex,
        rate_limiter: Arc<dyn RateLimiter>,
    ) -> Self {
        Self::build(config, process_fn, executor, SchedulerHooks::default(), Some(rate_limiter))
    }

    /// Builds a scheduler with both custom hooks and a custom rate limiter.
    pub fn with_hooks_and_rate_limiter(
        config: SchedulerConfig,
        process_fn: ProcessFn<Req, Resp, Err>,
        executor: Ex,
        hooks: SchedulerHooks<Req, Resp, Err>,
        rate_limiter: Arc<dyn RateLimiter>,
    ) -> Self {
        Self::build(config, process_fn, executor, hooks, Some(rate_limiter))
    }

    fn build(
        config: SchedulerConfig,
        process_fn: ProcessFn<Req, Resp, Err>,
        executor: Ex,
        hooks: SchedulerHooks<Req, Resp, Err>,
        rate_limiter: Option<Arc<dyn RateLimiter>>,
    ) -> Self {
        let config = Arc::new(config);
        let rate_limiter = rate_limiter.unwrap_or_else(|| default_rate_limiter(&config));
        let clock = Clock::real();
        let control_state = Arc::new(RwLock::new(ControlState::not_started()));
        let (main_tx, main_rx) = mpsc::unbounded_channel();
        let (delay_tiers, delay_rxs) = delay_queue::build_tiers(&config.delay_queues);
        let worker_pool = WorkerPool::new(executor.clone(), config.worker_pool_min, config.worker_pool_max);

        Self {
            inner: Arc::new(Inner {
                config,
                clock,
                control_state,
                in_flight: Arc::new(AtomicI64::new(0)),
                main_queue_depth: Arc::new(AtomicUsize::new(0)),
                main_tx,
                main_rx: std::sync::Mutex::new(Some(main_rx)),
                delay_tiers,
                delay_rxs: std::sync::Mutex::new(delay_rxs.into_iter().map(Some).collect()),
                worker_pool,
                executor,
                rate_limiter,
                process_fn,
                hooks,
                events: RwLock::new(EventListeners::new()),
                status_cache: StatusCache::new(),
                main_loop_alive: Arc::new(AtomicBool::new(false)),
                delay_tier_workers_alive: Arc::new(AtomicBool::new(false)),
            }),
        }
    }

    /// Registers an event listener. Only listeners registered before
    /// [`Scheduler::start`] observe events from the main loop and delay-tier
    /// workers, which take a snapshot of the listener set at spawn time;
    /// listeners added afterwards still see `submit*`-path events (request
    /// added/rejected), which are emitted directly against the live set.
    pub fn add_event_listener<L>(&self, listener: L)
    where
        L: EventListener<SchedulerEvent> + 'static,
    {
        self.inner.events.write().unwrap().add(listener);
    }

    /// Starts the engine's background tasks. Legal only from `NOT_STARTED`.
    pub fn start(&self) -> Result<(), ControlStateError> {
        {
            let mut state = self.inner.control_state.write().unwrap();
            if !state.is_not_started() {
                return Err(ControlStateError::StartNotLegal);
            }
            *state = ControlState::running();
        }

        let events_snapshot = self.inner.events.read().unwrap().clone();
        events_snapshot.emit(&SchedulerEvent::new(
            &self.inner.config.service_name,
            SchedulerEventKind::ServiceControlStateChanged {
                description: "RUNNING".to_string(),
            },
        ));

        self.inner.delay_tier_workers_alive.store(true, Ordering::Release);
        let mut delay_rxs = self.inner.delay_rxs.lock().unwrap();
        for (tier, rx_slot) in self.inner.delay_tiers.iter().zip(delay_rxs.iter_mut()) {
            let rx = rx_slot
                .take()
                .expect("a delay tier worker is started at most once");
            spawn_supervised(
                &self.inner.executor,
                events_snapshot.clone(),
                self.inner.config.service_name.clone(),
                "delay_tier_worker",
                Arc::clone(&self.inner.delay_tier_workers_alive),
                delay_queue::run_delay_tier_worker(
                    rx,
                    tier.tx.clone(),
                    self.inner.main_tx.clone(),
                    tier.delay_ms,
                    self.inner.clock.clone(),
                    Arc::clone(&self.inner.control_state),
                    self.inner.config.max_sleep_time,
                    Arc::clone(&self.inner.main_queue_depth),
                ),
            );
        }
        drop(delay_rxs);

        let main_rx = self
            .inner
            .main_rx
            .lock()
            .unwrap()
            .take()
            .expect("the main loop is started at most once");
        self.inner.main_loop_alive.store(true, Ordering::Release);
        spawn_supervised(
            &self.inner.executor,
            events_snapshot,
            self.inner.config.service_name.clone(),
            "main_loop",
            Arc::clone(&self.inner.main_loop_alive),
            dispatch::run_main_loop(
                main_rx,
                self.inner.main_tx.clone(),
                self.inner.delay_tiers.clone(),
                self.inner.worker_pool.clone(),
                Arc::clone(&self.inner.rate_limiter),
                Arc::clone(&self.inner.process_fn),
                self.inner.clock.clone(),
                self.inner.hooks.clone(),
                self.inner.events.read().unwrap().clone(),
                Arc::clone(&self.inner.in_flight),
                Arc::clone(&self.inner.control_state),
                Arc::clone(&self.inner.main_queue_depth),
                Arc::clone(&self.inner.config),
            ),
        );

        Ok(())
    }

    fn emit(&self, kind: SchedulerEventKind) {
        self.inner
            .events
            .read()
            .unwrap()
            .emit(&SchedulerEvent::new(&self.inner.config.service_name, kind));
    }

    async fn enqueue(
        &self,
        input: Req,
        request_validity_duration: i64,
        earliest_processing_time: Option<DelayPair>,
    ) -> Result<crate::future::RequestFuture<Req, Resp, Err>, RejectionError> {
        {
            let state = self.inner.control_state.read().unwrap();
            if let Some(reason) = state.reject_requests_reason.clone() {
                drop(state);
                let rejection = RejectionError::new(RejectionReason::NotAccepting { reason });
                #[cfg(feature = "tracing")]
                warn!(
                    service = %self.inner.config.service_name,
                    reason = %rejection.reason,
                    "request rejected"
                );
                #[cfg(feature = "metrics")]
                counter!("rrl_requests_rejected_total", "reason" => "not_accepting").increment(1);
                self.emit(SchedulerEventKind::ErrorRequestRejected {
                    reason: rejection.reason.to_string(),
                });
                return Err(rejection);
            }
        }

        let in_flight = self.inner.in_flight.load(Ordering::Acquire).max(0) as usize;
        let max_pending = self.inner.config.max_pending_requests;
        if in_flight >= max_pending {
            let rejection = RejectionError::new(RejectionReason::AtCapacity { in_flight, max_pending });
            #[cfg(feature = "tracing")]
            warn!(
                service = %self.inner.config.service_name,
                reason = %rejection.reason,
                "request rejected"
            );
            #[cfg(feature = "metrics")]
            counter!("rrl_requests_rejected_total", "reason" => "at_capacity").increment(1);
            self.emit(SchedulerEventKind::ErrorRequestRejected {
                reason: rejection.reason.to_string(),
            });
            return Err(rejection);
        }

        self.inner.in_flight.fetch_add(1, Ordering::AcqRel);
        let (entry, future) = Entry::new(
            Arc::new(input),
            self.inner.clock.now(),
            request_validity_duration,
            earliest_processing_time,
        );

        #[cfg(feature = "tracing")]
        {
            let _enter = entry.span.enter();
            debug!(service = %self.inner.config.service_name, "request added");
        }
        #[cfg(feature = "metrics")]
        counter!("rrl_requests_accepted_total").increment(1);

        self.emit(SchedulerEventKind::RequestAdded);
        let hook_ok = hooks::call_guarded(std::panic::AssertUnwindSafe(|| {
            (self.inner.hooks.after_request_added)(&entry.input)
        }));
        if !hook_ok {
            self.emit(SchedulerEventKind::ErrorSpiMethodException {
                hook: "after_request_added",
            });
        }

        self.inner.main_queue_depth.fetch_add(1, Ordering::AcqRel);
        let _ = self.inner.main_tx.send(entry);
        Ok(future)
    }

    /// Submits `input`, timing it out if it has not reached a terminal
    /// state within `time_limit`.
    pub async fn submit(
        &self,
        input: Req,
        time_limit: Duration,
    ) -> Result<crate::future::RequestFuture<Req, Resp, Err>, SubmitError> {
        let time_limit_ms = time_limit.as_millis() as i64;
        if time_limit_ms <= 0 {
            return Err(ValidationError::NonPositiveTimeLimit.into());
        }
        Ok(self.enqueue(input, time_limit_ms, None).await?)
    }

    /// Submits `input`, not eligible for its first attempt until `delay`
    /// has elapsed, and timing out after `time_limit`.
    pub async fn submit_delayed(
        &self,
        input: Req,
        delay: Duration,
        time_limit: Duration,
    ) -> Result<crate::future::RequestFuture<Req, Resp, Err>, SubmitError> {
        let delay_ms = delay.as_millis() as i64;
        let time_limit_ms = time_limit.as_millis() as i64;
        if delay_ms <= 0 || delay_ms >= time_limit_ms {
            return Err(ValidationError::DelayNotBeforeTimeLimit { delay_ms, time_limit_ms }.into());
        }
        let now = self.inner.clock.now();
        let earliest_processing_time = Some(DelayPair { anchor: now, virtual_ms: delay_ms });
        Ok(self.enqueue(input, time_limit_ms, earliest_processing_time).await?)
    }

    /// Submits `input`, timing out at the absolute instant `until`.
    pub async fn submit_until(
        &self,
        input: Req,
        until: Instant,
    ) -> Result<crate::future::RequestFuture<Req, Resp, Err>, SubmitError> {
        let now = self.inner.clock.now();
        let time_limit_ms = self.inner.clock.gap_virtual(now, until);
        if time_limit_ms <= 0 {
            return Err(ValidationError::NonPositiveTimeLimit.into());
        }
        Ok(self.enqueue(input, time_limit_ms, None).await?)
    }

    /// Submits `input`, not eligible for its first attempt until the
    /// absolute instant `delay_until`, timing out at `until`.
    pub async fn submit_delayed_until(
        &self,
        input: Req,
        delay_until: Instant,
        until: Instant,
    ) -> Result<crate::future::RequestFuture<Req, Resp, Err>, SubmitError> {
        let now = self.inner.clock.now();
        if delay_until >= until || delay_until <= now || until <= now {
            return Err(ValidationError::DelayUntilNotBeforeUntil.into());
        }
        let time_limit_ms = self.inner.clock.gap_virtual(now, until);
        let delay_ms = self.inner.clock.gap_virtual(now, delay_until);
        let earliest_processing_time = Some(DelayPair { anchor: now, virtual_ms: delay_ms });
        Ok(self.enqueue(input, time_limit_ms, earliest_processing_time).await?)
    }

    /// Whether the engine currently accepts new submissions.
    pub fn is_accepting_requests(&self) -> bool {
        self.inner.control_state.read().unwrap().is_accepting_requests()
    }

    /// The current control state, for inspection.
    pub fn control_state(&self) -> ControlState {
        self.inner.control_state.read().unwrap().clone()
    }

    /// Installs a custom control state (power-user escape hatch — spec §6
    /// `setControlState`).
    pub fn set_control_state(&self, state: ControlState) {
        let description = state.description.clone();
        {
            let mut guard = self.inner.control_state.write().unwrap();
            *guard = state;
        }
        self.emit(SchedulerEventKind::ServiceControlStateChanged { description });
    }

    /// A (possibly cached, within `max_age`) snapshot of the engine's state.
    pub async fn status(&self, max_age: Duration) -> SchedulerStatus {
        let now = self.inner.clock.now();
        let control_state = self.inner.control_state.read().unwrap().clone();
        let in_flight_count = self.inner.in_flight.load(Ordering::Acquire).max(0) as usize;
        let main_queue_size = self.inner.main_queue_depth.load(Ordering::Acquire);
        let active_worker_count = self.inner.worker_pool.active_count();
        let available_tickets_estimation = self.inner.rate_limiter.available_tickets_estimation();
        let liveness = TaskLiveness {
            main_loop_alive: self.inner.main_loop_alive.load(Ordering::Acquire),
            delay_tier_workers_alive: self.inner.delay_tier_workers_alive.load(Ordering::Acquire),
            worker_pool_alive: self.inner.worker_pool.is_alive(),
        };
        let config = Arc::clone(&self.inner.config);

        self.inner.status_cache.get_or_build(now, max_age, || SchedulerStatus {
            created_at: now,
            accepting_requests: control_state.is_accepting_requests(),
            control_state_description: status::control_state_description(&control_state),
            liveness,
            active_worker_count,
            in_flight_count,
            main_queue_size,
            available_tickets_estimation,
            config: ConfigProjection {
                service_name: config.service_name.clone(),
                max_attempts: config.max_attempts,
                max_pending_requests: config.max_pending_requests,
                worker_pool_min: config.worker_pool_min,
                worker_pool_max: config.worker_pool_max,
                rate_limiter_bucket_size: config.rate_limiter_bucket_size,
            },
        })
    }

    /// Drains until `deadline`: stops accepting new requests, shortens
    /// delays/ticket waits once the internal (buffer-adjusted) spooldown
    /// target is close, and waits for in-flight work to reach zero before
    /// moving to `SHUTDOWN`. If the target passes first, emits
    /// `ErrorShutdownSpooldownNotAchieved` and proceeds to `SHUTDOWN` anyway
    /// — draining is best-effort, never a hang risk (spec §4.6).
    pub async fn shutdown_until(
        &self,
        deadline: Instant,
        options: ShutdownOptions,
    ) -> Result<(), ControlStateError> {
        {
            let state = self.inner.control_state.read().unwrap();
            if state.is_shutdown() {
                return Err(ControlStateError::ShutdownNotLegalAfterShutdown);
            }
        }

        let now = self.inner.clock.now();
        let total = deadline.saturating_duration_since(now);
        let buffer_perc = self.inner.config.shutdown_buffer_time_perc as u32;
        let buffered = total.saturating_sub(total * buffer_perc / 100);
        let spooldown_target = now + buffered;

        self.set_control_state(ControlState::shutdown_in_progress(
            spooldown_target,
            options.ignore_delays,
            options.wait_for_tickets,
        ));

        let poll_interval = Duration::from_millis(20).min(buffered.max(Duration::from_millis(1)));
        loop {
            if self.inner.in_flight.load(Ordering::Acquire) <= 0 {
                break;
            }
            if self.inner.clock.now() >= spooldown_target {
                let remaining = self.inner.in_flight.load(Ordering::Acquire).max(0) as usize;
                #[cfg(feature = "tracing")]
                warn!(
                    service = %self.inner.config.service_name,
                    remaining,
                    "shutdown spooldown not achieved"
                );
                self.emit(SchedulerEventKind::ErrorShutdownSpooldownNotAchieved { remaining });
                break;
            }
            tokio::time::sleep(poll_interval).await;
        }

        self.set_control_state(ControlState::shutdown());
        Ok(())
    }

    /// `shutdown_until` with a deadline `duration` from now.
    pub async fn shutdown_for(
        &self,
        duration: Duration,
        options: ShutdownOptions,
    ) -> Result<(), ControlStateError> {
        let deadline = self.inner.clock.now() + duration;
        self.shutdown_until(deadline, options).await
    }

    /// Convenience wrapper (§12): drains with a generous 30s default
    /// deadline and default (no-bypass) options.
    pub async fn shutdown_gracefully(&self) -> Result<(), ControlStateError> {
        self.shutdown_for(Duration::from_secs(30), ShutdownOptions::default()).await
    }

    /// Convenience wrapper (§12): moves straight to `SHUTDOWN` without
    /// draining. Already-dispatched attempts still run to completion (the
    /// worker pool is not force-aborted mid-attempt); only acceptance and
    /// further delay/retry scheduling stop immediately.
    pub fn shutdown_now(&self) -> Result<(), ControlStateError> {
        {
            let state = self.inner.control_state.read().unwrap();
            if state.is_shutdown() {
                return Err(ControlStateError::ShutdownNotLegalAfterShutdown);
            }
        }
        self.set_control_state(ControlState::shutdown());
        self.inner.worker_pool.shutdown_now();
        Ok(())
    }
}

/// Spawns `fut` and a small watcher task that marks `alive` false and emits
/// `ErrorUnexpectedRuntimeException` if it panics.
///
/// The original engine restarts a crashed main-loop/delay-tier task up to a
/// configured exception limit. Here the loop's ownership of its channel
/// receiver cannot be reconstructed once a panic has unwound it, so this is
/// deliberately an observe-and-report supervisor rather than a
/// restart-with-budget one; every fallible step inside the loop bodies is
/// already individually guarded (`terminal.rs`, `hooks.rs`), so reaching
/// this supervisor at all is itself the unexpected case.
fn spawn_supervised<Ex, F>(
    executor: &Ex,
    events: EventListeners<SchedulerEvent>,
    pattern_name: String,
    task_name: &'static str,
    alive: Arc<AtomicBool>,
    fut: F,
) where
    Ex: Executor,
    F: std::future::Future<Output = ()> + Send + 'static,
{
    let handle = executor.spawn(fut);
    executor.spawn(async move {
        if let Err(err) = handle.await {
            alive.store(false, Ordering::Release);
            if err.is_panic() {
                events.emit(&SchedulerEvent::new(
                    &pattern_name,
                    SchedulerEventKind::ErrorUnexpectedRuntimeException { task: task_name },
                ));
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::future::BoxFuture;
    use std::sync::atomic::AtomicUsize as StdAtomicUsize;

    fn config() -> SchedulerConfig {
        crate::config::SchedulerConfigBuilder::new()
            .max_pending_requests(4)
            .build()
            .unwrap()
    }

    fn always_succeeds() -> ProcessFn<u32, u32, &'static str> {
        Arc::new(|input: Arc<u32>, _attempt: usize| -> BoxFuture<'static, Result<u32, &'static str>> {
            Box::pin(async move { Ok(*input) })
        })
    }

    #[tokio::test]
    async fn start_is_illegal_twice() {
        let scheduler: Scheduler<u32, u32, &'static str> =
            Scheduler::new(config(), always_succeeds(), tokio::runtime::Handle::current());
        scheduler.start().unwrap();
        assert_eq!(scheduler.start().unwrap_err(), ControlStateError::StartNotLegal);
    }

    #[tokio::test]
    async fn submit_then_get_round_trips_success() {
        let scheduler: Scheduler<u32, u32, &'static str> =
            Scheduler::new(config(), always_succeeds(), tokio::runtime::Handle::current());
        scheduler.start().unwrap();

        let future = scheduler.submit(7, Duration::from_secs(1)).await.unwrap();
        let result = future.get(Some(Duration::from_secs(1))).await;
        assert_eq!(result.unwrap(), 7);
    }

    #[tokio::test]
    async fn submit_before_start_is_rejected() {
        let scheduler: Scheduler<u32, u32, &'static str> =
            Scheduler::new(config(), always_succeeds(), tokio::runtime::Handle::current());
        let result = scheduler.submit(7, Duration::from_secs(1)).await;
        assert!(matches!(result, Err(SubmitError::Rejected(_))));
    }

    #[tokio::test]
    async fn submit_rejects_at_capacity() {
        let cfg = crate::config::SchedulerConfigBuilder::new()
            .max_pending_requests(1)
            .worker_pool(0, 1)
            .build()
            .unwrap();
        let counter = Arc::new(StdAtomicUsize::new(0));
        let counter2 = Arc::clone(&counter);
        let blocking: ProcessFn<u32, u32, &'static str> = Arc::new(move |input, _attempt| {
            let counter = Arc::clone(&counter2);
            Box::pin(async move {
                counter.fetch_add(1, Ordering::SeqCst);
                let _ = input;
                std::future::pending::<Result<u32, &'static str>>().await
            })
        });
        let scheduler: Scheduler<u32, u32, &'static str> =
            Scheduler::new(cfg, blocking, tokio::runtime::Handle::current());
        scheduler.start().unwrap();

        let _first = scheduler.submit(1, Duration::from_secs(5)).await.unwrap();
        tokio::task::yield_now().await;
        let second = scheduler.submit(2, Duration::from_secs(5)).await;
        assert!(matches!(second, Err(SubmitError::Rejected(_))));
    }

    #[tokio::test]
    async fn shutdown_now_stops_acceptance() {
        let scheduler: Scheduler<u32, u32, &'static str> =
            Scheduler::new(config(), always_succeeds(), tokio::runtime::Handle::current());
        scheduler.start().unwrap();
        scheduler.shutdown_now().unwrap();
        assert!(!scheduler.is_accepting_requests());
        let result = scheduler.submit(1, Duration::from_secs(1)).await;
        assert!(matches!(result, Err(SubmitError::Rejected(_))));
    }

    #[tokio::test]
    async fn shutdown_now_twice_is_illegal() {
        let scheduler: Scheduler<u32, u32, &'static str> =
            Scheduler::new(config(), always_succeeds(), tokio::runtime::Handle::current());
        scheduler.start().unwrap();
        scheduler.shutdown_now().unwrap();
        assert_eq!(
            scheduler.shutdown_now().unwrap_err(),
            ControlStateError::ShutdownNotLegalAfterShutdown
        );
    }

    #[tokio::test]
    async fn submit_rejects_non_positive_time_limit() {
        let scheduler: Scheduler<u32, u32, &'static str> =
            Scheduler::new(config(), always_succeeds(), tokio::runtime::Handle::current());
        scheduler.start().unwrap();
        let result = scheduler.submit(1, Duration::ZERO).await;
        assert!(matches!(result, Err(SubmitError::Validation(_))));
    }
}
