//! Configuration value (C1): an immutable policy bundle read at startup.

use std::time::Duration;
use thiserror::Error;

/// Advisory scheduling hint for a task's priority. The engine runs every
/// component as a tokio task, so this has no OS-level effect; it is carried
/// through so it can be surfaced in logs/metrics the way the original
/// engine's thread-priority knobs were, without pretending tokio honours it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ThreadPriority {
    Low,
    #[default]
    Normal,
    High,
}

/// Thresholds after which a fault-tolerant engine task gives up rather than
/// restarting, per spec §4.2 "Fault tolerance".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExceptionLimits {
    pub unexpected: usize,
    pub interrupted: usize,
    pub runtime: usize,
}

impl Default for ExceptionLimits {
    fn default() -> Self {
        Self {
            unexpected: 16,
            interrupted: 16,
            runtime: 16,
        }
    }
}

/// Immutable policy bundle for one [`crate::Scheduler`] instance.
///
/// Constructed only via [`SchedulerConfigBuilder::build`], which performs
/// the field validation described in the field docs below.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    pub service_name: String,
    pub use_daemon_threads: bool,
    pub max_attempts: usize,
    pub delays_after_failure: Vec<Duration>,
    pub max_pending_requests: usize,
    pub request_early_processing_grace_period: Duration,
    pub delay_queues: Vec<Duration>,
    pub delay_queue_too_long_grace_period: Duration,
    pub rate_limiter_bucket_size: u64,
    pub rate_limiter_refill_rate: u64,
    pub rate_limiter_refill_interval: Duration,
    pub worker_pool_min: usize,
    pub worker_pool_max: usize,
    pub request_processing_thread_priority: ThreadPriority,
    pub main_queue_processing_thread_priority: ThreadPriority,
    pub delay_queue_processing_thread_priority: ThreadPriority,
    pub max_sleep_time: Duration,
    pub shutdown_buffer_time_perc: u8,
    pub main_queue_max_request_handover_wait_time: Duration,
    pub main_queue_exception_limits: ExceptionLimits,
    pub delay_queue_exception_limits: ExceptionLimits,
}

/// Error returned by [`SchedulerConfigBuilder::build`] when a field
/// violates its documented invariant.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("max_attempts must be >= 1")]
    MaxAttemptsZero,
    #[error("delays_after_failure must not be empty")]
    DelaysAfterFailureEmpty,
    #[error("max_pending_requests must be >= 1")]
    MaxPendingRequestsZero,
    #[error("delay_queues must not be empty")]
    DelayQueuesEmpty,
    #[error("delay_queues must be strictly ascending and positive")]
    DelayQueuesNotAscending,
    #[error("worker_pool max ({max}) must be >= min ({min})")]
    WorkerPoolMaxBelowMin { min: usize, max: usize },
    #[error("worker_pool max must be >= 1")]
    WorkerPoolMaxZero,
    #[error("shutdown_buffer_time_perc must be in 0..=100, got {0}")]
    ShutdownBufferOutOfRange(u8),
}

/// Builder for [`SchedulerConfig`], following the validated-`build()` idiom
/// used throughout this crate family's `*Config`/`*ConfigBuilder` pairs.
pub struct SchedulerConfigBuilder {
    service_name: String,
    use_daemon_threads: bool,
    max_attempts: usize,
    delays_after_failure: Vec<Duration>,
    max_pending_requests: usize,
    request_early_processing_grace_period: Duration,
    delay_queues: Vec<Duration>,
    delay_queue_too_long_grace_period: Duration,
    rate_limiter_bucket_size: u64,
    rate_limiter_refill_rate: u64,
    rate_limiter_refill_interval: Duration,
    worker_pool_min: usize,
    worker_pool_max: usize,
    request_processing_thread_priority: ThreadPriority,
    main_queue_processing_thread_priority: ThreadPriority,
    delay_queue_processing_thread_priority: ThreadPriority,
    max_sleep_time: Duration,
    shutdown_buffer_time_perc: u8,
    main_queue_max_request_handover_wait_time: Duration,
    main_queue_exception_limits: ExceptionLimits,
    delay_queue_exception_limits: ExceptionLimits,
}

impl Default for SchedulerConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl SchedulerConfigBuilder {
    /// Creates a builder with defaults matching the engine's most common
    /// use: three attempts, one delay tier, no rate limiting, a 2-worker
    /// pool, and a 1s cap on any single blocking wait.
    pub fn new() -> Self {
        Self {
            service_name: "rrl-scheduler".to_string(),
            use_daemon_threads: true,
            max_attempts: 3,
            delays_after_failure: vec![Duration::from_millis(200)],
            max_pending_requests: 1024,
            request_early_processing_grace_period: Duration::from_millis(20),
            delay_queues: vec![Duration::from_millis(100)],
            delay_queue_too_long_grace_period: Duration::from_secs(1),
            rate_limiter_bucket_size: 0,
            rate_limiter_refill_rate: 0,
            rate_limiter_refill_interval: Duration::from_secs(1),
            worker_pool_min: 0,
            worker_pool_max: 4,
            request_processing_thread_priority: ThreadPriority::default(),
            main_queue_processing_thread_priority: ThreadPriority::default(),
            delay_queue_processing_thread_priority: ThreadPriority::default(),
            max_sleep_time: Duration::from_secs(1),
            shutdown_buffer_time_perc: 10,
            main_queue_max_request_handover_wait_time: Duration::from_millis(500),
            main_queue_exception_limits: ExceptionLimits::default(),
            delay_queue_exception_limits: ExceptionLimits::default(),
        }
    }

    pub fn service_name(mut self, name: impl Into<String>) -> Self {
        self.service_name = name.into();
        self
    }

    pub fn use_daemon_threads(mut self, daemon: bool) -> Self {
        self.use_daemon_threads = daemon;
        self
    }

    pub fn max_attempts(mut self, n: usize) -> Self {
        self.max_attempts = n;
        self
    }

    pub fn delays_after_failure(mut self, delays: Vec<Duration>) -> Self {
        self.delays_after_failure = delays;
        self
    }

    pub fn max_pending_requests(mut self, n: usize) -> Self {
        self.max_pending_requests = n;
        self
    }

    pub fn request_early_processing_grace_period(mut self, grace: Duration) -> Self {
        self.request_early_processing_grace_period = grace;
        self
    }

    pub fn delay_queues(mut self, tiers: Vec<Duration>) -> Self {
        self.delay_queues = tiers;
        self
    }

    pub fn delay_queue_too_long_grace_period(mut self, grace: Duration) -> Self {
        self.delay_queue_too_long_grace_period = grace;
        self
    }

    pub fn rate_limiter(
        mut self,
        bucket_size: u64,
        refill_rate: u64,
        refill_interval: Duration,
    ) -> Self {
        self.rate_limiter_bucket_size = bucket_size;
        self.rate_limiter_refill_rate = refill_rate;
        self.rate_limiter_refill_interval = refill_interval;
        self
    }

    pub fn worker_pool(mut self, min: usize, max: usize) -> Self {
        self.worker_pool_min = min;
        self.worker_pool_max = max;
        self
    }

    pub fn request_processing_thread_priority(mut self, p: ThreadPriority) -> Self {
        self.request_processing_thread_priority = p;
        self
    }

    pub fn main_queue_processing_thread_priority(mut self, p: ThreadPriority) -> Self {
        self.main_queue_processing_thread_priority = p;
        self
    }

    pub fn delay_queue_processing_thread_priority(mut self, p: ThreadPriority) -> Self {
        self.delay_queue_processing_thread_priority = p;
        self
    }

    pub fn max_sleep_time(mut self, cap: Duration) -> Self {
        self.max_sleep_time = cap;
        self
    }

    pub fn shutdown_buffer_time_perc(mut self, perc: u8) -> Self {
        self.shutdown_buffer_time_perc = perc;
        self
    }

    pub fn main_queue_max_request_handover_wait_time(mut self, wait: Duration) -> Self {
        self.main_queue_max_request_handover_wait_time = wait;
        self
    }

    pub fn main_queue_exception_limits(mut self, limits: ExceptionLimits) -> Self {
        self.main_queue_exception_limits = limits;
        self
    }

    pub fn delay_queue_exception_limits(mut self, limits: ExceptionLimits) -> Self {
        self.delay_queue_exception_limits = limits;
        self
    }

    /// Validates and finalizes the configuration.
    pub fn build(self) -> Result<SchedulerConfig, ConfigError> {
        if self.max_attempts == 0 {
            return Err(ConfigError::MaxAttemptsZero);
        }
        if self.delays_after_failure.is_empty() {
            return Err(ConfigError::DelaysAfterFailureEmpty);
        }
        if self.max_pending_requests == 0 {
            return Err(ConfigError::MaxPendingRequestsZero);
        }
        if self.delay_queues.is_empty() {
            return Err(ConfigError::DelayQueuesEmpty);
        }
        if !self
            .delay_queues
            .windows(2)
            .all(|w| w[0] > Duration::ZERO && w[0] < w[1])
            || self.delay_queues[0] <= Duration::ZERO
        {
            return Err(ConfigError::DelayQueuesNotAscending);
        }
        if self.worker_pool_max < self.worker_pool_min {
            return Err(ConfigError::WorkerPoolMaxBelowMin {
                min: self.worker_pool_min,
                max: self.worker_pool_max,
            });
        }
        if self.worker_pool_max == 0 {
            return Err(ConfigError::WorkerPoolMaxZero);
        }
        if self.shutdown_buffer_time_perc > 100 {
            return Err(ConfigError::ShutdownBufferOutOfRange(
                self.shutdown_buffer_time_perc,
            ));
        }

        Ok(SchedulerConfig {
            service_name: self.service_name,
            use_daemon_threads: self.use_daemon_threads,
            max_attempts: self.max_attempts,
            delays_after_failure: self.delays_after_failure,
            max_pending_requests: self.max_pending_requests,
            request_early_processing_grace_period: self.request_early_processing_grace_period,
            delay_queues: self.delay_queues,
            delay_queue_too_long_grace_period: self.delay_queue_too_long_grace_period,
            rate_limiter_bucket_size: self.rate_limiter_bucket_size,
            rate_limiter_refill_rate: self.rate_limiter_refill_rate,
            rate_limiter_refill_interval: self.rate_limiter_refill_interval,
            worker_pool_min: self.worker_pool_min,
            worker_pool_max: self.worker_pool_max,
            request_processing_thread_priority: self.request_processing_thread_priority,
            main_queue_processing_thread_priority: self.main_queue_processing_thread_priority,
            delay_queue_processing_thread_priority: self.delay_queue_processing_thread_priority,
            max_sleep_time: self.max_sleep_time,
            shutdown_buffer_time_perc: self.shutdown_buffer_time_perc,
            main_queue_max_request_handover_wait_time: self
                .main_queue_max_request_handover_wait_time,
            main_queue_exception_limits: self.main_queue_exception_limits,
            delay_queue_exception_limits: self.delay_queue_exception_limits,
        })
    }
}

impl SchedulerConfig {
    /// Delay to apply after the `attempt`'th failed attempt (1-indexed),
    /// per spec §3.1: index `min(attempt, len - 1)`.
    pub fn delay_after_failure(&self, attempt: usize) -> Duration {
        let idx = attempt.min(self.delays_after_failure.len() - 1);
        self.delays_after_failure[idx]
    }
}
