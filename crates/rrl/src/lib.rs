//! A retry-and-rate-limit scheduling engine: submit work, get a future back,
//! retries and pacing happen underneath.
//!
//! `rrl` bundles four focused crates behind one dependency:
//!
//! - [`core`] — the shared event system, error taxonomy, and time source.
//! - [`executor`] — the worker-pool capability the engine dispatches onto.
//! - [`ratelimiter`] — the rate-limiter contract plus `Unlimited` and
//!   `TokenBucketLimiter`.
//! - [`scheduler`] — the engine itself: [`Scheduler`], its config, and the
//!   future you get back from `submit`.
//!
//! # Quick start
//!
//! ```rust,no_run
//! use rrl::SchedulerConfigBuilder;
//! use rrl::Scheduler;
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = SchedulerConfigBuilder::new()
//!     .service_name("example")
//!     .max_attempts(3)
//!     .worker_pool(1, 4)
//!     .build()?;
//!
//! let scheduler = Scheduler::new(
//!     config,
//!     Arc::new(|input: Arc<u32>, _attempt: usize| {
//!         Box::pin(async move { Ok::<_, std::io::Error>(*input * 2) })
//!     }),
//!     tokio::runtime::Handle::current(),
//! );
//! scheduler.start()?;
//!
//! let future = scheduler.submit(21u32, Duration::from_secs(5)).await?;
//! let response = future.get(None).await?;
//! assert_eq!(response, 42);
//!
//! scheduler.shutdown_gracefully().await?;
//! # Ok(())
//! # }
//! ```
//!
//! # Why a scheduler instead of a middleware layer
//!
//! Retrying and rate-limiting a single in-flight call is a [`tower::Layer`]
//! problem, and the wider resilience lineage this crate comes from solves it
//! that way. This engine targets a different shape: callers hand over work
//! that may need to wait (for a worker, for a rate-limiter ticket, for a
//! retry delay) well past the lifetime of the request that submitted it —
//! a work queue, not a request/response layer. [`Scheduler`] is `Clone`
//! and cheap to hand out to many producers; the future returned by `submit`
//! is what a caller awaits, detaches, or polls at its own pace.
//!
//! [`tower::Layer`]: https://docs.rs/tower/latest/tower/trait.Layer.html

pub use rrl_core as core;
pub use rrl_executor as executor;
pub use rrl_ratelimiter as ratelimiter;
pub use rrl_scheduler as scheduler;

pub use rrl_core::{Clock, EventListener, EventListeners, FnListener, ResilienceError, ResilienceEvent};
pub use rrl_executor::{Executor, ReserveError, WorkerPool, WorkerReservation};
pub use rrl_ratelimiter::{RateLimiter, Ticket, TokenBucketLimiter, Unlimited};
pub use rrl_scheduler::{
    ConfigError, ConfigProjection, ControlState, ControlStateError, ControlStateKind, ExceptionLimits,
    GetError, ProcessFn, RejectionError, RejectionReason, RequestFuture, Scheduler, SchedulerConfig,
    SchedulerConfigBuilder, SchedulerEvent, SchedulerEventKind, SchedulerHooks, SchedulerHooksBuilder,
    SchedulerStatus, ShutdownOptions, SubmitError, TaskLiveness, Terminal, TerminalKind, ThreadPriority,
    ValidationError, WaitForTickets,
};
