//! A retry-and-rate-limit scheduling engine: bounded-concurrency dispatch,
//! tiered delay requeueing, and graceful drain over a user-supplied
//! `processRequest` callback.
//!
//! [`Scheduler`] is the single public entry point. Submit work with
//! `submit*`, read it back through the returned [`RequestFuture`], and wind
//! the engine down with `shutdown_gracefully`/`shutdown_now`.

mod config;
mod control_state;
mod delay_queue;
mod dispatch;
mod entry;
mod events;
mod future;
mod hooks;
mod process;
mod rejection;
mod scheduler;
mod status;
mod terminal;
mod worker;

pub use config::{ConfigError, ExceptionLimits, SchedulerConfig, SchedulerConfigBuilder, ThreadPriority};
pub use control_state::{ControlState, ControlStateError, ControlStateKind, ShutdownOptions, WaitForTickets};
pub use events::{SchedulerEvent, SchedulerEventKind};
pub use future::{GetError, RequestFuture, Terminal, TerminalKind};
pub use hooks::{SchedulerHooks, SchedulerHooksBuilder};
pub use process::ProcessFn;
pub use rejection::{RejectionError, RejectionReason, SubmitError, ValidationError};
pub use scheduler::Scheduler;
pub use status::{ConfigProjection, SchedulerStatus, TaskLiveness};
