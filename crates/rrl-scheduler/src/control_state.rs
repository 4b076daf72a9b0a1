//! Control state (C2): a named, mostly-immutable bundle of flags steering
//! the scheduler. The engine holds exactly one current value at a time.

use std::sync::Arc;
use std::sync::RwLock;
use thiserror::Error;
use tokio::time::Instant;

/// The engine's control state, shared read-mostly between the main loop,
/// the delay-tier workers, and any caller thread reading status/flags.
/// Transitions are made by replacing the value behind this lock (see
/// `Scheduler::set_control_state`), which also emits
/// `ServiceControlStateChanged`.
pub(crate) type SharedControlState = Arc<RwLock<ControlState>>;

/// Reads the current `ignore_delays` flag.
pub(crate) fn ignore_delays(state: &SharedControlState) -> bool {
    state.read().unwrap().ignore_delays
}

/// Three-valued "wait for tickets" knob (spec §9 "Dynamic decisions").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WaitForTickets {
    /// Consult the rate limiter and wait up to the normal budget.
    #[default]
    WaitNormally,
    /// Only take an immediately-available ticket; do not wait.
    DoNotWait,
    /// Bypass the rate limiter entirely (a synthetic ticket is produced).
    IgnoreEntirely,
}

/// Tuning flags for `shutdown_until`/`shutdown_for` (spec §4.6 "Optional
/// flags tune behaviour").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ShutdownOptions {
    /// Delay tiers push straight to the main queue and skip their sleeps.
    pub ignore_delays: bool,
    /// How the main loop should treat the rate limiter while draining.
    pub wait_for_tickets: WaitForTickets,
}

impl ShutdownOptions {
    /// The default drain: delays still apply, tickets are still obtained
    /// normally.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ignore_delays(mut self, ignore: bool) -> Self {
        self.ignore_delays = ignore;
        self
    }

    pub fn wait_for_tickets(mut self, wait: WaitForTickets) -> Self {
        self.wait_for_tickets = wait;
        self
    }
}

/// Which named state a [`ControlState`] represents, used to enforce the
/// `start`/`shutdown*` legality invariants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlStateKind {
    NotStarted,
    Running,
    ShutdownInProgress,
    Shutdown,
    Custom,
}

/// The engine's current operating mode.
///
/// Predefined values ([`ControlState::not_started`], [`ControlState::running`],
/// [`ControlState::shutdown_in_progress`], [`ControlState::shutdown`]) cover
/// ordinary operation; a caller may also construct a custom value via the
/// public fields for power-user control (spec §6 "`setControlState`").
#[derive(Debug, Clone)]
pub struct ControlState {
    pub kind: ControlStateKind,
    pub description: String,
    pub reject_requests_reason: Option<String>,
    pub ignore_delays: bool,
    pub timeout_all_pending_requests: bool,
    pub timeout_requests_after_failed_attempt: bool,
    pub spooldown_target_timestamp: Option<Instant>,
    pub limit_waiting_for_processing_thread: bool,
    pub limit_waiting_for_ticket: bool,
    pub wait_for_tickets: WaitForTickets,
}

impl ControlState {
    pub fn not_started() -> Self {
        Self {
            kind: ControlStateKind::NotStarted,
            description: "NOT_STARTED".to_string(),
            reject_requests_reason: Some("service has not been started".to_string()),
            ignore_delays: false,
            timeout_all_pending_requests: false,
            timeout_requests_after_failed_attempt: false,
            spooldown_target_timestamp: None,
            limit_waiting_for_processing_thread: false,
            limit_waiting_for_ticket: false,
            wait_for_tickets: WaitForTickets::WaitNormally,
        }
    }

    pub fn running() -> Self {
        Self {
            kind: ControlStateKind::Running,
            description: "RUNNING".to_string(),
            reject_requests_reason: None,
            ignore_delays: false,
            timeout_all_pending_requests: false,
            timeout_requests_after_failed_attempt: false,
            spooldown_target_timestamp: None,
            limit_waiting_for_processing_thread: false,
            limit_waiting_for_ticket: false,
            wait_for_tickets: WaitForTickets::WaitNormally,
        }
    }

    /// Drain state used by `shutdown_until`. `spooldown_target` is the
    /// (possibly buffer-shortened) internal deadline.
    pub fn shutdown_in_progress(
        spooldown_target: Instant,
        ignore_delays: bool,
        wait_for_tickets: WaitForTickets,
    ) -> Self {
        Self {
            kind: ControlStateKind::ShutdownInProgress,
            description: "SHUTDOWN_IN_PROGRESS".to_string(),
            reject_requests_reason: Some("service is shutting down".to_string()),
            ignore_delays,
            timeout_all_pending_requests: false,
            timeout_requests_after_failed_attempt: false,
            spooldown_target_timestamp: Some(spooldown_target),
            limit_waiting_for_processing_thread: true,
            limit_waiting_for_ticket: true,
            wait_for_tickets,
        }
    }

    pub fn shutdown() -> Self {
        Self {
            kind: ControlStateKind::Shutdown,
            description: "SHUTDOWN".to_string(),
            reject_requests_reason: Some("service has been shut down".to_string()),
            ignore_delays: true,
            timeout_all_pending_requests: false,
            timeout_requests_after_failed_attempt: false,
            spooldown_target_timestamp: None,
            limit_waiting_for_processing_thread: false,
            limit_waiting_for_ticket: false,
            wait_for_tickets: WaitForTickets::IgnoreEntirely,
        }
    }

    pub fn is_accepting_requests(&self) -> bool {
        self.reject_requests_reason.is_none()
    }

    pub fn is_shutdown(&self) -> bool {
        self.kind == ControlStateKind::Shutdown
    }

    pub fn is_not_started(&self) -> bool {
        self.kind == ControlStateKind::NotStarted
    }
}

/// Raised when `start`/`shutdown*` is invoked from an illegal control
/// state (spec §3.2 invariants, testable property 9).
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ControlStateError {
    #[error("start() is only legal from NOT_STARTED")]
    StartNotLegal,
    #[error("shutdown*() is not legal once the service has reached SHUTDOWN")]
    ShutdownNotLegalAfterShutdown,
}
