//! Capacity/acceptance rejection (spec §6 `mayAcceptRequest`, §7 "Capacity
//! rejection"). Supplemented with a typed [`RejectionReason`] (§12) so
//! callers can branch on cause without string matching, while `Display`
//! still produces the descriptive reason string the original spec asks for.

use thiserror::Error;

/// Why a submission was turned away before entering the pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectionReason {
    /// The control state has a non-null reject reason (not started,
    /// shutting down, shut down, or a custom rejecting state).
    NotAccepting { reason: String },
    /// In-flight count is at or above `max_pending_requests`.
    AtCapacity { in_flight: usize, max_pending: usize },
}

impl std::fmt::Display for RejectionReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RejectionReason::NotAccepting { reason } => write!(f, "not accepting requests: {reason}"),
            RejectionReason::AtCapacity {
                in_flight,
                max_pending,
            } => write!(
                f,
                "at capacity: {in_flight} in-flight requests >= max_pending_requests ({max_pending})"
            ),
        }
    }
}

/// Synchronous error returned by `submit*` when a request is rejected.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("request rejected: {reason}")]
pub struct RejectionError {
    pub reason: RejectionReason,
}

impl RejectionError {
    pub fn new(reason: RejectionReason) -> Self {
        Self { reason }
    }
}

/// Validation failure on `submit*`/`shutdown*` arguments (spec §7
/// "Validation").
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("delay ({delay_ms}ms) must be > 0 and < time_limit ({time_limit_ms}ms)")]
    DelayNotBeforeTimeLimit { delay_ms: i64, time_limit_ms: i64 },
    #[error("delay_until must be strictly before until, and both must be in the future")]
    DelayUntilNotBeforeUntil,
    #[error("time_limit_virtual_ms must be positive")]
    NonPositiveTimeLimit,
}

/// Submission-time outcome: either a [`RejectionError`] (capacity/state) or
/// a [`ValidationError`] (bad arguments), per spec §7's error taxonomy.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SubmitError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Rejected(#[from] RejectionError),
}
