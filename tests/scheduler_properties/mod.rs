//! Property tests for the scheduler's quantified invariants.

pub mod attempts_and_delay;
pub mod control_state_rejection;
pub mod drain;
pub mod lifecycle;
pub mod queue_bookkeeping;
pub mod rate_limit;
