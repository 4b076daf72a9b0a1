//! Rate-limiter contract (C5) consumed by the `rrl` scheduler, plus two
//! conforming implementations: [`Unlimited`] and [`TokenBucketLimiter`].
//!
//! The scheduler never depends on a concrete limiter — only on the
//! [`RateLimiter`] trait object — so a caller can plug in any algorithm
//! (leaky bucket, sliding window, a remote limiter service, …) as long as it
//! honours the wait budget passed to `obtain_ticket`.

mod ticket;
mod token_bucket;
mod unlimited;

pub use ticket::Ticket;
pub use token_bucket::TokenBucketLimiter;
pub use unlimited::Unlimited;

use futures::future::BoxFuture;
use std::time::Duration;

/// Sentinel returned by [`RateLimiter::available_tickets_estimation`] when
/// the limiter has no finite capacity (e.g. [`Unlimited`]).
pub const UNBOUNDED_TICKETS: u64 = u64::MAX;

/// Ticket-based admission control, consulted by the scheduler's main
/// dispatch loop before every handoff to a worker.
///
/// Implementations must be cheap to clone-share (typically `Arc`-backed)
/// and must honour `max_wait` in `obtain_ticket` — the scheduler layers its
/// own real-time sleep budget on top and expects the limiter to return
/// promptly once that budget elapses, not to block indefinitely.
pub trait RateLimiter: Send + Sync {
    /// Attempts to obtain one ticket, waiting up to `max_wait` (real time).
    ///
    /// Returns `None` if no ticket became available within the budget, or
    /// `Some(ticket)` otherwise — possibly after waiting.
    fn obtain_ticket(&self, max_wait: Duration) -> BoxFuture<'_, Option<Ticket>>;

    /// Restores a ticket the caller obtained but did not end up using.
    ///
    /// Must be benign and fast; called from the scheduler's dispatch loop
    /// when it decides not to proceed after already holding a ticket.
    fn return_unused_ticket(&self, ticket: Ticket);

    /// A monitoring-only snapshot of remaining capacity. No business-logic
    /// guarantee is made about its accuracy under concurrent access.
    fn available_tickets_estimation(&self) -> u64;
}
