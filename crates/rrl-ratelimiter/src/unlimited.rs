//! The "rate limiting disabled" collaborator (`rateLimiterBucketSize == 0`).

use crate::{RateLimiter, Ticket, UNBOUNDED_TICKETS};
use futures::future::BoxFuture;
use std::time::Duration;

/// A limiter that always grants a synthetic ticket immediately.
#[derive(Debug, Clone, Copy, Default)]
pub struct Unlimited;

impl Unlimited {
    /// Creates an unlimited limiter.
    pub fn new() -> Self {
        Self
    }
}

impl RateLimiter for Unlimited {
    fn obtain_ticket(&self, _max_wait: Duration) -> BoxFuture<'_, Option<Ticket>> {
        Box::pin(async { Some(Ticket::synthetic()) })
    }

    fn return_unused_ticket(&self, _ticket: Ticket) {
        // Nothing to restore: this limiter has no finite resource.
    }

    fn available_tickets_estimation(&self) -> u64 {
        UNBOUNDED_TICKETS
    }
}
