//! Token-bucket [`crate::RateLimiter`] implementation.
//!
//! Tokens are added in whole-token increments every `refill_interval`, up to
//! `bucket_size`; the bucket starts empty (`initial tokens = 0`, per spec).

use crate::{RateLimiter, Ticket, ticket::TicketKind};
use futures::future::BoxFuture;
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::Instant;

#[cfg(feature = "metrics")]
use metrics::counter;

struct State {
    tokens: u64,
    last_refill: Instant,
}

impl State {
    fn refill(&mut self, now: Instant, bucket_size: u64, refill_rate: u64, refill_interval: Duration) {
        if refill_interval.is_zero() || refill_rate == 0 {
            return;
        }
        let elapsed = now.saturating_duration_since(self.last_refill);
        let intervals = (elapsed.as_nanos() / refill_interval.as_nanos().max(1)) as u64;
        if intervals == 0 {
            return;
        }
        let added = intervals.saturating_mul(refill_rate);
        self.tokens = (self.tokens + added).min(bucket_size);
        self.last_refill += refill_interval * intervals as u32;
    }

    fn time_until_next_token(&self, now: Instant, refill_interval: Duration) -> Duration {
        if refill_interval.is_zero() {
            return Duration::ZERO;
        }
        let elapsed = now.saturating_duration_since(self.last_refill);
        let into_interval = Duration::from_nanos(
            (elapsed.as_nanos() % refill_interval.as_nanos().max(1)) as u64,
        );
        refill_interval.saturating_sub(into_interval)
    }
}

/// A token-bucket rate limiter: `bucket_size` capacity, refilled by
/// `refill_rate` tokens every `refill_interval`.
pub struct TokenBucketLimiter {
    bucket_size: u64,
    refill_rate: u64,
    refill_interval: Duration,
    state: Mutex<State>,
}

impl TokenBucketLimiter {
    /// Creates a bucket starting empty, per spec §3.1.
    pub fn new(bucket_size: u64, refill_rate: u64, refill_interval: Duration) -> Self {
        Self {
            bucket_size,
            refill_rate,
            refill_interval,
            state: Mutex::new(State {
                tokens: 0,
                last_refill: Instant::now(),
            }),
        }
    }

    /// Overrides the current token count. Test/warm-start helper; not part
    /// of the spec's default construction (which always starts at zero).
    pub fn seed_tokens(&self, tokens: u64) {
        let mut state = self.state.lock().unwrap();
        state.tokens = tokens.min(self.bucket_size);
        state.last_refill = Instant::now();
    }

    fn try_acquire(&self) -> Option<Duration> {
        let now = Instant::now();
        let mut state = self.state.lock().unwrap();
        state.refill(now, self.bucket_size, self.refill_rate, self.refill_interval);
        if state.tokens > 0 {
            state.tokens -= 1;
            None
        } else {
            Some(state.time_until_next_token(now, self.refill_interval))
        }
    }
}

impl RateLimiter for TokenBucketLimiter {
    fn obtain_ticket(&self, max_wait: Duration) -> BoxFuture<'_, Option<Ticket>> {
        Box::pin(async move {
            let deadline = Instant::now() + max_wait;
            loop {
                match self.try_acquire() {
                    None => {
                        #[cfg(feature = "metrics")]
                        counter!("rrl_ratelimiter_tickets_granted_total").increment(1);
                        return Some(Ticket::bucket());
                    }
                    Some(wait) => {
                        let now = Instant::now();
                        if now >= deadline {
                            #[cfg(feature = "metrics")]
                            counter!("rrl_ratelimiter_tickets_denied_total").increment(1);
                            return None;
                        }
                        let remaining = deadline.saturating_duration_since(now);
                        let sleep_for = wait.min(remaining);
                        if sleep_for.is_zero() {
                            #[cfg(feature = "metrics")]
                            counter!("rrl_ratelimiter_tickets_denied_total").increment(1);
                            return None;
                        }
                        tokio::time::sleep(sleep_for).await;
                    }
                }
            }
        })
    }

    fn return_unused_ticket(&self, ticket: Ticket) {
        if matches!(ticket.0, TicketKind::Bucket) {
            let mut state = self.state.lock().unwrap();
            state.tokens = (state.tokens + 1).min(self.bucket_size);
        }
    }

    fn available_tickets_estimation(&self) -> u64 {
        let now = Instant::now();
        let mut state = self.state.lock().unwrap();
        state.refill(now, self.bucket_size, self.refill_rate, self.refill_interval);
        state.tokens
    }
}
