//! Delay-queue tier (C6): N bucketed FIFOs, each with one worker, giving
//! coarse timed re-entry without one-timer-per-entry overhead.

use crate::control_state::SharedControlState;
use crate::entry::{DelayPair, Entry};
use rrl_core::Clock;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;

#[cfg(feature = "metrics")]
use metrics::gauge;

/// The producer-facing half of one tier: its nominal delay and a sender
/// into its FIFO. Cheap to clone; every clone points at the same tier.
pub(crate) struct DelayTierHandle<Req, Resp, E> {
    pub delay_ms: u64,
    pub(crate) tx: mpsc::UnboundedSender<Entry<Req, Resp, E>>,
}

impl<Req, Resp, E> Clone for DelayTierHandle<Req, Resp, E> {
    fn clone(&self) -> Self {
        Self {
            delay_ms: self.delay_ms,
            tx: self.tx.clone(),
        }
    }
}

/// Builds one tier's channel pair. The receiver is consumed by
/// [`run_delay_tier_worker`] when the scheduler starts.
pub(crate) fn new_tier<Req, Resp, E>(
    delay_ms: u64,
) -> (
    DelayTierHandle<Req, Resp, E>,
    mpsc::UnboundedReceiver<Entry<Req, Resp, E>>,
) {
    let (tx, rx) = mpsc::unbounded_channel();
    (DelayTierHandle { delay_ms, tx }, rx)
}

/// Selects which tier an entry requesting delay `desired_delay_ms` should
/// land in: the highest-delay tier whose `delay_ms <= desired + grace`; if
/// none qualifies, the shortest tier. `tier_delays_ms` must be ascending
/// (the configuration builder enforces this).
pub(crate) fn select_tier_index(
    tier_delays_ms: &[u64],
    desired_delay_ms: i64,
    grace: Duration,
) -> usize {
    let grace_ms = grace.as_millis() as i64;
    let mut best = None;
    for (i, &delay_ms) in tier_delays_ms.iter().enumerate() {
        if (delay_ms as i64) <= desired_delay_ms + grace_ms {
            best = Some(i);
        }
    }
    best.unwrap_or(0)
}

fn remaining_delay(clock: &Clock, delay: DelayPair, now: Instant) -> i64 {
    delay.virtual_ms - clock.gap_virtual(delay.anchor, now)
}

fn allowed(clock: &Clock, in_delay_queue_since: Instant, tier_delay_ms: u64, now: Instant) -> i64 {
    tier_delay_ms as i64 - clock.gap_virtual(in_delay_queue_since, now)
}

/// One tier's worker loop (spec §4.3 "Worker behaviour").
///
/// Runs until its receiver closes (the scheduler is shutting down and has
/// dropped every producer handle).
pub(crate) async fn run_delay_tier_worker<Req, Resp, E>(
    mut rx: mpsc::UnboundedReceiver<Entry<Req, Resp, E>>,
    self_tx: mpsc::UnboundedSender<Entry<Req, Resp, E>>,
    main_tx: mpsc::UnboundedSender<Entry<Req, Resp, E>>,
    tier_delay_ms: u64,
    clock: Clock,
    control_state: SharedControlState,
    max_sleep_time: Duration,
    main_queue_depth: Arc<AtomicUsize>,
) {
    while let Some(mut entry) = rx.recv().await {
        let delay = entry.earliest_processing_time.unwrap_or(DelayPair {
            anchor: clock.now(),
            virtual_ms: 0,
        });
        let now = clock.now();
        let since = entry.in_delay_queue_since.unwrap_or(now);

        let remaining = remaining_delay(&clock, delay, now);
        let allowed_ms = allowed(&clock, since, tier_delay_ms, now);
        let sleep_virtual_ms = remaining.min(allowed_ms).max(0);

        let mut real_budget = clock.real_interval(sleep_virtual_ms);
        while !real_budget.is_zero() && !crate::control_state::ignore_delays(&control_state) {
            let chunk = real_budget.min(max_sleep_time);
            tokio::time::sleep(chunk).await;
            real_budget = real_budget.saturating_sub(chunk);
        }

        let now = clock.now();
        let remaining = remaining_delay(&clock, delay, now);
        let ignore_delays = crate::control_state::ignore_delays(&control_state);

        // No fallible step precedes this point in one iteration, so there
        // is no "exception path" distinct from the happy path here; a
        // closed channel below just means the scheduler is tearing down.
        if remaining < tier_delay_ms as i64 || ignore_delays {
            #[cfg(feature = "metrics")]
            gauge!("rrl_delay_tier_occupancy", "tier_delay_ms" => tier_delay_ms.to_string())
                .decrement(1.0);
            main_queue_depth.fetch_add(1, Ordering::AcqRel);
            let _ = main_tx.send(entry);
        } else {
            entry.in_delay_queue_since = Some(now);
            let _ = self_tx.send(entry);
        }
    }
}

/// Builds the `{handles, receivers}` pair for every configured tier, in
/// ascending order.
#[allow(clippy::type_complexity)]
pub(crate) fn build_tiers<Req, Resp, E>(
    tier_delays: &[Duration],
) -> (
    Vec<DelayTierHandle<Req, Resp, E>>,
    Vec<mpsc::UnboundedReceiver<Entry<Req, Resp, E>>>,
) {
    let mut handles = Vec::with_capacity(tier_delays.len());
    let mut receivers = Vec::with_capacity(tier_delays.len());
    for delay in tier_delays {
        let (handle, rx) = new_tier(delay.as_millis() as u64);
        handles.push(handle);
        receivers.push(rx);
    }
    (handles, receivers)
}

pub(crate) fn tier_delays_ms<Req, Resp, E>(handles: &[DelayTierHandle<Req, Resp, E>]) -> Vec<u64> {
    handles.iter().map(|h| h.delay_ms).collect()
}
