//! Main dispatch loop (C7): the decision rule and resource-acquisition
//! protocol of spec §4.2, running as a single tokio task per scheduler.

use crate::config::SchedulerConfig;
use crate::control_state::{SharedControlState, WaitForTickets};
use crate::delay_queue::{DelayTierHandle, select_tier_index, tier_delays_ms};
use crate::entry::Entry;
use crate::events::{SchedulerEvent, SchedulerEventKind};
use crate::hooks::SchedulerHooks;
use crate::process::ProcessFn;
use crate::terminal::{self, TerminalContext};
use crate::worker;
use rrl_core::{Clock, EventListeners};
use rrl_executor::{Executor, WorkerPool};
use rrl_ratelimiter::{RateLimiter, Ticket};
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;

#[cfg(feature = "metrics")]
use metrics::gauge;

/// What the decision rule says to do with an entry at the front of the
/// main queue, evaluated in the fixed order spec §4.2 specifies.
#[derive(Debug, Clone, Copy)]
enum Decision {
    Timeout,
    Cancel,
    /// Carries the desired delay in virtual ms.
    Delay(i64),
    Proceed,
}

/// The decision rule itself (spec §4.2 "Decision rule"), factored out so it
/// can be unit-tested without a runtime.
///
/// Mutates `entry.earliest_processing_time` to `None` when falling through
/// past a delay that is within grace (or ignored): the anchor has served
/// its purpose once the decision is made.
#[allow(clippy::too_many_arguments)]
fn decide<Req, Resp, Err>(
    entry: &mut Entry<Req, Resp, Err>,
    timeout_all_pending_requests: bool,
    timeout_requests_after_failed_attempt: bool,
    had_prior_resource_failure: bool,
    ignore_delays: bool,
    grace_period_ms: i64,
    clock: &Clock,
    now: Instant,
) -> Decision {
    if timeout_all_pending_requests
        || (timeout_requests_after_failed_attempt && had_prior_resource_failure)
    {
        return Decision::Timeout;
    }

    let remaining_validity =
        entry.request_validity_duration - clock.gap_virtual(entry.created_at, now);
    if remaining_validity <= 0 {
        return Decision::Timeout;
    }

    if entry.cancel_requested() {
        return Decision::Cancel;
    }

    if let Some(ept) = entry.earliest_processing_time {
        let remaining_delay = ept.virtual_ms - clock.gap_virtual(ept.anchor, now);
        if remaining_delay > grace_period_ms && !ignore_delays {
            return Decision::Delay(remaining_delay);
        }
        entry.earliest_processing_time = None;
    }

    Decision::Proceed
}

/// Runs until `main_rx` closes (every sender — scheduler handles and the
/// delay tiers' requeue senders — has been dropped, which only happens
/// once the scheduler is fully torn down).
#[allow(clippy::too_many_arguments)]
pub(crate) async fn run_main_loop<Req, Resp, Err, Ex>(
    mut main_rx: mpsc::UnboundedReceiver<Entry<Req, Resp, Err>>,
    main_tx: mpsc::UnboundedSender<Entry<Req, Resp, Err>>,
    delay_tiers: Vec<DelayTierHandle<Req, Resp, Err>>,
    worker_pool: WorkerPool<Ex>,
    rate_limiter: Arc<dyn RateLimiter>,
    process_fn: ProcessFn<Req, Resp, Err>,
    clock: Clock,
    hooks: SchedulerHooks<Req, Resp, Err>,
    events: EventListeners<SchedulerEvent>,
    in_flight: Arc<AtomicI64>,
    control_state: SharedControlState,
    main_queue_depth: Arc<AtomicUsize>,
    config: Arc<SchedulerConfig>,
) where
    Req: Send + Sync + 'static,
    Resp: Send + Sync + Clone + 'static,
    Err: Send + 'static,
    Ex: Executor,
{
    let pattern_name = config.service_name.clone();
    let tier_delays = tier_delays_ms(&delay_tiers);
    let grace_ms = config.request_early_processing_grace_period.as_millis() as i64;

    'next_entry: while let Some(mut entry) = main_rx.recv().await {
        main_queue_depth.fetch_sub(1, Ordering::AcqRel);
        let mut had_prior_resource_failure = false;

        loop {
            let state = control_state.read().unwrap().clone();
            let now = clock.now();

            let decision = decide(
                &mut entry,
                state.timeout_all_pending_requests,
                state.timeout_requests_after_failed_attempt,
                had_prior_resource_failure,
                state.ignore_delays,
                grace_ms,
                &clock,
                now,
            );

            events.emit(&SchedulerEvent::new(
                &pattern_name,
                SchedulerEventKind::MainQueueDecision {
                    description: format!("{decision:?}"),
                },
            ));

            match decision {
                Decision::Timeout => {
                    let ctx = terminal_ctx(&clock, &hooks, &events, &pattern_name, &in_flight);
                    terminal::handle_timeout(&mut entry, &ctx);
                    complete_iteration(&events, &pattern_name);
                    continue 'next_entry;
                }
                Decision::Cancel => {
                    let ctx = terminal_ctx(&clock, &hooks, &events, &pattern_name, &in_flight);
                    terminal::handle_cancel(&mut entry, &ctx);
                    complete_iteration(&events, &pattern_name);
                    continue 'next_entry;
                }
                Decision::Delay(desired_delay_ms) => {
                    let idx = select_tier_index(
                        &tier_delays,
                        desired_delay_ms,
                        config.delay_queue_too_long_grace_period,
                    );
                    entry.in_delay_queue_since = Some(now);
                    events.emit(&SchedulerEvent::new(
                        &pattern_name,
                        SchedulerEventKind::DelayQueueItemBeforeDelayStep {
                            tier_delay_ms: tier_delays[idx],
                        },
                    ));
                    #[cfg(feature = "metrics")]
                    gauge!("rrl_delay_tier_occupancy", "tier_delay_ms" => tier_delays[idx].to_string())
                        .increment(1.0);
                    let _ = delay_tiers[idx].tx.send(entry);
                    complete_iteration(&events, &pattern_name);
                    continue 'next_entry;
                }
                Decision::Proceed => {
                    let remaining_validity_ms =
                        entry.request_validity_duration - clock.gap_virtual(entry.created_at, now);
                    let wait_budget = clock
                        .real_interval(remaining_validity_ms)
                        .min(config.max_sleep_time);

                    let reservation = match worker_pool.reserve(wait_budget).await {
                        Ok(reservation) => {
                            events.emit(&SchedulerEvent::new(
                                &pattern_name,
                                SchedulerEventKind::MainQueueThreadObtainAttempt { succeeded: true },
                            ));
                            reservation
                        }
                        Err(_) => {
                            events.emit(&SchedulerEvent::new(
                                &pattern_name,
                                SchedulerEventKind::MainQueueThreadObtainAttempt {
                                    succeeded: false,
                                },
                            ));
                            had_prior_resource_failure = true;
                            continue;
                        }
                    };

                    let maybe_ticket = obtain_ticket(
                        &*rate_limiter,
                        &state,
                        wait_budget,
                        now,
                        &in_flight,
                    )
                    .await;

                    let Some(ticket) = maybe_ticket else {
                        events.emit(&SchedulerEvent::new(
                            &pattern_name,
                            SchedulerEventKind::MainQueueTicketObtainAttempt { succeeded: false },
                        ));
                        drop(reservation);
                        had_prior_resource_failure = true;
                        continue;
                    };
                    events.emit(&SchedulerEvent::new(
                        &pattern_name,
                        SchedulerEventKind::MainQueueTicketObtainAttempt { succeeded: true },
                    ));

                    let attempt = entry.number_of_failed_attempts + 1;
                    let delay_ms = config.delay_after_failure(attempt).as_millis() as i64;
                    let task = worker::run_attempt(
                        entry,
                        attempt,
                        ticket,
                        Arc::clone(&process_fn),
                        main_tx.clone(),
                        clock.clone(),
                        hooks.clone(),
                        events.clone(),
                        pattern_name.clone(),
                        Arc::clone(&in_flight),
                        Arc::clone(&control_state),
                        Arc::clone(&main_queue_depth),
                        config.max_attempts,
                        delay_ms,
                    );
                    reservation.dispatch(task);
                    complete_iteration(&events, &pattern_name);
                    continue 'next_entry;
                }
            }
        }
    }
}

fn terminal_ctx<'a, Req, Resp, Err>(
    clock: &'a Clock,
    hooks: &'a SchedulerHooks<Req, Resp, Err>,
    events: &'a EventListeners<SchedulerEvent>,
    pattern_name: &'a str,
    in_flight: &'a AtomicI64,
) -> TerminalContext<'a, Req, Resp, Err> {
    TerminalContext {
        clock,
        hooks,
        events,
        pattern_name,
        in_flight,
    }
}

fn complete_iteration(events: &EventListeners<SchedulerEvent>, pattern_name: &str) {
    events.emit(&SchedulerEvent::new(
        pattern_name,
        SchedulerEventKind::MainQueueProcessingCompleted,
    ));
}

/// Acquires a ticket according to the current [`WaitForTickets`] mode,
/// honouring the spooldown budget-per-item when the control state asks for
/// it (spec §9 "Dynamic decisions").
///
/// `in_flight` stands in for the original's "total queued items" divisor:
/// with entries owned by exactly one stage at a time (spec §5), the
/// in-flight count is the closest always-available proxy for how many
/// requests are still competing for the remaining spooldown budget.
async fn obtain_ticket(
    rate_limiter: &dyn RateLimiter,
    state: &crate::control_state::ControlState,
    wait_budget: Duration,
    now: Instant,
    in_flight: &AtomicI64,
) -> Option<Ticket> {
    match state.wait_for_tickets {
        WaitForTickets::IgnoreEntirely => Some(Ticket::synthetic()),
        WaitForTickets::DoNotWait => rate_limiter.obtain_ticket(Duration::ZERO).await,
        WaitForTickets::WaitNormally => {
            let budget = if state.limit_waiting_for_ticket {
                match state.spooldown_target_timestamp {
                    Some(target) => {
                        let queued = (in_flight.load(Ordering::Acquire).max(0) as u32) + 1;
                        let remaining = target.saturating_duration_since(now);
                        (remaining / queued).min(wait_budget)
                    }
                    None => wait_budget,
                }
            } else {
                wait_budget
            };
            rate_limiter.obtain_ticket(budget).await
        }
    }
}
