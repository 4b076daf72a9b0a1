//! Request worker (C8): runs one attempt of `processRequest` and decides,
//! on failure, between a final failure, a timeout, or a retry (spec §4.4).

use crate::control_state::SharedControlState;
use crate::entry::{DelayPair, Entry};
use crate::events::{SchedulerEvent, SchedulerEventKind};
use crate::hooks::{SchedulerHooks, call_guarded};
use crate::process::ProcessFn;
use crate::terminal::{self, TerminalContext};
use rrl_core::{Clock, EventListeners};
use rrl_ratelimiter::Ticket;
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};
use tokio::sync::mpsc;

#[cfg(feature = "metrics")]
use metrics::counter;
#[cfg(feature = "tracing")]
use tracing::debug;

/// What happens to an entry after one failed attempt.
enum FailureOutcome<E> {
    FinalFailure(E),
    Timeout,
    Retry { delay_virtual_ms: i64 },
}

fn decide_after_failure<E>(
    attempt: usize,
    max_attempts: usize,
    remaining_validity_ms: i64,
    timeout_requests_after_failed_attempt: bool,
    delay_after_failure_ms: i64,
    cause: E,
) -> FailureOutcome<E> {
    if attempt >= max_attempts {
        return FailureOutcome::FinalFailure(cause);
    }
    if remaining_validity_ms <= 0 {
        return FailureOutcome::Timeout;
    }
    if timeout_requests_after_failed_attempt {
        return FailureOutcome::Timeout;
    }
    FailureOutcome::Retry {
        delay_virtual_ms: remaining_validity_ms.min(delay_after_failure_ms),
    }
}

/// One worker-pool task: one attempt at `process_fn`, then the
/// success/final-failure/timeout/retry decision.
///
/// Runs to completion once dispatched — spec §5 "Cancellation semantics":
/// a request cancellation flag is only consulted at main-queue decision
/// points, never mid-attempt.
#[allow(clippy::too_many_arguments)]
pub(crate) async fn run_attempt<Req, Resp, E>(
    mut entry: Entry<Req, Resp, E>,
    attempt: usize,
    ticket: Ticket,
    process_fn: ProcessFn<Req, Resp, E>,
    main_tx: mpsc::UnboundedSender<Entry<Req, Resp, E>>,
    clock: Clock,
    hooks: SchedulerHooks<Req, Resp, E>,
    events: EventListeners<SchedulerEvent>,
    pattern_name: String,
    in_flight: Arc<AtomicI64>,
    control_state: SharedControlState,
    main_queue_depth: Arc<AtomicUsize>,
    max_attempts: usize,
    delay_after_failure_ms: i64,
) where
    Resp: Clone,
{
    // The ticket is spent by running the attempt; nothing to give back
    // regardless of outcome, so it is just held until this task ends.
    drop(ticket);

    #[cfg(feature = "tracing")]
    {
        let _enter = entry.span.enter();
        debug!(attempt, pattern = %pattern_name, "executing request attempt");
    }
    #[cfg(feature = "metrics")]
    counter!("rrl_request_attempts_total", "pattern" => pattern_name.clone()).increment(1);

    events.emit(&SchedulerEvent::new(
        &pattern_name,
        SchedulerEventKind::RequestExecuting { attempt },
    ));

    let ctx = TerminalContext {
        clock: &clock,
        hooks: &hooks,
        events: &events,
        pattern_name: &pattern_name,
        in_flight: &in_flight,
    };

    match (process_fn)(Arc::clone(&entry.input), attempt).await {
        Ok(value) => {
            terminal::handle_success(&mut entry, &ctx, attempt, value);
        }
        Err(cause) => {
            entry.number_of_failed_attempts += 1;
            events.emit(&SchedulerEvent::new(
                &pattern_name,
                SchedulerEventKind::RequestAttemptFailed { attempt },
            ));
            let hook_ok = call_guarded(std::panic::AssertUnwindSafe(|| {
                (hooks.after_request_attempt_failed)(&entry.input, attempt, &cause)
            }));
            if !hook_ok {
                events.emit(&SchedulerEvent::new(
                    &pattern_name,
                    SchedulerEventKind::ErrorSpiMethodException {
                        hook: "after_request_attempt_failed",
                    },
                ));
            }

            let now = clock.now();
            let remaining_validity_ms =
                entry.request_validity_duration - clock.gap_virtual(entry.created_at, now);
            // Read fresh: a shutdown may have started mid-attempt.
            let timeout_requests_after_failed_attempt =
                timeout_requests_after_failed_attempt(&control_state);

            let outcome = decide_after_failure(
                attempt,
                max_attempts,
                remaining_validity_ms,
                timeout_requests_after_failed_attempt,
                delay_after_failure_ms,
                cause,
            );

            match outcome {
                FailureOutcome::FinalFailure(cause) => {
                    terminal::handle_final_failure(&mut entry, &ctx, attempt, cause);
                }
                FailureOutcome::Timeout => {
                    terminal::handle_timeout(&mut entry, &ctx);
                }
                FailureOutcome::Retry { delay_virtual_ms } => {
                    #[cfg(feature = "tracing")]
                    {
                        let _enter = entry.span.enter();
                        debug!(
                            attempt,
                            delay_ms = delay_virtual_ms,
                            pattern = %pattern_name,
                            "retrying after delay"
                        );
                    }
                    #[cfg(feature = "metrics")]
                    counter!("rrl_request_retries_total", "pattern" => pattern_name.clone()).increment(1);
                    events.emit(&SchedulerEvent::new(
                        &pattern_name,
                        SchedulerEventKind::RequestAttemptFailedDecision {
                            description: format!("retry after {delay_virtual_ms}ms"),
                        },
                    ));
                    entry.earliest_processing_time = Some(DelayPair {
                        anchor: now,
                        virtual_ms: delay_virtual_ms,
                    });
                    main_queue_depth.fetch_add(1, Ordering::AcqRel);
                    let _ = main_tx.send(entry);
                }
            }
        }
    }
}

/// Re-reads `control_state.timeout_requests_after_failed_attempt` at the
/// moment a failure decision is made, since a shutdown can start mid-attempt.
/// Kept separate from [`decide_after_failure`] so that function stays a pure,
/// directly-testable decision table.
pub(crate) fn timeout_requests_after_failed_attempt(control_state: &SharedControlState) -> bool {
    control_state.read().unwrap().timeout_requests_after_failed_attempt
}
