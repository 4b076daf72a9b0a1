//! The four terminal handlers (`handleSuccess` / `handleFinalFailure` /
//! `handleTimeout` / `handleCancel`) named in spec §4.2. These are the
//! *only* places an entry's in-flight counter decrements and its future
//! transitions to a terminal state — shared by the main dispatch loop
//! (timeout, cancel) and the request worker (success, final failure,
//! post-attempt timeout).

use crate::entry::Entry;
use crate::events::{SchedulerEvent, SchedulerEventKind};
use crate::future::Terminal;
use crate::hooks::{SchedulerHooks, call_guarded};
use rrl_core::{Clock, EventListeners};
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

#[cfg(feature = "metrics")]
use metrics::{counter, histogram};
#[cfg(feature = "tracing")]
use tracing::warn;

/// Shared context every terminal handler needs. Borrowed, not owned, so
/// both `dispatch` and `worker` can build one cheaply per call.
pub(crate) struct TerminalContext<'a, Req, Resp, E> {
    pub clock: &'a Clock,
    pub hooks: &'a SchedulerHooks<Req, Resp, E>,
    pub events: &'a EventListeners<SchedulerEvent>,
    pub pattern_name: &'a str,
    pub in_flight: &'a AtomicI64,
}

/// Decrements the in-flight counter, clamping to zero and emitting an
/// assertion-error event if it would go negative (spec §5 "Shared state").
fn decrement_in_flight(in_flight: &AtomicI64, events: &EventListeners<SchedulerEvent>, pattern_name: &str) {
    let previous = in_flight.fetch_sub(1, Ordering::AcqRel);
    if previous <= 0 {
        in_flight.store(0, Ordering::Release);
        events.emit(&SchedulerEvent::new(
            pattern_name,
            SchedulerEventKind::ErrorAssertionError {
                description: "in-flight count went negative on decrement".to_string(),
            },
        ));
    }
}

fn emit_removed_and_hook<Req, Resp, E>(
    ctx: &TerminalContext<Req, Resp, E>,
    input: &Arc<Req>,
    after_removed: &Arc<dyn Fn(&Arc<Req>) + Send + Sync>,
) {
    ctx.events.emit(&SchedulerEvent::new(
        ctx.pattern_name,
        SchedulerEventKind::RequestRemoved,
    ));
    let hook_ok = call_guarded(std::panic::AssertUnwindSafe(|| (after_removed)(input)));
    if !hook_ok {
        ctx.events.emit(&SchedulerEvent::new(
            ctx.pattern_name,
            SchedulerEventKind::ErrorSpiMethodException {
                hook: "after_request_removed",
            },
        ));
    }
}

pub(crate) fn handle_success<Req, Resp, E>(
    entry: &mut Entry<Req, Resp, E>,
    ctx: &TerminalContext<Req, Resp, E>,
    attempt: usize,
    value: Resp,
) where
    Resp: Clone,
{
    let now = ctx.clock.now();
    let input = Arc::clone(&entry.input);
    let value_for_hook = value.clone();
    entry.complete(now, ctx.clock, Terminal::Success(value));
    decrement_in_flight(ctx.in_flight, ctx.events, ctx.pattern_name);

    #[cfg(feature = "metrics")]
    {
        counter!("rrl_requests_succeeded_total", "pattern" => ctx.pattern_name.to_string())
            .increment(1);
        histogram!("rrl_request_attempts", "pattern" => ctx.pattern_name.to_string())
            .record(attempt as f64);
    }

    ctx.events.emit(&SchedulerEvent::new(
        ctx.pattern_name,
        SchedulerEventKind::RequestSuccess { attempt },
    ));
    let hook_ok = call_guarded(std::panic::AssertUnwindSafe(|| {
        (ctx.hooks.after_request_success)(&input, &value_for_hook)
    }));
    if !hook_ok {
        ctx.events.emit(&SchedulerEvent::new(
            ctx.pattern_name,
            SchedulerEventKind::ErrorSpiMethodException {
                hook: "after_request_success",
            },
        ));
    }
    emit_removed_and_hook(ctx, &input, &ctx.hooks.after_request_removed);
}

pub(crate) fn handle_final_failure<Req, Resp, E>(
    entry: &mut Entry<Req, Resp, E>,
    ctx: &TerminalContext<Req, Resp, E>,
    attempts: usize,
    cause: E,
) {
    let now = ctx.clock.now();
    let input = Arc::clone(&entry.input);
    entry.complete(now, ctx.clock, Terminal::Error(cause));
    decrement_in_flight(ctx.in_flight, ctx.events, ctx.pattern_name);

    #[cfg(feature = "tracing")]
    warn!(pattern = ctx.pattern_name, attempts, "request failed after exhausting attempts");
    #[cfg(feature = "metrics")]
    {
        counter!("rrl_requests_final_failure_total", "pattern" => ctx.pattern_name.to_string())
            .increment(1);
        histogram!("rrl_request_attempts", "pattern" => ctx.pattern_name.to_string())
            .record(attempts as f64);
    }

    ctx.events.emit(&SchedulerEvent::new(
        ctx.pattern_name,
        SchedulerEventKind::RequestFinalFailure { attempts },
    ));
    let hook_ok = call_guarded(std::panic::AssertUnwindSafe(|| {
        (ctx.hooks.after_request_final_failure)(&input)
    }));
    if !hook_ok {
        ctx.events.emit(&SchedulerEvent::new(
            ctx.pattern_name,
            SchedulerEventKind::ErrorSpiMethodException {
                hook: "after_request_final_failure",
            },
        ));
    }
    emit_removed_and_hook(ctx, &input, &ctx.hooks.after_request_removed);
}

pub(crate) fn handle_timeout<Req, Resp, E>(
    entry: &mut Entry<Req, Resp, E>,
    ctx: &TerminalContext<Req, Resp, E>,
) {
    let now = ctx.clock.now();
    let total_processing_time_ms = ctx.clock.gap_virtual(entry.created_at, now);
    let input = Arc::clone(&entry.input);
    entry.complete(
        now,
        ctx.clock,
        Terminal::Timeout {
            total_processing_time_ms,
        },
    );
    decrement_in_flight(ctx.in_flight, ctx.events, ctx.pattern_name);

    #[cfg(feature = "metrics")]
    counter!("rrl_requests_timed_out_total", "pattern" => ctx.pattern_name.to_string()).increment(1);

    ctx.events.emit(&SchedulerEvent::new(
        ctx.pattern_name,
        SchedulerEventKind::RequestFinalTimeout {
            total_processing_time_ms,
        },
    ));
    let hook_ok = call_guarded(std::panic::AssertUnwindSafe(|| {
        (ctx.hooks.after_request_final_timeout)(&input, total_processing_time_ms)
    }));
    if !hook_ok {
        ctx.events.emit(&SchedulerEvent::new(
            ctx.pattern_name,
            SchedulerEventKind::ErrorSpiMethodException {
                hook: "after_request_final_timeout",
            },
        ));
    }
    emit_removed_and_hook(ctx, &input, &ctx.hooks.after_request_removed);
}

pub(crate) fn handle_cancel<Req, Resp, E>(
    entry: &mut Entry<Req, Resp, E>,
    ctx: &TerminalContext<Req, Resp, E>,
) {
    let now = ctx.clock.now();
    let input = Arc::clone(&entry.input);
    entry.complete(now, ctx.clock, Terminal::Cancelled);
    decrement_in_flight(ctx.in_flight, ctx.events, ctx.pattern_name);

    #[cfg(feature = "metrics")]
    counter!("rrl_requests_cancelled_total", "pattern" => ctx.pattern_name.to_string()).increment(1);

    ctx.events.emit(&SchedulerEvent::new(
        ctx.pattern_name,
        SchedulerEventKind::RequestCancelled,
    ));
    let hook_ok = call_guarded(std::panic::AssertUnwindSafe(|| {
        (ctx.hooks.after_request_cancelled)(&input)
    }));
    if !hook_ok {
        ctx.events.emit(&SchedulerEvent::new(
            ctx.pattern_name,
            SchedulerEventKind::ErrorSpiMethodException {
                hook: "after_request_cancelled",
            },
        ));
    }
    emit_removed_and_hook(ctx, &input, &ctx.hooks.after_request_removed);
}
