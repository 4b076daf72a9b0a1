//! Entry record (C3): per-submission mutable state carried through the
//! pipeline. Ownership is strictly serial — at any moment an entry is owned
//! by exactly one of the main queue, a delay tier, the main loop, or a
//! worker task (spec §5 "Ownership discipline") — so, deliberately, no
//! field here is behind a lock; transitions happen only by moving the
//! `Entry` value itself across channels.

use crate::future::{ResultCell, Terminal};
use std::any::Any;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::time::Instant;

/// A `(anchor, virtual_ms)` pair used for both the delay-queue's requested
/// delay and the post-failure/initial "not before" time. Stored as a pair
/// rather than an absolute deadline so that changing `time_factor` mid-wait
/// recomputes correctly (spec §3.3).
#[derive(Debug, Clone, Copy)]
pub struct DelayPair {
    pub anchor: Instant,
    pub virtual_ms: i64,
}

/// Per-submission state, owned by the engine for the entry's lifetime.
pub struct Entry<Req, Resp, E> {
    pub input: Arc<Req>,
    pub created_at: Instant,
    pub request_validity_duration: i64,
    pub cancel_requested: Arc<AtomicBool>,
    pub result: Arc<ResultCell<Resp, E>>,

    pub in_delay_queue_since: Option<Instant>,
    pub earliest_processing_time: Option<DelayPair>,

    pub number_of_failed_attempts: usize,
    pub total_processing_time: Option<i64>,

    /// Opaque slot for collaborator use (spec §3.3 `customData`); the
    /// engine never reads or writes it itself.
    pub custom_data: Option<Arc<dyn Any + Send + Sync>>,

    /// Follows this submission across the main queue, delay tiers, and
    /// worker attempts. `Span` itself is `Send + Sync` and cheap to clone;
    /// only its `Entered` guard is not, so call sites enter it for a
    /// synchronous logging block and let it drop before any `.await`.
    #[cfg(feature = "tracing")]
    pub(crate) span: tracing::Span,
}

impl<Req, Resp, E> Entry<Req, Resp, E> {
    pub fn new(
        input: Arc<Req>,
        created_at: Instant,
        request_validity_duration: i64,
        earliest_processing_time: Option<DelayPair>,
    ) -> (Self, crate::future::RequestFuture<Req, Resp, E>) {
        let cancel_requested = Arc::new(AtomicBool::new(false));
        let result = Arc::new(ResultCell::new());
        #[cfg(feature = "tracing")]
        let span = tracing::span!(tracing::Level::DEBUG, "submission");

        let entry = Self {
            input: Arc::clone(&input),
            created_at,
            request_validity_duration,
            cancel_requested: Arc::clone(&cancel_requested),
            result: Arc::clone(&result),
            in_delay_queue_since: None,
            earliest_processing_time,
            number_of_failed_attempts: 0,
            total_processing_time: None,
            custom_data: None,
            #[cfg(feature = "tracing")]
            span,
        };

        let future = crate::future::RequestFuture {
            input,
            cell: result,
            cancel_requested,
        };

        (entry, future)
    }

    pub fn cancel_requested(&self) -> bool {
        self.cancel_requested.load(Ordering::Acquire)
    }

    /// Completes the entry's future exactly once and records the total
    /// processing time. Per spec §4.2, this (and its siblings in
    /// `dispatch`/`worker`) is the *only* place a terminal is written.
    pub fn complete(&mut self, now: Instant, clock: &rrl_core::Clock, terminal: Terminal<Resp, E>) -> bool {
        let elapsed = clock.gap_virtual(self.created_at, now);
        self.total_processing_time.get_or_insert(elapsed);
        self.result.complete(terminal)
    }
}
