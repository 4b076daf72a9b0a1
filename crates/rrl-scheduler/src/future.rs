//! Result handle (C4): a single-assignment cell with four terminal states,
//! plus the caller-visible [`RequestFuture`] built on top of it.

use rrl_core::ResilienceError;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Notify;

/// The terminal outcome of one submitted entry.
#[derive(Debug)]
pub enum Terminal<Resp, E> {
    Success(Resp),
    Cancelled,
    Timeout { total_processing_time_ms: i64 },
    Error(E),
}

/// A coarse tag for [`Terminal`] that doesn't require moving the value out,
/// used by [`RequestFuture::poll_done`] and the status/observability
/// surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminalKind {
    Success,
    Cancelled,
    Timeout,
    Error,
}

impl<Resp, E> Terminal<Resp, E> {
    pub fn kind(&self) -> TerminalKind {
        match self {
            Terminal::Success(_) => TerminalKind::Success,
            Terminal::Cancelled => TerminalKind::Cancelled,
            Terminal::Timeout { .. } => TerminalKind::Timeout,
            Terminal::Error(_) => TerminalKind::Error,
        }
    }
}

enum CellState<Resp, E> {
    Pending,
    Done(Terminal<Resp, E>),
    Taken(TerminalKind),
}

/// The single-assignment cell underlying a submitted entry's result.
///
/// Shared between the entry (which completes it exactly once, from one of
/// the engine's four terminal handlers) and the caller-visible
/// [`RequestFuture`] (which reads it, possibly many times before it's
/// done, and consumes it exactly once via `get`).
pub(crate) struct ResultCell<Resp, E> {
    state: Mutex<CellState<Resp, E>>,
    notify: Notify,
}

impl<Resp, E> ResultCell<Resp, E> {
    pub(crate) fn new() -> Self {
        Self {
            state: Mutex::new(CellState::Pending),
            notify: Notify::new(),
        }
    }

    /// Completes the cell. Returns `false` (an assertion-error condition,
    /// per spec §3.4 "later writers are a no-op ... constitute an
    /// assertion error") if the cell was already done.
    pub(crate) fn complete(&self, terminal: Terminal<Resp, E>) -> bool {
        let mut state = self.state.lock().unwrap();
        match &*state {
            CellState::Pending => {
                *state = CellState::Done(terminal);
                drop(state);
                self.notify.notify_waiters();
                true
            }
            _ => false,
        }
    }

    pub(crate) fn kind(&self) -> Option<TerminalKind> {
        match &*self.state.lock().unwrap() {
            CellState::Pending => None,
            CellState::Done(t) => Some(t.kind()),
            CellState::Taken(k) => Some(*k),
        }
    }

    /// Awaits completion without consuming the value.
    pub(crate) async fn wait(&self) {
        loop {
            if self.kind().is_some() {
                return;
            }
            let notified = self.notify.notified();
            if self.kind().is_some() {
                return;
            }
            notified.await;
        }
    }

    /// Takes the terminal value, leaving a `Taken` marker behind. Only
    /// meaningful after [`ResultCell::wait`] (or a `kind` check) confirmed
    /// completion.
    pub(crate) fn take(&self) -> Option<Terminal<Resp, E>> {
        let mut state = self.state.lock().unwrap();
        match std::mem::replace(&mut *state, CellState::Pending) {
            CellState::Done(t) => {
                let k = t.kind();
                *state = CellState::Taken(k);
                Some(t)
            }
            other @ (CellState::Pending | CellState::Taken(_)) => {
                *state = other;
                None
            }
        }
    }
}

/// Error produced by [`RequestFuture::get`] — every way a submitted
/// request can fail to produce a value for the caller, per spec §3.4.
#[derive(Debug, Error)]
pub enum GetError<E> {
    /// The engine reached a terminal outcome; see the wrapped
    /// [`ResilienceError`] for which one.
    #[error(transparent)]
    Terminal(#[from] ResilienceError<E>),
    /// The caller's own deadline passed before the engine completed the
    /// request — distinct from an engine-side timeout.
    #[error("wait expired before the request completed")]
    DeadlinePassed,
}

/// The caller-visible handle returned by `submit*`.
///
/// Semantically a single-assignment cell with four possible terminal
/// states (spec §3.4). `Req` is kept behind an `Arc` so `get_task` can
/// return it without requiring `Req: Clone`, and so the same input is
/// visible to the request worker's `process_request` callback.
pub struct RequestFuture<Req, Resp, E> {
    pub(crate) input: Arc<Req>,
    pub(crate) cell: Arc<ResultCell<Resp, E>>,
    pub(crate) cancel_requested: Arc<AtomicBool>,
}

impl<Req, Resp, E> RequestFuture<Req, Resp, E> {
    /// True once the entry has reached any terminal state.
    pub fn is_done(&self) -> bool {
        self.cell.kind().is_some()
    }

    /// True if the terminal state is [`TerminalKind::Cancelled`].
    pub fn is_cancelled(&self) -> bool {
        self.cell.kind() == Some(TerminalKind::Cancelled)
    }

    /// True if the terminal state is [`TerminalKind::Success`].
    pub fn is_successful(&self) -> bool {
        self.cell.kind() == Some(TerminalKind::Success)
    }

    /// Returns the original submitted input.
    pub fn get_task(&self) -> Arc<Req> {
        Arc::clone(&self.input)
    }

    /// Requests cancellation. No guarantee of effect: the flag is only
    /// consulted at main-queue decision points, and once dispatched to a
    /// worker an attempt runs to completion (spec §5 "Cancellation
    /// semantics").
    pub fn request_cancellation(&self) {
        self.cancel_requested.store(true, Ordering::Release);
    }

    /// Non-blocking peek at the terminal variant, without consuming the
    /// handle (§12 "`into_future`-free polling accessor").
    pub fn poll_done(&self) -> Option<TerminalKind> {
        self.cell.kind()
    }

    /// Blocks (asynchronously) until the request reaches a terminal state,
    /// or `deadline` elapses, whichever comes first.
    pub async fn get(self, deadline: Option<Duration>) -> Result<Resp, GetError<E>> {
        match deadline {
            Some(d) => {
                if tokio::time::timeout(d, self.cell.wait()).await.is_err() {
                    return Err(GetError::DeadlinePassed);
                }
            }
            None => self.cell.wait().await,
        }

        let terminal = self
            .cell
            .take()
            .expect("cell reached Done before take() is called exactly once");

        match terminal {
            Terminal::Success(resp) => Ok(resp),
            Terminal::Cancelled => Err(ResilienceError::Cancelled.into()),
            Terminal::Timeout {
                total_processing_time_ms,
            } => Err(ResilienceError::Timeout {
                total_processing_time_ms,
            }
            .into()),
            Terminal::Error(e) => Err(ResilienceError::Application(e).into()),
        }
    }

    /// `get` variant returning `None` (the "absent" sentinel) instead of
    /// raising when `deadline` passes first, mirroring `getOrNull`.
    pub async fn get_or_absent(
        self,
        deadline: Duration,
    ) -> Option<Result<Resp, ResilienceError<E>>> {
        match self.get(Some(deadline)).await {
            Ok(resp) => Some(Ok(resp)),
            Err(GetError::DeadlinePassed) => None,
            Err(GetError::Terminal(e)) => Some(Err(e)),
        }
    }
}
