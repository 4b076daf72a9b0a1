//! The user-supplied processing callback (spec §6 "Processing callback").

use futures::future::BoxFuture;
use std::sync::Arc;

/// `processRequest(input, attemptNumber) -> output | throws`.
///
/// `attempt` starts at 1 and is the *next* attempt number at call time.
/// The input is shared via `Arc` so the same value backs both the
/// in-flight attempt and the caller's [`crate::RequestFuture::get_task`].
pub type ProcessFn<Req, Resp, E> =
    Arc<dyn Fn(Arc<Req>, usize) -> BoxFuture<'static, Result<Resp, E>> + Send + Sync>;
