//! Unified error wrapper for composing the scheduler with other resilience
//! layers without hand-writing `From` impls for each one.

use std::fmt;
use std::time::Duration;

/// A common error type for composing the scheduler with other middleware.
///
/// Mirrors the zero-boilerplate `ResilienceError<E>` pattern used across the
/// `tower-resilience` lineage: application errors are preserved in
/// `Application`, everything else is a categorized scheduler-level outcome.
#[derive(Debug, Clone)]
pub enum ResilienceError<E> {
    /// The request's validity window elapsed before it could be dispatched
    /// or completed.
    Timeout {
        /// Total virtual-ms the request spent in the pipeline.
        total_processing_time_ms: i64,
    },

    /// The submission was rejected before entering the pipeline.
    Rejected {
        /// Human-readable reason (mirrors the control state's reject reason
        /// or the capacity-exceeded message).
        reason: String,
    },

    /// A ticket could not be obtained from the rate limiter in time.
    RateLimited {
        /// How long the caller waited before giving up, if known.
        waited: Option<Duration>,
    },

    /// The caller cancelled the request before it was dispatched.
    Cancelled,

    /// The wrapped user callback returned an error.
    Application(E),
}

impl<E> fmt::Display for ResilienceError<E>
where
    E: fmt::Display,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResilienceError::Timeout {
                total_processing_time_ms,
            } => write!(
                f,
                "request timed out after {total_processing_time_ms}ms of processing"
            ),
            ResilienceError::Rejected { reason } => write!(f, "request rejected: {reason}"),
            ResilienceError::RateLimited { waited } => match waited {
                Some(d) => write!(f, "rate limited, waited {d:?} before giving up"),
                None => write!(f, "rate limited"),
            },
            ResilienceError::Cancelled => write!(f, "request cancelled"),
            ResilienceError::Application(e) => write!(f, "application error: {e}"),
        }
    }
}

impl<E> std::error::Error for ResilienceError<E> where E: std::error::Error {}

impl<E> ResilienceError<E> {
    /// True if this is a [`ResilienceError::Timeout`].
    pub fn is_timeout(&self) -> bool {
        matches!(self, ResilienceError::Timeout { .. })
    }

    /// True if this is a [`ResilienceError::Rejected`].
    pub fn is_rejected(&self) -> bool {
        matches!(self, ResilienceError::Rejected { .. })
    }

    /// True if this is a [`ResilienceError::RateLimited`].
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, ResilienceError::RateLimited { .. })
    }

    /// True if this is a [`ResilienceError::Cancelled`].
    pub fn is_cancelled(&self) -> bool {
        matches!(self, ResilienceError::Cancelled)
    }

    /// True if this wraps an application error.
    pub fn is_application(&self) -> bool {
        matches!(self, ResilienceError::Application(_))
    }

    /// Extracts the wrapped application error, if any.
    pub fn application_error(self) -> Option<E> {
        match self {
            ResilienceError::Application(e) => Some(e),
            _ => None,
        }
    }

    /// Maps the wrapped application error.
    pub fn map_application<F, T>(self, f: F) -> ResilienceError<T>
    where
        F: FnOnce(E) -> T,
    {
        match self {
            ResilienceError::Timeout {
                total_processing_time_ms,
            } => ResilienceError::Timeout {
                total_processing_time_ms,
            },
            ResilienceError::Rejected { reason } => ResilienceError::Rejected { reason },
            ResilienceError::RateLimited { waited } => ResilienceError::RateLimited { waited },
            ResilienceError::Cancelled => ResilienceError::Cancelled,
            ResilienceError::Application(e) => ResilienceError::Application(f(e)),
        }
    }
}
