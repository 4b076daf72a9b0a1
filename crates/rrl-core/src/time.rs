//! Virtual/real time model shared by the scheduler and its collaborators.
//!
//! The scheduler reasons about two clocks at once: *real* wall-clock time,
//! which every blocking wait is capped against (`maxSleepTime`), and
//! *virtual* time, which is real time scaled by a `time_factor` knob. The
//! knob exists purely so tests can compress delays/backoffs/validity windows
//! without touching real sleeps; it must never be reachable from the
//! `processRequest` callback surface.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// A clonable handle to the engine's notion of "now" and its virtual-time
/// scaling factor.
///
/// `Clock` wraps `tokio::time::Instant` rather than `std::time::Instant` so
/// that tests using `tokio::time::pause`/`advance` observe a controllable
/// clock without the engine needing to know it is under test.
#[derive(Clone, Debug)]
pub struct Clock {
    inner: Arc<ClockState>,
}

#[derive(Debug)]
struct ClockState {
    /// `f64` bits of the current time factor. `NaN` means "real time".
    factor_bits: AtomicU64,
}

impl Default for Clock {
    fn default() -> Self {
        Self::real()
    }
}

impl Clock {
    /// A clock with no virtual-time scaling (`time_factor() == NaN`).
    pub fn real() -> Self {
        Self {
            inner: Arc::new(ClockState {
                factor_bits: AtomicU64::new(f64::NAN.to_bits()),
            }),
        }
    }

    /// A clock that scales every virtual-time computation by `factor`.
    ///
    /// Intended for tests: a `factor` of `10.0` makes one real millisecond
    /// worth ten virtual milliseconds, so delays/backoffs/validity windows
    /// specified in virtual time elapse ten times faster in real time.
    pub fn with_time_factor(factor: f64) -> Self {
        let clock = Self::real();
        clock.set_time_factor(factor);
        clock
    }

    /// Current real-wall-clock timestamp.
    pub fn now(&self) -> Instant {
        Instant::now()
    }

    /// The current scaling factor, or `NaN` if running at real time.
    pub fn time_factor(&self) -> f64 {
        f64::from_bits(self.inner.factor_bits.load(Ordering::Acquire))
    }

    /// Overrides the scaling factor. Test-only in spirit (see module docs);
    /// not gated behind `cfg(test)` because external test harnesses need it
    /// too, but it is never exposed through the `processRequest` surface.
    pub fn set_time_factor(&self, factor: f64) {
        self.inner
            .factor_bits
            .store(factor.to_bits(), Ordering::Release);
    }

    fn effective_factor(&self) -> f64 {
        let f = self.time_factor();
        if f.is_nan() { 1.0 } else { f }
    }

    /// Virtual-ms elapsed between two real timestamps.
    ///
    /// Never zero unless `start == end`. For a negative delta (`end` before
    /// `start`), the ceiling result is additionally decremented by one so
    /// that small negative deltas that would otherwise ceiling to zero stay
    /// negative and non-zero.
    pub fn gap_virtual(&self, start: Instant, end: Instant) -> i64 {
        if start == end {
            return 0;
        }
        let real_ms = signed_millis(start, end);
        let raw = real_ms * self.effective_factor();
        let mut v = raw.ceil() as i64;
        if real_ms < 0.0 {
            v -= 1;
        } else if v == 0 {
            v = 1;
        }
        v
    }

    /// Advances `real` by the real-time equivalent of `virtual_ms`.
    ///
    /// Always produces a strictly later timestamp for positive
    /// `virtual_ms`, regardless of how large `time_factor` is.
    pub fn add_virtual_to_real(&self, real: Instant, virtual_ms: i64) -> Instant {
        if virtual_ms == 0 {
            return real;
        }
        let factor = self.effective_factor();
        let real_ms = (virtual_ms as f64) / factor;
        if virtual_ms > 0 {
            let nanos = (real_ms * 1_000_000.0).max(1.0);
            real + Duration::from_nanos(nanos as u64)
        } else {
            let nanos = (-real_ms * 1_000_000.0).max(1.0);
            real.checked_sub(Duration::from_nanos(nanos as u64))
                .unwrap_or(real)
        }
    }

    /// The real-time `Duration` corresponding to `virtual_ms` starting now.
    pub fn real_interval(&self, virtual_ms: i64) -> Duration {
        let t0 = self.now();
        let t1 = self.add_virtual_to_real(t0, virtual_ms);
        if t1 >= t0 {
            t1 - t0
        } else {
            Duration::ZERO
        }
    }
}

fn signed_millis(start: Instant, end: Instant) -> f64 {
    if end >= start {
        (end - start).as_secs_f64() * 1000.0
    } else {
        -((start - end).as_secs_f64() * 1000.0)
    }
}
