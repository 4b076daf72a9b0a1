//! Invariants 4-6: the attempts bound, delay-schedule monotonicity (the
//! retry delay is `min(remaining_validity, delaysAfterFailure[...])`), and
//! the validity timeout (no entry executes past its own deadline).

use crate::support::{always_fails, base_config, new_scheduler};
use proptest::prelude::*;
use rrl::{GetError, ProcessFn, ResilienceError};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Builder;

#[derive(Debug, Clone, PartialEq, Eq)]
struct AttemptsError;

impl std::fmt::Display for AttemptsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "attempts error")
    }
}
impl std::error::Error for AttemptsError {}

fn fails_n_times(n: usize) -> ProcessFn<u32, String, AttemptsError> {
    let calls = Arc::new(AtomicUsize::new(0));
    Arc::new(move |input: Arc<u32>, _attempt: usize| {
        let calls = Arc::clone(&calls);
        Box::pin(async move {
            let call = calls.fetch_add(1, Ordering::SeqCst);
            if call < n {
                Err(AttemptsError)
            } else {
                Ok(input.to_string())
            }
        })
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    /// A single entry never makes more than `max_attempts` attempts, and an
    /// entry that exhausts them reaches final failure on the `max_attempts`th.
    #[test]
    fn attempts_never_exceed_max_attempts(
        max_attempts in 1usize..=6,
        failures in 0usize..=8,
    ) {
        let rt = Builder::new_current_thread().enable_all().build().unwrap();
        rt.block_on(async move {
            let config = rrl::SchedulerConfigBuilder::new()
                .service_name("attempts-property")
                .max_attempts(max_attempts)
                .delays_after_failure(vec![Duration::from_millis(1)])
                .delay_queues(vec![Duration::from_millis(5)])
                .max_sleep_time(Duration::from_millis(1))
                .worker_pool(2, 4)
                .build()
                .unwrap();
            let scheduler: rrl::Scheduler<u32, String, AttemptsError> =
                rrl::Scheduler::new(config, fails_n_times(failures), tokio::runtime::Handle::current());
            scheduler.start().unwrap();

            let future = scheduler.submit(1, Duration::from_secs(10)).await.unwrap();
            let result = future.get(Some(Duration::from_secs(10))).await;

            if failures < max_attempts {
                prop_assert!(result.is_ok(), "expected success once failures < max_attempts");
            } else {
                match result {
                    Err(GetError::Terminal(ResilienceError::Application(_))) => {}
                    other => prop_assert!(false, "expected a final application failure, got {other:?}"),
                }
            }
            Ok(())
        })?;
    }

    /// The retry delay actually applied, measured on the engine's own
    /// (pausable) clock, matches `delays_after_failure[0]` when the request's
    /// validity is far looser than the configured delay.
    #[test]
    fn retry_delay_matches_config_when_validity_is_not_binding(
        delay_ms in 20u64..=300,
    ) {
        let rt = Builder::new_current_thread().enable_all().build().unwrap();
        rt.block_on(async move {
            tokio::time::pause();

            let config = base_config()
                .max_attempts(2)
                .delays_after_failure(vec![Duration::from_millis(delay_ms)])
                .delay_queues(vec![Duration::from_millis(delay_ms * 4 + 50)])
                .build()
                .unwrap();
            let scheduler = new_scheduler(config, always_fails_then_succeeds());
            scheduler.start().unwrap();

            let started = tokio::time::Instant::now();
            let future = scheduler.submit(9, Duration::from_secs(30)).await.unwrap();
            future.get(Some(Duration::from_secs(30))).await.unwrap();
            let elapsed = tokio::time::Instant::now().saturating_duration_since(started);

            prop_assert!(
                elapsed >= Duration::from_millis(delay_ms),
                "elapsed {elapsed:?} should be at least the configured delay {delay_ms}ms"
            );
            prop_assert!(
                elapsed <= Duration::from_millis(delay_ms) + Duration::from_millis(60),
                "elapsed {elapsed:?} overshot the configured delay {delay_ms}ms by more than slack"
            );
            Ok(())
        })?;
    }

    /// When the request's own validity is tighter than the configured retry
    /// delay, the entry times out instead of waiting the full delay, and the
    /// reported total processing time never exceeds the validity window.
    #[test]
    fn validity_timeout_bounds_total_processing_time(
        validity_ms in 20u64..=200,
    ) {
        let rt = Builder::new_current_thread().enable_all().build().unwrap();
        rt.block_on(async move {
            tokio::time::pause();

            let config = base_config()
                .max_attempts(5)
                .delays_after_failure(vec![Duration::from_secs(10)])
                .delay_queues(vec![Duration::from_secs(11)])
                .build()
                .unwrap();
            let scheduler = new_scheduler(config, always_fails());
            scheduler.start().unwrap();

            let future = scheduler
                .submit(1, Duration::from_millis(validity_ms))
                .await
                .unwrap();
            let result = future.get(Some(Duration::from_secs(30))).await;

            match result {
                Err(GetError::Terminal(ResilienceError::Timeout {
                    total_processing_time_ms,
                })) => {
                    prop_assert!(
                        total_processing_time_ms <= validity_ms as i64 + 50,
                        "total_processing_time_ms {total_processing_time_ms} exceeded validity {validity_ms}ms by more than slack"
                    );
                }
                other => prop_assert!(false, "expected a timeout terminal, got {other:?}"),
            }
            Ok(())
        })?;
    }
}

fn always_fails_then_succeeds() -> ProcessFn<u32, String, crate::support::TestError> {
    Arc::new(|input: Arc<u32>, attempt: usize| {
        Box::pin(async move {
            if attempt <= 1 {
                Err(crate::support::TestError("simulated failure"))
            } else {
                Ok(input.to_string())
            }
        })
    })
}
