//! Invariants 1-3: exactly-once terminal per entry, requestAdded/requestRemoved
//! balance, and a running in-flight count that is never observably negative.

use crate::support::{base_config, new_scheduler, EventRecorder, TestError};
use proptest::prelude::*;
use rrl::ProcessFn;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Builder;

const TERMINAL_KINDS: &[&str] = &[
    "request_success",
    "request_final_failure",
    "request_final_timeout",
    "request_cancelled",
];

fn counting_process_fn(fail_until_attempt: Vec<usize>) -> ProcessFn<u32, String, TestError> {
    Arc::new(move |input: Arc<u32>, attempt: usize| {
        let threshold = fail_until_attempt[(*input as usize) - 1];
        Box::pin(async move {
            if attempt <= threshold {
                Err(TestError("simulated failure"))
            } else {
                Ok(input.to_string())
            }
        })
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    /// Each entry produces exactly one terminal event, `requestRemoved` fires
    /// once per entry, and at no prefix of the event stream does the running
    /// count of removals exceed the count of additions.
    #[test]
    fn exactly_one_terminal_and_balanced_counters(
        fail_until_attempt in prop::collection::vec(0usize..=4, 1..=6),
    ) {
        let n = fail_until_attempt.len();
        let rt = Builder::new_current_thread().enable_all().build().unwrap();
        rt.block_on(async move {
            tokio::time::pause();

            let config = base_config()
                .max_attempts(3)
                .delays_after_failure(vec![Duration::from_millis(15)])
                .worker_pool(4, 8)
                .build()
                .unwrap();
            let scheduler = new_scheduler(config, counting_process_fn(fail_until_attempt));

            let recorder = EventRecorder::new();
            recorder.attach(&scheduler);
            scheduler.start().unwrap();

            let mut futures = Vec::new();
            for i in 1..=(n as u32) {
                futures.push(scheduler.submit(i, Duration::from_secs(30)).await.unwrap());
            }
            for f in futures {
                let _ = f.get(Some(Duration::from_secs(30))).await;
            }

            let events = recorder.events();
            let names: Vec<&'static str> = events.iter().map(|e| e.name()).collect();

            let terminal_count = names.iter().filter(|n| TERMINAL_KINDS.contains(n)).count();
            prop_assert_eq!(terminal_count, n, "expected exactly one terminal event per entry");

            let removed_count = names.iter().filter(|n| **n == "request_removed").count();
            prop_assert_eq!(removed_count, n, "expected exactly one request_removed per entry");

            let mut added = 0i64;
            let mut removed = 0i64;
            for name in &names {
                match *name {
                    "request_added" => added += 1,
                    "request_removed" => removed += 1,
                    _ => {}
                }
                prop_assert!(removed <= added, "more removals than additions at some prefix");
                prop_assert!(added - removed >= 0, "negative in-flight count implied by event prefix");
            }
            prop_assert_eq!(added, n as i64);
            prop_assert_eq!(removed, n as i64);
            Ok(())
        })?;
    }
}
