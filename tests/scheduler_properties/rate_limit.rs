//! Invariant 7: with an unlimited pool of pending work, the count of
//! `requestExecuting` events observed over any window of `W` refill
//! intervals never exceeds `bucket_size + W * refill_rate + 1`.

use crate::support::{base_config, flaky_process_fn, new_scheduler, EventRecorder};
use proptest::prelude::*;
use std::time::Duration;
use tokio::runtime::Builder;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn rate_limiter_bounds_executions_per_window(
        bucket_size in 1u64..=4,
        refill_rate in 1u64..=4,
        windows in 1u64..=3,
    ) {
        let rt = Builder::new_current_thread().enable_all().build().unwrap();
        rt.block_on(async move {
            tokio::time::pause();

            let interval = Duration::from_millis(100);
            let config = base_config()
                .max_pending_requests(512)
                .worker_pool(32, 64)
                .rate_limiter(bucket_size, refill_rate, interval)
                .build()
                .unwrap();
            // Many more entries than any window could possibly admit, so the
            // limiter -- not the supply of work -- is what's gating execution.
            let total_requests = (bucket_size + refill_rate * (windows + 2)) as u32 * 3;
            let scheduler = new_scheduler(config, flaky_process_fn(0));

            let recorder = EventRecorder::new();
            recorder.attach(&scheduler);
            scheduler.start().unwrap();

            for i in 1..=total_requests {
                let _ = scheduler.submit(i, Duration::from_secs(60)).await.unwrap();
            }

            tokio::time::advance(interval * windows as u32).await;
            // Let every task that's ready to run at this virtual instant
            // actually get polled before we count.
            for _ in 0..8 {
                tokio::task::yield_now().await;
            }

            let executing_count = recorder.count("request_executing");
            let bound = bucket_size + refill_rate * windows + 1;
            prop_assert!(
                executing_count as u64 <= bound,
                "observed {executing_count} executions within {windows} intervals, bound is {bound}"
            );
            Ok(())
        })?;
    }
}
