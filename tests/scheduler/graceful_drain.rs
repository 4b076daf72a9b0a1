//! S5 (graceful drain): a generous deadline lets every in-flight entry
//! finish before the drain completes, even with a tight rate limiter.

use super::support::{base_config, flaky_process_fn, start_scheduler};
use rrl::{ControlStateKind, ShutdownOptions};
use std::time::Duration;

#[tokio::test(start_paused = true)]
async fn all_entries_complete_before_the_deadline() {
    let config = base_config()
        .worker_pool(5, 5)
        .rate_limiter(1, 1, Duration::from_secs(1))
        .build()
        .unwrap();
    let scheduler = start_scheduler(config, flaky_process_fn(0));

    let mut futures = Vec::new();
    for i in 1..=5u32 {
        futures.push(scheduler.submit(i, Duration::from_secs(20)).await.unwrap());
    }

    let gather = async {
        for f in futures {
            f.get(Some(Duration::from_secs(20))).await.unwrap();
        }
    };
    let shutdown = scheduler.shutdown_for(Duration::from_secs(10), ShutdownOptions::new().ignore_delays(true));

    let (shutdown_result, ()) = tokio::join!(shutdown, gather);
    shutdown_result.unwrap();

    assert_eq!(scheduler.control_state().kind, ControlStateKind::Shutdown);
}
