//! S2 (retry then success): two failed attempts, then a third succeeds.

use super::support::{base_config, new_scheduler, EventRecorder};
use std::time::Duration;

#[tokio::test(start_paused = true)]
async fn retries_twice_then_succeeds() {
    let config = base_config()
        .max_attempts(3)
        .delays_after_failure(vec![Duration::from_millis(200)])
        .delay_queues(vec![Duration::from_millis(250)])
        .build()
        .unwrap();
    let scheduler = new_scheduler(config, super::support::flaky_process_fn(2));

    let recorder = EventRecorder::new();
    recorder.attach(&scheduler);
    scheduler.start().unwrap();

    let started = tokio::time::Instant::now();
    let future = scheduler.submit(7, Duration::from_secs(5)).await.unwrap();
    let response = future.get(Some(Duration::from_secs(5))).await.unwrap();
    assert_eq!(response, "7");

    // Paused time auto-advances past the two 200ms backoffs while the test
    // task is itself blocked on `get`, so real elapsed wall time stays near
    // zero; the virtual elapsed time is what spec S2 actually constrains.
    assert!(tokio::time::Instant::now().saturating_duration_since(started) >= Duration::from_millis(400));

    let names = recorder.names();
    assert_eq!(names.iter().filter(|n| **n == "request_attempt_failed").count(), 2);
    assert_eq!(names.iter().filter(|n| **n == "request_executing").count(), 3);
    assert_eq!(names.iter().filter(|n| **n == "request_success").count(), 1);
}
