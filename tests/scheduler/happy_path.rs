//! S1 (happy path): one entry, succeeds on the first attempt.

use super::support::{assert_subsequence, base_config, flaky_process_fn, new_scheduler, EventRecorder};
use std::time::Duration;

#[tokio::test]
async fn succeeds_on_first_attempt_with_expected_event_order() {
    let config = base_config().max_attempts(3).build().unwrap();
    let scheduler = new_scheduler(config, flaky_process_fn(0));

    let recorder = EventRecorder::new();
    recorder.attach(&scheduler);
    scheduler.start().unwrap();

    let future = scheduler.submit(21, Duration::from_secs(2)).await.unwrap();
    let response = future.get(Some(Duration::from_secs(2))).await.unwrap();
    assert_eq!(response, "21");

    assert_subsequence(
        &recorder.names(),
        &["request_added", "request_executing", "request_success", "request_removed"],
    );
}
