//! S3 (timeout before retry): the request's own validity expires while it
//! is sitting out the backoff delay, so the next decision times it out
//! instead of dispatching a second attempt.

use super::support::{always_fails, base_config, new_scheduler};
use rrl::{GetError, ResilienceError};
use std::time::Duration;

#[tokio::test(start_paused = true)]
async fn expires_during_backoff_instead_of_retrying() {
    let config = base_config()
        .max_attempts(3)
        .delays_after_failure(vec![Duration::from_millis(300)])
        .delay_queues(vec![Duration::from_millis(350)])
        .build()
        .unwrap();
    let scheduler = new_scheduler(config, always_fails());
    scheduler.start().unwrap();

    let future = scheduler.submit(1, Duration::from_millis(150)).await.unwrap();
    let result = future.get(Some(Duration::from_secs(5))).await;

    match result {
        Err(GetError::Terminal(ResilienceError::Timeout { .. })) => {}
        other => panic!("expected a timeout terminal, got {other:?}"),
    }
}
