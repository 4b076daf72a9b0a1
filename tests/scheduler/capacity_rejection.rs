//! S4 (capacity rejection): a second submission is rejected synchronously
//! once `max_pending_requests` in-flight entries are already held.

use super::support::{base_config, new_scheduler, EventRecorder};
use rrl::{RejectionReason, SubmitError};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[tokio::test]
async fn second_submission_rejects_synchronously() {
    let config = base_config()
        .max_pending_requests(1)
        .worker_pool(1, 1)
        .build()
        .unwrap();

    let calls = Arc::new(AtomicUsize::new(0));
    let calls2 = Arc::clone(&calls);
    let blocking: rrl::ProcessFn<u32, String, super::support::TestError> = Arc::new(move |input, _attempt| {
        let calls = Arc::clone(&calls2);
        Box::pin(async move {
            calls.fetch_add(1, Ordering::SeqCst);
            let _ = input;
            std::future::pending::<Result<String, super::support::TestError>>().await
        })
    });

    let scheduler = new_scheduler(config, blocking);
    let recorder = EventRecorder::new();
    recorder.attach(&scheduler);
    scheduler.start().unwrap();

    let _first = scheduler.submit(1, Duration::from_secs(5)).await.unwrap();
    tokio::task::yield_now().await;

    let second = scheduler.submit(2, Duration::from_secs(5)).await;
    match second {
        Err(SubmitError::Rejected(err)) => {
            assert!(matches!(err.reason, RejectionReason::AtCapacity { .. }));
        }
        Err(SubmitError::Validation(e)) => panic!("unexpected validation error: {e:?}"),
        Ok(_) => panic!("expected a capacity rejection but the submission succeeded"),
    }
    assert_eq!(recorder.count("error_request_rejected"), 1);
}
