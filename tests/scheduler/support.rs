//! Shared fixtures for the scheduler integration tests (spec.md §8 S1-S6).

use rrl::{FnListener, ProcessFn, Scheduler, SchedulerConfig, SchedulerConfigBuilder};
use rrl::{SchedulerEvent, SchedulerEventKind};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestError(pub &'static str);

impl std::fmt::Display for TestError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for TestError {}

pub type TestScheduler = Scheduler<u32, String, TestError>;

/// Records every event a scheduler under test emits, in order.
#[derive(Clone, Default)]
pub struct EventRecorder {
    kinds: Arc<Mutex<Vec<SchedulerEventKind>>>,
}

impl EventRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attach(&self, scheduler: &TestScheduler) {
        let kinds = Arc::clone(&self.kinds);
        scheduler.add_event_listener(FnListener::new(move |event: &SchedulerEvent| {
            kinds.lock().unwrap().push(event.kind.clone());
        }));
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.kinds.lock().unwrap().iter().map(|k| k.name()).collect()
    }

    pub fn count(&self, name: &str) -> usize {
        self.names().iter().filter(|n| **n == name).count()
    }

    pub fn events(&self) -> Vec<SchedulerEventKind> {
        self.kinds.lock().unwrap().clone()
    }
}

/// Fails on the first `fail_attempts` calls, then succeeds with the input
/// rendered as a string.
pub fn flaky_process_fn(fail_attempts: usize) -> ProcessFn<u32, String, TestError> {
    let calls = Arc::new(AtomicUsize::new(0));
    Arc::new(move |input: Arc<u32>, _attempt: usize| {
        let calls = Arc::clone(&calls);
        Box::pin(async move {
            let call = calls.fetch_add(1, Ordering::SeqCst);
            if call < fail_attempts {
                Err(TestError("simulated failure"))
            } else {
                Ok(input.to_string())
            }
        })
    })
}

/// Always fails.
pub fn always_fails() -> ProcessFn<u32, String, TestError> {
    Arc::new(|_input: Arc<u32>, _attempt: usize| Box::pin(async move { Err(TestError("always fails")) }))
}

/// Succeeds after sleeping `delay`, for tests that need to hold a worker
/// slot or keep a request in-flight for a controlled window.
pub fn slow_success(delay: Duration) -> ProcessFn<u32, String, TestError> {
    Arc::new(move |input: Arc<u32>, _attempt: usize| {
        Box::pin(async move {
            tokio::time::sleep(delay).await;
            Ok(input.to_string())
        })
    })
}

/// A builder pre-populated with fast, test-friendly defaults: a single
/// short delay tier and a short `max_sleep_time` so real-time sleeps in the
/// engine never dominate a test's wall-clock budget.
pub fn base_config() -> SchedulerConfigBuilder {
    SchedulerConfigBuilder::new()
        .service_name("scheduler-test")
        .max_pending_requests(64)
        .delay_queues(vec![Duration::from_millis(15)])
        .worker_pool(2, 4)
        .max_sleep_time(Duration::from_millis(10))
}

/// Builds a scheduler but does not start it, so a caller can attach an
/// [`EventRecorder`] first and observe the background tasks' own events too
/// (see `Scheduler::add_event_listener`'s doc comment: a listener only sees
/// main-loop/delay-tier events if it was registered before `start()`).
pub fn new_scheduler(config: SchedulerConfig, process_fn: ProcessFn<u32, String, TestError>) -> TestScheduler {
    Scheduler::new(config, process_fn, tokio::runtime::Handle::current())
}

pub fn start_scheduler(config: SchedulerConfig, process_fn: ProcessFn<u32, String, TestError>) -> TestScheduler {
    let scheduler = new_scheduler(config, process_fn);
    scheduler.start().unwrap();
    scheduler
}

/// Asserts every name in `expected` appears in `names`, in that relative
/// order, allowing other events to interleave between them.
pub fn assert_subsequence(names: &[&str], expected: &[&str]) {
    let mut cursor = 0;
    for want in expected {
        match names[cursor..].iter().position(|n| n == want) {
            Some(offset) => cursor += offset + 1,
            None => panic!("expected {want:?} after position {cursor} in {names:?}"),
        }
    }
}
