mod support;

mod capacity_rejection;
mod graceful_drain;
mod happy_path;
mod hard_drain;
mod retry_then_success;
mod timeout_before_retry;
