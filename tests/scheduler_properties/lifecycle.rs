//! Invariant 9: calling `start`/`shutdown*` again once the service has
//! reached `SHUTDOWN` (or calling `start` twice) raises an illegal-state
//! error with no other side effect.

use crate::support::{base_config, new_scheduler};
use rrl::{ControlStateError, ControlStateKind, ShutdownOptions};
use std::time::Duration;

#[tokio::test]
async fn start_twice_is_rejected() {
    let config = base_config().build().unwrap();
    let scheduler = new_scheduler(config, crate::support::always_fails());
    scheduler.start().unwrap();
    assert_eq!(scheduler.start().unwrap_err(), ControlStateError::StartNotLegal);
    assert_eq!(scheduler.control_state().kind, ControlStateKind::Running);
}

#[tokio::test]
async fn shutdown_after_shutdown_is_rejected() {
    let config = base_config().build().unwrap();
    let scheduler = new_scheduler(config, crate::support::always_fails());
    scheduler.start().unwrap();
    scheduler.shutdown_now().unwrap();
    assert_eq!(scheduler.control_state().kind, ControlStateKind::Shutdown);

    assert_eq!(
        scheduler.shutdown_now().unwrap_err(),
        ControlStateError::ShutdownNotLegalAfterShutdown
    );
    assert_eq!(
        scheduler
            .shutdown_for(Duration::from_secs(1), ShutdownOptions::default())
            .await
            .unwrap_err(),
        ControlStateError::ShutdownNotLegalAfterShutdown
    );
    assert_eq!(scheduler.start().unwrap_err(), ControlStateError::StartNotLegal);
    assert_eq!(scheduler.control_state().kind, ControlStateKind::Shutdown);
}
