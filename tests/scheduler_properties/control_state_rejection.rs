//! Invariant 10: while the control state carries a `reject_requests_reason`,
//! every submission is rejected and the reported reason matches it.

use crate::support::{base_config, new_scheduler};
use proptest::prelude::*;
use rrl::{ControlState, RejectionReason, SubmitError};
use std::time::Duration;
use tokio::runtime::Builder;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(20))]

    #[test]
    fn custom_reject_reason_is_surfaced_on_every_submission(
        reason in "[a-z]{3,24}",
        attempts in 1usize..=4,
    ) {
        let rt = Builder::new_current_thread().enable_all().build().unwrap();
        rt.block_on(async move {
            let config = base_config().build().unwrap();
            let scheduler = new_scheduler(config, crate::support::always_fails());
            scheduler.start().unwrap();

            let mut custom = ControlState::running();
            custom.reject_requests_reason = Some(reason.clone());
            scheduler.set_control_state(custom);

            prop_assert!(!scheduler.is_accepting_requests());

            for i in 0..attempts {
                match scheduler.submit(i as u32, Duration::from_secs(5)).await {
                    Err(SubmitError::Rejected(err)) => match err.reason {
                        RejectionReason::NotAccepting { reason: got } => {
                            prop_assert_eq!(got, reason.clone());
                        }
                        other => prop_assert!(false, "expected NotAccepting, got {other:?}"),
                    },
                    Err(SubmitError::Validation(e)) => {
                        prop_assert!(false, "unexpected validation error: {e:?}")
                    }
                    Ok(_) => prop_assert!(false, "expected submission to be rejected but it succeeded"),
                }
            }
            Ok(())
        })?;
    }
}
