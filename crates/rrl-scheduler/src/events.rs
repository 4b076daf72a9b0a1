//! Event vocabulary (§4.8). Every entry named in spec §4.8 has a variant
//! here; consumers register [`rrl_core::EventListener`]s against
//! [`SchedulerEvent`] to observe the engine without depending on its
//! internals.

use rrl_core::ResilienceEvent;
use std::time::Instant;

/// One occurrence in the scheduler's fixed event vocabulary.
#[derive(Debug, Clone)]
pub struct SchedulerEvent {
    pub kind: SchedulerEventKind,
    pub pattern_name: String,
    pub timestamp: Instant,
}

impl SchedulerEvent {
    pub fn new(pattern_name: impl Into<String>, kind: SchedulerEventKind) -> Self {
        Self {
            kind,
            pattern_name: pattern_name.into(),
            timestamp: Instant::now(),
        }
    }
}

impl ResilienceEvent for SchedulerEvent {
    fn event_type(&self) -> &'static str {
        self.kind.name()
    }

    fn timestamp(&self) -> Instant {
        self.timestamp
    }

    fn pattern_name(&self) -> &str {
        &self.pattern_name
    }
}

/// The fixed event vocabulary of spec §4.8.
#[derive(Debug, Clone)]
pub enum SchedulerEventKind {
    RequestAdded,
    RequestExecuting { attempt: usize },
    RequestSuccess { attempt: usize },
    RequestAttemptFailed { attempt: usize },
    RequestAttemptFailedDecision { description: String },
    RequestFinalFailure { attempts: usize },
    RequestFinalTimeout { total_processing_time_ms: i64 },
    RequestCancelled,
    RequestRemoved,

    MainQueueDecision { description: String },
    MainQueueThreadObtainAttempt { succeeded: bool },
    MainQueueTicketObtainAttempt { succeeded: bool },
    MainQueueProcessingCompleted,

    DelayQueueItemBeforeDelayStep { tier_delay_ms: u64 },
    DelayQueueDecisionAfterDelayStep { requeued_to_main: bool },

    ErrorAssertionError { description: String },
    ErrorRequestRejected { reason: String },
    ErrorSpiMethodException { hook: &'static str },
    ErrorEventListenerMethodException,
    ErrorUnexpectedInterruptedException { task: &'static str },
    ErrorUnexpectedRuntimeException { task: &'static str },
    ErrorShutdownSpooldownNotAchieved { remaining: usize },

    ServiceControlStateChanged { description: String },
}

impl SchedulerEventKind {
    pub fn name(&self) -> &'static str {
        match self {
            SchedulerEventKind::RequestAdded => "request_added",
            SchedulerEventKind::RequestExecuting { .. } => "request_executing",
            SchedulerEventKind::RequestSuccess { .. } => "request_success",
            SchedulerEventKind::RequestAttemptFailed { .. } => "request_attempt_failed",
            SchedulerEventKind::RequestAttemptFailedDecision { .. } => {
                "request_attempt_failed_decision"
            }
            SchedulerEventKind::RequestFinalFailure { .. } => "request_final_failure",
            SchedulerEventKind::RequestFinalTimeout { .. } => "request_final_timeout",
            SchedulerEventKind::RequestCancelled => "request_cancelled",
            SchedulerEventKind::RequestRemoved => "request_removed",
            SchedulerEventKind::MainQueueDecision { .. } => "main_queue_decision",
            SchedulerEventKind::MainQueueThreadObtainAttempt { .. } => {
                "main_queue_thread_obtain_attempt"
            }
            SchedulerEventKind::MainQueueTicketObtainAttempt { .. } => {
                "main_queue_ticket_obtain_attempt"
            }
            SchedulerEventKind::MainQueueProcessingCompleted => "main_queue_processing_completed",
            SchedulerEventKind::DelayQueueItemBeforeDelayStep { .. } => {
                "delay_queue_item_before_delay_step"
            }
            SchedulerEventKind::DelayQueueDecisionAfterDelayStep { .. } => {
                "delay_queue_decision_after_delay_step"
            }
            SchedulerEventKind::ErrorAssertionError { .. } => "error_assertion_error",
            SchedulerEventKind::ErrorRequestRejected { .. } => "error_request_rejected",
            SchedulerEventKind::ErrorSpiMethodException { .. } => "error_spi_method_exception",
            SchedulerEventKind::ErrorEventListenerMethodException => {
                "error_event_listener_method_exception"
            }
            SchedulerEventKind::ErrorUnexpectedInterruptedException { .. } => {
                "error_unexpected_interrupted_exception"
            }
            SchedulerEventKind::ErrorUnexpectedRuntimeException { .. } => {
                "error_unexpected_runtime_exception"
            }
            SchedulerEventKind::ErrorShutdownSpooldownNotAchieved { .. } => {
                "error_shutdown_spooldown_not_achieved"
            }
            SchedulerEventKind::ServiceControlStateChanged { .. } => {
                "service_control_state_changed"
            }
        }
    }
}
