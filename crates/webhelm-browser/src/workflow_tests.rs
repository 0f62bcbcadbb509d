use webhelm_protocols::{ErrorKind, OperationOutcome};

use super::*;

fn failure() -> OperationOutcome {
    OperationOutcome::Failure(ErrorKind::NavigationTimeout)
}

fn message(err: BrowserError) -> String {
    assert_eq!(err.kind(), ErrorKind::Validation);
    err.to_string()
}

#[test]
fn test_lifecycle_operations_always_admitted() {
    let ledger = WorkflowLedger::new(8);
    for state in [
        SessionState::Uninitialized,
        SessionState::Ready,
        SessionState::Crashed,
        SessionState::Closed,
    ] {
        assert!(ledger.validate(INIT, state).is_ok());
        assert!(ledger.validate(CLOSE, state).is_ok());
        assert!(ledger.validate(STATUS, state).is_ok());
    }
}

#[test]
fn test_content_before_init_names_init() {
    let ledger = WorkflowLedger::new(8);
    let msg = message(
        ledger
            .validate(GET_CONTENT, SessionState::Uninitialized)
            .unwrap_err(),
    );
    assert!(msg.contains("browser_init was never called"));
}

#[test]
fn test_failed_inits_are_reported() {
    let ledger = WorkflowLedger::new(8);
    ledger.record(INIT, OperationOutcome::Failure(ErrorKind::BrowserLaunch));
    ledger.record(INIT, OperationOutcome::Failure(ErrorKind::BrowserLaunch));

    let msg = message(ledger.validate(NAVIGATE, SessionState::Uninitialized).unwrap_err());
    assert!(msg.contains("browser_init failed 2 times"));
}

#[test]
fn test_navigate_requires_live_session_only() {
    let ledger = WorkflowLedger::new(8);
    ledger.record(INIT, OperationOutcome::Success);
    assert!(ledger.validate(NAVIGATE, SessionState::Ready).is_ok());
    assert!(ledger.validate(NAVIGATE, SessionState::Busy).is_ok());
}

#[test]
fn test_page_operations_require_navigation() {
    let ledger = WorkflowLedger::new(8);
    ledger.record(INIT, OperationOutcome::Success);

    for op in [GET_CONTENT, CLICK, TYPE, WAIT_FOR, EXECUTE_JS] {
        let msg = message(ledger.validate(op, SessionState::Ready).unwrap_err());
        assert_eq!(msg, format!("browser_navigate must succeed before {}", op));
    }

    ledger.record(NAVIGATE, OperationOutcome::Success);
    for op in [GET_CONTENT, CLICK, TYPE, WAIT_FOR, EXECUTE_JS] {
        assert!(ledger.validate(op, SessionState::Ready).is_ok());
    }
}

#[test]
fn test_failed_navigations_are_reported() {
    let ledger = WorkflowLedger::new(8);
    ledger.record(INIT, OperationOutcome::Success);
    for _ in 0..3 {
        ledger.record(NAVIGATE, failure());
    }

    let msg = message(ledger.validate(CLICK, SessionState::Ready).unwrap_err());
    assert!(msg.contains("browser_navigate failed 3 times"));
    assert_eq!(ledger.consecutive_failures(NAVIGATE), 3);
}

#[test]
fn test_reinit_requires_new_navigation() {
    let ledger = WorkflowLedger::new(8);
    ledger.record(INIT, OperationOutcome::Success);
    ledger.record(NAVIGATE, OperationOutcome::Success);
    ledger.record(INIT, OperationOutcome::Success);

    assert!(ledger.validate(GET_CONTENT, SessionState::Ready).is_err());
}

#[test]
fn test_crashed_rejects_session_work() {
    let ledger = WorkflowLedger::new(8);
    ledger.record(INIT, OperationOutcome::Success);
    ledger.record(NAVIGATE, OperationOutcome::Success);

    let err = ledger.validate(GET_CONTENT, SessionState::Crashed).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::SessionCrashed);
    assert!(err.to_string().contains("browser_init"));
    assert!(ledger.validate(NAVIGATE, SessionState::Crashed).is_err());
    assert!(ledger.validate(INIT, SessionState::Crashed).is_ok());
    assert!(ledger.validate(CLOSE, SessionState::Crashed).is_ok());
    assert!(ledger.validate(STATUS, SessionState::Crashed).is_ok());
}

#[test]
fn test_unknown_operation_rejected() {
    let ledger = WorkflowLedger::new(8);
    let msg = message(ledger.validate("browser_fly", SessionState::Ready).unwrap_err());
    assert!(msg.contains("Unknown operation"));
}

#[test]
fn test_ring_buffer_is_bounded() {
    let ledger = WorkflowLedger::new(3);
    for op in [INIT, NAVIGATE, CLICK, TYPE, GET_CONTENT] {
        ledger.record(op, OperationOutcome::Success);
    }
    assert_eq!(ledger.len(), 3);
    let ops: Vec<_> = ledger.recent(10).into_iter().map(|r| r.operation).collect();
    assert_eq!(ops, vec![CLICK, TYPE, GET_CONTENT]);
    assert_eq!(ledger.recent(1)[0].operation, GET_CONTENT);
}

#[test]
fn test_consecutive_failures_stop_at_success() {
    let ledger = WorkflowLedger::new(16);
    ledger.record(CLICK, failure());
    ledger.record(CLICK, OperationOutcome::Success);
    ledger.record(CLICK, failure());
    ledger.record(NAVIGATE, OperationOutcome::Success);
    ledger.record(CLICK, failure());

    assert_eq!(ledger.consecutive_failures(CLICK), 2);
    assert_eq!(ledger.consecutive_failures(TYPE), 0);
}

#[test]
fn test_restart_keeps_history_and_clears_flags() {
    let ledger = WorkflowLedger::new(8);
    ledger.record(INIT, OperationOutcome::Success);
    ledger.record(NAVIGATE, OperationOutcome::Success);
    ledger.restart();

    assert_eq!(ledger.len(), 2);
    let msg = message(ledger.validate(NAVIGATE, SessionState::Closed).unwrap_err());
    assert!(msg.contains("browser_init was never called"));
}

#[test]
fn test_failure_counts_start_over_after_restart() {
    let ledger = WorkflowLedger::new(16);
    ledger.record(INIT, OperationOutcome::Failure(ErrorKind::BrowserLaunch));
    ledger.record(INIT, OperationOutcome::Success);
    ledger.record(NAVIGATE, failure());
    ledger.record(NAVIGATE, failure());
    assert_eq!(ledger.consecutive_failures(NAVIGATE), 2);

    ledger.restart();
    assert_eq!(ledger.consecutive_failures(NAVIGATE), 0);
    let msg = message(ledger.validate(CLICK, SessionState::Closed).unwrap_err());
    assert!(msg.contains("browser_init was never called"));

    ledger.record(INIT, OperationOutcome::Success);
    let msg = message(ledger.validate(CLICK, SessionState::Ready).unwrap_err());
    assert_eq!(msg, format!("browser_navigate must succeed before {}", CLICK));
}

#[test]
fn test_navigate_failures_count_from_last_init() {
    let ledger = WorkflowLedger::new(16);
    ledger.record(INIT, OperationOutcome::Success);
    ledger.record(NAVIGATE, failure());
    ledger.record(INIT, OperationOutcome::Success);
    ledger.record(NAVIGATE, failure());

    let msg = message(ledger.validate(GET_CONTENT, SessionState::Ready).unwrap_err());
    assert!(msg.contains("browser_navigate failed 1 time;"));
}

#[test]
fn test_close_restarts_workflow_but_keeps_history() {
    let ledger = WorkflowLedger::new(8);
    ledger.record(INIT, OperationOutcome::Success);
    ledger.record(NAVIGATE, OperationOutcome::Success);
    ledger.record(CLOSE, OperationOutcome::Success);

    assert_eq!(ledger.len(), 3);
    let msg = message(ledger.validate(CLICK, SessionState::Closed).unwrap_err());
    assert!(msg.contains("browser_init was never called"));

    ledger.record(INIT, OperationOutcome::Success);
    let msg = message(ledger.validate(CLICK, SessionState::Ready).unwrap_err());
    assert!(msg.contains("browser_navigate must succeed"));
}
