use std::time::Duration;

use procwatch::core::process_monitor::{
    ProcessState, TerminationController, TerminationPhase, TerminationRequest,
};

use super::common::{raw, Behavior, FakeSource};

fn controller() -> TerminationController {
    TerminationController::new(Duration::from_millis(10), Duration::from_millis(10))
}

fn source_with(behavior: Behavior) -> FakeSource {
    FakeSource::new("alice", vec![raw(42, "worker", "alice", ProcessState::Running)])
        .with_behavior(42, behavior)
}

#[test]
fn test_graceful_exit_never_kills() {
    let mut source = source_with(Behavior::ExitOnTerm);
    let mut escalations = 0;

    let outcome = controller().run(&mut source, TerminationRequest::new(42, "worker"), |_| {
        escalations += 1
    });

    assert!(outcome.succeeded());
    assert!(!outcome.forced);
    assert_eq!(outcome.message, "Terminated worker (PID 42)");
    assert_eq!(escalations, 0);
    assert!(source.state.lock().kill_calls.is_empty());
    assert_eq!(
        outcome.trace,
        vec![
            TerminationPhase::Idle,
            TerminationPhase::Requested,
            TerminationPhase::GracefulSent,
            TerminationPhase::WaitingGraceful,
            TerminationPhase::Confirmed,
        ]
    );
}

#[test]
fn test_escalates_to_kill() {
    let mut source = source_with(Behavior::ExitOnKill);
    let mut escalated_for = Vec::new();

    let outcome = controller().run(&mut source, TerminationRequest::new(42, "worker"), |request| {
        escalated_for.push(request.target_name.clone())
    });

    assert!(outcome.succeeded());
    assert!(outcome.forced);
    assert_eq!(outcome.message, "Force killed worker (PID 42)");
    assert_eq!(escalated_for, vec!["worker".to_string()]);
    assert_eq!(source.state.lock().kill_calls, vec![42]);
}

#[test]
fn test_ignoring_both_signals_fails_without_error() {
    let mut source = source_with(Behavior::Ignore);

    let outcome = controller().run(&mut source, TerminationRequest::new(42, "worker"), |_| {});

    assert_eq!(outcome.phase, TerminationPhase::Failed);
    assert!(outcome.phase.is_terminal());
    assert_eq!(outcome.message, "Could not terminate worker (PID 42)");
    let state = source.state.lock();
    assert_eq!(state.terminate_calls, vec![42]);
    assert_eq!(state.kill_calls, vec![42]);
}

#[test]
fn test_permission_denied_fails_immediately() {
    let mut source = source_with(Behavior::DenyTerm);

    let outcome = controller().run(&mut source, TerminationRequest::new(42, "worker"), |_| {});

    assert_eq!(outcome.phase, TerminationPhase::Failed);
    assert!(outcome.message.starts_with("Permission denied"));
    assert!(source.state.lock().kill_calls.is_empty());
}

#[test]
fn test_already_gone_counts_as_confirmed() {
    let mut source = source_with(Behavior::Gone);

    let outcome = controller().run(&mut source, TerminationRequest::new(42, "worker"), |_| {});

    assert!(outcome.succeeded());
    assert_eq!(outcome.message, "process no longer exists");
}

#[test]
fn test_kill_failure_reports_reason() {
    let mut source = source_with(Behavior::KillFails);

    let outcome = controller().run(&mut source, TerminationRequest::new(42, "worker"), |_| {});

    assert_eq!(outcome.phase, TerminationPhase::Failed);
    assert!(outcome.message.starts_with("Kill failed:"));
    assert!(outcome.message.contains("operation not permitted"));
}
