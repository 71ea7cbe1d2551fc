//! Graceful-then-forceful process termination.
//!
//! A single escalation: terminate, wait, kill, wait. The controller never
//! retries past that and never returns an error; every path ends in
//! [`TerminationPhase::Confirmed`] or [`TerminationPhase::Failed`].

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::source::{ProcessError, ProcessSource};

pub const DEFAULT_GRACEFUL_TIMEOUT: Duration = Duration::from_secs(3);
pub const DEFAULT_FORCE_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TerminationPhase {
    Idle,
    Requested,
    GracefulSent,
    WaitingGraceful,
    ForceSent,
    WaitingForce,
    Confirmed,
    Failed,
}

impl TerminationPhase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, TerminationPhase::Confirmed | TerminationPhase::Failed)
    }
}

/// A termination in flight.
#[derive(Debug, Clone)]
pub struct TerminationRequest {
    pub pid: u32,
    pub target_name: String,
    phase: TerminationPhase,
    trace: Vec<TerminationPhase>,
}

impl TerminationRequest {
    pub fn new(pid: u32, target_name: impl Into<String>) -> Self {
        Self {
            pid,
            target_name: target_name.into(),
            phase: TerminationPhase::Idle,
            trace: vec![TerminationPhase::Idle],
        }
    }

    pub fn phase(&self) -> TerminationPhase {
        self.phase
    }

    fn advance(&mut self, next: TerminationPhase) {
        log::debug!(
            "Termination of {} (PID {}): {:?} -> {:?}",
            self.target_name,
            self.pid,
            self.phase,
            next
        );
        self.phase = next;
        self.trace.push(next);
    }
}

/// Final result of a termination attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TerminationOutcome {
    pub pid: u32,
    pub name: String,
    pub phase: TerminationPhase,
    pub forced: bool,
    pub message: String,
    /// Every phase visited, starting at Idle
    pub trace: Vec<TerminationPhase>,
}

impl TerminationOutcome {
    pub fn succeeded(&self) -> bool {
        self.phase == TerminationPhase::Confirmed
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TerminationController {
    pub graceful_timeout: Duration,
    pub force_timeout: Duration,
}

impl Default for TerminationController {
    fn default() -> Self {
        Self {
            graceful_timeout: DEFAULT_GRACEFUL_TIMEOUT,
            force_timeout: DEFAULT_FORCE_TIMEOUT,
        }
    }
}

impl TerminationController {
    pub fn new(graceful_timeout: Duration, force_timeout: Duration) -> Self {
        Self {
            graceful_timeout,
            force_timeout,
        }
    }

    /// Drive one request to a terminal phase. Blocks for at most the sum of
    /// both timeouts; call it from a worker thread.
    ///
    /// `on_escalate` fires once if the graceful wait runs out, before the
    /// forceful signal is sent.
    pub fn run<F>(
        &self,
        source: &mut dyn ProcessSource,
        mut request: TerminationRequest,
        mut on_escalate: F,
    ) -> TerminationOutcome
    where
        F: FnMut(&TerminationRequest),
    {
        let pid = request.pid;
        request.advance(TerminationPhase::Requested);
        request.advance(TerminationPhase::GracefulSent);

        match source.terminate(pid) {
            Ok(()) => {}
            Err(ProcessError::NoSuchProcess { .. }) => {
                request.advance(TerminationPhase::Confirmed);
                return finish(request, false, "process no longer exists".to_string());
            }
            Err(ProcessError::AccessDenied { .. }) => {
                request.advance(TerminationPhase::Failed);
                let message = format!(
                    "Permission denied: cannot terminate {} (PID {}). Try running with elevated privileges.",
                    request.target_name, pid
                );
                return finish(request, false, message);
            }
            Err(e) => {
                request.advance(TerminationPhase::Failed);
                let message = format!("Error terminating {}: {}", request.target_name, e);
                return finish(request, false, message);
            }
        }

        request.advance(TerminationPhase::WaitingGraceful);
        if source.wait_for_exit(pid, self.graceful_timeout) {
            request.advance(TerminationPhase::Confirmed);
            let message = format!("Terminated {} (PID {})", request.target_name, pid);
            return finish(request, false, message);
        }

        on_escalate(&request);
        request.advance(TerminationPhase::ForceSent);

        match source.kill(pid) {
            Ok(()) => {}
            Err(ProcessError::NoSuchProcess { .. }) => {
                // Exited between the wait and the kill
                request.advance(TerminationPhase::Confirmed);
                let message = format!("Terminated {} (PID {})", request.target_name, pid);
                return finish(request, false, message);
            }
            Err(e) => {
                request.advance(TerminationPhase::Failed);
                let message = format!("Kill failed: {}", e);
                return finish(request, true, message);
            }
        }

        request.advance(TerminationPhase::WaitingForce);
        if source.wait_for_exit(pid, self.force_timeout) {
            request.advance(TerminationPhase::Confirmed);
            let message = format!("Force killed {} (PID {})", request.target_name, pid);
            return finish(request, true, message);
        }

        request.advance(TerminationPhase::Failed);
        let message = format!("Could not terminate {} (PID {})", request.target_name, pid);
        finish(request, true, message)
    }
}

fn finish(request: TerminationRequest, forced: bool, message: String) -> TerminationOutcome {
    if request.phase == TerminationPhase::Confirmed {
        log::info!("{}", message);
    } else {
        log::warn!("{}", message);
    }
    TerminationOutcome {
        pid: request.pid,
        name: request.target_name,
        phase: request.phase,
        forced,
        message,
        trace: request.trace,
    }
}
