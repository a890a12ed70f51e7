//! Run-status state machine.
//!
//! Lifecycle: Idle → Running ↔ Paused → StopRequested → Stopped, plus the
//! terminal Succeeded/Failed states reached through finish. Terminal
//! states accept no further events.

use serde::{Deserialize, Serialize};

/// Run-level status of the command queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RunStatus {
    #[default]
    Idle,
    Running,
    Paused,
    StopRequested,
    Stopped,
    Succeeded,
    Failed,
}

impl RunStatus {
    /// Whether no more commands will ever run.
    pub const fn is_terminal(&self) -> bool {
        matches!(
            self,
            RunStatus::Stopped | RunStatus::Succeeded | RunStatus::Failed
        )
    }
}

/// Result of a run-status transition attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransitionResult {
    /// Transition succeeded; carries the new status.
    Ok(RunStatus),
    /// Transition rejected; carries the reason.
    Rejected(&'static str),
}

/// Run-level event that can trigger a status transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunEvent {
    /// Caller requested play/resume.
    Play,
    /// Caller or a wait-for-resume command requested pause.
    Pause,
    /// Caller requested stop; `command_in_flight` defers the stop until
    /// the running command settles.
    Stop { command_in_flight: bool },
    /// The in-flight command reached a terminal status.
    CommandSettled,
    /// A protocol command failed; the run pauses for recovery.
    CommandFailed,
    /// Caller closed the run.
    Finish { failed: bool },
}

/// Run-status manager holding the current status.
#[derive(Debug, Clone, Default)]
pub struct RunStateMachine {
    status: RunStatus,
}

impl RunStateMachine {
    pub const fn new() -> Self {
        Self {
            status: RunStatus::Idle,
        }
    }

    #[inline]
    pub const fn status(&self) -> RunStatus {
        self.status
    }

    /// Attempt a transition given an event.
    ///
    /// Returns `TransitionResult::Ok(new_status)` on success,
    /// `TransitionResult::Rejected(reason)` if the transition is not
    /// valid.
    pub fn handle_event(&mut self, event: RunEvent) -> TransitionResult {
        use RunEvent::*;
        use RunStatus::*;

        let next = match (self.status, event) {
            (Idle, Play) | (Paused, Play) => Running,
            // Play while already running is a no-op.
            (Running, Play) => Running,

            (Running, Pause) => Paused,
            (Paused, Pause) => Paused,

            // Stop from any non-terminal status. With a command in
            // flight the stop resolves when that command settles.
            (Idle, Stop { .. }) => Stopped,
            (Running | Paused, Stop { command_in_flight }) => {
                if command_in_flight {
                    StopRequested
                } else {
                    Stopped
                }
            }
            (StopRequested, Stop { .. }) => StopRequested,

            (StopRequested, CommandSettled | CommandFailed) => Stopped,
            // Settling in any other status leaves it unchanged.
            (status, CommandSettled) if !status.is_terminal() => status,

            // A failed protocol command pauses the run for recovery.
            (Running | Paused, CommandFailed) => Paused,

            (status, Finish { failed }) if !status.is_terminal() => {
                if failed {
                    Failed
                } else {
                    Succeeded
                }
            }

            _ => {
                return TransitionResult::Rejected(invalid_transition_reason(self.status, event));
            }
        };

        self.status = next;
        TransitionResult::Ok(next)
    }
}

fn invalid_transition_reason(status: RunStatus, event: RunEvent) -> &'static str {
    use RunEvent::*;
    use RunStatus::*;
    match (status, event) {
        (Stopped | Succeeded | Failed, _) => "run is over; no further events allowed",
        (Idle, Pause) => "cannot pause before the run has been played",
        (Idle, CommandFailed) => "no command can fail before the run has been played",
        _ => "invalid event for current run status",
    }
}

// ─── Tests ──────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use RunEvent::*;
    use RunStatus::*;

    #[test]
    fn initial_status_is_idle() {
        assert_eq!(RunStateMachine::new().status(), Idle);
    }

    #[test]
    fn play_pause_resume() {
        let mut sm = RunStateMachine::new();
        assert_eq!(sm.handle_event(Play), TransitionResult::Ok(Running));
        assert_eq!(sm.handle_event(Pause), TransitionResult::Ok(Paused));
        assert_eq!(sm.handle_event(Play), TransitionResult::Ok(Running));
    }

    #[test]
    fn play_is_idempotent_while_running() {
        let mut sm = RunStateMachine::new();
        sm.handle_event(Play);
        assert_eq!(sm.handle_event(Play), TransitionResult::Ok(Running));
    }

    #[test]
    fn stop_while_idle_is_immediate() {
        let mut sm = RunStateMachine::new();
        assert_eq!(
            sm.handle_event(Stop {
                command_in_flight: false
            }),
            TransitionResult::Ok(Stopped)
        );
    }

    #[test]
    fn stop_with_command_in_flight_defers_until_settled() {
        let mut sm = RunStateMachine::new();
        sm.handle_event(Play);
        assert_eq!(
            sm.handle_event(Stop {
                command_in_flight: true
            }),
            TransitionResult::Ok(StopRequested)
        );
        assert_eq!(sm.handle_event(CommandSettled), TransitionResult::Ok(Stopped));
    }

    #[test]
    fn protocol_failure_pauses_for_recovery() {
        let mut sm = RunStateMachine::new();
        sm.handle_event(Play);
        assert_eq!(sm.handle_event(CommandFailed), TransitionResult::Ok(Paused));
        assert_eq!(sm.handle_event(Play), TransitionResult::Ok(Running));
    }

    #[test]
    fn finish_reaches_terminal_status() {
        let mut sm = RunStateMachine::new();
        sm.handle_event(Play);
        assert_eq!(
            sm.handle_event(Finish { failed: false }),
            TransitionResult::Ok(Succeeded)
        );
        // Terminal states reject everything.
        assert!(matches!(
            sm.handle_event(Play),
            TransitionResult::Rejected(_)
        ));
    }

    #[test]
    fn pause_before_play_is_rejected() {
        let mut sm = RunStateMachine::new();
        assert!(matches!(
            sm.handle_event(Pause),
            TransitionResult::Rejected(_)
        ));
    }
}
