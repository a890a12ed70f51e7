//! Command queue and history sub-store.
//!
//! Holds every command record for the run (commands are never deleted),
//! the pending queue, and the run-status state machine. Ordering is
//! strict FIFO with one exception: fixit commands splice in ahead of the
//! remaining protocol commands to support guided recovery after a
//! failure.

use std::collections::{HashMap, VecDeque};

use tracing::{debug, warn};

use aria_common::command::{Command, CommandIntent, CommandStatus, ErrorOccurrence};
use aria_common::error::EngineError;

use crate::actions::Action;
use crate::state::run::{RunEvent, RunStateMachine, RunStatus, TransitionResult};

#[derive(Debug, Clone, Default)]
pub struct CommandStore {
    run: RunStateMachine,
    /// Every command id in enqueue order; ids are never removed.
    all_ids: Vec<String>,
    by_id: HashMap<String, Command>,
    /// Ids still waiting to execute, in execution order.
    queued: VecDeque<String>,
    running_id: Option<String>,
    /// Most recent failed protocol command, anchoring fixit recovery.
    failed_command_id: Option<String>,
    /// Run-level error for a fatally stopped run.
    run_error: Option<ErrorOccurrence>,
}

impl CommandStore {
    pub fn new() -> Self {
        Self::default()
    }

    // ─── Mutation (actions only) ────────────────────────────────────

    pub fn handle_action(&mut self, action: &Action) -> Result<(), EngineError> {
        match action {
            Action::QueueCommand { command } => self.enqueue(command.clone()),
            Action::SetCommandRunning {
                command_id,
                started_at,
            } => self.mark_running(command_id, *started_at),
            Action::SucceedCommand {
                command_id,
                completed_at,
                result,
                notes,
                ..
            } => self.mark_succeeded(command_id, *completed_at, result.clone(), notes.clone()),
            Action::FailCommand {
                command_id,
                completed_at,
                error,
                notes,
            } => self.mark_failed(command_id, *completed_at, error.clone(), notes.clone()),
            Action::Play => {
                self.failed_command_id = None;
                self.apply_run_event(RunEvent::Play)
            }
            Action::Pause => self.apply_run_event(RunEvent::Pause),
            Action::Stop => self.apply_run_event(RunEvent::Stop {
                command_in_flight: self.running_id.is_some(),
            }),
            Action::FinishRun { error } => {
                self.run_error = error.clone();
                self.apply_run_event(RunEvent::Finish {
                    failed: error.is_some(),
                })
            }
            Action::AddLabwareOffset { .. } | Action::AddLiquid { .. } => Ok(()),
        }
    }

    fn enqueue(&mut self, command: Command) -> Result<(), EngineError> {
        let id = command.id.clone();
        let position = if command.intent == CommandIntent::Fixit {
            // Fixit commands run before the remaining protocol commands,
            // in their own enqueue order.
            self.queued
                .iter()
                .position(|queued_id| self.intent_of(queued_id) != CommandIntent::Fixit)
                .unwrap_or(self.queued.len())
        } else {
            self.queued.len()
        };
        debug!(command_id = %id, command_type = command.command_type(), "command queued");
        self.queued.insert(position, id.clone());
        self.all_ids.push(id.clone());
        self.by_id.insert(id, command);
        Ok(())
    }

    fn mark_running(
        &mut self,
        command_id: &str,
        started_at: chrono::DateTime<chrono::Utc>,
    ) -> Result<(), EngineError> {
        // A stop can land between command selection and this dispatch;
        // a command must never start once the run is over.
        if self.run.status().is_terminal() {
            return Err(EngineError::RunStopped);
        }
        let command = self.get_mut(command_id)?;
        if command.status != CommandStatus::Queued {
            warn!(command_id, status = %command.status, "ignoring mark-running on settled command");
            return Ok(());
        }
        command.status = CommandStatus::Running;
        command.started_at = Some(started_at);
        self.queued.retain(|id| id != command_id);
        self.running_id = Some(command_id.to_owned());
        Ok(())
    }

    fn mark_succeeded(
        &mut self,
        command_id: &str,
        completed_at: chrono::DateTime<chrono::Utc>,
        result: aria_common::command::CommandResult,
        notes: Vec<aria_common::command::CommandNote>,
    ) -> Result<(), EngineError> {
        let command = self.get_mut(command_id)?;
        if command.is_terminal() {
            // Terminal state is write-once.
            return Ok(());
        }
        command.status = CommandStatus::Succeeded;
        command.result = Some(result);
        command.completed_at = Some(completed_at);
        command.notes.extend(notes);
        self.settle(command_id);
        self.apply_run_event(RunEvent::CommandSettled)
    }

    fn mark_failed(
        &mut self,
        command_id: &str,
        completed_at: chrono::DateTime<chrono::Utc>,
        error: ErrorOccurrence,
        notes: Vec<aria_common::command::CommandNote>,
    ) -> Result<(), EngineError> {
        let command = self.get_mut(command_id)?;
        if command.is_terminal() {
            return Ok(());
        }
        command.status = CommandStatus::Failed;
        command.error = Some(error);
        command.completed_at = Some(completed_at);
        command.notes.extend(notes);
        let intent = command.intent;
        self.settle(command_id);

        if intent == CommandIntent::Protocol {
            self.failed_command_id = Some(command_id.to_owned());
            self.apply_run_event(RunEvent::CommandFailed)
        } else {
            // Setup and fixit failures do not interrupt the run.
            self.apply_run_event(RunEvent::CommandSettled)
        }
    }

    fn get_mut(&mut self, command_id: &str) -> Result<&mut Command, EngineError> {
        self.by_id
            .get_mut(command_id)
            .ok_or_else(|| EngineError::CommandDoesNotExist {
                command_id: command_id.to_owned(),
            })
    }

    fn settle(&mut self, command_id: &str) {
        if self.running_id.as_deref() == Some(command_id) {
            self.running_id = None;
        }
    }

    fn apply_run_event(&mut self, event: RunEvent) -> Result<(), EngineError> {
        match self.run.handle_event(event) {
            TransitionResult::Ok(status) => {
                debug!(?status, "run status changed");
                Ok(())
            }
            TransitionResult::Rejected(reason) => Err(EngineError::InvalidRunAction {
                detail: reason.to_owned(),
            }),
        }
    }

    // ─── Reads ──────────────────────────────────────────────────────

    pub fn get(&self, command_id: &str) -> Result<&Command, EngineError> {
        self.by_id
            .get(command_id)
            .ok_or_else(|| EngineError::CommandDoesNotExist {
                command_id: command_id.to_owned(),
            })
    }

    /// All commands in enqueue order.
    pub fn get_all(&self) -> Vec<&Command> {
        self.all_ids
            .iter()
            .filter_map(|id| self.by_id.get(id))
            .collect()
    }

    pub fn run_status(&self) -> RunStatus {
        self.run.status()
    }

    pub fn run_error(&self) -> Option<&ErrorOccurrence> {
        self.run_error.as_ref()
    }

    pub fn running_command_id(&self) -> Option<&str> {
        self.running_id.as_deref()
    }

    pub fn failed_command_id(&self) -> Option<&str> {
        self.failed_command_id.as_deref()
    }

    pub fn queued_count(&self) -> usize {
        self.queued.len()
    }

    /// Whether every enqueued command has reached a terminal status.
    pub fn all_commands_settled(&self) -> bool {
        self.queued.is_empty() && self.running_id.is_none()
    }

    /// The id of the next command to execute.
    ///
    /// `Ok(None)` means nothing is runnable right now but more work may
    /// arrive; `Err(RunStopped)` means no command will ever run again.
    /// While paused for recovery, only fixit commands are runnable.
    pub fn get_next_to_execute(&self) -> Result<Option<String>, EngineError> {
        if self.run.status().is_terminal() {
            return Err(EngineError::RunStopped);
        }
        if self.running_id.is_some() {
            return Ok(None);
        }
        match self.run.status() {
            RunStatus::Running => Ok(self.queued.front().cloned()),
            RunStatus::Paused => Ok(self
                .queued
                .front()
                .filter(|id| self.intent_of(id) == CommandIntent::Fixit)
                .cloned()),
            _ => Ok(None),
        }
    }

    fn intent_of(&self, command_id: &str) -> CommandIntent {
        self.by_id
            .get(command_id)
            .map(|c| c.intent)
            .unwrap_or(CommandIntent::Protocol)
    }
}

// ─── Tests ──────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use aria_common::command::{CommandParams, CommandResult, CommentParams};
    use chrono::{TimeZone, Utc};

    fn now() -> chrono::DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
    }

    fn comment(id: &str, intent: CommandIntent) -> Command {
        Command::new(
            id,
            CommandParams::Comment(CommentParams {
                message: "hello".into(),
            }),
            intent,
            now(),
        )
    }

    fn error() -> ErrorOccurrence {
        ErrorOccurrence {
            id: "error-1".into(),
            created_at: now(),
            error_type: "tipNotAttached".into(),
            detail: "no tip".into(),
            wrapped_errors: vec![],
        }
    }

    fn store_with_queued(ids: &[&str]) -> CommandStore {
        let mut store = CommandStore::new();
        for id in ids {
            store
                .handle_action(&Action::QueueCommand {
                    command: comment(id, CommandIntent::Protocol),
                })
                .unwrap();
        }
        store.handle_action(&Action::Play).unwrap();
        store
    }

    #[test]
    fn fifo_execution_order() {
        let store = store_with_queued(&["c-1", "c-2"]);
        assert_eq!(store.get_next_to_execute().unwrap(), Some("c-1".into()));
    }

    #[test]
    fn at_most_one_running() {
        let mut store = store_with_queued(&["c-1", "c-2"]);
        store
            .handle_action(&Action::SetCommandRunning {
                command_id: "c-1".into(),
                started_at: now(),
            })
            .unwrap();
        // c-2 is queued but nothing else may start.
        assert_eq!(store.get_next_to_execute().unwrap(), None);
        store
            .handle_action(&Action::SucceedCommand {
                command_id: "c-1".into(),
                completed_at: now(),
                result: CommandResult::Comment {},
                private_result: None,
                notes: vec![],
            })
            .unwrap();
        assert_eq!(store.get_next_to_execute().unwrap(), Some("c-2".into()));
    }

    #[test]
    fn terminal_status_is_write_once() {
        let mut store = store_with_queued(&["c-1"]);
        store
            .handle_action(&Action::SetCommandRunning {
                command_id: "c-1".into(),
                started_at: now(),
            })
            .unwrap();
        store
            .handle_action(&Action::SucceedCommand {
                command_id: "c-1".into(),
                completed_at: now(),
                result: CommandResult::Comment {},
                private_result: None,
                notes: vec![],
            })
            .unwrap();
        // A late failure dispatch must not overwrite the result.
        store
            .handle_action(&Action::FailCommand {
                command_id: "c-1".into(),
                completed_at: now(),
                error: error(),
                notes: vec![],
            })
            .unwrap();
        let command = store.get("c-1").unwrap();
        assert_eq!(command.status, CommandStatus::Succeeded);
        assert!(command.error.is_none());
    }

    #[test]
    fn protocol_failure_pauses_and_records_failed_command() {
        let mut store = store_with_queued(&["c-1", "c-2"]);
        store
            .handle_action(&Action::SetCommandRunning {
                command_id: "c-1".into(),
                started_at: now(),
            })
            .unwrap();
        store
            .handle_action(&Action::FailCommand {
                command_id: "c-1".into(),
                completed_at: now(),
                error: error(),
                notes: vec![],
            })
            .unwrap();
        assert_eq!(store.run_status(), RunStatus::Paused);
        assert_eq!(store.failed_command_id(), Some("c-1"));
        // Protocol commands are held while paused.
        assert_eq!(store.get_next_to_execute().unwrap(), None);
    }

    #[test]
    fn fixit_splices_ahead_of_protocol_commands() {
        let mut store = store_with_queued(&["c-1", "c-2"]);
        store
            .handle_action(&Action::SetCommandRunning {
                command_id: "c-1".into(),
                started_at: now(),
            })
            .unwrap();
        store
            .handle_action(&Action::FailCommand {
                command_id: "c-1".into(),
                completed_at: now(),
                error: error(),
                notes: vec![],
            })
            .unwrap();

        store
            .handle_action(&Action::QueueCommand {
                command: comment("fixit-1", CommandIntent::Fixit),
            })
            .unwrap();
        store
            .handle_action(&Action::QueueCommand {
                command: comment("fixit-2", CommandIntent::Fixit),
            })
            .unwrap();

        // Fixits run while paused, in their own order, before c-2.
        assert_eq!(store.get_next_to_execute().unwrap(), Some("fixit-1".into()));
        store
            .handle_action(&Action::SetCommandRunning {
                command_id: "fixit-1".into(),
                started_at: now(),
            })
            .unwrap();
        store
            .handle_action(&Action::SucceedCommand {
                command_id: "fixit-1".into(),
                completed_at: now(),
                result: CommandResult::Comment {},
                private_result: None,
                notes: vec![],
            })
            .unwrap();
        assert_eq!(store.get_next_to_execute().unwrap(), Some("fixit-2".into()));
    }

    #[test]
    fn resume_after_recovery_runs_remaining_protocol_commands() {
        let mut store = store_with_queued(&["c-1", "c-2"]);
        store
            .handle_action(&Action::SetCommandRunning {
                command_id: "c-1".into(),
                started_at: now(),
            })
            .unwrap();
        store
            .handle_action(&Action::FailCommand {
                command_id: "c-1".into(),
                completed_at: now(),
                error: error(),
                notes: vec![],
            })
            .unwrap();
        store.handle_action(&Action::Play).unwrap();
        assert_eq!(store.run_status(), RunStatus::Running);
        assert!(store.failed_command_id().is_none());
        assert_eq!(store.get_next_to_execute().unwrap(), Some("c-2".into()));
    }

    #[test]
    fn stop_resolves_after_running_command_settles() {
        let mut store = store_with_queued(&["c-1", "c-2"]);
        store
            .handle_action(&Action::SetCommandRunning {
                command_id: "c-1".into(),
                started_at: now(),
            })
            .unwrap();
        store.handle_action(&Action::Stop).unwrap();
        assert_eq!(store.run_status(), RunStatus::StopRequested);
        assert_eq!(store.get_next_to_execute().unwrap(), None);

        store
            .handle_action(&Action::SucceedCommand {
                command_id: "c-1".into(),
                completed_at: now(),
                result: CommandResult::Comment {},
                private_result: None,
                notes: vec![],
            })
            .unwrap();
        assert_eq!(store.run_status(), RunStatus::Stopped);
        assert!(matches!(
            store.get_next_to_execute(),
            Err(EngineError::RunStopped)
        ));
    }

    #[test]
    fn stop_before_start_keeps_command_queued() {
        let mut store = store_with_queued(&["c-1"]);
        assert_eq!(store.get_next_to_execute().unwrap(), Some("c-1".into()));

        // Stop lands after selection but before the command starts.
        store.handle_action(&Action::Stop).unwrap();
        assert_eq!(store.run_status(), RunStatus::Stopped);

        assert!(matches!(
            store.handle_action(&Action::SetCommandRunning {
                command_id: "c-1".into(),
                started_at: now(),
            }),
            Err(EngineError::RunStopped)
        ));
        let command = store.get("c-1").unwrap();
        assert_eq!(command.status, CommandStatus::Queued);
        assert!(command.started_at.is_none());
    }

    #[test]
    fn setup_failure_does_not_pause_run() {
        let mut store = CommandStore::new();
        store
            .handle_action(&Action::QueueCommand {
                command: comment("setup-1", CommandIntent::Setup),
            })
            .unwrap();
        store.handle_action(&Action::Play).unwrap();
        store
            .handle_action(&Action::SetCommandRunning {
                command_id: "setup-1".into(),
                started_at: now(),
            })
            .unwrap();
        store
            .handle_action(&Action::FailCommand {
                command_id: "setup-1".into(),
                completed_at: now(),
                error: error(),
                notes: vec![],
            })
            .unwrap();
        assert_eq!(store.run_status(), RunStatus::Running);
        assert!(store.failed_command_id().is_none());
    }

    #[test]
    fn finish_records_run_error() {
        let mut store = store_with_queued(&["c-1"]);
        store
            .handle_action(&Action::FinishRun {
                error: Some(error()),
            })
            .unwrap();
        assert_eq!(store.run_status(), RunStatus::Failed);
        assert!(store.run_error().is_some());
    }

    #[test]
    fn unknown_command_lookup_fails() {
        let store = CommandStore::new();
        assert!(matches!(
            store.get("missing"),
            Err(EngineError::CommandDoesNotExist { .. })
        ));
    }
}
