//! State mutation actions.
//!
//! An [`Action`] is the sole mutation primitive: every change to engine
//! state is traceable to exactly one dispatched action, which the state
//! store applies atomically across all sub-stores.

use chrono::{DateTime, Utc};

use aria_common::command::{
    Command, CommandNote, CommandPrivateResult, CommandResult, ErrorOccurrence,
};
use aria_common::entities::{LabwareOffset, Liquid};

#[derive(Debug, Clone)]
pub enum Action {
    /// Append a freshly created command to the queue.
    QueueCommand { command: Command },

    /// Mark a queued command as the single in-flight command.
    SetCommandRunning {
        command_id: String,
        started_at: DateTime<Utc>,
    },

    /// Terminal success. Carries the public result plus the private
    /// result other sub-stores consume, and any notes attached during
    /// execution.
    SucceedCommand {
        command_id: String,
        completed_at: DateTime<Utc>,
        result: CommandResult,
        private_result: Option<CommandPrivateResult>,
        notes: Vec<CommandNote>,
    },

    /// Terminal failure with a structured error record.
    FailCommand {
        command_id: String,
        completed_at: DateTime<Utc>,
        error: ErrorOccurrence,
        notes: Vec<CommandNote>,
    },

    /// Start or resume pulling commands from the queue.
    Play,

    /// Stop pulling commands; the in-flight command finishes.
    Pause,

    /// Request a permanent stop. Takes effect immediately when idle,
    /// otherwise once the in-flight command settles.
    Stop,

    /// Close the run as succeeded, or failed with a run-level error.
    FinishRun { error: Option<ErrorOccurrence> },

    AddLabwareOffset { offset: LabwareOffset },

    AddLiquid { liquid: Liquid },
}
