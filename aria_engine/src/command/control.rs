//! Control-flow commands: comment and pause.

use aria_common::command::{CommandResult, CommentParams, WaitForResumeParams};
use aria_common::error::EngineError;
use tracing::info;

use crate::command::ExecuteOutcome;

pub fn comment(params: &CommentParams) -> Result<ExecuteOutcome, EngineError> {
    info!(message = %params.message, "protocol comment");
    Ok(ExecuteOutcome::from_result(CommandResult::Comment {}))
}

/// Succeeds immediately but asks the executor to pause the run, so the
/// worker stops pulling protocol commands until the next play.
pub fn wait_for_resume(params: &WaitForResumeParams) -> Result<ExecuteOutcome, EngineError> {
    if let Some(message) = &params.message {
        info!(%message, "pausing for operator");
    }
    let mut outcome = ExecuteOutcome::from_result(CommandResult::WaitForResume {});
    outcome.request_pause = true;
    Ok(outcome)
}
