//! Per-command-type implementations.
//!
//! [`execute_command`] matches a command's params variant to its
//! implementation and hands it the handlers and state views it needs.
//! Implementations are pure with respect to engine state: they read the
//! snapshot, drive handlers, and describe the outcome; the executor turns
//! that outcome into dispatched actions.

pub mod control;
pub mod equipment;
pub mod movement;
pub mod pipetting;

use aria_common::command::{
    Command, CommandNote, CommandParams, CommandPrivateResult, CommandResult,
};
use aria_common::error::EngineError;

use crate::execution::CommandHandlers;
use crate::resources::ResourceProvider;
use crate::state::EngineState;

/// Everything a successful command produces.
#[derive(Debug, Clone)]
pub struct ExecuteOutcome {
    pub result: CommandResult,
    pub private_result: Option<CommandPrivateResult>,
    pub notes: Vec<CommandNote>,
    /// The run should pause once this command settles.
    pub request_pause: bool,
}

impl ExecuteOutcome {
    pub fn from_result(result: CommandResult) -> Self {
        Self {
            result,
            private_result: None,
            notes: Vec::new(),
            request_pause: false,
        }
    }
}

/// Run one command against a state snapshot.
pub fn execute_command(
    command: &Command,
    state: &EngineState,
    handlers: &CommandHandlers,
    resources: &dyn ResourceProvider,
) -> Result<ExecuteOutcome, EngineError> {
    match &command.params {
        CommandParams::Aspirate(params) => pipetting::aspirate(params, state, handlers),
        CommandParams::AspirateInPlace(params) => {
            pipetting::aspirate_in_place(params, state, handlers)
        }
        CommandParams::Dispense(params) => pipetting::dispense(params, state, handlers),
        CommandParams::DispenseInPlace(params) => {
            pipetting::dispense_in_place(params, state, handlers)
        }
        CommandParams::BlowOutInPlace(params) => {
            pipetting::blow_out_in_place(params, state, handlers)
        }
        CommandParams::PickUpTip(params) => pipetting::pick_up_tip(params, state, handlers),
        CommandParams::DropTip(params) => pipetting::drop_tip(params, state, handlers),
        CommandParams::MoveToWell(params) => movement::move_to_well(params, state, handlers),
        CommandParams::Home(params) => movement::home(params, handlers),
        CommandParams::LoadPipette(params) => {
            equipment::load_pipette(params, state, handlers, resources)
        }
        CommandParams::ConfigureForVolume(params) => {
            equipment::configure_for_volume(params, state, handlers)
        }
        CommandParams::LoadLabware(params) => {
            equipment::load_labware(params, state, handlers, resources)
        }
        CommandParams::LoadModule(params) => {
            equipment::load_module(params, state, handlers, resources)
        }
        CommandParams::LoadLiquid(params) => equipment::load_liquid(params, state),
        CommandParams::MoveLabware(params) => equipment::move_labware(params, state),
        CommandParams::Comment(params) => control::comment(params),
        CommandParams::WaitForResume(params) => control::wait_for_resume(params),
    }
}
