//! Gantry movement commands.

use aria_common::command::{CommandResult, HomeParams, MoveToWellParams};
use aria_common::error::EngineError;
use aria_common::types::MotorAxis;

use crate::command::ExecuteOutcome;
use crate::execution::CommandHandlers;
use crate::execution::movement::MoveToWellRequest;
use crate::state::EngineState;

const ALL_AXES: [MotorAxis; 6] = [
    MotorAxis::X,
    MotorAxis::Y,
    MotorAxis::LeftZ,
    MotorAxis::RightZ,
    MotorAxis::LeftPlunger,
    MotorAxis::RightPlunger,
];

pub fn move_to_well(
    params: &MoveToWellParams,
    state: &EngineState,
    handlers: &CommandHandlers,
) -> Result<ExecuteOutcome, EngineError> {
    let position = handlers.movement.move_to_well(
        state,
        &MoveToWellRequest {
            pipette_id: &params.pipette_id,
            labware_id: &params.labware_id,
            well_name: &params.well_name,
            well_location: params.well_location.clone(),
            force_direct: params.force_direct,
            minimum_z_height: params.minimum_z_height,
            speed: params.speed,
        },
    )?;
    Ok(ExecuteOutcome::from_result(CommandResult::MoveToWell {
        position,
    }))
}

pub fn home(params: &HomeParams, handlers: &CommandHandlers) -> Result<ExecuteOutcome, EngineError> {
    let axes = params.axes.as_deref().unwrap_or(&ALL_AXES);
    handlers.movement.home(axes)?;
    Ok(ExecuteOutcome::from_result(CommandResult::Home {}))
}
