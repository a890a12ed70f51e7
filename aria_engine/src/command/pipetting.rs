//! Liquid-handling commands: aspirate, dispense, blow-out, and tip
//! exchange.

use aria_common::command::{
    AspirateInPlaceParams, AspirateParams, BlowOutInPlaceParams, CommandResult,
    DispenseInPlaceParams, DispenseParams, DropTipParams, PickUpTipParams,
};
use aria_common::error::EngineError;
use aria_common::types::WellLocation;

use crate::command::ExecuteOutcome;
use crate::execution::CommandHandlers;
use crate::execution::movement::MoveToWellRequest;
use crate::resources::pipette_data;
use crate::state::EngineState;

/// Well-targeted aspirate.
///
/// If the plunger is not in a known position, the pipette is first raised
/// to the well top and prepared there, so no liquid is drawn mid-travel.
pub fn aspirate(
    params: &AspirateParams,
    state: &EngineState,
    handlers: &CommandHandlers,
) -> Result<ExecuteOutcome, EngineError> {
    if !handlers
        .pipetting
        .get_is_ready_to_aspirate(state, &params.pipette_id)?
    {
        let at_well_top = MoveToWellRequest {
            pipette_id: &params.pipette_id,
            labware_id: &params.labware_id,
            well_name: &params.well_name,
            well_location: WellLocation::default(),
            force_direct: false,
            minimum_z_height: None,
            speed: None,
        };
        handlers.movement.move_to_well(state, &at_well_top)?;
        handlers
            .pipetting
            .prepare_for_aspirate(state, &params.pipette_id)?;
    }

    let position = handlers.movement.move_to_well(
        state,
        &MoveToWellRequest {
            pipette_id: &params.pipette_id,
            labware_id: &params.labware_id,
            well_name: &params.well_name,
            well_location: params.well_location.clone(),
            force_direct: false,
            minimum_z_height: None,
            speed: None,
        },
    )?;
    let pipetted = handlers.pipetting.aspirate_in_place(
        state,
        &params.pipette_id,
        params.volume,
        params.flow_rate,
    )?;

    Ok(ExecuteOutcome {
        result: CommandResult::Aspirate {
            volume: pipetted.volume,
            position,
        },
        private_result: None,
        notes: pipetted.notes,
        request_pause: false,
    })
}

/// Aspirate wherever the pipette currently is. Unlike the well-targeted
/// form there is no way to recover an unknown plunger position here.
pub fn aspirate_in_place(
    params: &AspirateInPlaceParams,
    state: &EngineState,
    handlers: &CommandHandlers,
) -> Result<ExecuteOutcome, EngineError> {
    if !handlers
        .pipetting
        .get_is_ready_to_aspirate(state, &params.pipette_id)?
    {
        return Err(EngineError::PipetteNotReadyToAspirate {
            pipette_id: params.pipette_id.clone(),
        });
    }
    let pipetted = handlers.pipetting.aspirate_in_place(
        state,
        &params.pipette_id,
        params.volume,
        params.flow_rate,
    )?;
    Ok(ExecuteOutcome {
        result: CommandResult::AspirateInPlace {
            volume: pipetted.volume,
        },
        private_result: None,
        notes: pipetted.notes,
        request_pause: false,
    })
}

pub fn dispense(
    params: &DispenseParams,
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
            force_direct: false,
            minimum_z_height: None,
            speed: None,
        },
    )?;
    let pipetted = handlers.pipetting.dispense_in_place(
        state,
        &params.pipette_id,
        params.volume,
        params.flow_rate,
        params.push_out,
    )?;
    Ok(ExecuteOutcome {
        result: CommandResult::Dispense {
            volume: pipetted.volume,
            position,
        },
        private_result: None,
        notes: pipetted.notes,
        request_pause: false,
    })
}

pub fn dispense_in_place(
    params: &DispenseInPlaceParams,
    state: &EngineState,
    handlers: &CommandHandlers,
) -> Result<ExecuteOutcome, EngineError> {
    let pipetted = handlers.pipetting.dispense_in_place(
        state,
        &params.pipette_id,
        params.volume,
        params.flow_rate,
        params.push_out,
    )?;
    Ok(ExecuteOutcome {
        result: CommandResult::DispenseInPlace {
            volume: pipetted.volume,
        },
        private_result: None,
        notes: pipetted.notes,
        request_pause: false,
    })
}

pub fn blow_out_in_place(
    params: &BlowOutInPlaceParams,
    state: &EngineState,
    handlers: &CommandHandlers,
) -> Result<ExecuteOutcome, EngineError> {
    handlers
        .pipetting
        .blow_out_in_place(state, &params.pipette_id, params.flow_rate)?;
    Ok(ExecuteOutcome::from_result(CommandResult::BlowOutInPlace {}))
}

pub fn pick_up_tip(
    params: &PickUpTipParams,
    state: &EngineState,
    handlers: &CommandHandlers,
) -> Result<ExecuteOutcome, EngineError> {
    let pipette = state.pipettes.get(&params.pipette_id)?;
    let tip = pipette_data::tip_geometry(pipette.pipette_name);

    let position = handlers.movement.move_to_well(
        state,
        &MoveToWellRequest {
            pipette_id: &params.pipette_id,
            labware_id: &params.labware_id,
            well_name: &params.well_name,
            well_location: params.well_location.clone(),
            force_direct: false,
            minimum_z_height: None,
            speed: None,
        },
    )?;
    handlers
        .pipetting
        .pick_up_tip(state, &params.pipette_id, &tip)?;

    Ok(ExecuteOutcome::from_result(CommandResult::PickUpTip {
        tip_volume: tip.volume,
        tip_length: tip.length,
        tip_diameter: tip.diameter,
        position,
    }))
}

pub fn drop_tip(
    params: &DropTipParams,
    state: &EngineState,
    handlers: &CommandHandlers,
) -> Result<ExecuteOutcome, EngineError> {
    handlers.movement.move_to_well(
        state,
        &MoveToWellRequest {
            pipette_id: &params.pipette_id,
            labware_id: &params.labware_id,
            well_name: &params.well_name,
            well_location: WellLocation::default(),
            force_direct: false,
            minimum_z_height: None,
            speed: None,
        },
    )?;
    handlers
        .pipetting
        .drop_tip(state, &params.pipette_id, params.home_after)?;
    Ok(ExecuteOutcome::from_result(CommandResult::DropTip {}))
}
