//! Equipment commands: loading pipettes, labware, modules, and liquids,
//! plus labware movement.

use aria_common::command::{
    CommandPrivateResult, CommandResult, ConfigureForVolumeParams, LoadLabwareParams,
    LoadLiquidParams, LoadModuleParams, LoadPipetteParams, MoveLabwareParams,
};
use aria_common::entities::LabwareOffsetLocation;
use aria_common::error::EngineError;
use aria_common::types::LabwareLocation;

use crate::command::ExecuteOutcome;
use crate::execution::CommandHandlers;
use crate::resources::ResourceProvider;
use crate::state::EngineState;

pub fn load_pipette(
    params: &LoadPipetteParams,
    state: &EngineState,
    handlers: &CommandHandlers,
    resources: &dyn ResourceProvider,
) -> Result<ExecuteOutcome, EngineError> {
    let data = handlers
        .equipment
        .load_pipette(state, params.pipette_name, params.mount)?;
    let pipette_id = params
        .pipette_id
        .clone()
        .unwrap_or_else(|| resources.generate_id());

    Ok(ExecuteOutcome {
        result: CommandResult::LoadPipette {
            pipette_id: pipette_id.clone(),
        },
        private_result: Some(CommandPrivateResult::LoadPipette {
            pipette_id,
            serial_number: data.serial_number,
            static_config: data.static_config,
        }),
        notes: Vec::new(),
        request_pause: false,
    })
}

pub fn configure_for_volume(
    params: &ConfigureForVolumeParams,
    state: &EngineState,
    handlers: &CommandHandlers,
) -> Result<ExecuteOutcome, EngineError> {
    let data = handlers
        .equipment
        .configure_for_volume(state, &params.pipette_id, params.volume)?;
    Ok(ExecuteOutcome {
        result: CommandResult::ConfigureForVolume {
            pipette_id: params.pipette_id.clone(),
        },
        private_result: Some(CommandPrivateResult::ConfigureForVolume {
            pipette_id: params.pipette_id.clone(),
            serial_number: data.serial_number,
            static_config: data.static_config,
        }),
        notes: Vec::new(),
        request_pause: false,
    })
}

pub fn load_labware(
    params: &LoadLabwareParams,
    state: &EngineState,
    handlers: &CommandHandlers,
    resources: &dyn ResourceProvider,
) -> Result<ExecuteOutcome, EngineError> {
    let data = handlers.equipment.load_labware(state, params)?;
    let labware_id = params
        .labware_id
        .clone()
        .unwrap_or_else(|| resources.generate_id());
    Ok(ExecuteOutcome::from_result(CommandResult::LoadLabware {
        labware_id,
        definition_uri: data.definition_uri,
        offset_id: data.offset_id,
    }))
}

pub fn load_module(
    params: &LoadModuleParams,
    state: &EngineState,
    handlers: &CommandHandlers,
    resources: &dyn ResourceProvider,
) -> Result<ExecuteOutcome, EngineError> {
    state.addressable_areas.check_area(params.location.id())?;
    let data = handlers.equipment.load_module(state, params)?;
    let module_id = params
        .module_id
        .clone()
        .unwrap_or_else(|| resources.generate_id());
    Ok(ExecuteOutcome::from_result(CommandResult::LoadModule {
        module_id,
        serial_number: data.serial_number,
    }))
}

pub fn load_liquid(
    params: &LoadLiquidParams,
    state: &EngineState,
) -> Result<ExecuteOutcome, EngineError> {
    if !state.liquids.has_liquid(&params.liquid_id) {
        return Err(EngineError::LiquidDoesNotExist {
            liquid_id: params.liquid_id.clone(),
        });
    }
    state.labware.get(&params.labware_id)?;
    Ok(ExecuteOutcome::from_result(CommandResult::LoadLiquid {}))
}

/// Move labware to a new location and re-resolve its offset there.
/// Moving off-deck keeps the record but clears the offset.
pub fn move_labware(
    params: &MoveLabwareParams,
    state: &EngineState,
) -> Result<ExecuteOutcome, EngineError> {
    let labware = state.labware.get(&params.labware_id)?;

    let offset_location = match &params.new_location {
        LabwareLocation::Slot(slot) => {
            state.addressable_areas.check_area(slot.id())?;
            Some(LabwareOffsetLocation {
                slot_name: *slot,
                module_model: None,
            })
        }
        LabwareLocation::Module(module_id) => {
            let module = state.modules.get(module_id)?;
            Some(LabwareOffsetLocation {
                slot_name: module.location,
                module_model: Some(module.model),
            })
        }
        LabwareLocation::AddressableArea(area_name) => {
            state.addressable_areas.check_area(area_name)?;
            None
        }
        LabwareLocation::OffDeck => None,
    };

    let offset_id = offset_location.and_then(|location| {
        state
            .labware
            .find_applicable_offset(&labware.definition_uri, &location)
            .map(|offset| offset.id.clone())
    });

    Ok(ExecuteOutcome::from_result(CommandResult::MoveLabware {
        offset_id,
    }))
}
