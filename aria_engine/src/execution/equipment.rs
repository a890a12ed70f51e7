//! Equipment handler: loading pipettes, labware, and modules.
//!
//! Labware resolution is backend-independent and lives in a provided
//! trait method; only serial-number acquisition differs between the
//! hardware and virtual implementations.

use std::sync::Arc;

use tracing::info;

use aria_common::command::{LoadLabwareParams, LoadModuleParams};
use aria_common::config::EngineConfig;
use aria_common::entities::{LabwareOffsetLocation, StaticPipetteConfig};
use aria_common::error::EngineError;
use aria_common::types::{LabwareLocation, MountType, PipetteName};

use crate::execution::hardware_api::HardwareApi;
use crate::resources::pipette_data;
use crate::state::EngineState;

/// Resolved pipette data, stored via the load command's private result.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedPipetteData {
    pub serial_number: String,
    pub static_config: StaticPipetteConfig,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LoadedLabwareData {
    pub definition_uri: String,
    pub offset_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LoadedModuleData {
    pub serial_number: Option<String>,
}

pub trait EquipmentHandler: Send + Sync {
    fn load_pipette(
        &self,
        state: &EngineState,
        pipette_name: PipetteName,
        mount: MountType,
    ) -> Result<LoadedPipetteData, EngineError>;

    fn configure_for_volume(
        &self,
        state: &EngineState,
        pipette_id: &str,
        volume: f64,
    ) -> Result<LoadedPipetteData, EngineError>;

    fn load_module(
        &self,
        state: &EngineState,
        params: &LoadModuleParams,
    ) -> Result<LoadedModuleData, EngineError>;

    /// Resolve labware against the deck and find its applicable offset.
    fn load_labware(
        &self,
        state: &EngineState,
        params: &LoadLabwareParams,
    ) -> Result<LoadedLabwareData, EngineError> {
        let definition_uri = format!(
            "{}/{}/{}",
            params.namespace, params.load_name, params.version
        );

        let offset_location = match &params.location {
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
                .find_applicable_offset(&definition_uri, &location)
                .map(|offset| offset.id.clone())
        });

        info!(%definition_uri, ?offset_id, "resolved labware");
        Ok(LoadedLabwareData {
            definition_uri,
            offset_id,
        })
    }
}

pub fn create_equipment_handler(
    config: &EngineConfig,
    hardware: Arc<dyn HardwareApi>,
) -> Box<dyn EquipmentHandler> {
    if config.use_virtual_pipettes {
        Box::new(VirtualEquipmentHandler)
    } else {
        Box::new(HardwareEquipmentHandler { hardware })
    }
}

fn check_robot_compatibility(
    state: &EngineState,
    pipette_name: PipetteName,
    mount: MountType,
) -> Result<(), EngineError> {
    if pipette_name.robot_type() != state.config.robot_type {
        return Err(EngineError::InvalidSpecificationForRobotType {
            pipette_name,
            mount,
            robot_type: state.config.robot_type,
        });
    }
    Ok(())
}

// ─── Hardware implementation ────────────────────────────────────────

struct HardwareEquipmentHandler {
    hardware: Arc<dyn HardwareApi>,
}

impl EquipmentHandler for HardwareEquipmentHandler {
    fn load_pipette(
        &self,
        state: &EngineState,
        pipette_name: PipetteName,
        mount: MountType,
    ) -> Result<LoadedPipetteData, EngineError> {
        check_robot_compatibility(state, pipette_name, mount)?;
        let serial_number = self.hardware.get_serial_number(mount)?;
        Ok(LoadedPipetteData {
            serial_number,
            static_config: pipette_data::static_config(pipette_name),
        })
    }

    fn configure_for_volume(
        &self,
        state: &EngineState,
        pipette_id: &str,
        volume: f64,
    ) -> Result<LoadedPipetteData, EngineError> {
        let pipette = state.pipettes.get(pipette_id)?;
        let serial_number = match &pipette.serial_number {
            Some(serial) => serial.clone(),
            None => self.hardware.get_serial_number(pipette.mount)?,
        };
        Ok(LoadedPipetteData {
            serial_number,
            static_config: pipette_data::static_config_for_volume(pipette.pipette_name, volume),
        })
    }

    fn load_module(
        &self,
        _state: &EngineState,
        params: &LoadModuleParams,
    ) -> Result<LoadedModuleData, EngineError> {
        // TODO: read the real serial once the module bus driver lands.
        Ok(LoadedModuleData {
            serial_number: Some(format!("module-{}", params.location.id())),
        })
    }
}

// ─── Virtual implementation ─────────────────────────────────────────

struct VirtualEquipmentHandler;

fn virtual_serial(mount: MountType) -> String {
    match mount {
        MountType::Left => "virtual-left".to_owned(),
        MountType::Right => "virtual-right".to_owned(),
    }
}

impl EquipmentHandler for VirtualEquipmentHandler {
    fn load_pipette(
        &self,
        state: &EngineState,
        pipette_name: PipetteName,
        mount: MountType,
    ) -> Result<LoadedPipetteData, EngineError> {
        check_robot_compatibility(state, pipette_name, mount)?;
        Ok(LoadedPipetteData {
            serial_number: virtual_serial(mount),
            static_config: pipette_data::static_config(pipette_name),
        })
    }

    fn configure_for_volume(
        &self,
        state: &EngineState,
        pipette_id: &str,
        volume: f64,
    ) -> Result<LoadedPipetteData, EngineError> {
        let pipette = state.pipettes.get(pipette_id)?;
        let serial_number = pipette
            .serial_number
            .clone()
            .unwrap_or_else(|| virtual_serial(pipette.mount));
        Ok(LoadedPipetteData {
            serial_number,
            static_config: pipette_data::static_config_for_volume(pipette.pipette_name, volume),
        })
    }

    fn load_module(
        &self,
        _state: &EngineState,
        _params: &LoadModuleParams,
    ) -> Result<LoadedModuleData, EngineError> {
        Ok(LoadedModuleData {
            serial_number: None,
        })
    }
}

// ─── Tests ──────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use aria_common::command::{Command, CommandIntent, CommandParams, CommandResult};
    use aria_common::entities::{LabwareOffset, OffsetVector};
    use aria_common::types::{DeckSlot, ModuleModel, RobotType};
    use chrono::{TimeZone, Utc};

    use crate::actions::Action;

    fn now() -> chrono::DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
    }

    fn virtual_state() -> EngineState {
        EngineState::new(EngineConfig::virtual_config())
    }

    #[test]
    fn load_pipette_rejects_wrong_robot_generation() {
        let state = virtual_state();
        assert_eq!(state.config.robot_type, RobotType::AriaFlex);
        let handler = VirtualEquipmentHandler;
        assert!(matches!(
            handler.load_pipette(&state, PipetteName::P300SingleGen2, MountType::Left),
            Err(EngineError::InvalidSpecificationForRobotType { .. })
        ));
        assert!(
            handler
                .load_pipette(&state, PipetteName::P1000SingleFlex, MountType::Left)
                .is_ok()
        );
    }

    #[test]
    fn load_labware_builds_uri_and_finds_offset() {
        let mut state = virtual_state();
        state.labware.handle_action(&Action::AddLabwareOffset {
            offset: LabwareOffset {
                id: "offset-1".into(),
                created_at: now(),
                definition_uri: "aria/corning_96_wellplate/1".into(),
                location: LabwareOffsetLocation {
                    slot_name: DeckSlot::C2,
                    module_model: None,
                },
                vector: OffsetVector {
                    x: 1.0,
                    y: 0.0,
                    z: 0.0,
                },
            },
        });

        let handler = VirtualEquipmentHandler;
        let params = LoadLabwareParams {
            location: LabwareLocation::Slot(DeckSlot::C2),
            load_name: "corning_96_wellplate".into(),
            namespace: "aria".into(),
            version: 1,
            labware_id: None,
            display_name: None,
        };
        let data = handler.load_labware(&state, &params).unwrap();
        assert_eq!(data.definition_uri, "aria/corning_96_wellplate/1");
        assert_eq!(data.offset_id.as_deref(), Some("offset-1"));
    }

    #[test]
    fn labware_on_module_uses_module_slot_for_offsets() {
        let mut state = virtual_state();
        let mut load_module = Command::new(
            "mod-1",
            CommandParams::LoadModule(LoadModuleParams {
                model: ModuleModel::TemperatureModuleV2,
                location: DeckSlot::D1,
                module_id: Some("module-1".into()),
            }),
            CommandIntent::Setup,
            now(),
        );
        load_module.result = Some(CommandResult::LoadModule {
            module_id: "module-1".into(),
            serial_number: None,
        });
        state.modules.handle_command_success(&load_module);

        state.labware.handle_action(&Action::AddLabwareOffset {
            offset: LabwareOffset {
                id: "offset-1".into(),
                created_at: now(),
                definition_uri: "aria/corning_96_wellplate/1".into(),
                location: LabwareOffsetLocation {
                    slot_name: DeckSlot::D1,
                    module_model: Some(ModuleModel::TemperatureModuleV2),
                },
                vector: OffsetVector {
                    x: 0.0,
                    y: 0.0,
                    z: 0.5,
                },
            },
        });

        let handler = VirtualEquipmentHandler;
        let params = LoadLabwareParams {
            location: LabwareLocation::Module("module-1".into()),
            load_name: "corning_96_wellplate".into(),
            namespace: "aria".into(),
            version: 1,
            labware_id: None,
            display_name: None,
        };
        let data = handler.load_labware(&state, &params).unwrap();
        assert_eq!(data.offset_id.as_deref(), Some("offset-1"));
    }

    #[test]
    fn off_deck_labware_gets_no_offset() {
        let state = virtual_state();
        let handler = VirtualEquipmentHandler;
        let params = LoadLabwareParams {
            location: LabwareLocation::OffDeck,
            load_name: "corning_96_wellplate".into(),
            namespace: "aria".into(),
            version: 1,
            labware_id: None,
            display_name: None,
        };
        let data = handler.load_labware(&state, &params).unwrap();
        assert!(data.offset_id.is_none());
    }
}
