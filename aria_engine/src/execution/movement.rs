//! Gantry movement handler: well targeting and homing.
//!
//! Well positions are resolved from the deck definition plus nominal
//! plate geometry. Full labware definitions live in an external package;
//! the engine only needs a deterministic position for each (labware,
//! well) pair, adjusted by any stored labware offset.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::debug;

use aria_common::config::EngineConfig;
use aria_common::error::EngineError;
use aria_common::types::{LabwareLocation, MotorAxis, Point, WellLocation, WellOrigin};

use crate::execution::hardware_api::HardwareApi;
use crate::state::EngineState;

// Nominal ANSI/SLAS plate geometry, in millimeters.
const WELL_A1_X: f64 = 14.38;
const WELL_A1_Y: f64 = 74.24;
const WELL_PITCH: f64 = 9.0;
const WELL_TOP_Z: f64 = 14.22;
const WELL_DEPTH: f64 = 10.67;

/// A fully-specified movement target.
#[derive(Debug, Clone)]
pub struct MoveToWellRequest<'a> {
    pub pipette_id: &'a str,
    pub labware_id: &'a str,
    pub well_name: &'a str,
    pub well_location: WellLocation,
    pub force_direct: bool,
    pub minimum_z_height: Option<f64>,
    pub speed: Option<f64>,
}

pub trait MovementHandler: Send + Sync {
    /// Move the pipette to a well, returning the position reached.
    fn move_to_well(
        &self,
        state: &EngineState,
        request: &MoveToWellRequest<'_>,
    ) -> Result<Point, EngineError>;

    fn home(&self, axes: &[MotorAxis]) -> Result<(), EngineError>;
}

pub fn create_movement_handler(
    config: &EngineConfig,
    hardware: Arc<dyn HardwareApi>,
    cancelled: Arc<AtomicBool>,
) -> Box<dyn MovementHandler> {
    if config.use_virtual_pipettes {
        Box::new(VirtualMovementHandler)
    } else {
        Box::new(HardwareMovementHandler {
            hardware,
            cancelled,
        })
    }
}

// ─── Shared position resolution ─────────────────────────────────────

/// Resolve the absolute deck position of a well target.
pub fn resolve_well_position(
    state: &EngineState,
    labware_id: &str,
    well_name: &str,
    well_location: &WellLocation,
) -> Result<Point, EngineError> {
    let labware = state.labware.get(labware_id)?;

    let area_name = match &labware.location {
        LabwareLocation::Slot(slot) => slot.id().to_owned(),
        LabwareLocation::Module(module_id) => {
            state.modules.get_location(module_id)?.id().to_owned()
        }
        LabwareLocation::AddressableArea(area_name) => area_name.clone(),
        LabwareLocation::OffDeck => {
            return Err(EngineError::LabwareNotLoaded {
                labware_id: labware_id.to_owned(),
            });
        }
    };
    let area = state.addressable_areas.check_area(&area_name)?;

    let well = well_grid_offset(well_name);
    let z = match well_location.origin {
        WellOrigin::Top => WELL_TOP_Z,
        WellOrigin::Center => WELL_TOP_Z - WELL_DEPTH / 2.0,
        WellOrigin::Bottom => WELL_TOP_Z - WELL_DEPTH,
    };

    let mut position = area.position
        + Point::new(WELL_A1_X + well.x, WELL_A1_Y + well.y, z)
        + Point::new(
            well_location.offset.x,
            well_location.offset.y,
            well_location.offset.z,
        );

    if let Some(offset_id) = &labware.offset_id {
        let vector = &state.labware.get_offset(offset_id)?.vector;
        position = position + Point::new(vector.x, vector.y, vector.z);
    }
    Ok(position)
}

/// Offset of a well from A1 on a nominal 9 mm grid. Names that do not
/// follow the row-letter column-number convention resolve to A1.
fn well_grid_offset(well_name: &str) -> Point {
    let mut chars = well_name.chars();
    let row = chars
        .next()
        .and_then(|c| c.is_ascii_uppercase().then(|| (c as u8 - b'A') as f64))
        .unwrap_or(0.0);
    let column = chars
        .as_str()
        .parse::<u32>()
        .map(|n| n.saturating_sub(1) as f64)
        .unwrap_or(0.0);
    Point::new(column * WELL_PITCH, -row * WELL_PITCH, 0.0)
}

// ─── Hardware implementation ────────────────────────────────────────

struct HardwareMovementHandler {
    hardware: Arc<dyn HardwareApi>,
    cancelled: Arc<AtomicBool>,
}

impl MovementHandler for HardwareMovementHandler {
    fn move_to_well(
        &self,
        state: &EngineState,
        request: &MoveToWellRequest<'_>,
    ) -> Result<Point, EngineError> {
        let mount = state.pipettes.get_mount(request.pipette_id)?;
        let mut target = resolve_well_position(
            state,
            request.labware_id,
            request.well_name,
            &request.well_location,
        )?;
        if let Some(minimum_z) = request.minimum_z_height {
            target.z = target.z.max(minimum_z);
        }
        if self.cancelled.load(Ordering::SeqCst) {
            return Err(EngineError::CommandCancelled {
                detail: "run cancelled before hardware motion".to_owned(),
            });
        }
        debug!(
            labware_id = request.labware_id,
            well_name = request.well_name,
            ?target,
            "moving to well"
        );
        self.hardware
            .move_to(mount, target, request.force_direct, request.speed)
    }

    fn home(&self, axes: &[MotorAxis]) -> Result<(), EngineError> {
        self.hardware.home(axes)
    }
}

// ─── Virtual implementation ─────────────────────────────────────────

struct VirtualMovementHandler;

impl MovementHandler for VirtualMovementHandler {
    fn move_to_well(
        &self,
        state: &EngineState,
        request: &MoveToWellRequest<'_>,
    ) -> Result<Point, EngineError> {
        state.pipettes.get(request.pipette_id)?;
        let mut target = resolve_well_position(
            state,
            request.labware_id,
            request.well_name,
            &request.well_location,
        )?;
        if let Some(minimum_z) = request.minimum_z_height {
            target.z = target.z.max(minimum_z);
        }
        Ok(target)
    }

    fn home(&self, _axes: &[MotorAxis]) -> Result<(), EngineError> {
        Ok(())
    }
}

// ─── Tests ──────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use aria_common::command::{
        Command, CommandIntent, CommandParams, CommandResult, LoadLabwareParams,
    };
    use aria_common::entities::{LabwareOffset, LabwareOffsetLocation, OffsetVector};
    use aria_common::types::{DeckSlot, WellOffset};
    use chrono::{TimeZone, Utc};

    use crate::actions::Action;

    fn now() -> chrono::DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
    }

    fn state_with_plate(offset_id: Option<&str>) -> EngineState {
        let mut state = EngineState::new(EngineConfig::virtual_config());
        let mut command = Command::new(
            "load-1",
            CommandParams::LoadLabware(LoadLabwareParams {
                location: LabwareLocation::Slot(DeckSlot::D1),
                load_name: "corning_96_wellplate".into(),
                namespace: "aria".into(),
                version: 1,
                labware_id: Some("plate-1".into()),
                display_name: None,
            }),
            CommandIntent::Setup,
            now(),
        );
        command.result = Some(CommandResult::LoadLabware {
            labware_id: "plate-1".into(),
            definition_uri: "aria/corning_96_wellplate/1".into(),
            offset_id: offset_id.map(Into::into),
        });
        state.labware.handle_command_success(&command);
        state
    }

    #[test]
    fn well_a1_sits_at_nominal_corner_offset() {
        let state = state_with_plate(None);
        let position =
            resolve_well_position(&state, "plate-1", "A1", &WellLocation::default()).unwrap();
        // D1 cutout is the deck origin.
        assert_eq!(position, Point::new(WELL_A1_X, WELL_A1_Y, WELL_TOP_Z));
    }

    #[test]
    fn well_grid_walks_rows_and_columns() {
        let state = state_with_plate(None);
        let b3 = resolve_well_position(&state, "plate-1", "B3", &WellLocation::default()).unwrap();
        assert_eq!(
            b3,
            Point::new(
                WELL_A1_X + 2.0 * WELL_PITCH,
                WELL_A1_Y - WELL_PITCH,
                WELL_TOP_Z
            )
        );
    }

    #[test]
    fn bottom_origin_and_offset_adjust_z() {
        let state = state_with_plate(None);
        let location = WellLocation {
            origin: WellOrigin::Bottom,
            offset: WellOffset {
                x: 0.0,
                y: 0.0,
                z: 1.0,
            },
        };
        let position = resolve_well_position(&state, "plate-1", "A1", &location).unwrap();
        assert_eq!(position.z, WELL_TOP_Z - WELL_DEPTH + 1.0);
    }

    #[test]
    fn labware_offset_shifts_the_target() {
        let mut state = state_with_plate(Some("offset-1"));
        state.labware.handle_action(&Action::AddLabwareOffset {
            offset: LabwareOffset {
                id: "offset-1".into(),
                created_at: now(),
                definition_uri: "aria/corning_96_wellplate/1".into(),
                location: LabwareOffsetLocation {
                    slot_name: DeckSlot::D1,
                    module_model: None,
                },
                vector: OffsetVector {
                    x: 0.5,
                    y: -0.5,
                    z: 0.25,
                },
            },
        });
        let position =
            resolve_well_position(&state, "plate-1", "A1", &WellLocation::default()).unwrap();
        assert_eq!(
            position,
            Point::new(WELL_A1_X + 0.5, WELL_A1_Y - 0.5, WELL_TOP_Z + 0.25)
        );
    }

    #[test]
    fn off_deck_labware_cannot_be_targeted() {
        let mut state = state_with_plate(None);
        let mut command = Command::new(
            "move-1",
            CommandParams::MoveLabware(aria_common::command::MoveLabwareParams {
                labware_id: "plate-1".into(),
                new_location: LabwareLocation::OffDeck,
                strategy: aria_common::command::MoveLabwareStrategy::ManualMoveWithoutPause,
            }),
            CommandIntent::Protocol,
            now(),
        );
        command.result = Some(CommandResult::MoveLabware { offset_id: None });
        state.labware.handle_command_success(&command);

        assert!(matches!(
            resolve_well_position(&state, "plate-1", "A1", &WellLocation::default()),
            Err(EngineError::LabwareNotLoaded { .. })
        ));
    }

    #[test]
    fn move_requires_a_loaded_pipette() {
        let state = state_with_plate(None);
        let handler = VirtualMovementHandler;
        let request = MoveToWellRequest {
            pipette_id: "missing",
            labware_id: "plate-1",
            well_name: "A1",
            well_location: WellLocation::default(),
            force_direct: false,
            minimum_z_height: Some(50.0),
            speed: None,
        };
        assert!(matches!(
            handler.move_to_well(&state, &request),
            Err(EngineError::PipetteNotLoaded { .. })
        ));
    }
}
