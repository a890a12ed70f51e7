//! Liquid-handling handler: aspirate, dispense, and blow-out primitives.
//!
//! Volume validation is shared between the hardware and virtual
//! implementations so both backends enforce identical semantics; only
//! the final plunger movement differs.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::debug;

use aria_common::command::CommandNote;
use aria_common::config::EngineConfig;
use aria_common::entities::TipGeometry;
use aria_common::error::EngineError;
use aria_common::types::ApiVersion;

use crate::execution::hardware_api::HardwareApi;
use crate::state::EngineState;

/// API level at which `volume: 0` stopped meaning "everything".
const PARTIAL_VOLUME_API: ApiVersion = ApiVersion::new(2, 16);

/// Outcome of an aspirate or dispense: the volume actually moved plus
/// any notes raised while validating it.
#[derive(Debug, Clone, PartialEq)]
pub struct PipettingResult {
    pub volume: f64,
    pub notes: Vec<CommandNote>,
}

pub trait PipettingHandler: Send + Sync {
    /// Whether the plunger is in a known position from which an in-place
    /// aspirate is safe.
    fn get_is_ready_to_aspirate(
        &self,
        state: &EngineState,
        pipette_id: &str,
    ) -> Result<bool, EngineError>;

    /// Prepare the plunger for aspiration without moving liquid.
    fn prepare_for_aspirate(
        &self,
        state: &EngineState,
        pipette_id: &str,
    ) -> Result<(), EngineError>;

    fn aspirate_in_place(
        &self,
        state: &EngineState,
        pipette_id: &str,
        volume: f64,
        flow_rate: f64,
    ) -> Result<PipettingResult, EngineError>;

    fn dispense_in_place(
        &self,
        state: &EngineState,
        pipette_id: &str,
        volume: f64,
        flow_rate: f64,
        push_out: Option<f64>,
    ) -> Result<PipettingResult, EngineError>;

    fn blow_out_in_place(
        &self,
        state: &EngineState,
        pipette_id: &str,
        flow_rate: f64,
    ) -> Result<(), EngineError>;

    /// Seat a tip currently under the nozzle.
    fn pick_up_tip(
        &self,
        state: &EngineState,
        pipette_id: &str,
        tip: &TipGeometry,
    ) -> Result<(), EngineError>;

    fn drop_tip(
        &self,
        state: &EngineState,
        pipette_id: &str,
        home_after: bool,
    ) -> Result<(), EngineError>;
}

pub fn create_pipetting_handler(
    config: &EngineConfig,
    hardware: Arc<dyn HardwareApi>,
    cancelled: Arc<AtomicBool>,
) -> Box<dyn PipettingHandler> {
    if config.use_virtual_pipettes {
        Box::new(VirtualPipettingHandler)
    } else {
        Box::new(HardwarePipettingHandler {
            hardware,
            cancelled,
        })
    }
}

// ─── Shared validation ──────────────────────────────────────────────

enum TransferKind {
    Aspirate,
    Dispense,
}

/// Resolve the volume an aspirate may move.
///
/// A requested volume of zero means "fill to capacity" below
/// [`PARTIAL_VOLUME_API`] and literally zero from there on. Requests
/// exceeding the available volume by at most the configured rounding
/// epsilon are clamped down with a warning note; larger excesses fail.
pub fn resolve_aspirate_volume(
    state: &EngineState,
    pipette_id: &str,
    requested: f64,
) -> Result<(f64, Vec<CommandNote>), EngineError> {
    let available = state.pipettes.get_available_volume(pipette_id)?;
    let requested = apply_full_transfer_shorthand(requested, available, state.config.api_version);
    clamp_to_available(requested, available, state, TransferKind::Aspirate)
}

/// Resolve the volume a dispense may move. The available volume is
/// whatever the pipette currently holds; an unknown held volume (after a
/// blow-out) cannot be dispensed.
pub fn resolve_dispense_volume(
    state: &EngineState,
    pipette_id: &str,
    requested: f64,
    push_out: Option<f64>,
) -> Result<(f64, Vec<CommandNote>), EngineError> {
    if let Some(push_out) = push_out {
        if push_out < 0.0 {
            return Err(EngineError::InvalidPushOutVolume { push_out });
        }
    }
    let held = state.pipettes.get_aspirated_volume(pipette_id)?;
    let Some(available) = held else {
        return Err(EngineError::InvalidDispenseVolume {
            attempted: requested,
            available: 0.0,
        });
    };
    let requested = apply_full_transfer_shorthand(requested, available, state.config.api_version);
    clamp_to_available(requested, available, state, TransferKind::Dispense)
}

fn apply_full_transfer_shorthand(requested: f64, available: f64, api_version: ApiVersion) -> f64 {
    if requested == 0.0 && api_version < PARTIAL_VOLUME_API {
        available
    } else {
        requested
    }
}

fn clamp_to_available(
    requested: f64,
    available: f64,
    state: &EngineState,
    kind: TransferKind,
) -> Result<(f64, Vec<CommandNote>), EngineError> {
    let epsilon = state.config.volume_rounding_epsilon;
    if requested < 0.0 || requested - available > epsilon {
        return Err(match kind {
            TransferKind::Aspirate => EngineError::InvalidAspirateVolume {
                attempted: requested,
                available,
            },
            TransferKind::Dispense => EngineError::InvalidDispenseVolume {
                attempted: requested,
                available,
            },
        });
    }
    if requested > available {
        debug!(requested, available, "clamping volume to available");
        let note = CommandNote::warning(format!(
            "requested volume {requested} exceeded the available volume by less than \
             {epsilon} and was clamped to {available}"
        ));
        return Ok((available, vec![note]));
    }
    Ok((requested, Vec::new()))
}

// ─── Hardware implementation ────────────────────────────────────────

struct HardwarePipettingHandler {
    hardware: Arc<dyn HardwareApi>,
    cancelled: Arc<AtomicBool>,
}

impl HardwarePipettingHandler {
    fn check_cancelled(&self) -> Result<(), EngineError> {
        if self.cancelled.load(Ordering::SeqCst) {
            return Err(EngineError::CommandCancelled {
                detail: "run cancelled before hardware motion".to_owned(),
            });
        }
        Ok(())
    }
}

impl PipettingHandler for HardwarePipettingHandler {
    fn get_is_ready_to_aspirate(
        &self,
        state: &EngineState,
        pipette_id: &str,
    ) -> Result<bool, EngineError> {
        state.pipettes.get_attached_tip(pipette_id)?;
        state.pipettes.get_ready_to_aspirate(pipette_id)
    }

    fn prepare_for_aspirate(
        &self,
        state: &EngineState,
        pipette_id: &str,
    ) -> Result<(), EngineError> {
        state.pipettes.get_attached_tip(pipette_id)?;
        self.check_cancelled()?;
        let mount = state.pipettes.get_mount(pipette_id)?;
        self.hardware.prepare_for_aspirate(mount)
    }

    fn aspirate_in_place(
        &self,
        state: &EngineState,
        pipette_id: &str,
        volume: f64,
        flow_rate: f64,
    ) -> Result<PipettingResult, EngineError> {
        let (volume, notes) = resolve_aspirate_volume(state, pipette_id, volume)?;
        self.check_cancelled()?;
        let mount = state.pipettes.get_mount(pipette_id)?;
        self.hardware.aspirate(mount, volume, flow_rate)?;
        Ok(PipettingResult { volume, notes })
    }

    fn dispense_in_place(
        &self,
        state: &EngineState,
        pipette_id: &str,
        volume: f64,
        flow_rate: f64,
        push_out: Option<f64>,
    ) -> Result<PipettingResult, EngineError> {
        let (volume, notes) = resolve_dispense_volume(state, pipette_id, volume, push_out)?;
        self.check_cancelled()?;
        let mount = state.pipettes.get_mount(pipette_id)?;
        self.hardware.dispense(mount, volume, flow_rate, push_out)?;
        Ok(PipettingResult { volume, notes })
    }

    fn blow_out_in_place(
        &self,
        state: &EngineState,
        pipette_id: &str,
        flow_rate: f64,
    ) -> Result<(), EngineError> {
        state.pipettes.get_attached_tip(pipette_id)?;
        self.check_cancelled()?;
        let mount = state.pipettes.get_mount(pipette_id)?;
        self.hardware.blow_out(mount, flow_rate)
    }

    fn pick_up_tip(
        &self,
        state: &EngineState,
        pipette_id: &str,
        tip: &TipGeometry,
    ) -> Result<(), EngineError> {
        self.check_cancelled()?;
        let mount = state.pipettes.get_mount(pipette_id)?;
        self.hardware.pick_up_tip(mount, tip)
    }

    fn drop_tip(
        &self,
        state: &EngineState,
        pipette_id: &str,
        home_after: bool,
    ) -> Result<(), EngineError> {
        state.pipettes.get_attached_tip(pipette_id)?;
        self.check_cancelled()?;
        let mount = state.pipettes.get_mount(pipette_id)?;
        self.hardware.drop_tip(mount, home_after)
    }
}

// ─── Virtual implementation ─────────────────────────────────────────

/// Backend for analysis and simulation: validates and book-keeps without
/// any hardware. Readiness is inferred purely from whether the held
/// volume is known.
struct VirtualPipettingHandler;

impl PipettingHandler for VirtualPipettingHandler {
    fn get_is_ready_to_aspirate(
        &self,
        state: &EngineState,
        pipette_id: &str,
    ) -> Result<bool, EngineError> {
        Ok(state.pipettes.get_aspirated_volume(pipette_id)?.is_some())
    }

    fn prepare_for_aspirate(
        &self,
        state: &EngineState,
        pipette_id: &str,
    ) -> Result<(), EngineError> {
        state.pipettes.get_attached_tip(pipette_id)?;
        Ok(())
    }

    fn aspirate_in_place(
        &self,
        state: &EngineState,
        pipette_id: &str,
        volume: f64,
        _flow_rate: f64,
    ) -> Result<PipettingResult, EngineError> {
        let (volume, notes) = resolve_aspirate_volume(state, pipette_id, volume)?;
        Ok(PipettingResult { volume, notes })
    }

    fn dispense_in_place(
        &self,
        state: &EngineState,
        pipette_id: &str,
        volume: f64,
        _flow_rate: f64,
        push_out: Option<f64>,
    ) -> Result<PipettingResult, EngineError> {
        let (volume, notes) = resolve_dispense_volume(state, pipette_id, volume, push_out)?;
        Ok(PipettingResult { volume, notes })
    }

    fn blow_out_in_place(
        &self,
        state: &EngineState,
        pipette_id: &str,
        _flow_rate: f64,
    ) -> Result<(), EngineError> {
        state.pipettes.get_attached_tip(pipette_id)?;
        Ok(())
    }

    fn pick_up_tip(
        &self,
        state: &EngineState,
        pipette_id: &str,
        _tip: &TipGeometry,
    ) -> Result<(), EngineError> {
        state.pipettes.get(pipette_id)?;
        Ok(())
    }

    fn drop_tip(
        &self,
        state: &EngineState,
        pipette_id: &str,
        _home_after: bool,
    ) -> Result<(), EngineError> {
        state.pipettes.get_attached_tip(pipette_id)?;
        Ok(())
    }
}

// ─── Tests ──────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use aria_common::command::{
        AspirateInPlaceParams, Command, CommandIntent, CommandParams, CommandPrivateResult,
        CommandResult, PickUpTipParams,
    };
    use aria_common::entities::StaticPipetteConfig;
    use aria_common::types::{MountType, PipetteName, Point, WellLocation};
    use chrono::{TimeZone, Utc};
    use std::collections::BTreeMap;

    fn now() -> chrono::DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
    }

    /// State with one loaded pipette whose working volume is 3 and which
    /// currently holds 2, leaving 1 available.
    fn state_with_held_volume() -> EngineState {
        let mut state = EngineState::new(EngineConfig::virtual_config());

        let load = Command::new(
            "load-1",
            CommandParams::LoadPipette(aria_common::command::LoadPipetteParams {
                pipette_name: PipetteName::P300SingleGen2,
                mount: MountType::Left,
                pipette_id: Some("pipette-1".into()),
            }),
            CommandIntent::Setup,
            now(),
        );
        state.pipettes.handle_command_success(
            &load,
            Some(&CommandPrivateResult::LoadPipette {
                pipette_id: "pipette-1".into(),
                serial_number: "SIM-0001".into(),
                static_config: StaticPipetteConfig {
                    model: "p300_single_v2.1".into(),
                    display_name: "P300".into(),
                    channels: 1,
                    min_volume: 1.0,
                    max_volume: 3.0,
                    default_aspirate_flow_rate: 1.0,
                    default_dispense_flow_rate: 1.0,
                    default_blow_out_flow_rate: 1.0,
                    nominal_tip_overlap: BTreeMap::new(),
                },
            }),
        );

        let mut pick_up = Command::new(
            "tip-1",
            CommandParams::PickUpTip(PickUpTipParams {
                pipette_id: "pipette-1".into(),
                labware_id: "tiprack-1".into(),
                well_name: "A1".into(),
                well_location: WellLocation::default(),
            }),
            CommandIntent::Protocol,
            now(),
        );
        pick_up.result = Some(CommandResult::PickUpTip {
            tip_volume: 3.0,
            tip_length: 51.0,
            tip_diameter: 5.2,
            position: Point::default(),
        });
        state.pipettes.handle_command_success(&pick_up, None);

        let mut aspirate = Command::new(
            "asp-1",
            CommandParams::AspirateInPlace(AspirateInPlaceParams {
                pipette_id: "pipette-1".into(),
                volume: 2.0,
                flow_rate: 1.0,
            }),
            CommandIntent::Protocol,
            now(),
        );
        aspirate.result = Some(CommandResult::AspirateInPlace { volume: 2.0 });
        state.pipettes.handle_command_success(&aspirate, None);

        state
    }

    #[test]
    fn aspirate_within_available_passes_through() {
        let state = state_with_held_volume();
        let (volume, notes) = resolve_aspirate_volume(&state, "pipette-1", 0.5).unwrap();
        assert_eq!(volume, 0.5);
        assert!(notes.is_empty());
    }

    #[test]
    fn aspirate_barely_over_available_is_clamped_with_warning() {
        let state = state_with_held_volume();
        let (volume, notes) =
            resolve_aspirate_volume(&state, "pipette-1", 1.000_000_000_000_1).unwrap();
        assert_eq!(volume, 1.0);
        assert_eq!(notes.len(), 1);
    }

    #[test]
    fn aspirate_clearly_over_available_fails() {
        let state = state_with_held_volume();
        assert!(matches!(
            resolve_aspirate_volume(&state, "pipette-1", 1.01),
            Err(EngineError::InvalidAspirateVolume { .. })
        ));
    }

    #[test]
    fn negative_push_out_is_rejected() {
        let state = state_with_held_volume();
        assert!(matches!(
            resolve_dispense_volume(&state, "pipette-1", 1.0, Some(-7.0)),
            Err(EngineError::InvalidPushOutVolume { push_out }) if push_out == -7.0
        ));
    }

    #[test]
    fn dispense_with_unknown_held_volume_fails() {
        let mut state = state_with_held_volume();
        let mut blow_out = Command::new(
            "blow-1",
            CommandParams::BlowOutInPlace(aria_common::command::BlowOutInPlaceParams {
                pipette_id: "pipette-1".into(),
                flow_rate: 1.0,
            }),
            CommandIntent::Protocol,
            now(),
        );
        blow_out.result = Some(CommandResult::BlowOutInPlace {});
        state.pipettes.handle_command_success(&blow_out, None);

        assert!(matches!(
            resolve_dispense_volume(&state, "pipette-1", 1.0, None),
            Err(EngineError::InvalidDispenseVolume { .. })
        ));
    }

    #[test]
    fn zero_volume_means_everything_before_api_2_16() {
        let mut state = state_with_held_volume();
        state.config.api_version = ApiVersion::new(2, 15);
        let (volume, _) = resolve_aspirate_volume(&state, "pipette-1", 0.0).unwrap();
        assert_eq!(volume, 1.0);
        let (dispensed, _) = resolve_dispense_volume(&state, "pipette-1", 0.0, None).unwrap();
        assert_eq!(dispensed, 2.0);
    }

    #[test]
    fn zero_volume_means_zero_from_api_2_16() {
        let state = state_with_held_volume();
        assert!(state.config.api_version >= PARTIAL_VOLUME_API);
        let (volume, _) = resolve_aspirate_volume(&state, "pipette-1", 0.0).unwrap();
        assert_eq!(volume, 0.0);
    }

    #[test]
    fn virtual_readiness_follows_known_volume() {
        let state = state_with_held_volume();
        let handler = VirtualPipettingHandler;
        assert!(handler.get_is_ready_to_aspirate(&state, "pipette-1").unwrap());
    }
}
