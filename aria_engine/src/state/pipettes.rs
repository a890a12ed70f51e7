//! Pipette sub-store.
//!
//! Tracks loaded pipettes and their live liquid-handling state: attached
//! tip, aspirated volume, and plunger readiness. Updated only from
//! command success actions; the resolved hardware configuration arrives
//! through the load command's private result.

use std::collections::HashMap;

use tracing::warn;

use aria_common::command::{Command, CommandParams, CommandPrivateResult, CommandResult};
use aria_common::entities::{LoadedPipette, TipGeometry};
use aria_common::error::EngineError;

#[derive(Debug, Clone, Default)]
pub struct PipetteStore {
    by_id: HashMap<String, LoadedPipette>,
}

impl PipetteStore {
    pub fn new() -> Self {
        Self::default()
    }

    // ─── Mutation (command success only) ────────────────────────────

    pub fn handle_command_success(
        &mut self,
        command: &Command,
        private_result: Option<&CommandPrivateResult>,
    ) {
        match (&command.params, &command.result) {
            (CommandParams::LoadPipette(params), _) => {
                let Some(CommandPrivateResult::LoadPipette {
                    pipette_id,
                    serial_number,
                    static_config,
                }) = private_result
                else {
                    warn!(command_id = %command.id, "loadPipette succeeded without private result");
                    return;
                };
                self.by_id.insert(
                    pipette_id.clone(),
                    LoadedPipette {
                        id: pipette_id.clone(),
                        pipette_name: params.pipette_name,
                        mount: params.mount,
                        serial_number: Some(serial_number.clone()),
                        static_config: Some(static_config.clone()),
                        attached_tip: None,
                        aspirated_volume: None,
                        ready_to_aspirate: false,
                    },
                );
            }
            (CommandParams::ConfigureForVolume(_), _) => {
                let Some(CommandPrivateResult::ConfigureForVolume {
                    pipette_id,
                    serial_number,
                    static_config,
                }) = private_result
                else {
                    return;
                };
                if let Some(pipette) = self.by_id.get_mut(pipette_id) {
                    pipette.serial_number = Some(serial_number.clone());
                    pipette.static_config = Some(static_config.clone());
                }
            }
            (
                CommandParams::PickUpTip(params),
                Some(CommandResult::PickUpTip {
                    tip_volume,
                    tip_length,
                    tip_diameter,
                    ..
                }),
            ) => {
                if let Some(pipette) = self.by_id.get_mut(&params.pipette_id) {
                    pipette.attached_tip = Some(TipGeometry {
                        length: *tip_length,
                        diameter: *tip_diameter,
                        volume: *tip_volume,
                    });
                    pipette.aspirated_volume = Some(0.0);
                    pipette.ready_to_aspirate = true;
                }
            }
            (CommandParams::DropTip(params), _) => {
                if let Some(pipette) = self.by_id.get_mut(&params.pipette_id) {
                    pipette.attached_tip = None;
                    pipette.aspirated_volume = None;
                    pipette.ready_to_aspirate = false;
                }
            }
            (CommandParams::Aspirate(params), Some(CommandResult::Aspirate { volume, .. })) => {
                if let Some(pipette) = self.by_id.get_mut(&params.pipette_id) {
                    pipette.aspirated_volume =
                        Some(pipette.aspirated_volume.unwrap_or(0.0) + volume);
                    // A well-targeted aspirate resets the plunger in a
                    // known position, restoring readiness.
                    pipette.ready_to_aspirate = true;
                }
            }
            (
                CommandParams::AspirateInPlace(params),
                Some(CommandResult::AspirateInPlace { volume }),
            ) => {
                if let Some(pipette) = self.by_id.get_mut(&params.pipette_id) {
                    pipette.aspirated_volume =
                        Some(pipette.aspirated_volume.unwrap_or(0.0) + volume);
                }
            }
            (CommandParams::Dispense(params), Some(CommandResult::Dispense { volume, .. })) => {
                self.subtract_volume(&params.pipette_id, *volume);
            }
            (
                CommandParams::DispenseInPlace(params),
                Some(CommandResult::DispenseInPlace { volume }),
            ) => {
                self.subtract_volume(&params.pipette_id, *volume);
            }
            (CommandParams::BlowOutInPlace(params), _) => {
                if let Some(pipette) = self.by_id.get_mut(&params.pipette_id) {
                    // The plunger is past zero; its position and the held
                    // volume are both unknown until the next well-targeted
                    // aspirate.
                    pipette.aspirated_volume = None;
                    pipette.ready_to_aspirate = false;
                }
            }
            _ => {}
        }
    }

    fn subtract_volume(&mut self, pipette_id: &str, volume: f64) {
        if let Some(pipette) = self.by_id.get_mut(pipette_id) {
            if let Some(held) = pipette.aspirated_volume {
                pipette.aspirated_volume = Some((held - volume).max(0.0));
            }
        }
    }

    // ─── Reads ──────────────────────────────────────────────────────

    pub fn get(&self, pipette_id: &str) -> Result<&LoadedPipette, EngineError> {
        self.by_id
            .get(pipette_id)
            .ok_or_else(|| EngineError::PipetteNotLoaded {
                pipette_id: pipette_id.to_owned(),
            })
    }

    pub fn get_all(&self) -> Vec<&LoadedPipette> {
        let mut pipettes: Vec<_> = self.by_id.values().collect();
        pipettes.sort_by(|a, b| a.id.cmp(&b.id));
        pipettes
    }

    pub fn get_attached_tip(&self, pipette_id: &str) -> Result<&TipGeometry, EngineError> {
        self.get(pipette_id)?
            .attached_tip
            .as_ref()
            .ok_or_else(|| EngineError::TipNotAttached {
                pipette_id: pipette_id.to_owned(),
            })
    }

    /// Volume currently held. `Ok(None)` means the plunger position is
    /// unknown (e.g. after a blow-out). Fails if no tip is attached.
    pub fn get_aspirated_volume(&self, pipette_id: &str) -> Result<Option<f64>, EngineError> {
        self.get_attached_tip(pipette_id)?;
        Ok(self.get(pipette_id)?.aspirated_volume)
    }

    /// Max volume the pipette can hold with its current tip.
    pub fn get_working_volume(&self, pipette_id: &str) -> Result<f64, EngineError> {
        let tip = self.get_attached_tip(pipette_id)?;
        let max_volume = self
            .get(pipette_id)?
            .static_config
            .as_ref()
            .map(|c| c.max_volume)
            .unwrap_or(tip.volume);
        Ok(max_volume.min(tip.volume))
    }

    /// Remaining room for aspiration with the current tip.
    pub fn get_available_volume(&self, pipette_id: &str) -> Result<f64, EngineError> {
        let working = self.get_working_volume(pipette_id)?;
        let held = self.get_aspirated_volume(pipette_id)?.unwrap_or(0.0);
        Ok((working - held).max(0.0))
    }

    pub fn get_ready_to_aspirate(&self, pipette_id: &str) -> Result<bool, EngineError> {
        Ok(self.get(pipette_id)?.ready_to_aspirate)
    }

    pub fn get_mount(&self, pipette_id: &str) -> Result<aria_common::types::MountType, EngineError> {
        Ok(self.get(pipette_id)?.mount)
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
