//! Labware sub-store.
//!
//! Tracks loaded labware and stored labware offsets. Labware is never
//! deleted; moving it off-deck is a location update that also clears the
//! applied offset.

use std::collections::HashMap;

use aria_common::command::{Command, CommandParams, CommandResult};
use aria_common::entities::{LabwareOffset, LabwareOffsetLocation, LoadedLabware};
use aria_common::error::EngineError;
use aria_common::types::LabwareLocation;

use crate::actions::Action;

#[derive(Debug, Clone, Default)]
pub struct LabwareStore {
    by_id: HashMap<String, LoadedLabware>,
    /// Offsets in creation order; the most recently added match wins.
    offsets: Vec<LabwareOffset>,
}

impl LabwareStore {
    pub fn new() -> Self {
        Self::default()
    }

    // ─── Mutation ───────────────────────────────────────────────────

    pub fn handle_action(&mut self, action: &Action) {
        if let Action::AddLabwareOffset { offset } = action {
            self.offsets.push(offset.clone());
        }
    }

    pub fn handle_command_success(&mut self, command: &Command) {
        match (&command.params, &command.result) {
            (
                CommandParams::LoadLabware(params),
                Some(CommandResult::LoadLabware {
                    labware_id,
                    definition_uri,
                    offset_id,
                }),
            ) => {
                self.by_id.insert(
                    labware_id.clone(),
                    LoadedLabware {
                        id: labware_id.clone(),
                        load_name: params.load_name.clone(),
                        definition_uri: definition_uri.clone(),
                        location: params.location.clone(),
                        offset_id: offset_id.clone(),
                        display_name: params.display_name.clone(),
                    },
                );
            }
            (CommandParams::MoveLabware(params), Some(CommandResult::MoveLabware { offset_id })) => {
                if let Some(labware) = self.by_id.get_mut(&params.labware_id) {
                    labware.location = params.new_location.clone();
                    labware.offset_id = offset_id.clone();
                }
            }
            _ => {}
        }
    }

    // ─── Reads ──────────────────────────────────────────────────────

    pub fn get(&self, labware_id: &str) -> Result<&LoadedLabware, EngineError> {
        self.by_id
            .get(labware_id)
            .ok_or_else(|| EngineError::LabwareNotLoaded {
                labware_id: labware_id.to_owned(),
            })
    }

    pub fn get_all(&self) -> Vec<&LoadedLabware> {
        let mut labware: Vec<_> = self.by_id.values().collect();
        labware.sort_by(|a, b| a.id.cmp(&b.id));
        labware
    }

    pub fn get_location(&self, labware_id: &str) -> Result<&LabwareLocation, EngineError> {
        Ok(&self.get(labware_id)?.location)
    }

    pub fn get_offset(&self, offset_id: &str) -> Result<&LabwareOffset, EngineError> {
        self.offsets
            .iter()
            .find(|offset| offset.id == offset_id)
            .ok_or_else(|| EngineError::LabwareOffsetDoesNotExist {
                offset_id: offset_id.to_owned(),
            })
    }

    pub fn get_all_offsets(&self) -> &[LabwareOffset] {
        &self.offsets
    }

    /// The offset applying to labware of `definition_uri` at `location`,
    /// if any. The most recently added match wins.
    pub fn find_applicable_offset(
        &self,
        definition_uri: &str,
        location: &LabwareOffsetLocation,
    ) -> Option<&LabwareOffset> {
        self.offsets
            .iter()
            .rev()
            .find(|offset| offset.definition_uri == definition_uri && &offset.location == location)
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
