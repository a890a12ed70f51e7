//! Engine error taxonomy.
//!
//! Classified errors become a failed command's [`ErrorOccurrence`] and the
//! run continues (subject to command intent). Unclassified errors escape
//! the executor, unwind the queue worker, and are fatal to the run.
//! [`EngineError::RunStopped`] is the internal unwind signal and is never
//! shown to users.

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::command::ErrorOccurrence;
use crate::types::{MountType, PipetteName, RobotType};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    // Preconditions
    #[error("pipette {pipette_id} has no tip attached")]
    TipNotAttached { pipette_id: String },

    #[error(
        "pipette {pipette_id} is not ready to aspirate; the plunger must be \
         reset by aspirating at a known well position first"
    )]
    PipetteNotReadyToAspirate { pipette_id: String },

    #[error(
        "pipette {pipette_name:?} on mount {mount:?} is not compatible with robot type \
         {robot_type:?}"
    )]
    InvalidSpecificationForRobotType {
        pipette_name: PipetteName,
        mount: MountType,
        robot_type: RobotType,
    },

    // Validation
    #[error("cannot aspirate {attempted} uL; only {available} uL available")]
    InvalidAspirateVolume { attempted: f64, available: f64 },

    #[error("cannot dispense {attempted} uL; only {available} uL held")]
    InvalidDispenseVolume { attempted: f64, available: f64 },

    #[error("push-out volume must be non-negative, got {push_out}")]
    InvalidPushOutVolume { push_out: f64 },

    // Deck configuration
    #[error("addressable area {area_name} is not in the deck configuration")]
    AreaNotInDeckConfiguration { area_name: String },

    #[error(
        "addressable area {area_name} is incompatible with the fixture already \
         configured for cutout {cutout_id}"
    )]
    IncompatibleAddressableArea {
        area_name: String,
        cutout_id: String,
    },

    #[error("cutout {cutout_id} does not exist in the deck definition")]
    CutoutDoesNotExist { cutout_id: String },

    #[error("cutout fixture {fixture_id} does not exist in the deck definition")]
    FixtureDoesNotExist { fixture_id: String },

    #[error("addressable area {area_name} does not exist in the deck definition")]
    AddressableAreaDoesNotExist { area_name: String },

    // Entity lookup
    #[error("labware {labware_id} is not loaded")]
    LabwareNotLoaded { labware_id: String },

    #[error("pipette {pipette_id} is not loaded")]
    PipetteNotLoaded { pipette_id: String },

    #[error("module {module_id} is not loaded")]
    ModuleNotLoaded { module_id: String },

    #[error("command {command_id} does not exist")]
    CommandDoesNotExist { command_id: String },

    #[error("labware offset {offset_id} does not exist")]
    LabwareOffsetDoesNotExist { offset_id: String },

    #[error("liquid {liquid_id} has not been defined")]
    LiquidDoesNotExist { liquid_id: String },

    // Run control
    #[error("run action not allowed: {detail}")]
    InvalidRunAction { detail: String },

    // Hardware and control signals
    #[error("hardware fault: {detail}")]
    HardwareFault { detail: String },

    #[error("command cancelled: {detail}")]
    CommandCancelled { detail: String },

    #[error("queue worker panicked: {detail}")]
    WorkerPanicked { detail: String },

    /// Internal signal: no more commands will ever run. Unwinds the queue
    /// worker loop cleanly.
    #[error("run has stopped")]
    RunStopped,
}

impl EngineError {
    /// Stable wire identifier for this error kind.
    pub const fn error_type(&self) -> &'static str {
        match self {
            EngineError::TipNotAttached { .. } => "tipNotAttached",
            EngineError::PipetteNotReadyToAspirate { .. } => "pipetteNotReadyToAspirate",
            EngineError::InvalidSpecificationForRobotType { .. } => {
                "invalidSpecificationForRobotType"
            }
            EngineError::InvalidAspirateVolume { .. } => "invalidAspirateVolume",
            EngineError::InvalidDispenseVolume { .. } => "invalidDispenseVolume",
            EngineError::InvalidPushOutVolume { .. } => "invalidPushOutVolume",
            EngineError::AreaNotInDeckConfiguration { .. } => "areaNotInDeckConfiguration",
            EngineError::IncompatibleAddressableArea { .. } => "incompatibleAddressableArea",
            EngineError::CutoutDoesNotExist { .. } => "cutoutDoesNotExist",
            EngineError::FixtureDoesNotExist { .. } => "fixtureDoesNotExist",
            EngineError::AddressableAreaDoesNotExist { .. } => "addressableAreaDoesNotExist",
            EngineError::LabwareNotLoaded { .. } => "labwareNotLoaded",
            EngineError::PipetteNotLoaded { .. } => "pipetteNotLoaded",
            EngineError::ModuleNotLoaded { .. } => "moduleNotLoaded",
            EngineError::CommandDoesNotExist { .. } => "commandDoesNotExist",
            EngineError::LabwareOffsetDoesNotExist { .. } => "labwareOffsetDoesNotExist",
            EngineError::LiquidDoesNotExist { .. } => "liquidDoesNotExist",
            EngineError::InvalidRunAction { .. } => "invalidRunAction",
            EngineError::HardwareFault { .. } => "hardwareFault",
            EngineError::CommandCancelled { .. } => "commandCancelled",
            EngineError::WorkerPanicked { .. } => "workerPanicked",
            EngineError::RunStopped => "runStopped",
        }
    }

    /// Whether this error is an expected, classified failure mode that
    /// becomes a failed-command record. Everything else is fatal to the
    /// run.
    pub const fn is_classified(&self) -> bool {
        !matches!(
            self,
            EngineError::HardwareFault { .. }
                | EngineError::WorkerPanicked { .. }
                | EngineError::RunStopped
        )
    }

    /// Convert into the boundary error record. The occurrence id and
    /// timestamp come from the caller's resource provider.
    pub fn to_occurrence(&self, id: impl Into<String>, created_at: DateTime<Utc>) -> ErrorOccurrence {
        ErrorOccurrence {
            id: id.into(),
            created_at,
            error_type: self.error_type().to_owned(),
            detail: self.to_string(),
            wrapped_errors: Vec::new(),
        }
    }
}

// ─── Tests ──────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn classification_splits_recoverable_from_fatal() {
        let recoverable = EngineError::InvalidPushOutVolume { push_out: -7.0 };
        assert!(recoverable.is_classified());

        assert!(!EngineError::RunStopped.is_classified());
        assert!(
            !EngineError::HardwareFault {
                detail: "motor stall".into()
            }
            .is_classified()
        );
    }

    #[test]
    fn occurrence_carries_type_and_detail() {
        let err = EngineError::InvalidAspirateVolume {
            attempted: 1.01,
            available: 1.0,
        };
        let at = Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap();
        let occurrence = err.to_occurrence("error-1", at);
        assert_eq!(occurrence.error_type, "invalidAspirateVolume");
        assert!(occurrence.detail.contains("1.01"));
        assert!(occurrence.wrapped_errors.is_empty());
    }
}
