//! Command record model.
//!
//! A [`Command`] is the unit of queued work at the engine boundary. Its
//! params are a closed tagged union, one variant per command type, so
//! dispatch from variant to implementation is checked at compile time.
//! Results split into a public [`CommandResult`] exposed to callers and a
//! [`CommandPrivateResult`] consumed internally by the state stores.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::entities::StaticPipetteConfig;
use crate::types::{
    DeckSlot, LabwareLocation, ModuleModel, MotorAxis, MountType, PipetteName, Point, WellLocation,
};

// ─── Status & intent ────────────────────────────────────────────────

/// Lifecycle status of a command. Transitions are monotonic:
/// `Queued → Running → {Succeeded | Failed}`, never backwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CommandStatus {
    Queued,
    Running,
    Succeeded,
    Failed,
}

impl CommandStatus {
    pub const fn is_terminal(&self) -> bool {
        matches!(self, CommandStatus::Succeeded | CommandStatus::Failed)
    }
}

impl fmt::Display for CommandStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CommandStatus::Queued => "queued",
            CommandStatus::Running => "running",
            CommandStatus::Succeeded => "succeeded",
            CommandStatus::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Why a command was enqueued. Fixit commands splice in directly after a
/// failed command for guided recovery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CommandIntent {
    #[default]
    Protocol,
    Setup,
    Fixit,
}

// ─── Notes & errors ─────────────────────────────────────────────────

/// Severity of a note attached to a command during execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NoteKind {
    Warning,
    Information,
}

/// A note attached to a command during execution, e.g. a volume-rounding
/// warning. Notes never change the command's status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandNote {
    pub kind: NoteKind,
    pub message: String,
}

impl CommandNote {
    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            kind: NoteKind::Warning,
            message: message.into(),
        }
    }
}

/// Structured record of a failure, attached to a failed command and, for
/// run-fatal errors, to the run itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorOccurrence {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub error_type: String,
    pub detail: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub wrapped_errors: Vec<ErrorOccurrence>,
}

// ─── Params ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AspirateParams {
    pub pipette_id: String,
    pub labware_id: String,
    pub well_name: String,
    #[serde(default)]
    pub well_location: WellLocation,
    pub volume: f64,
    pub flow_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AspirateInPlaceParams {
    pub pipette_id: String,
    pub volume: f64,
    pub flow_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DispenseParams {
    pub pipette_id: String,
    pub labware_id: String,
    pub well_name: String,
    #[serde(default)]
    pub well_location: WellLocation,
    pub volume: f64,
    pub flow_rate: f64,
    /// Extra plunger travel past zero, in microliters. Must be
    /// non-negative.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub push_out: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DispenseInPlaceParams {
    pub pipette_id: String,
    pub volume: f64,
    pub flow_rate: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub push_out: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlowOutInPlaceParams {
    pub pipette_id: String,
    pub flow_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveToWellParams {
    pub pipette_id: String,
    pub labware_id: String,
    pub well_name: String,
    #[serde(default)]
    pub well_location: WellLocation,
    /// Skip arc planning and move in a straight line.
    #[serde(default)]
    pub force_direct: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minimum_z_height: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speed: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PickUpTipParams {
    pub pipette_id: String,
    pub labware_id: String,
    pub well_name: String,
    #[serde(default)]
    pub well_location: WellLocation,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DropTipParams {
    pub pipette_id: String,
    pub labware_id: String,
    pub well_name: String,
    /// Home the plunger after dropping, clearing residual volume.
    #[serde(default = "default_true")]
    pub home_after: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadPipetteParams {
    pub pipette_name: PipetteName,
    pub mount: MountType,
    /// Caller-assigned id; generated when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pipette_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigureForVolumeParams {
    pub pipette_id: String,
    pub volume: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadLabwareParams {
    pub location: LabwareLocation,
    pub load_name: String,
    pub namespace: String,
    pub version: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub labware_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadModuleParams {
    pub model: ModuleModel,
    pub location: DeckSlot,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub module_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadLiquidParams {
    pub liquid_id: String,
    pub labware_id: String,
    /// Initial volume per well name, in microliters.
    pub volume_by_well: BTreeMap<String, f64>,
}

/// How labware physically gets to its new location.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MoveLabwareStrategy {
    UsingGripper,
    ManualMoveWithPause,
    ManualMoveWithoutPause,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveLabwareParams {
    pub labware_id: String,
    pub new_location: LabwareLocation,
    pub strategy: MoveLabwareStrategy,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentParams {
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WaitForResumeParams {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HomeParams {
    /// Axes to home; all axes when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub axes: Option<Vec<MotorAxis>>,
}

/// Closed union of command parameters, tagged by command type at the
/// serialization boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "commandType", content = "params", rename_all = "camelCase")]
pub enum CommandParams {
    Aspirate(AspirateParams),
    AspirateInPlace(AspirateInPlaceParams),
    Dispense(DispenseParams),
    DispenseInPlace(DispenseInPlaceParams),
    BlowOutInPlace(BlowOutInPlaceParams),
    MoveToWell(MoveToWellParams),
    PickUpTip(PickUpTipParams),
    DropTip(DropTipParams),
    LoadPipette(LoadPipetteParams),
    ConfigureForVolume(ConfigureForVolumeParams),
    LoadLabware(LoadLabwareParams),
    LoadModule(LoadModuleParams),
    LoadLiquid(LoadLiquidParams),
    MoveLabware(MoveLabwareParams),
    Comment(CommentParams),
    WaitForResume(WaitForResumeParams),
    Home(HomeParams),
}

impl CommandParams {
    /// Command type discriminant as it appears on the wire.
    pub const fn command_type(&self) -> &'static str {
        match self {
            CommandParams::Aspirate(_) => "aspirate",
            CommandParams::AspirateInPlace(_) => "aspirateInPlace",
            CommandParams::Dispense(_) => "dispense",
            CommandParams::DispenseInPlace(_) => "dispenseInPlace",
            CommandParams::BlowOutInPlace(_) => "blowOutInPlace",
            CommandParams::MoveToWell(_) => "moveToWell",
            CommandParams::PickUpTip(_) => "pickUpTip",
            CommandParams::DropTip(_) => "dropTip",
            CommandParams::LoadPipette(_) => "loadPipette",
            CommandParams::ConfigureForVolume(_) => "configureForVolume",
            CommandParams::LoadLabware(_) => "loadLabware",
            CommandParams::LoadModule(_) => "loadModule",
            CommandParams::LoadLiquid(_) => "loadLiquid",
            CommandParams::MoveLabware(_) => "moveLabware",
            CommandParams::Comment(_) => "comment",
            CommandParams::WaitForResume(_) => "waitForResume",
            CommandParams::Home(_) => "home",
        }
    }
}

// ─── Results ────────────────────────────────────────────────────────

/// Public command results, exposed to callers once a command succeeds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum CommandResult {
    Aspirate {
        /// Volume actually aspirated, after clamping.
        volume: f64,
        position: Point,
    },
    AspirateInPlace {
        volume: f64,
    },
    Dispense {
        volume: f64,
        position: Point,
    },
    DispenseInPlace {
        volume: f64,
    },
    BlowOutInPlace {},
    MoveToWell {
        position: Point,
    },
    PickUpTip {
        tip_volume: f64,
        tip_length: f64,
        tip_diameter: f64,
        position: Point,
    },
    DropTip {},
    LoadPipette {
        pipette_id: String,
    },
    ConfigureForVolume {
        pipette_id: String,
    },
    LoadLabware {
        labware_id: String,
        definition_uri: String,
        offset_id: Option<String>,
    },
    LoadModule {
        module_id: String,
        serial_number: Option<String>,
    },
    LoadLiquid {},
    MoveLabware {
        offset_id: Option<String>,
    },
    Comment {},
    WaitForResume {},
    Home {},
}

/// Internal-only results used to keep other sub-stores in sync. Never
/// serialized at the boundary.
#[derive(Debug, Clone, PartialEq)]
pub enum CommandPrivateResult {
    LoadPipette {
        pipette_id: String,
        serial_number: String,
        static_config: StaticPipetteConfig,
    },
    ConfigureForVolume {
        pipette_id: String,
        serial_number: String,
        static_config: StaticPipetteConfig,
    },
}

// ─── Command record ─────────────────────────────────────────────────

/// A single queued, typed unit of work and its full execution record.
///
/// Commands are created when enqueued, mutated only through dispatched
/// actions, and kept in history for the lifetime of the run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Command {
    pub id: String,
    /// Caller-supplied idempotency/correlation key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(flatten)]
    pub params: CommandParams,
    pub status: CommandStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<CommandResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorOccurrence>,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub intent: CommandIntent,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub notes: Vec<CommandNote>,
}

impl Command {
    /// Build a freshly queued command record.
    pub fn new(
        id: impl Into<String>,
        params: CommandParams,
        intent: CommandIntent,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            key: None,
            params,
            status: CommandStatus::Queued,
            result: None,
            error: None,
            created_at,
            started_at: None,
            completed_at: None,
            intent,
            notes: Vec::new(),
        }
    }

    pub fn command_type(&self) -> &'static str {
        self.params.command_type()
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
