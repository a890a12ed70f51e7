//! Core value types shared across the workspace.
//!
//! Geometric primitives, deck slot names, mounts, pipette and robot
//! identifiers, well targeting, and the protocol API version used to gate
//! behavior changes between protocol schema generations.

use serde::{Deserialize, Serialize};
use std::fmt;

// ─── Geometry ───────────────────────────────────────────────────────

/// Absolute deck coordinate in millimeters.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }
}

impl std::ops::Add for Point {
    type Output = Point;

    fn add(self, rhs: Point) -> Point {
        Point::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

/// Bounding-box dimensions of a deck feature, in millimeters.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Dimensions {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

// ─── Deck slots ─────────────────────────────────────────────────────

/// Named working slot on the robot deck, row A (back) to D (front),
/// columns 1–3.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DeckSlot {
    A1,
    A2,
    A3,
    B1,
    B2,
    B3,
    C1,
    C2,
    C3,
    D1,
    D2,
    D3,
}

impl DeckSlot {
    /// All slots in deck order (back-left to front-right).
    pub const ALL: [DeckSlot; 12] = [
        DeckSlot::A1,
        DeckSlot::A2,
        DeckSlot::A3,
        DeckSlot::B1,
        DeckSlot::B2,
        DeckSlot::B3,
        DeckSlot::C1,
        DeckSlot::C2,
        DeckSlot::C3,
        DeckSlot::D1,
        DeckSlot::D2,
        DeckSlot::D3,
    ];

    /// Slot name as it appears in deck definitions and protocols.
    pub const fn id(&self) -> &'static str {
        match self {
            DeckSlot::A1 => "A1",
            DeckSlot::A2 => "A2",
            DeckSlot::A3 => "A3",
            DeckSlot::B1 => "B1",
            DeckSlot::B2 => "B2",
            DeckSlot::B3 => "B3",
            DeckSlot::C1 => "C1",
            DeckSlot::C2 => "C2",
            DeckSlot::C3 => "C3",
            DeckSlot::D1 => "D1",
            DeckSlot::D2 => "D2",
            DeckSlot::D3 => "D3",
        }
    }

    /// Cutout id hosting this slot in the deck definition.
    pub fn cutout_id(&self) -> String {
        format!("cutout{}", self.id())
    }
}

impl fmt::Display for DeckSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

// ─── Instruments ────────────────────────────────────────────────────

/// Pipette mount position on the gantry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MountType {
    Left,
    Right,
}

/// Robot generation the engine is driving.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RobotType {
    #[serde(rename = "ARIA One")]
    AriaOne,
    #[serde(rename = "ARIA Flex")]
    AriaFlex,
}

impl Default for RobotType {
    fn default() -> Self {
        RobotType::AriaFlex
    }
}

/// Logical pipette model names, resolved to concrete hardware
/// configurations by the equipment handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PipetteName {
    #[serde(rename = "p20_single_gen2")]
    P20SingleGen2,
    #[serde(rename = "p300_single_gen2")]
    P300SingleGen2,
    #[serde(rename = "p300_multi_gen2")]
    P300MultiGen2,
    #[serde(rename = "p1000_single_gen2")]
    P1000SingleGen2,
    #[serde(rename = "p50_single_flex")]
    P50SingleFlex,
    #[serde(rename = "p50_multi_flex")]
    P50MultiFlex,
    #[serde(rename = "p1000_single_flex")]
    P1000SingleFlex,
    #[serde(rename = "p1000_multi_flex")]
    P1000MultiFlex,
    #[serde(rename = "p1000_96")]
    P1000NinetySix,
}

impl PipetteName {
    /// Robot generation this pipette model mounts on.
    pub const fn robot_type(&self) -> RobotType {
        match self {
            PipetteName::P20SingleGen2
            | PipetteName::P300SingleGen2
            | PipetteName::P300MultiGen2
            | PipetteName::P1000SingleGen2 => RobotType::AriaOne,
            PipetteName::P50SingleFlex
            | PipetteName::P50MultiFlex
            | PipetteName::P1000SingleFlex
            | PipetteName::P1000MultiFlex
            | PipetteName::P1000NinetySix => RobotType::AriaFlex,
        }
    }
}

// ─── Well targeting ─────────────────────────────────────────────────

/// Reference point within a well for a movement target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WellOrigin {
    Top,
    Bottom,
    Center,
}

impl Default for WellOrigin {
    fn default() -> Self {
        WellOrigin::Top
    }
}

/// Offset from the well origin, in millimeters.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct WellOffset {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

/// Target location within a well.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WellLocation {
    #[serde(default)]
    pub origin: WellOrigin,
    #[serde(default)]
    pub offset: WellOffset,
}

// ─── Labware & module locations ─────────────────────────────────────

/// Where a piece of labware lives: a deck slot, on top of a module,
/// a named addressable area, or off the deck entirely.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LabwareLocation {
    #[serde(rename = "slotName")]
    Slot(DeckSlot),
    #[serde(rename = "moduleId")]
    Module(String),
    #[serde(rename = "addressableAreaName")]
    AddressableArea(String),
    #[serde(rename = "offDeck")]
    OffDeck,
}

/// Hardware module models the engine knows how to load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ModuleModel {
    #[serde(rename = "temperatureModuleV2")]
    TemperatureModuleV2,
    #[serde(rename = "magneticModuleV2")]
    MagneticModuleV2,
    #[serde(rename = "thermocyclerModuleV2")]
    ThermocyclerModuleV2,
    #[serde(rename = "heaterShakerModuleV1")]
    HeaterShakerModuleV1,
}

/// Gantry axes addressable by a home command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MotorAxis {
    X,
    Y,
    LeftZ,
    RightZ,
    LeftPlunger,
    RightPlunger,
}

// ─── Protocol API version ───────────────────────────────────────────

/// Protocol API schema version, used to gate behavior changes between
/// protocol generations (e.g., the meaning of a zero-volume dispense).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
pub struct ApiVersion {
    pub major: u16,
    pub minor: u16,
}

impl ApiVersion {
    pub const fn new(major: u16, minor: u16) -> Self {
        Self { major, minor }
    }
}

impl fmt::Display for ApiVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
