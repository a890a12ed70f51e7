//! Loaded domain entities.
//!
//! These records are created by the success action of their loading
//! command and persist for the remainder of the run. They are referenced
//! by id from commands and never mutated outside a dispatched action.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::types::{
    DeckSlot, Dimensions, LabwareLocation, ModuleModel, MountType, PipetteName, Point,
};

// ─── Pipettes ───────────────────────────────────────────────────────

/// Geometry of a tip currently attached to a pipette.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TipGeometry {
    pub length: f64,
    pub diameter: f64,
    pub volume: f64,
}

/// Concrete hardware configuration resolved for a loaded pipette.
///
/// Produced by the equipment handler and carried through a command's
/// private result into the pipette store; never exposed at the boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StaticPipetteConfig {
    pub model: String,
    pub display_name: String,
    pub channels: u8,
    pub min_volume: f64,
    pub max_volume: f64,
    pub default_aspirate_flow_rate: f64,
    pub default_dispense_flow_rate: f64,
    pub default_blow_out_flow_rate: f64,
    /// Nominal tip overlap by tip-rack load name, used by tip handling.
    pub nominal_tip_overlap: BTreeMap<String, f64>,
}

/// A pipette loaded onto a mount, including its live plunger state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadedPipette {
    pub id: String,
    pub pipette_name: PipetteName,
    pub mount: MountType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub serial_number: Option<String>,
    /// Resolved hardware configuration (from the load's private result).
    #[serde(skip)]
    pub static_config: Option<StaticPipetteConfig>,
    /// Tip currently attached, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attached_tip: Option<TipGeometry>,
    /// Liquid volume currently held. `None` means the plunger position is
    /// unknown (no tip, or immediately after a blow-out).
    #[serde(skip)]
    pub aspirated_volume: Option<f64>,
    /// Whether the plunger is in a known position safe to aspirate from.
    #[serde(skip)]
    pub ready_to_aspirate: bool,
}

// ─── Labware ────────────────────────────────────────────────────────

/// A piece of labware loaded onto the deck (or moved off it).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadedLabware {
    pub id: String,
    pub load_name: String,
    pub definition_uri: String,
    pub location: LabwareLocation,
    /// Labware offset applied at this location, if one matched.
    pub offset_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

/// Location key a labware offset applies to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LabwareOffsetLocation {
    pub slot_name: DeckSlot,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub module_model: Option<ModuleModel>,
}

/// Positional correction vector, in millimeters.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct OffsetVector {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

/// A stored labware offset: applies to labware of `definition_uri`
/// loaded at `location`. Most recently added wins on conflict.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LabwareOffset {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub definition_uri: String,
    pub location: LabwareOffsetLocation,
    pub vector: OffsetVector,
}

/// Caller request to add a labware offset (id and timestamp assigned by
/// the engine).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LabwareOffsetCreate {
    pub definition_uri: String,
    pub location: LabwareOffsetLocation,
    pub vector: OffsetVector,
}

// ─── Modules ────────────────────────────────────────────────────────

/// A hardware module loaded into a deck slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadedModule {
    pub id: String,
    pub model: ModuleModel,
    pub location: DeckSlot,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub serial_number: Option<String>,
}

// ─── Liquids ────────────────────────────────────────────────────────

/// A liquid declared for the run, assignable to labware wells.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Liquid {
    pub id: String,
    pub display_name: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_color: Option<String>,
}

// ─── Addressable areas ──────────────────────────────────────────────

/// Kind of deck feature an addressable area represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AreaType {
    Slot,
    MovableTrash,
    WasteChute,
}

/// A named location on the deck provided by a cutout fixture.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddressableArea {
    pub area_name: String,
    pub area_type: AreaType,
    pub cutout_id: String,
    /// Absolute position of the area's back-left corner.
    pub position: Point,
    pub bounding_box: Dimensions,
}

impl AddressableArea {
    /// Absolute center of the area's footprint.
    pub fn center(&self) -> Point {
        Point::new(
            self.position.x + self.bounding_box.x / 2.0,
            self.position.y + self.bounding_box.y / 2.0,
            self.position.z,
        )
    }

    /// Default move-to target: center of the footprint at the top of the
    /// bounding box.
    pub fn move_to_location(&self) -> Point {
        let center = self.center();
        Point::new(center.x, center.y, self.position.z + self.bounding_box.z)
    }
}

/// A cutout fixture that could provide a requested addressable area.
///
/// During simulated deck configuration, resolution records these so later
/// requests for the same cutout stay mutually consistent.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PotentialCutoutFixture {
    pub cutout_id: String,
    pub cutout_fixture_id: String,
    pub provided_addressable_areas: BTreeSet<String>,
}

// ─── Tests ──────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn addressable_area_center_and_move_to() {
        let area = AddressableArea {
            area_name: "area".into(),
            area_type: AreaType::Slot,
            cutout_id: "cutoutA1".into(),
            position: Point::new(1.0, 2.0, 3.0),
            bounding_box: Dimensions {
                x: 10.0,
                y: 20.0,
                z: 30.0,
            },
        };
        assert_eq!(area.center(), Point::new(6.0, 12.0, 3.0));
        assert_eq!(area.move_to_location(), Point::new(6.0, 12.0, 33.0));
    }

    #[test]
    fn loaded_labware_serde_round_trip() {
        let labware = LoadedLabware {
            id: "labware-1".into(),
            load_name: "corning_96_wellplate".into(),
            definition_uri: "aria/corning_96_wellplate/1".into(),
            location: LabwareLocation::Slot(DeckSlot::B2),
            offset_id: Some("offset-1".into()),
            display_name: None,
        };
        let json = serde_json::to_string(&labware).unwrap();
        let back: LoadedLabware = serde_json::from_str(&json).unwrap();
        assert_eq!(back, labware);
    }
}
