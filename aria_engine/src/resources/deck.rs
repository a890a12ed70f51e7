//! Static deck definition: cutouts, cutout fixtures, and the addressable
//! areas each fixture provides.
//!
//! Deck geometry definition files are owned by an external package; this
//! module carries the fixed lookup tables the engine needs to resolve
//! addressable areas against a deck configuration.

use std::collections::{BTreeSet, HashMap, HashSet};

use aria_common::entities::{AddressableArea, AreaType, PotentialCutoutFixture};
use aria_common::error::EngineError;
use aria_common::types::{DeckSlot, Dimensions, Point};

// ─── Fixture ids ────────────────────────────────────────────────────

pub const SINGLE_SLOT_FIXTURE: &str = "singleSlot";
pub const MOVABLE_TRASH_FIXTURE: &str = "movableTrash";
pub const WASTE_CHUTE_FIXTURE: &str = "wasteChute";

const SLOT_BOUNDING_BOX: Dimensions = Dimensions {
    x: 128.0,
    y: 86.0,
    z: 0.0,
};
const TRASH_BOUNDING_BOX: Dimensions = Dimensions {
    x: 246.5,
    y: 91.5,
    z: 40.0,
};
const WASTE_CHUTE_BOUNDING_BOX: Dimensions = Dimensions {
    x: 130.0,
    y: 170.0,
    z: 125.0,
};

/// Cutouts the movable trash fixture may mount to (right column).
const TRASH_CUTOUTS: [DeckSlot; 4] = [DeckSlot::A3, DeckSlot::B3, DeckSlot::C3, DeckSlot::D3];

/// Absolute deck position of a cutout, in millimeters.
pub fn get_cutout_position(cutout_id: &str) -> Result<Point, EngineError> {
    let slot = slot_for_cutout(cutout_id).ok_or_else(|| EngineError::CutoutDoesNotExist {
        cutout_id: cutout_id.to_owned(),
    })?;
    let column = match slot.id().as_bytes()[1] {
        b'1' => 0.0,
        b'2' => 164.0,
        _ => 328.0,
    };
    let row = match slot.id().as_bytes()[0] {
        b'A' => 321.0,
        b'B' => 214.0,
        b'C' => 107.0,
        _ => 0.0,
    };
    Ok(Point::new(column, row, 0.0))
}

fn slot_for_cutout(cutout_id: &str) -> Option<DeckSlot> {
    let name = cutout_id.strip_prefix("cutout")?;
    DeckSlot::ALL.iter().copied().find(|slot| slot.id() == name)
}

/// Area names a fixture provides when mounted to `cutout_id`.
pub fn get_provided_addressable_area_names(
    fixture_id: &str,
    cutout_id: &str,
) -> Result<Vec<String>, EngineError> {
    let slot = slot_for_cutout(cutout_id).ok_or_else(|| EngineError::CutoutDoesNotExist {
        cutout_id: cutout_id.to_owned(),
    })?;
    match fixture_id {
        SINGLE_SLOT_FIXTURE => Ok(vec![slot.id().to_owned()]),
        MOVABLE_TRASH_FIXTURE if TRASH_CUTOUTS.contains(&slot) => {
            Ok(vec![format!("movableTrash{}", slot.id())])
        }
        WASTE_CHUTE_FIXTURE if slot == DeckSlot::D3 => Ok(vec!["wasteChute".to_owned()]),
        MOVABLE_TRASH_FIXTURE | WASTE_CHUTE_FIXTURE => Ok(vec![]),
        _ => Err(EngineError::FixtureDoesNotExist {
            fixture_id: fixture_id.to_owned(),
        }),
    }
}

/// Resolve an area name to its cutout and the set of fixtures that could
/// provide it there.
pub fn get_potential_cutout_fixtures(
    area_name: &str,
) -> Result<(String, HashSet<PotentialCutoutFixture>), EngineError> {
    let (slot, fixture_id) = classify_area(area_name)?;
    let cutout_id = slot.cutout_id();
    let provided: BTreeSet<String> = get_provided_addressable_area_names(fixture_id, &cutout_id)?
        .into_iter()
        .collect();
    let fixture = PotentialCutoutFixture {
        cutout_id: cutout_id.clone(),
        cutout_fixture_id: fixture_id.to_owned(),
        provided_addressable_areas: provided,
    };
    Ok((cutout_id, HashSet::from([fixture])))
}

/// Full definition of an addressable area, positioned on the deck.
pub fn get_addressable_area(area_name: &str) -> Result<AddressableArea, EngineError> {
    let (slot, fixture_id) = classify_area(area_name)?;
    let position = get_cutout_position(&slot.cutout_id())?;
    let (area_type, bounding_box) = match fixture_id {
        MOVABLE_TRASH_FIXTURE => (AreaType::MovableTrash, TRASH_BOUNDING_BOX),
        WASTE_CHUTE_FIXTURE => (AreaType::WasteChute, WASTE_CHUTE_BOUNDING_BOX),
        _ => (AreaType::Slot, SLOT_BOUNDING_BOX),
    };
    Ok(AddressableArea {
        area_name: area_name.to_owned(),
        area_type,
        cutout_id: slot.cutout_id(),
        position,
        bounding_box,
    })
}

fn classify_area(area_name: &str) -> Result<(DeckSlot, &'static str), EngineError> {
    if let Some(slot) = DeckSlot::ALL.iter().copied().find(|s| s.id() == area_name) {
        return Ok((slot, SINGLE_SLOT_FIXTURE));
    }
    if let Some(slot_name) = area_name.strip_prefix("movableTrash") {
        if let Some(slot) = TRASH_CUTOUTS.iter().copied().find(|s| s.id() == slot_name) {
            return Ok((slot, MOVABLE_TRASH_FIXTURE));
        }
    }
    if area_name == "wasteChute" {
        return Ok((DeckSlot::D3, WASTE_CHUTE_FIXTURE));
    }
    Err(EngineError::AddressableAreaDoesNotExist {
        area_name: area_name.to_owned(),
    })
}

/// Factory-default physical deck configuration: plain slots everywhere,
/// with the movable trash mounted in A3.
pub fn default_deck_configuration() -> HashMap<String, String> {
    DeckSlot::ALL
        .iter()
        .map(|slot| {
            let fixture = if *slot == DeckSlot::A3 {
                MOVABLE_TRASH_FIXTURE
            } else {
                SINGLE_SLOT_FIXTURE
            };
            (slot.cutout_id(), fixture.to_owned())
        })
        .collect()
}

// ─── Tests ──────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cutout_positions_form_a_grid() {
        assert_eq!(
            get_cutout_position("cutoutD1").unwrap(),
            Point::new(0.0, 0.0, 0.0)
        );
        assert_eq!(
            get_cutout_position("cutoutA3").unwrap(),
            Point::new(328.0, 321.0, 0.0)
        );
        assert!(matches!(
            get_cutout_position("cutoutZ9"),
            Err(EngineError::CutoutDoesNotExist { .. })
        ));
    }

    #[test]
    fn single_slot_fixture_provides_slot_area() {
        let areas = get_provided_addressable_area_names(SINGLE_SLOT_FIXTURE, "cutoutB2").unwrap();
        assert_eq!(areas, vec!["B2".to_owned()]);
    }

    #[test]
    fn unknown_fixture_is_an_error() {
        assert!(matches!(
            get_provided_addressable_area_names("theFunFixture", "cutoutB2"),
            Err(EngineError::FixtureDoesNotExist { .. })
        ));
    }

    #[test]
    fn potential_fixtures_for_trash_area() {
        let (cutout_id, fixtures) = get_potential_cutout_fixtures("movableTrashA3").unwrap();
        assert_eq!(cutout_id, "cutoutA3");
        assert_eq!(fixtures.len(), 1);
        let fixture = fixtures.iter().next().unwrap();
        assert_eq!(fixture.cutout_fixture_id, MOVABLE_TRASH_FIXTURE);
        assert!(
            fixture
                .provided_addressable_areas
                .contains("movableTrashA3")
        );
    }

    #[test]
    fn unknown_area_is_an_error() {
        assert!(matches!(
            get_potential_cutout_fixtures("theFunArea"),
            Err(EngineError::AddressableAreaDoesNotExist { .. })
        ));
    }

    #[test]
    fn addressable_area_carries_cutout_position() {
        let area = get_addressable_area("C2").unwrap();
        assert_eq!(area.position, Point::new(164.0, 107.0, 0.0));
        assert_eq!(area.area_type, AreaType::Slot);

        let chute = get_addressable_area("wasteChute").unwrap();
        assert_eq!(chute.area_type, AreaType::WasteChute);
        assert_eq!(chute.cutout_id, "cutoutD3");
    }

    #[test]
    fn default_configuration_covers_every_cutout() {
        let config = default_deck_configuration();
        assert_eq!(config.len(), 12);
        assert_eq!(config["cutoutA3"], MOVABLE_TRASH_FIXTURE);
        assert_eq!(config["cutoutB2"], SINGLE_SLOT_FIXTURE);
    }
}
