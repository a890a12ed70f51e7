//! Addressable-area sub-store.
//!
//! Resolves requested area names against the deck configuration. On a
//! physical deck the configured fixture for the area's cutout must
//! provide it. With a simulated deck configuration any potential fixture
//! may be provisionally assumed, but the fixture choices recorded for
//! one cutout must stay mutually consistent across resolutions.

use std::collections::{HashMap, HashSet};

use aria_common::config::EngineConfig;
use aria_common::entities::{AddressableArea, PotentialCutoutFixture};
use aria_common::error::EngineError;

use crate::resources::deck;

#[derive(Debug, Clone)]
pub struct AddressableAreaStore {
    use_simulated_deck_config: bool,
    /// Cutout id → configured fixture id. Empty when simulated.
    deck_configuration: HashMap<String, String>,
    /// Areas already resolved for this run.
    loaded_areas: HashMap<String, AddressableArea>,
    /// Surviving fixture candidates per cutout (simulated decks only);
    /// each new resolution intersects with what was recorded before.
    potential_fixtures_by_cutout: HashMap<String, HashSet<PotentialCutoutFixture>>,
}

impl AddressableAreaStore {
    pub fn new(config: &EngineConfig) -> Self {
        let deck_configuration = if config.use_simulated_deck_config {
            HashMap::new()
        } else {
            deck::default_deck_configuration()
        };
        Self {
            use_simulated_deck_config: config.use_simulated_deck_config,
            deck_configuration,
            loaded_areas: HashMap::new(),
            potential_fixtures_by_cutout: HashMap::new(),
        }
    }

    /// Check that `area_name` is resolvable without recording anything.
    pub fn check_area(&self, area_name: &str) -> Result<AddressableArea, EngineError> {
        if let Some(area) = self.loaded_areas.get(area_name) {
            return Ok(area.clone());
        }
        let (cutout_id, potentials) = deck::get_potential_cutout_fixtures(area_name)?;

        if self.use_simulated_deck_config {
            if let Some(recorded) = self.potential_fixtures_by_cutout.get(&cutout_id) {
                if recorded.is_disjoint(&potentials) {
                    return Err(EngineError::IncompatibleAddressableArea {
                        area_name: area_name.to_owned(),
                        cutout_id,
                    });
                }
            }
        } else {
            let fixture_id = self.deck_configuration.get(&cutout_id).ok_or_else(|| {
                EngineError::AreaNotInDeckConfiguration {
                    area_name: area_name.to_owned(),
                }
            })?;
            let provided = deck::get_provided_addressable_area_names(fixture_id, &cutout_id)?;
            if !provided.iter().any(|name| name == area_name) {
                return Err(EngineError::IncompatibleAddressableArea {
                    area_name: area_name.to_owned(),
                    cutout_id,
                });
            }
        }

        deck::get_addressable_area(area_name)
    }

    /// Resolve `area_name` and record the resolution, narrowing the
    /// fixture candidates for its cutout on simulated decks.
    pub fn reference_area(&mut self, area_name: &str) -> Result<AddressableArea, EngineError> {
        let area = self.check_area(area_name)?;
        if self.use_simulated_deck_config && !self.loaded_areas.contains_key(area_name) {
            let (cutout_id, potentials) = deck::get_potential_cutout_fixtures(area_name)?;
            let narrowed = match self.potential_fixtures_by_cutout.get(&cutout_id) {
                Some(recorded) => recorded.intersection(&potentials).cloned().collect(),
                None => potentials,
            };
            self.potential_fixtures_by_cutout.insert(cutout_id, narrowed);
        }
        self.loaded_areas.insert(area_name.to_owned(), area.clone());
        Ok(area)
    }

    pub fn get_loaded_area(&self, area_name: &str) -> Result<&AddressableArea, EngineError> {
        self.loaded_areas
            .get(area_name)
            .ok_or_else(|| EngineError::AreaNotInDeckConfiguration {
                area_name: area_name.to_owned(),
            })
    }

    pub fn get_all_loaded(&self) -> Vec<&AddressableArea> {
        let mut areas: Vec<_> = self.loaded_areas.values().collect();
        areas.sort_by(|a, b| a.area_name.cmp(&b.area_name));
        areas
    }
}

// ─── Tests ──────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn physical_store() -> AddressableAreaStore {
        AddressableAreaStore::new(&EngineConfig::default())
    }

    fn simulated_store() -> AddressableAreaStore {
        AddressableAreaStore::new(&EngineConfig::virtual_config())
    }

    #[test]
    fn physical_deck_resolves_configured_slot() {
        let mut store = physical_store();
        let area = store.reference_area("C2").unwrap();
        assert_eq!(area.cutout_id, "cutoutC2");
        assert!(store.get_loaded_area("C2").is_ok());
    }

    #[test]
    fn physical_deck_rejects_area_claimed_by_other_fixture() {
        // A3 hosts the movable trash in the default configuration, so
        // the plain slot area there is incompatible.
        let store = physical_store();
        assert!(matches!(
            store.check_area("A3"),
            Err(EngineError::IncompatibleAddressableArea { .. })
        ));
        assert!(store.check_area("movableTrashA3").is_ok());
    }

    #[test]
    fn physical_deck_rejects_unconfigured_fixture_area() {
        let store = physical_store();
        // D3 is a plain slot by default; the waste chute is not mounted.
        assert!(matches!(
            store.check_area("wasteChute"),
            Err(EngineError::IncompatibleAddressableArea { .. })
        ));
    }

    #[test]
    fn simulated_deck_assumes_potential_fixture() {
        let mut store = simulated_store();
        // No fixture configured yet: resolution succeeds and records the
        // fixture choice.
        let area = store.reference_area("movableTrashA3").unwrap();
        assert_eq!(area.cutout_id, "cutoutA3");
    }

    #[test]
    fn simulated_deck_rejects_conflicting_choice_for_same_cutout() {
        let mut store = simulated_store();
        store.reference_area("movableTrashA3").unwrap();
        // The slot area A3 needs a different fixture on the same cutout.
        assert!(matches!(
            store.reference_area("A3"),
            Err(EngineError::IncompatibleAddressableArea { .. })
        ));
        // A previously resolved area stays resolvable.
        assert!(store.reference_area("movableTrashA3").is_ok());
    }

    #[test]
    fn simulated_deck_keeps_independent_cutouts_independent() {
        let mut store = simulated_store();
        store.reference_area("movableTrashA3").unwrap();
        assert!(store.reference_area("B3").is_ok());
    }

    #[test]
    fn unknown_area_does_not_exist() {
        let store = simulated_store();
        assert!(matches!(
            store.check_area("theFunArea"),
            Err(EngineError::AddressableAreaDoesNotExist { .. })
        ));
    }
}
