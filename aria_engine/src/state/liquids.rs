//! Liquid sub-store.
//!
//! Declared liquids plus the volumes assigned to labware wells by
//! loadLiquid commands.

use std::collections::{BTreeMap, HashMap};

use aria_common::command::{Command, CommandParams};
use aria_common::entities::Liquid;

use crate::actions::Action;

#[derive(Debug, Clone, Default)]
pub struct LiquidStore {
    by_id: HashMap<String, Liquid>,
    /// (labware id, well name) → (liquid id, volume).
    volumes_by_well: HashMap<(String, String), (String, f64)>,
}

impl LiquidStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn handle_action(&mut self, action: &Action) {
        if let Action::AddLiquid { liquid } = action {
            self.by_id.insert(liquid.id.clone(), liquid.clone());
        }
    }

    pub fn handle_command_success(&mut self, command: &Command) {
        if let CommandParams::LoadLiquid(params) = &command.params {
            for (well_name, volume) in &params.volume_by_well {
                self.volumes_by_well.insert(
                    (params.labware_id.clone(), well_name.clone()),
                    (params.liquid_id.clone(), *volume),
                );
            }
        }
    }

    pub fn get(&self, liquid_id: &str) -> Option<&Liquid> {
        self.by_id.get(liquid_id)
    }

    pub fn get_all(&self) -> Vec<&Liquid> {
        let mut liquids: Vec<_> = self.by_id.values().collect();
        liquids.sort_by(|a, b| a.id.cmp(&b.id));
        liquids
    }

    pub fn has_liquid(&self, liquid_id: &str) -> bool {
        self.by_id.contains_key(liquid_id)
    }

    /// Well contents of one labware, keyed by well name.
    pub fn get_well_volumes(&self, labware_id: &str) -> BTreeMap<String, (String, f64)> {
        self.volumes_by_well
            .iter()
            .filter(|((id, _), _)| id == labware_id)
            .map(|((_, well), contents)| (well.clone(), contents.clone()))
            .collect()
    }
}
