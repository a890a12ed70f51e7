//! Module sub-store.

use std::collections::HashMap;

use aria_common::command::{Command, CommandParams, CommandResult};
use aria_common::entities::LoadedModule;
use aria_common::error::EngineError;
use aria_common::types::DeckSlot;

#[derive(Debug, Clone, Default)]
pub struct ModuleStore {
    by_id: HashMap<String, LoadedModule>,
}

impl ModuleStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn handle_command_success(&mut self, command: &Command) {
        if let (
            CommandParams::LoadModule(params),
            Some(CommandResult::LoadModule {
                module_id,
                serial_number,
            }),
        ) = (&command.params, &command.result)
        {
            self.by_id.insert(
                module_id.clone(),
                LoadedModule {
                    id: module_id.clone(),
                    model: params.model,
                    location: params.location,
                    serial_number: serial_number.clone(),
                },
            );
        }
    }

    pub fn get(&self, module_id: &str) -> Result<&LoadedModule, EngineError> {
        self.by_id
            .get(module_id)
            .ok_or_else(|| EngineError::ModuleNotLoaded {
                module_id: module_id.to_owned(),
            })
    }

    pub fn get_all(&self) -> Vec<&LoadedModule> {
        let mut modules: Vec<_> = self.by_id.values().collect();
        modules.sort_by(|a, b| a.id.cmp(&b.id));
        modules
    }

    pub fn get_location(&self, module_id: &str) -> Result<DeckSlot, EngineError> {
        Ok(self.get(module_id)?.location)
    }
}
