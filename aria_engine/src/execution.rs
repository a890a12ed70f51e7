//! Command execution: hardware handler traits, the command executor, and
//! the queue worker.
//!
//! Each handler trait has a hardware-backed and a virtual implementation;
//! the factory functions select between them from the engine
//! configuration, so command implementations never know which backend
//! they are driving.

pub mod equipment;
pub mod executor;
pub mod hardware_api;
pub mod movement;
pub mod pipetting;
pub mod worker;

use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use aria_common::config::EngineConfig;

pub use equipment::{EquipmentHandler, create_equipment_handler};
pub use executor::CommandExecutor;
pub use hardware_api::{HardwareApi, SimulatedHardwareApi};
pub use movement::{MovementHandler, create_movement_handler};
pub use pipetting::{PipettingHandler, create_pipetting_handler};
pub use worker::{QueueWorker, WorkerStatus};

/// The hardware handlers a command implementation may declare it needs.
pub struct CommandHandlers {
    pub pipetting: Box<dyn PipettingHandler>,
    pub movement: Box<dyn MovementHandler>,
    pub equipment: Box<dyn EquipmentHandler>,
}

/// Build the full handler set for the configured backend.
pub fn create_command_handlers(
    config: &EngineConfig,
    hardware: Arc<dyn HardwareApi>,
    cancelled: Arc<AtomicBool>,
) -> CommandHandlers {
    CommandHandlers {
        pipetting: create_pipetting_handler(config, Arc::clone(&hardware), Arc::clone(&cancelled)),
        movement: create_movement_handler(config, Arc::clone(&hardware), Arc::clone(&cancelled)),
        equipment: create_equipment_handler(config, hardware),
    }
}
