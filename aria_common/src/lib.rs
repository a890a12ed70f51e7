//! # ARIA Common Library
//!
//! Shared types and definitions for the ARIA liquid-handling robot
//! workspace: geometric primitives, the command record model consumed and
//! produced at the engine boundary, loaded domain entities (labware,
//! pipettes, modules, liquids, addressable areas), the engine error
//! taxonomy, and the TOML engine configuration loader.
//!
//! Nothing in this crate touches hardware or holds mutable state; it is
//! the vocabulary the execution engine and its callers agree on.

pub mod command;
pub mod config;
pub mod entities;
pub mod error;
pub mod types;

pub mod prelude {
    //! Convenience re-exports for downstream crates.
    pub use crate::command::{
        Command, CommandIntent, CommandNote, CommandParams, CommandPrivateResult, CommandResult,
        CommandStatus, ErrorOccurrence, NoteKind,
    };
    pub use crate::config::EngineConfig;
    pub use crate::entities::{
        AddressableArea, LabwareOffset, Liquid, LoadedLabware, LoadedModule, LoadedPipette,
        PotentialCutoutFixture, TipGeometry,
    };
    pub use crate::error::EngineError;
    pub use crate::types::{
        ApiVersion, DeckSlot, LabwareLocation, MountType, PipetteName, Point, RobotType,
        WellLocation,
    };
}
