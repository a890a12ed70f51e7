//! # ARIA Protocol Execution Engine
//!
//! Executes liquid-handling protocols as an ordered queue of typed
//! commands against real or virtual hardware.
//!
//! ## Architecture
//!
//! 1. **State store**: per-domain sub-stores (commands, pipettes,
//!    labware, modules, liquids, addressable areas) behind one mutex,
//!    mutated only by dispatched [`actions::Action`]s.
//! 2. **Queue worker**: a background thread that blocks on the next
//!    runnable command id and drives the executor, yielding between
//!    commands.
//! 3. **Command executor**: matches a command's params variant to its
//!    implementation, runs it against the hardware handlers, and
//!    dispatches the terminal success or failure action.
//! 4. **Hardware handlers**: pipetting, movement, and equipment traits
//!    with hardware-backed and virtual implementations selected by
//!    configuration.
//!
//! The [`engine::ProtocolEngine`] facade ties these together and is the
//! only type most callers need.

pub mod actions;
pub mod command;
pub mod engine;
pub mod execution;
pub mod resources;
pub mod state;
