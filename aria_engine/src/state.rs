//! Engine state: per-domain sub-stores behind a single-writer store.
//!
//! All mutation flows through [`StateStore::dispatch`], which applies one
//! [`Action`] atomically across every sub-store under one lock and wakes
//! waiters. Readers take short-lived lock guards and clone snapshots out,
//! so they always observe a fully-applied state.

pub mod addressable_areas;
pub mod commands;
pub mod labware;
pub mod liquids;
pub mod modules;
pub mod pipettes;
pub mod run;

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

use aria_common::command::CommandParams;
use aria_common::config::EngineConfig;
use aria_common::error::EngineError;
use aria_common::types::LabwareLocation;

use crate::actions::Action;

pub use addressable_areas::AddressableAreaStore;
pub use commands::CommandStore;
pub use labware::LabwareStore;
pub use liquids::LiquidStore;
pub use modules::ModuleStore;
pub use pipettes::PipetteStore;
pub use run::RunStatus;

/// How long a waiter sleeps before re-checking its cancellation token.
const WAIT_INTERVAL: Duration = Duration::from_millis(100);

/// The complete engine state snapshot.
#[derive(Debug, Clone)]
pub struct EngineState {
    pub config: EngineConfig,
    pub commands: CommandStore,
    pub pipettes: PipetteStore,
    pub labware: LabwareStore,
    pub modules: ModuleStore,
    pub liquids: LiquidStore,
    pub addressable_areas: AddressableAreaStore,
}

impl EngineState {
    pub fn new(config: EngineConfig) -> Self {
        let addressable_areas = AddressableAreaStore::new(&config);
        Self {
            config,
            commands: CommandStore::new(),
            pipettes: PipetteStore::new(),
            labware: LabwareStore::new(),
            modules: ModuleStore::new(),
            liquids: LiquidStore::new(),
            addressable_areas,
        }
    }

    /// Apply one action to every sub-store.
    pub fn handle_action(&mut self, action: &Action) -> Result<(), EngineError> {
        self.commands.handle_action(action)?;
        self.labware.handle_action(action);
        self.liquids.handle_action(action);

        if let Action::SucceedCommand {
            command_id,
            private_result,
            ..
        } = action
        {
            let command = self.commands.get(command_id)?.clone();
            self.pipettes
                .handle_command_success(&command, private_result.as_ref());
            self.labware.handle_command_success(&command);
            self.modules.handle_command_success(&command);
            self.liquids.handle_command_success(&command);

            // Moving labware onto an addressable area records the fixture
            // choice for its cutout.
            if let CommandParams::MoveLabware(params) = &command.params {
                if let LabwareLocation::AddressableArea(area_name) = &params.new_location {
                    self.addressable_areas.reference_area(area_name)?;
                }
            }
        }
        Ok(())
    }
}

/// Single-writer state store with change notification.
pub struct StateStore {
    state: Mutex<EngineState>,
    changed: Condvar,
}

impl StateStore {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            state: Mutex::new(EngineState::new(config)),
            changed: Condvar::new(),
        }
    }

    /// Apply an action and wake all waiters.
    pub fn dispatch(&self, action: Action) -> Result<(), EngineError> {
        let mut state = self.state.lock();
        let result = state.handle_action(&action);
        drop(state);
        self.changed.notify_all();
        result
    }

    /// Read from the current snapshot under a short-lived guard.
    pub fn read<R>(&self, f: impl FnOnce(&EngineState) -> R) -> R {
        f(&self.state.lock())
    }

    /// Clone the full state out, e.g. for command execution.
    pub fn snapshot(&self) -> EngineState {
        self.state.lock().clone()
    }

    /// Wake all waiters without dispatching, e.g. on worker cancel.
    pub fn notify(&self) {
        self.changed.notify_all();
    }

    /// Block until a command is runnable.
    ///
    /// Resolves with `Err(RunStopped)` once no command will ever run
    /// again, and with `Err(CommandCancelled)` when the cancellation
    /// token is set.
    pub fn wait_for_next_command(&self, cancelled: &AtomicBool) -> Result<String, EngineError> {
        let mut state = self.state.lock();
        loop {
            if cancelled.load(Ordering::SeqCst) {
                return Err(EngineError::CommandCancelled {
                    detail: "queue worker cancelled".to_owned(),
                });
            }
            match state.commands.get_next_to_execute()? {
                Some(command_id) => return Ok(command_id),
                None => {
                    self.changed.wait_for(&mut state, WAIT_INTERVAL);
                }
            }
        }
    }

    /// Block until every enqueued command has settled, up to `timeout`.
    /// Returns false on timeout.
    pub fn wait_for_all_settled(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut state = self.state.lock();
        while !state.commands.all_commands_settled() {
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            self.changed.wait_for(&mut state, deadline - now);
        }
        true
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
