//! The `ProtocolEngine` facade.
//!
//! Owns the state store, the background queue worker, and the resource
//! provider. Callers enqueue commands and drive the run lifecycle
//! through this type only; everything underneath communicates through
//! dispatched actions.

use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::time::Duration;

use serde::Serialize;
use tracing::info;

use aria_common::command::{Command, CommandIntent, CommandParams, ErrorOccurrence};
use aria_common::config::EngineConfig;
use aria_common::entities::{
    LabwareOffset, LabwareOffsetCreate, Liquid, LoadedLabware, LoadedModule, LoadedPipette,
};
use aria_common::error::EngineError;

use crate::actions::Action;
use crate::execution::{
    CommandExecutor, HardwareApi, QueueWorker, SimulatedHardwareApi, create_command_handlers,
};
use crate::resources::{ResourceProvider, SystemResourceProvider};
use crate::state::{RunStatus, StateStore};

pub struct ProtocolEngine {
    store: Arc<StateStore>,
    worker: QueueWorker,
    resources: Arc<dyn ResourceProvider>,
}

impl ProtocolEngine {
    /// Engine with production defaults: system ids and clock, simulated
    /// hardware. Physical deployments inject their HAL through
    /// [`ProtocolEngine::with_dependencies`].
    pub fn new(config: EngineConfig) -> Self {
        Self::with_dependencies(
            config,
            Arc::new(SimulatedHardwareApi::new()),
            Arc::new(SystemResourceProvider),
        )
    }

    pub fn with_dependencies(
        config: EngineConfig,
        hardware: Arc<dyn HardwareApi>,
        resources: Arc<dyn ResourceProvider>,
    ) -> Self {
        let store = Arc::new(StateStore::new(config.clone()));
        let cancelled = Arc::new(AtomicBool::new(false));
        let handlers = create_command_handlers(&config, hardware, Arc::clone(&cancelled));
        let executor = Arc::new(CommandExecutor::new(
            Arc::clone(&store),
            handlers,
            Arc::clone(&resources),
        ));
        let worker = QueueWorker::new(
            Arc::clone(&store),
            executor,
            Arc::clone(&resources),
            cancelled,
        );
        Self {
            store,
            worker,
            resources,
        }
    }

    // ─── Run lifecycle ──────────────────────────────────────────────

    /// Validate and enqueue a command, returning its queued record.
    pub fn add_command(
        &self,
        params: CommandParams,
        intent: CommandIntent,
    ) -> Result<Command, EngineError> {
        let status = self.get_run_status();
        if status.is_terminal() {
            return Err(EngineError::InvalidRunAction {
                detail: format!("cannot add commands to a {status:?} run"),
            });
        }
        match intent {
            CommandIntent::Protocol => {}
            CommandIntent::Setup => {
                if !matches!(status, RunStatus::Idle | RunStatus::Paused) {
                    return Err(EngineError::InvalidRunAction {
                        detail: "setup commands are only allowed while idle or paused".to_owned(),
                    });
                }
            }
            CommandIntent::Fixit => {
                let recovering = self
                    .store
                    .read(|state| state.commands.failed_command_id().is_some());
                if status != RunStatus::Paused || !recovering {
                    return Err(EngineError::InvalidRunAction {
                        detail: "fixit commands require a paused run with a failed command"
                            .to_owned(),
                    });
                }
            }
        }

        let command = Command::new(
            self.resources.generate_id(),
            params,
            intent,
            self.resources.now(),
        );
        self.store.dispatch(Action::QueueCommand {
            command: command.clone(),
        })?;
        Ok(command)
    }

    /// Start or resume the run. Starts the worker on first play.
    pub fn play(&mut self) -> Result<(), EngineError> {
        self.store.dispatch(Action::Play)?;
        self.worker.start();
        Ok(())
    }

    pub fn pause(&self) -> Result<(), EngineError> {
        self.store.dispatch(Action::Pause)
    }

    /// Request a permanent stop. An in-flight command settles first.
    pub fn stop(&self) -> Result<(), EngineError> {
        self.store.dispatch(Action::Stop)
    }

    /// Close the run as succeeded, or failed when an error is given.
    pub fn finish(&self, error: Option<ErrorOccurrence>) -> Result<(), EngineError> {
        self.store.dispatch(Action::FinishRun { error })
    }

    /// Block until every enqueued command has settled. False on timeout.
    pub fn wait_for_all_settled(&self, timeout: Duration) -> bool {
        self.store.wait_for_all_settled(timeout)
    }

    /// Wait for the worker thread to exit. Call after the run reaches a
    /// terminal status.
    pub fn join(&mut self) -> Result<(), EngineError> {
        self.worker.join()
    }

    /// Cancel the worker without settling the queue, then reap it.
    pub fn halt(&mut self) -> Result<(), EngineError> {
        self.worker.cancel();
        self.worker.join()
    }

    // ─── Auxiliary inputs ───────────────────────────────────────────

    pub fn add_labware_offset(
        &self,
        create: LabwareOffsetCreate,
    ) -> Result<LabwareOffset, EngineError> {
        let offset = LabwareOffset {
            id: self.resources.generate_id(),
            created_at: self.resources.now(),
            definition_uri: create.definition_uri,
            location: create.location,
            vector: create.vector,
        };
        self.store.dispatch(Action::AddLabwareOffset {
            offset: offset.clone(),
        })?;
        info!(offset_id = %offset.id, "labware offset added");
        Ok(offset)
    }

    pub fn add_liquid(&self, liquid: Liquid) -> Result<(), EngineError> {
        self.store.dispatch(Action::AddLiquid { liquid })
    }

    // ─── Queries ────────────────────────────────────────────────────

    pub fn get_command(&self, command_id: &str) -> Result<Command, EngineError> {
        self.store
            .read(|state| state.commands.get(command_id).cloned())
    }

    pub fn get_all_commands(&self) -> Vec<Command> {
        self.store
            .read(|state| state.commands.get_all().into_iter().cloned().collect())
    }

    pub fn get_run_status(&self) -> RunStatus {
        self.store.read(|state| state.commands.run_status())
    }

    pub fn get_run_error(&self) -> Option<ErrorOccurrence> {
        self.store.read(|state| state.commands.run_error().cloned())
    }

    pub fn get_loaded_pipettes(&self) -> Vec<LoadedPipette> {
        self.store
            .read(|state| state.pipettes.get_all().into_iter().cloned().collect())
    }

    pub fn get_loaded_labware(&self) -> Vec<LoadedLabware> {
        self.store
            .read(|state| state.labware.get_all().into_iter().cloned().collect())
    }

    pub fn get_loaded_modules(&self) -> Vec<LoadedModule> {
        self.store
            .read(|state| state.modules.get_all().into_iter().cloned().collect())
    }

    pub fn get_liquids(&self) -> Vec<Liquid> {
        self.store
            .read(|state| state.liquids.get_all().into_iter().cloned().collect())
    }

    /// Full serializable record of the run.
    pub fn summary(&self) -> RunSummary {
        self.store.read(|state| RunSummary {
            status: state.commands.run_status(),
            error: state.commands.run_error().cloned(),
            commands: state.commands.get_all().into_iter().cloned().collect(),
            pipettes: state.pipettes.get_all().into_iter().cloned().collect(),
            labware: state.labware.get_all().into_iter().cloned().collect(),
            modules: state.modules.get_all().into_iter().cloned().collect(),
            liquids: state.liquids.get_all().into_iter().cloned().collect(),
            labware_offsets: state.labware.get_all_offsets().to_vec(),
        })
    }
}

/// Serializable record of a run: commands in execution order plus the
/// loaded entities and stored offsets.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSummary {
    pub status: RunStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorOccurrence>,
    pub commands: Vec<Command>,
    pub pipettes: Vec<LoadedPipette>,
    pub labware: Vec<LoadedLabware>,
    pub modules: Vec<LoadedModule>,
    pub liquids: Vec<Liquid>,
    pub labware_offsets: Vec<LabwareOffset>,
}

// ─── Tests ──────────────────────────────────────────────────────────
