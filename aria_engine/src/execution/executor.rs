//! Command executor: runs one command end to end.
//!
//! Marks the command running, executes its implementation against a
//! state snapshot, and settles it with a success or failure action.
//! Classified failures become failed-command records and the run goes
//! on; anything else propagates to the worker and kills the run.

use std::sync::Arc;

use tracing::{debug, info, warn};

use aria_common::error::EngineError;

use crate::actions::Action;
use crate::command::execute_command;
use crate::execution::CommandHandlers;
use crate::resources::ResourceProvider;
use crate::state::StateStore;

pub struct CommandExecutor {
    store: Arc<StateStore>,
    handlers: CommandHandlers,
    resources: Arc<dyn ResourceProvider>,
}

impl CommandExecutor {
    pub fn new(
        store: Arc<StateStore>,
        handlers: CommandHandlers,
        resources: Arc<dyn ResourceProvider>,
    ) -> Self {
        Self {
            store,
            handlers,
            resources,
        }
    }

    /// Execute one queued command to completion.
    ///
    /// Returns `Err` only for unclassified errors; those are fatal and
    /// must unwind the worker.
    pub fn execute(&self, command_id: &str) -> Result<(), EngineError> {
        if let Err(error) = self.store.dispatch(Action::SetCommandRunning {
            command_id: command_id.to_owned(),
            started_at: self.resources.now(),
        }) {
            // The run stopped between selection and this dispatch. The
            // command stays queued; the worker will observe the stop on
            // its next wait.
            if matches!(error, EngineError::RunStopped) {
                debug!(command_id, "run stopped before command start");
                return Ok(());
            }
            return Err(error);
        }

        let state = self.store.snapshot();
        let command = state.commands.get(command_id)?.clone();
        info!(command_id, command_type = command.command_type(), "executing command");

        match execute_command(&command, &state, &self.handlers, self.resources.as_ref()) {
            Ok(outcome) => {
                self.store.dispatch(Action::SucceedCommand {
                    command_id: command_id.to_owned(),
                    completed_at: self.resources.now(),
                    result: outcome.result,
                    private_result: outcome.private_result,
                    notes: outcome.notes,
                })?;
                if outcome.request_pause {
                    self.store.dispatch(Action::Pause)?;
                }
                Ok(())
            }
            Err(error) => {
                let classified = error.is_classified();
                warn!(
                    command_id,
                    %error,
                    classified,
                    "command failed"
                );
                let occurrence =
                    error.to_occurrence(self.resources.generate_id(), self.resources.now());
                self.store.dispatch(Action::FailCommand {
                    command_id: command_id.to_owned(),
                    completed_at: self.resources.now(),
                    error: occurrence,
                    notes: Vec::new(),
                })?;
                if classified { Ok(()) } else { Err(error) }
            }
        }
    }
}

// ─── Tests ──────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use aria_common::command::{Command, CommandIntent, CommandParams, CommandStatus, CommentParams};
    use aria_common::config::EngineConfig;
    use aria_common::types::{MountType, PipetteName};
    use chrono::{TimeZone, Utc};
    use std::sync::atomic::AtomicBool;

    use crate::execution::{SimulatedHardwareApi, create_command_handlers};
    use crate::resources::FixedResourceProvider;
    use crate::state::RunStatus;

    fn executor_with_store() -> (Arc<StateStore>, CommandExecutor) {
        let config = EngineConfig::virtual_config();
        let store = Arc::new(StateStore::new(config.clone()));
        let handlers = create_command_handlers(
            &config,
            Arc::new(SimulatedHardwareApi::new()),
            Arc::new(AtomicBool::new(false)),
        );
        let resources = Arc::new(FixedResourceProvider::new(
            "id",
            Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap(),
        ));
        let executor = CommandExecutor::new(Arc::clone(&store), handlers, resources);
        (store, executor)
    }

    fn enqueue(store: &StateStore, id: &str, params: CommandParams) {
        store
            .dispatch(Action::QueueCommand {
                command: Command::new(
                    id,
                    params,
                    CommandIntent::Protocol,
                    Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap(),
                ),
            })
            .unwrap();
    }

    #[test]
    fn successful_command_settles_with_result_and_timestamps() {
        let (store, executor) = executor_with_store();
        store.dispatch(Action::Play).unwrap();
        enqueue(
            &store,
            "c-1",
            CommandParams::Comment(CommentParams {
                message: "hello".into(),
            }),
        );

        executor.execute("c-1").unwrap();

        store.read(|state| {
            let command = state.commands.get("c-1").unwrap();
            assert_eq!(command.status, CommandStatus::Succeeded);
            assert!(command.started_at.is_some());
            assert!(command.completed_at.is_some());
            assert!(command.result.is_some());
        });
    }

    #[test]
    fn stop_between_selection_and_start_leaves_command_unexecuted() {
        let (store, executor) = executor_with_store();
        store.dispatch(Action::Play).unwrap();
        enqueue(
            &store,
            "c-1",
            CommandParams::Comment(CommentParams {
                message: "hello".into(),
            }),
        );

        // The worker has selected c-1 but not yet started it when the
        // stop lands.
        let next = store.read(|state| state.commands.get_next_to_execute().unwrap());
        assert_eq!(next, Some("c-1".into()));
        store.dispatch(Action::Stop).unwrap();

        // Not fatal: the command never runs and the run stays stopped.
        executor.execute("c-1").unwrap();

        store.read(|state| {
            let command = state.commands.get("c-1").unwrap();
            assert_eq!(command.status, CommandStatus::Queued);
            assert!(command.started_at.is_none());
            assert!(command.result.is_none());
            assert_eq!(state.commands.run_status(), RunStatus::Stopped);
        });
    }

    #[test]
    fn classified_failure_pauses_run_for_recovery() {
        let (store, executor) = executor_with_store();
        store.dispatch(Action::Play).unwrap();
        // Aspirating with no pipette loaded is a classified failure.
        enqueue(
            &store,
            "c-1",
            CommandParams::AspirateInPlace(aria_common::command::AspirateInPlaceParams {
                pipette_id: "missing".into(),
                volume: 10.0,
                flow_rate: 1.0,
            }),
        );

        // Classified: the executor itself returns Ok.
        executor.execute("c-1").unwrap();

        store.read(|state| {
            let command = state.commands.get("c-1").unwrap();
            assert_eq!(command.status, CommandStatus::Failed);
            assert_eq!(
                command.error.as_ref().unwrap().error_type,
                "pipetteNotLoaded"
            );
            assert_eq!(state.commands.run_status(), RunStatus::Paused);
            assert_eq!(state.commands.failed_command_id(), Some("c-1"));
        });
    }

    #[test]
    fn wait_for_resume_pauses_after_success() {
        let (store, executor) = executor_with_store();
        store.dispatch(Action::Play).unwrap();
        enqueue(
            &store,
            "c-1",
            CommandParams::WaitForResume(aria_common::command::WaitForResumeParams {
                message: Some("operator check".into()),
            }),
        );

        executor.execute("c-1").unwrap();

        store.read(|state| {
            let command = state.commands.get("c-1").unwrap();
            assert_eq!(command.status, CommandStatus::Succeeded);
            assert_eq!(state.commands.run_status(), RunStatus::Paused);
            // A pause requested by the command is not a failure.
            assert!(state.commands.failed_command_id().is_none());
        });
    }

    #[test]
    fn load_pipette_populates_pipette_store() {
        let (store, executor) = executor_with_store();
        store.dispatch(Action::Play).unwrap();
        enqueue(
            &store,
            "c-1",
            CommandParams::LoadPipette(aria_common::command::LoadPipetteParams {
                pipette_name: PipetteName::P1000SingleFlex,
                mount: MountType::Left,
                pipette_id: Some("pipette-1".into()),
            }),
        );

        executor.execute("c-1").unwrap();

        store.read(|state| {
            let pipette = state.pipettes.get("pipette-1").unwrap();
            assert_eq!(pipette.mount, MountType::Left);
            assert_eq!(pipette.serial_number.as_deref(), Some("virtual-left"));
            assert!(pipette.static_config.is_some());
        });
    }
}
