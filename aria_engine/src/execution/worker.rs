//! Background queue worker.
//!
//! A single thread pulls runnable commands from the state store and
//! executes them in order. The worker exits cleanly once the run reaches
//! a terminal status, exits early when cancelled, and converts any
//! unexpected error into a failed run before unwinding.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};

use tracing::{debug, error, info, warn};

use aria_common::error::EngineError;

use crate::actions::Action;
use crate::execution::executor::CommandExecutor;
use crate::resources::ResourceProvider;
use crate::state::StateStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerStatus {
    NotStarted,
    Running,
    Cancelled,
    Completed,
}

pub struct QueueWorker {
    store: Arc<StateStore>,
    executor: Arc<CommandExecutor>,
    resources: Arc<dyn ResourceProvider>,
    cancelled: Arc<AtomicBool>,
    handle: Option<JoinHandle<Result<(), EngineError>>>,
    status: WorkerStatus,
}

impl QueueWorker {
    pub fn new(
        store: Arc<StateStore>,
        executor: Arc<CommandExecutor>,
        resources: Arc<dyn ResourceProvider>,
        cancelled: Arc<AtomicBool>,
    ) -> Self {
        Self {
            store,
            executor,
            resources,
            cancelled,
            handle: None,
            status: WorkerStatus::NotStarted,
        }
    }

    pub fn status(&self) -> WorkerStatus {
        self.status
    }

    /// Spawn the worker thread. Calling again while started is a no-op.
    pub fn start(&mut self) {
        if self.handle.is_some() {
            return;
        }
        let store = Arc::clone(&self.store);
        let executor = Arc::clone(&self.executor);
        let resources = Arc::clone(&self.resources);
        let cancelled = Arc::clone(&self.cancelled);

        self.status = WorkerStatus::Running;
        self.handle = Some(thread::spawn(move || {
            worker_loop(&store, &executor, resources.as_ref(), &cancelled)
        }));
        info!("queue worker started");
    }

    /// Signal the worker to stop and wake it if it is waiting. Returns
    /// immediately; use [`QueueWorker::join`] to wait for the thread.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
        self.store.notify();
    }

    /// Wait for the worker thread to exit.
    ///
    /// The cancellation signal is an expected way to stop and is
    /// swallowed; any other error the thread died with is re-raised.
    pub fn join(&mut self) -> Result<(), EngineError> {
        let Some(handle) = self.handle.take() else {
            return Ok(());
        };
        let result = handle.join().map_err(|_| EngineError::WorkerPanicked {
            detail: "queue worker thread panicked".to_owned(),
        })?;
        match result {
            Ok(()) => {
                self.status = WorkerStatus::Completed;
                Ok(())
            }
            Err(EngineError::CommandCancelled { .. }) => {
                self.status = WorkerStatus::Cancelled;
                Ok(())
            }
            Err(error) => {
                self.status = WorkerStatus::Completed;
                Err(error)
            }
        }
    }
}

fn worker_loop(
    store: &StateStore,
    executor: &CommandExecutor,
    resources: &dyn ResourceProvider,
    cancelled: &AtomicBool,
) -> Result<(), EngineError> {
    let result = loop {
        match store.wait_for_next_command(cancelled) {
            Ok(command_id) => {
                if let Err(fatal) = executor.execute(&command_id) {
                    break Err(fatal);
                }
                // Let control dispatches (pause, stop) interleave between
                // commands.
                thread::yield_now();
            }
            Err(EngineError::RunStopped) => {
                debug!("no more commands will run; worker exiting");
                break Ok(());
            }
            Err(other) => break Err(other),
        }
    };

    if let Err(fatal) = &result {
        if !matches!(fatal, EngineError::CommandCancelled { .. }) {
            error!(%fatal, "queue worker unwinding; failing run");
            let occurrence = fatal.to_occurrence(resources.generate_id(), resources.now());
            if let Err(dispatch_error) = store.dispatch(Action::FinishRun {
                error: Some(occurrence),
            }) {
                warn!(%dispatch_error, "run already closed; failure record dropped");
            }
        }
    }
    result
}

// ─── Tests ──────────────────────────────────────────────────────────
