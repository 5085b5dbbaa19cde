//! Workflow events and the bus that delivers them.
//!
//! Handlers run synchronously on the manager's task, in registration order.
//! A handler that returns an error or panics is logged and skipped; it never
//! stops the pipeline. With `panic = "abort"` (the release profile) a
//! panicking handler still aborts the process.

use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc;

use parking_lot::RwLock;

use super::run::WorkflowRun;
use crate::agents::{AgentKind, BlogInputs, Stage, StepOutput};

/// Everything a presentation layer can observe about a run.
#[derive(Debug, Clone, PartialEq)]
pub enum WorkflowEvent {
    /// A new run was created and persisted.
    RunStarted { run_id: String, inputs: BlogInputs },

    /// A halted run was picked up again at `from_step`.
    RunResumed { run_id: String, from_step: usize },

    StepStarted { run_id: String, index: usize, stage: Stage, agent: AgentKind },

    StepCompleted {
        run_id: String,
        index: usize,
        stage: Stage,
        output: Box<StepOutput>,
        duration_ms: u64,
    },

    StepError { run_id: String, index: usize, stage: Stage, error: String },

    /// Emitted after every completed step.
    ProgressUpdate { run_id: String, completed: usize, total: usize, percentage: f64 },

    /// Terminal success; carries the final run.
    RunCompleted { run: Box<WorkflowRun> },

    RunError { run_id: String, error: String },

    /// Cancellation took effect after `completed` steps.
    RunCancelled { run_id: String, completed: usize },
}

impl WorkflowEvent {
    /// Stable event name, used in logs.
    pub fn name(&self) -> &'static str {
        match self {
            Self::RunStarted { .. } => "run_started",
            Self::RunResumed { .. } => "run_resumed",
            Self::StepStarted { .. } => "step_started",
            Self::StepCompleted { .. } => "step_completed",
            Self::StepError { .. } => "step_error",
            Self::ProgressUpdate { .. } => "progress_update",
            Self::RunCompleted { .. } => "run_completed",
            Self::RunError { .. } => "run_error",
            Self::RunCancelled { .. } => "run_cancelled",
        }
    }

    pub fn run_id(&self) -> &str {
        match self {
            Self::RunCompleted { run } => &run.id,
            Self::RunStarted { run_id, .. }
            | Self::RunResumed { run_id, .. }
            | Self::StepStarted { run_id, .. }
            | Self::StepCompleted { run_id, .. }
            | Self::StepError { run_id, .. }
            | Self::ProgressUpdate { run_id, .. }
            | Self::RunError { run_id, .. }
            | Self::RunCancelled { run_id, .. } => run_id,
        }
    }
}

type Handler = Box<dyn Fn(&WorkflowEvent) -> anyhow::Result<()> + Send + Sync>;

/// Ordered list of event handlers.
#[derive(Default)]
pub struct EventBus {
    handlers: RwLock<Vec<Handler>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler. Handlers must not subscribe from inside `emit`.
    pub fn subscribe<F>(&self, handler: F)
    where
        F: Fn(&WorkflowEvent) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.handlers.write().push(Box::new(handler));
    }

    /// Register a handler that forwards a clone of every event.
    ///
    /// Once the receiver is dropped the handler reports an error per event,
    /// which the bus logs and ignores.
    pub fn channel(&self) -> mpsc::Receiver<WorkflowEvent> {
        let (tx, rx) = mpsc::channel();
        self.subscribe(move |event| {
            tx.send(event.clone()).map_err(|_| anyhow::anyhow!("event receiver dropped"))
        });
        rx
    }

    pub fn handler_count(&self) -> usize {
        self.handlers.read().len()
    }

    /// Deliver `event` to every handler in registration order.
    pub fn emit(&self, event: &WorkflowEvent) {
        let handlers = self.handlers.read();

        for (index, handler) in handlers.iter().enumerate() {
            match panic::catch_unwind(AssertUnwindSafe(|| handler(event))) {
                Ok(Ok(())) => {}
                Ok(Err(e)) => tracing::warn!(
                    handler = index,
                    event = event.name(),
                    error = %e,
                    "Event handler failed"
                ),
                Err(_) => tracing::error!(
                    handler = index,
                    event = event.name(),
                    "Event handler panicked"
                ),
            }
        }
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus").field("handlers", &self.handler_count()).finish()
    }
}
