//! Workflow error types.

use crate::agents::{AgentError, Stage};
use crate::core::StoreError;

/// Errors that halt or refuse a run.
#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    /// A step handler failed. The run is marked `error`.
    #[error(transparent)]
    Agent(#[from] AgentError),

    /// The snapshot store failed.
    #[error(transparent)]
    Storage(#[from] StoreError),

    /// A step was asked to run before the steps ahead of it completed.
    #[error("{stage} cannot run before {blocking} has completed")]
    OutOfOrder { stage: Stage, blocking: Stage },

    /// No snapshot exists for the run id.
    #[error("Run not found: {0}")]
    RunNotFound(String),

    /// Resume was requested for a run whose every step completed.
    #[error("Run {0} is already completed")]
    AlreadyCompleted(String),

    /// Cancellation took effect at a step boundary.
    #[error("Run {0} was cancelled")]
    Cancelled(String),

    /// A stored snapshot does not describe a valid run.
    #[error("Invalid snapshot for run {id}: {reason}")]
    InvalidSnapshot { id: String, reason: String },
}

impl WorkflowError {
    /// Whether the run stopped on a credential problem.
    pub fn is_auth(&self) -> bool {
        matches!(self, Self::Agent(e) if e.is_auth())
    }
}

/// Result type for workflow operations.
pub type WorkflowResult<T> = Result<T, WorkflowError>;
