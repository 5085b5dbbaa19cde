//! Workflow management for article runs.
//!
//! A run moves through the ten pipeline stages strictly in order. After each
//! step the run is persisted, so a run halted by an error, a cancellation or
//! a crash can be resumed from its first unfinished step.
//!
//! ## Pieces
//!
//! - [`WorkflowManager`] - start, resume, cancel, and stored-run access
//! - [`WorkflowRun`] / [`StepRecord`] - the persisted run state
//! - [`EventBus`] / [`WorkflowEvent`] - synchronous, ordered event delivery
//! - [`RunRepository`] - stored runs, usable without an executor
//! - [`SessionRecorder`] - timings, model usage and the metadata report
//! - [`RunArtifacts`] - the exported article, report and step trace

mod cancel;
mod error;
mod events;
mod export;
mod manager;
mod recorder;
mod repository;
mod run;

pub use cancel::CancellationToken;
pub use error::{WorkflowError, WorkflowResult};
pub use events::{EventBus, WorkflowEvent};
pub use export::{RunArtifacts, STEPS_FILE};
pub use manager::WorkflowManager;
pub use recorder::{ModelUsage, PerformanceMetrics, QualityMetrics, SessionRecorder, StepTiming};
pub use repository::RunRepository;
pub use run::{FinalOutput, RunStatus, StepRecord, StepStatus, WorkflowRun};
