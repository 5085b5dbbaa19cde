//! Run and step records.
//!
//! A [`WorkflowRun`] is what gets persisted after every step transition. It
//! always holds exactly ten [`StepRecord`]s, one per [`Stage`], in order.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::agents::{AgentKind, BlogInputs, CompiledArticle, RunningContext, Stage, StepOutput};

/// Overall state of a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    #[default]
    Pending,
    Running,
    Completed,
    Error,
    Cancelled,
}

impl RunStatus {
    /// Whether `resume` may pick the run up again.
    pub fn is_resumable(self) -> bool {
        !matches!(self, Self::Completed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Error => "error",
            Self::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

/// State of one step. `Pending -> Running -> Completed | Error` is the only path.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    #[default]
    Pending,
    Running,
    Completed,
    Error,
}

/// One pipeline position within a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepRecord {
    pub stage: Stage,

    /// Handler kind serving the stage
    pub agent: AgentKind,

    pub status: StepStatus,

    /// Structured result, present once completed
    #[serde(default)]
    pub output: Option<StepOutput>,

    /// Failure message when the step errored
    #[serde(default)]
    pub error: Option<String>,

    /// Model the stage's requests were routed to
    #[serde(default)]
    pub model: Option<String>,

    #[serde(default)]
    pub start_time: Option<DateTime<Utc>>,

    #[serde(default)]
    pub end_time: Option<DateTime<Utc>>,
}

impl StepRecord {
    pub fn new(stage: Stage) -> Self {
        Self {
            stage,
            agent: stage.agent(),
            status: StepStatus::Pending,
            output: None,
            error: None,
            model: None,
            start_time: None,
            end_time: None,
        }
    }

    pub fn is_completed(&self) -> bool {
        self.status == StepStatus::Completed
    }

    /// Wall-clock duration once both ends are recorded.
    pub fn duration_ms(&self) -> Option<u64> {
        let (start, end) = (self.start_time?, self.end_time?);
        u64::try_from((end - start).num_milliseconds()).ok()
    }

    /// Return the step to `Pending`, dropping any earlier attempt.
    pub fn reset(&mut self) {
        *self = Self::new(self.stage);
    }
}

/// Deliverables of a completed run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinalOutput {
    pub article: CompiledArticle,

    /// Markdown session report (timings, models, quality)
    pub metadata_report: String,
}

/// One end-to-end execution of the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowRun {
    pub id: String,
    pub inputs: BlogInputs,
    pub steps: Vec<StepRecord>,
    pub status: RunStatus,
    pub start_time: DateTime<Utc>,

    #[serde(default)]
    pub end_time: Option<DateTime<Utc>>,

    #[serde(default)]
    pub final_output: Option<FinalOutput>,

    /// Message of the error that halted the run
    #[serde(default)]
    pub error: Option<String>,

    /// Times the run was picked up again after halting
    #[serde(default)]
    pub resumed_count: u32,
}

impl WorkflowRun {
    /// New pending run with a fresh id and ten pending steps.
    pub fn new(inputs: BlogInputs) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            inputs,
            steps: Stage::ALL.into_iter().map(StepRecord::new).collect(),
            status: RunStatus::Pending,
            start_time: Utc::now(),
            end_time: None,
            final_output: None,
            error: None,
            resumed_count: 0,
        }
    }

    pub fn step(&self, stage: Stage) -> &StepRecord {
        &self.steps[stage.index()]
    }

    pub fn step_mut(&mut self, stage: Stage) -> &mut StepRecord {
        &mut self.steps[stage.index()]
    }

    pub fn completed_steps(&self) -> usize {
        self.steps.iter().filter(|s| s.is_completed()).count()
    }

    /// Length of the leading run of completed steps.
    pub fn completed_prefix(&self) -> usize {
        self.steps.iter().take_while(|s| s.is_completed()).count()
    }

    /// Completed steps over total, in percent.
    pub fn progress_percentage(&self) -> f64 {
        self.completed_steps() as f64 / Stage::COUNT as f64 * 100.0
    }

    /// Index of the first step that has not completed.
    pub fn current_step_index(&self) -> Option<usize> {
        self.steps.iter().position(|s| !s.is_completed())
    }

    /// Elapsed time, up to now while the run has not finished.
    pub fn duration(&self) -> Duration {
        self.end_time.unwrap_or_else(Utc::now) - self.start_time
    }

    /// Running context for `stage`, built from the completed earlier steps.
    pub fn context_for(&self, stage: Stage) -> RunningContext {
        let outputs = self.steps[..stage.index()]
            .iter()
            .filter(|s| s.is_completed())
            .filter_map(|s| s.output.as_ref().map(|output| (s.stage, output)));

        RunningContext::from_outputs(self.id.clone(), stage, outputs)
    }

    /// Title after planning filled it in, else the raw input.
    pub fn title(&self) -> &str {
        match &self.step(Stage::ContentPlanning).output {
            Some(StepOutput::Plan(plan)) if !plan.title.is_empty() => &plan.title,
            _ => &self.inputs.title,
        }
    }

    /// Check the fixed shape of a loaded snapshot.
    pub fn validate(&self) -> Result<(), String> {
        if self.steps.len() != Stage::COUNT {
            return Err(format!("expected {} steps, found {}", Stage::COUNT, self.steps.len()));
        }

        for (index, step) in self.steps.iter().enumerate() {
            if step.stage.index() != index {
                return Err(format!("step {index} holds {}", step.stage));
            }
            if step.is_completed() && step.output.is_none() {
                return Err(format!("completed step {index} has no output"));
            }
            if let Some(output) = &step.output {
                if output.stage() != step.stage {
                    return Err(format!("step {index} holds output of {}", output.stage()));
                }
            }
        }

        Ok(())
    }
}
