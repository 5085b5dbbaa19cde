//! The workflow manager: drives the ten stages of a run in order.
//!
//! Each step is marked running, handed a [`RunningContext`] built from the
//! completed steps before it, and on success stored and persisted before the
//! next step starts. A failing step halts the run in the `error` state; the
//! run can later be resumed from its first unfinished step.
//!
//! [`RunningContext`]: crate::agents::RunningContext

use std::sync::Arc;

use chrono::Utc;

use super::cancel::CancellationToken;
use super::error::{WorkflowError, WorkflowResult};
use super::events::{EventBus, WorkflowEvent};
use super::recorder::SessionRecorder;
use super::repository::RunRepository;
use super::run::{FinalOutput, RunStatus, StepStatus, WorkflowRun};
use crate::agents::{BlogInputs, Stage, StageExecutor, StepOutput};
use crate::core::SnapshotStore;

/// Owns step sequencing, persistence, cancellation and event emission.
pub struct WorkflowManager {
    executor: Arc<dyn StageExecutor>,
    runs: RunRepository,
    events: EventBus,
    cancel: CancellationToken,
}

impl WorkflowManager {
    pub fn new(executor: Arc<dyn StageExecutor>, store: Arc<dyn SnapshotStore>) -> Self {
        Self {
            executor,
            runs: RunRepository::new(store),
            events: EventBus::new(),
            cancel: CancellationToken::new(),
        }
    }

    /// The bus every run event is emitted on.
    pub fn events(&self) -> &EventBus {
        &self.events
    }

    /// A handle that cancels the current run from elsewhere (a signal handler).
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Stop the current run at the next step boundary.
    ///
    /// A step already in flight finishes first; `RunCancelled` is emitted
    /// when the cancellation takes effect.
    pub fn cancel(&self) {
        tracing::info!("Cancellation requested");
        self.cancel.cancel();
    }

    /// Create a run for `inputs` and execute all ten steps.
    ///
    /// Returns the completed run, or the first error that halted it. A halted
    /// run stays in the store and can be resumed by id.
    pub async fn start(&self, inputs: BlogInputs) -> WorkflowResult<WorkflowRun> {
        self.cancel.reset();

        let mut run = WorkflowRun::new(inputs);
        run.status = RunStatus::Running;
        self.persist(&run)?;

        tracing::info!(run_id = %run.id, title = %run.inputs.title, "Run started");
        self.events.emit(&WorkflowEvent::RunStarted {
            run_id: run.id.clone(),
            inputs: run.inputs.clone(),
        });

        let mut recorder = SessionRecorder::new(run.id.clone(), run.start_time);
        self.drive(&mut run, 0, &mut recorder).await?;
        Ok(run)
    }

    /// Continue a halted run from its first non-completed step.
    ///
    /// Steps after the completed prefix are reset to pending, clearing their
    /// earlier errors. Completed steps are never executed again.
    pub async fn resume(&self, run_id: &str) -> WorkflowResult<WorkflowRun> {
        self.cancel.reset();

        let mut run = self.load_run(run_id)?;
        if !run.status.is_resumable() {
            return Err(WorkflowError::AlreadyCompleted(run.id));
        }

        let from_step = run.completed_prefix();
        for step in &mut run.steps[from_step..] {
            step.reset();
        }
        run.status = RunStatus::Running;
        run.error = None;
        run.end_time = None;
        run.resumed_count += 1;
        self.persist(&run)?;

        tracing::info!(run_id = %run.id, from_step, resumed = run.resumed_count, "Run resumed");
        self.events.emit(&WorkflowEvent::RunResumed { run_id: run.id.clone(), from_step });

        let mut recorder = SessionRecorder::from_run(&run);
        self.drive(&mut run, from_step, &mut recorder).await?;
        Ok(run)
    }

    /// Load and validate a stored run.
    pub fn load_run(&self, run_id: &str) -> WorkflowResult<WorkflowRun> {
        self.runs.load(run_id)
    }

    /// Every readable stored run, newest first.
    pub fn list_runs(&self) -> WorkflowResult<Vec<WorkflowRun>> {
        self.runs.list()
    }

    /// Remove a stored run.
    pub fn delete_run(&self, run_id: &str) -> WorkflowResult<()> {
        self.runs.delete(run_id)
    }

    /// Stored-run access without executing anything.
    pub fn repository(&self) -> &RunRepository {
        &self.runs
    }

    async fn drive(
        &self,
        run: &mut WorkflowRun,
        from_step: usize,
        recorder: &mut SessionRecorder,
    ) -> WorkflowResult<()> {
        for stage in &Stage::ALL[from_step..] {
            if self.cancel.is_cancelled() {
                return Err(self.halt_cancelled(run));
            }
            self.run_step(run, *stage, recorder).await?;
        }

        self.finish(run, recorder)
    }

    async fn run_step(
        &self,
        run: &mut WorkflowRun,
        stage: Stage,
        recorder: &mut SessionRecorder,
    ) -> WorkflowResult<()> {
        let index = stage.index();
        if let Some(blocking) = run.steps[..index].iter().find(|s| !s.is_completed()) {
            let error = WorkflowError::OutOfOrder { stage, blocking: blocking.stage };
            return Err(self.halt_error(run, error));
        }

        let model = self.executor.model_for(stage);
        {
            let step = run.step_mut(stage);
            step.status = StepStatus::Running;
            step.start_time = Some(Utc::now());
            step.model = Some(model.clone());
        }

        tracing::info!(
            run_id = %run.id,
            step = index,
            stage = %stage,
            model = %model,
            "Step started"
        );
        self.events.emit(&WorkflowEvent::StepStarted {
            run_id: run.id.clone(),
            index,
            stage,
            agent: stage.agent(),
        });

        let context = run.context_for(stage);
        let result = self.executor.execute(stage, &context, &run.inputs).await;

        let step = run.step_mut(stage);
        step.end_time = Some(Utc::now());

        let output = match result {
            Ok(output) => output,
            Err(e) => {
                let message = e.to_string();
                step.status = StepStatus::Error;
                step.error = Some(message.clone());

                tracing::error!(step = index, stage = %stage, error = %message, "Step failed");
                self.events.emit(&WorkflowEvent::StepError {
                    run_id: run.id.clone(),
                    index,
                    stage,
                    error: message,
                });
                return Err(self.halt_error(run, e.into()));
            }
        };

        step.status = StepStatus::Completed;
        step.output = Some(output.clone());
        let duration_ms = step.duration_ms().unwrap_or(0);
        recorder.record_step(step);

        if let Err(e) = self.persist(run) {
            return Err(self.halt_error(run, e));
        }

        tracing::info!(
            run_id = %run.id,
            step = index,
            stage = %stage,
            duration_ms,
            "Step completed"
        );
        self.events.emit(&WorkflowEvent::StepCompleted {
            run_id: run.id.clone(),
            index,
            stage,
            output: Box::new(output),
            duration_ms,
        });
        self.events.emit(&WorkflowEvent::ProgressUpdate {
            run_id: run.id.clone(),
            completed: run.completed_steps(),
            total: Stage::COUNT,
            percentage: run.progress_percentage(),
        });

        Ok(())
    }

    fn finish(&self, run: &mut WorkflowRun, recorder: &SessionRecorder) -> WorkflowResult<()> {
        let article = match &run.step(Stage::Compilation).output {
            Some(StepOutput::Compiled(article)) => article.clone(),
            _ => {
                let error = WorkflowError::InvalidSnapshot {
                    id: run.id.clone(),
                    reason: "compilation step has no compiled article".to_string(),
                };
                return Err(self.halt_error(run, error));
            }
        };

        let end_time = Utc::now();
        let metadata_report = recorder.render_markdown(&run.inputs, &article.article, end_time);

        run.final_output = Some(FinalOutput { article, metadata_report });
        run.status = RunStatus::Completed;
        run.end_time = Some(end_time);
        if let Err(e) = self.persist(run) {
            run.final_output = None;
            return Err(self.halt_error(run, e));
        }

        tracing::info!(
            run_id = %run.id,
            duration_ms = run.duration().num_milliseconds(),
            "Run completed"
        );
        self.events.emit(&WorkflowEvent::RunCompleted { run: Box::new(run.clone()) });
        Ok(())
    }

    /// Mark the run `error`, persist it and emit `RunError`.
    fn halt_error(&self, run: &mut WorkflowRun, error: WorkflowError) -> WorkflowError {
        let message = error.to_string();
        run.status = RunStatus::Error;
        run.error = Some(message.clone());
        run.end_time = Some(Utc::now());

        if let Err(e) = self.persist(run) {
            tracing::error!(run_id = %run.id, error = %e, "Failed to persist halted run");
        }

        self.events.emit(&WorkflowEvent::RunError { run_id: run.id.clone(), error: message });
        error
    }

    fn halt_cancelled(&self, run: &mut WorkflowRun) -> WorkflowError {
        run.status = RunStatus::Cancelled;
        run.end_time = Some(Utc::now());

        if let Err(e) = self.persist(run) {
            tracing::error!(run_id = %run.id, error = %e, "Failed to persist cancelled run");
        }

        let completed = run.completed_steps();
        tracing::info!(run_id = %run.id, completed, "Run cancelled");
        self.events.emit(&WorkflowEvent::RunCancelled { run_id: run.id.clone(), completed });
        WorkflowError::Cancelled(run.id.clone())
    }

    fn persist(&self, run: &WorkflowRun) -> WorkflowResult<()> {
        self.runs.save(run)
    }
}
