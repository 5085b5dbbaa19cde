//! Step handlers for the ten-stage article pipeline.
//!
//! Six handler kinds serve the ten stages. Each handler renders a prompt from
//! the subject inputs and earlier stage outputs, asks the completion client
//! for text, and parses the reply into a structured [`StepOutput`]. Parsing is
//! best effort: a reply that misses the requested layout degrades to partial
//! results, never to an error.
//!
//! [`AgentSet`] dispatches a [`Stage`] to its handler and is the production
//! [`StageExecutor`] used by the workflow manager.

mod brainstormer;
mod brand;
mod context;
mod orchestrator;
mod outline;
mod outputs;
mod planner;
mod reviewer;
mod stage;
mod writer;

pub use brainstormer::Brainstormer;
pub use brand::BrandProfile;
pub use context::{BlogInputs, InputField, RunningContext};
pub use orchestrator::Orchestrator;
pub use outline::OutlineWriter;
pub use outputs::{
    BrainstormResult, BriefResult, CompiledArticle, Draft, FinalOutline, HeadingSubheadings,
    OutlineSection, OutlineSelection, PlanResult, ReviewResult, RevisionResult, StepOutput,
    SubheadingPlan, WordCountChange, WorkflowSummary,
};
pub use planner::ContentPlanner;
pub use reviewer::Reviewer;
pub use stage::{AgentKind, Stage};
pub use writer::ContentWriter;

use std::sync::Arc;

use async_trait::async_trait;

use crate::completion::{ChatMessage, CompletionClient, CompletionError, CompletionOptions};

/// Step handler error types.
#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    /// The completion client failed (after its own retries).
    #[error(transparent)]
    Completion(#[from] CompletionError),

    /// A stage ran without the output of a stage it depends on.
    #[error("{stage} requires the output of {needs}, which is missing")]
    MissingUpstream { stage: Stage, needs: Stage },
}

impl AgentError {
    /// Whether the failure is a credential problem.
    pub fn is_auth(&self) -> bool {
        matches!(self, Self::Completion(e) if e.is_auth())
    }
}

/// Executes one pipeline stage.
#[async_trait]
pub trait StageExecutor: Send + Sync {
    /// Run `stage` with the outputs of earlier stages and the raw user inputs.
    async fn execute(
        &self,
        stage: Stage,
        context: &RunningContext,
        inputs: &BlogInputs,
    ) -> Result<StepOutput, AgentError>;

    /// Model the stage's requests are routed to.
    fn model_for(&self, stage: Stage) -> String;
}

/// Generation budget for one request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Budget {
    pub max_tokens: u32,
    pub temperature: f32,
}

impl Budget {
    pub(crate) const fn new(max_tokens: u32, temperature: f32) -> Self {
        Self { max_tokens, temperature }
    }
}

/// Completion access shared by the handlers of one agent kind.
#[derive(Clone)]
pub(crate) struct Prompter {
    client: Arc<CompletionClient>,
    brand: Arc<BrandProfile>,
    agent: AgentKind,
}

impl Prompter {
    pub(crate) fn new(
        client: Arc<CompletionClient>,
        brand: Arc<BrandProfile>,
        agent: AgentKind,
    ) -> Self {
        Self { client, brand, agent }
    }

    pub(crate) fn brand(&self) -> &BrandProfile {
        &self.brand
    }

    /// Send a system prompt built from `instructions` plus one user turn.
    pub(crate) async fn ask(
        &self,
        instructions: &str,
        prompt: String,
        budget: Budget,
    ) -> Result<String, AgentError> {
        let messages = [
            ChatMessage::system(self.brand.system_prompt(self.agent, instructions)),
            ChatMessage::user(prompt),
        ];
        let options = CompletionOptions::new(self.agent, budget.max_tokens, budget.temperature);

        Ok(self.client.complete(&messages, &options).await?)
    }
}

/// The six handlers, dispatched by stage.
pub struct AgentSet {
    client: Arc<CompletionClient>,
    planner: ContentPlanner,
    orchestrator: Orchestrator,
    brainstormer: Brainstormer,
    outline: OutlineWriter,
    writer: ContentWriter,
    reviewer: Reviewer,
}

impl AgentSet {
    /// Build every handler around one shared client and brand profile.
    pub fn new(client: Arc<CompletionClient>, brand: BrandProfile) -> Self {
        let brand = Arc::new(brand);
        Self {
            planner: ContentPlanner::new(client.clone(), brand.clone()),
            orchestrator: Orchestrator::new(client.clone(), brand.clone()),
            brainstormer: Brainstormer::new(client.clone(), brand.clone()),
            outline: OutlineWriter::new(client.clone(), brand.clone()),
            writer: ContentWriter::new(client.clone(), brand.clone()),
            reviewer: Reviewer::new(client.clone(), brand),
            client,
        }
    }

    /// The client the handlers share.
    pub fn client(&self) -> &CompletionClient {
        &self.client
    }
}

#[async_trait]
impl StageExecutor for AgentSet {
    async fn execute(
        &self,
        stage: Stage,
        context: &RunningContext,
        inputs: &BlogInputs,
    ) -> Result<StepOutput, AgentError> {
        let inputs = context.effective_inputs(inputs);
        tracing::debug!(
            run_id = %context.run_id,
            stage = %stage,
            agent = %stage.agent(),
            "Dispatching stage"
        );

        let output = match stage {
            Stage::ContentPlanning => StepOutput::Plan(self.planner.plan(&inputs).await?),
            Stage::ProjectBrief => StepOutput::Brief(self.orchestrator.brief(&inputs).await?),
            Stage::Brainstorm => {
                StepOutput::Brainstorm(self.brainstormer.brainstorm(context, &inputs).await?)
            }
            Stage::OutlineSelection => {
                StepOutput::OutlineSelection(self.outline.select(context, &inputs).await?)
            }
            Stage::SubheadingSuggestions => {
                StepOutput::Subheadings(self.writer.suggest_subheadings(context, &inputs).await?)
            }
            Stage::OutlineFinalization => {
                StepOutput::FinalOutline(self.outline.finalize(context).await?)
            }
            Stage::Drafting => StepOutput::Draft(self.writer.compose(context, &inputs).await?),
            Stage::Review => StepOutput::Review(self.reviewer.review(context, &inputs).await?),
            Stage::Revision => StepOutput::Revision(self.writer.revise(context, &inputs).await?),
            Stage::Compilation => {
                StepOutput::Compiled(self.orchestrator.compile(context, &inputs).await?)
            }
        };

        Ok(output)
    }

    fn model_for(&self, stage: Stage) -> String {
        self.client.routing().model_for(stage.agent()).to_string()
    }
}
