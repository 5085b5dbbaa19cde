//! Subject inputs and the per-step running context.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::outputs::{
    BrainstormResult, BriefResult, Draft, FinalOutline, OutlineSelection, PlanResult,
    ReviewResult, RevisionResult, SubheadingPlan,
};
use super::{AgentError, AgentKind, Stage, StepOutput};
use crate::text::split_keywords;

/// A subject input field the planner may have to synthesize.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputField {
    Title,
    Keywords,
    Context,
}

impl InputField {
    pub const ALL: [Self; 3] = [Self::Title, Self::Keywords, Self::Context];

    /// Label used in prompts and replies (`TITLE:`).
    pub fn label(self) -> &'static str {
        match self {
            Self::Title => "TITLE",
            Self::Keywords => "KEYWORDS",
            Self::Context => "CONTEXT",
        }
    }
}

impl fmt::Display for InputField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Title => "title",
            Self::Keywords => "keywords",
            Self::Context => "context",
        };
        f.write_str(name)
    }
}

/// User-supplied subject of an article. Fixed once a run starts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlogInputs {
    pub title: String,

    /// Comma-separated keywords
    pub keywords: String,

    /// Audience, tone and purpose description
    pub context: String,

    /// Whether research beyond the model's own knowledge is permitted
    #[serde(default = "default_allow_web")]
    pub allow_web: bool,
}

fn default_allow_web() -> bool {
    true
}

impl BlogInputs {
    pub fn new(
        title: impl Into<String>,
        keywords: impl Into<String>,
        context: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            keywords: keywords.into(),
            context: context.into(),
            allow_web: true,
        }
    }

    /// Set the research-permission flag.
    pub fn with_web(mut self, allow_web: bool) -> Self {
        self.allow_web = allow_web;
        self
    }

    /// Keywords as a trimmed list.
    pub fn keyword_list(&self) -> Vec<String> {
        split_keywords(&self.keywords)
    }

    /// Value of one field.
    pub fn field(&self, field: InputField) -> &str {
        match field {
            InputField::Title => &self.title,
            InputField::Keywords => &self.keywords,
            InputField::Context => &self.context,
        }
    }

    /// Fields that are empty or whitespace only.
    pub fn missing_fields(&self) -> Vec<InputField> {
        InputField::ALL.into_iter().filter(|f| self.field(*f).trim().is_empty()).collect()
    }
}

/// Snapshot of every earlier stage's output, rebuilt for each step.
#[derive(Debug, Clone, PartialEq)]
pub struct RunningContext {
    pub run_id: String,
    pub current_step: Stage,
    pub total_steps: usize,

    /// Outputs of completed stages before `current_step`
    pub previous: BTreeMap<Stage, StepOutput>,
}

impl RunningContext {
    /// Build the context for `current`, keeping only outputs of earlier stages.
    pub fn from_outputs<'a>(
        run_id: impl Into<String>,
        current: Stage,
        outputs: impl IntoIterator<Item = (Stage, &'a StepOutput)>,
    ) -> Self {
        let previous = outputs
            .into_iter()
            .filter(|(stage, _)| *stage < current)
            .map(|(stage, output)| (stage, output.clone()))
            .collect();

        Self { run_id: run_id.into(), current_step: current, total_steps: Stage::COUNT, previous }
    }

    /// Output of one earlier stage.
    pub fn output(&self, stage: Stage) -> Option<&StepOutput> {
        self.previous.get(&stage)
    }

    /// Most recent output produced by an agent kind.
    pub fn latest_for(&self, agent: AgentKind) -> Option<&StepOutput> {
        self.previous.iter().rev().find(|(stage, _)| stage.agent() == agent).map(|(_, out)| out)
    }

    /// Planner-completed inputs when the planning stage has run, else `raw`.
    pub fn effective_inputs(&self, raw: &BlogInputs) -> BlogInputs {
        match self.output(Stage::ContentPlanning) {
            Some(StepOutput::Plan(plan)) => plan.inputs(),
            _ => raw.clone(),
        }
    }

    fn require<'a, T>(
        &'a self,
        needs: Stage,
        pick: impl FnOnce(&'a StepOutput) -> Option<&'a T>,
    ) -> Result<&'a T, AgentError> {
        self.output(needs)
            .and_then(pick)
            .ok_or(AgentError::MissingUpstream { stage: self.current_step, needs })
    }

    pub fn plan(&self) -> Result<&PlanResult, AgentError> {
        self.require(Stage::ContentPlanning, |o| match o {
            StepOutput::Plan(v) => Some(v),
            _ => None,
        })
    }

    pub fn brief(&self) -> Result<&BriefResult, AgentError> {
        self.require(Stage::ProjectBrief, |o| match o {
            StepOutput::Brief(v) => Some(v),
            _ => None,
        })
    }

    pub fn brainstorm(&self) -> Result<&BrainstormResult, AgentError> {
        self.require(Stage::Brainstorm, |o| match o {
            StepOutput::Brainstorm(v) => Some(v),
            _ => None,
        })
    }

    pub fn selection(&self) -> Result<&OutlineSelection, AgentError> {
        self.require(Stage::OutlineSelection, |o| match o {
            StepOutput::OutlineSelection(v) => Some(v),
            _ => None,
        })
    }

    pub fn subheadings(&self) -> Result<&SubheadingPlan, AgentError> {
        self.require(Stage::SubheadingSuggestions, |o| match o {
            StepOutput::Subheadings(v) => Some(v),
            _ => None,
        })
    }

    pub fn final_outline(&self) -> Result<&FinalOutline, AgentError> {
        self.require(Stage::OutlineFinalization, |o| match o {
            StepOutput::FinalOutline(v) => Some(v),
            _ => None,
        })
    }

    pub fn draft(&self) -> Result<&Draft, AgentError> {
        self.require(Stage::Drafting, |o| match o {
            StepOutput::Draft(v) => Some(v),
            _ => None,
        })
    }

    pub fn review(&self) -> Result<&ReviewResult, AgentError> {
        self.require(Stage::Review, |o| match o {
            StepOutput::Review(v) => Some(v),
            _ => None,
        })
    }

    /// The revision, if that stage has run.
    pub fn revision(&self) -> Option<&RevisionResult> {
        match self.output(Stage::Revision) {
            Some(StepOutput::Revision(v)) => Some(v),
            _ => None,
        }
    }

    /// Brief text, or empty when the brief stage has not run.
    pub fn brief_text(&self) -> &str {
        self.brief().map(|b| b.brief.as_str()).unwrap_or("")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn brief(text: &str) -> StepOutput {
        StepOutput::Brief(BriefResult { brief: text.to_string() })
    }

    #[test]
    fn test_missing_fields() {
        let inputs = BlogInputs::new("X", "  ", "");
        assert_eq!(inputs.missing_fields(), vec![InputField::Keywords, InputField::Context]);
        assert!(BlogInputs::new("a", "b", "c").missing_fields().is_empty());
    }

    #[test]
    fn test_keyword_list() {
        let inputs = BlogInputs::new("T", "a, b ,,c", "adults");
        assert_eq!(inputs.keyword_list(), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_context_never_reads_ahead() {
        let early = brief("early");
        let late = brief("late");
        let outputs = vec![(Stage::ProjectBrief, &early), (Stage::Review, &late)];

        let context = RunningContext::from_outputs("run", Stage::Brainstorm, outputs);
        assert_eq!(context.previous.len(), 1);
        assert!(context.output(Stage::Review).is_none());
        assert_eq!(context.brief_text(), "early");
        assert_eq!(context.total_steps, 10);
    }

    #[test]
    fn test_missing_upstream_names_both_stages() {
        let context = RunningContext::from_outputs("run", Stage::OutlineSelection, Vec::new());
        match context.brainstorm() {
            Err(AgentError::MissingUpstream { stage, needs }) => {
                assert_eq!(stage, Stage::OutlineSelection);
                assert_eq!(needs, Stage::Brainstorm);
            }
            other => panic!("unexpected: {other:?}"),
        }
        assert_eq!(context.brief_text(), "");
    }

    #[test]
    fn test_effective_inputs_prefers_plan() {
        let raw = BlogInputs::new("X", "", "");
        let plan = StepOutput::Plan(PlanResult {
            title: "X".to_string(),
            keywords: "k1, k2".to_string(),
            context: "adults".to_string(),
            allow_web: false,
            provided: vec![InputField::Title],
            generated: vec![InputField::Keywords, InputField::Context],
            raw_response: None,
        });

        let before = RunningContext::from_outputs("run", Stage::ContentPlanning, vec![]);
        assert_eq!(before.effective_inputs(&raw), raw);

        let outputs = vec![(Stage::ContentPlanning, &plan)];
        let after = RunningContext::from_outputs("run", Stage::ProjectBrief, outputs);
        let inputs = after.effective_inputs(&raw);
        assert_eq!(inputs.keywords, "k1, k2");
        assert!(!inputs.allow_web);
    }

    #[test]
    fn test_latest_for_agent() {
        let draft = StepOutput::Draft(Draft {
            content: "draft".to_string(),
            word_count: 1,
            reading_time_minutes: 1,
            keyword_density: Vec::new(),
            structure: Default::default(),
        });
        let plan = StepOutput::Subheadings(SubheadingPlan::default());
        let outputs = vec![(Stage::SubheadingSuggestions, &plan), (Stage::Drafting, &draft)];

        let context = RunningContext::from_outputs("run", Stage::Review, outputs);
        assert_eq!(context.latest_for(AgentKind::ContentWriter), Some(&draft));
        assert!(context.latest_for(AgentKind::Reviewer).is_none());
    }
}
