//! Pipeline positions and the agent kinds that serve them.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The six step-handler kinds. Several stages share a kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AgentKind {
    /// Fills in missing subject inputs
    ContentPlanner,

    /// Writes the project brief and compiles the final output
    Orchestrator,

    /// Generates heading, introduction and conclusion candidates
    Brainstormer,

    /// Selects and finalizes the outline
    OutlineWriter,

    /// Suggests subheadings, drafts and revises the article
    ContentWriter,

    /// Scores the draft and lists revisions
    Reviewer,
}

impl AgentKind {
    /// All agent kinds.
    pub const ALL: [Self; 6] = [
        Self::ContentPlanner,
        Self::Orchestrator,
        Self::Brainstormer,
        Self::OutlineWriter,
        Self::ContentWriter,
        Self::Reviewer,
    ];

    /// Stable identifier (matches the serialized form).
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ContentPlanner => "content-planner",
            Self::Orchestrator => "orchestrator",
            Self::Brainstormer => "brainstormer",
            Self::OutlineWriter => "outline-writer",
            Self::ContentWriter => "content-writer",
            Self::Reviewer => "reviewer",
        }
    }

    /// Human-readable role name.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::ContentPlanner => "Content Planning Assistant",
            Self::Orchestrator => "Blog Orchestrator",
            Self::Brainstormer => "Blog Brainstormer",
            Self::OutlineWriter => "Outline Writer",
            Self::ContentWriter => "Content Writer",
            Self::Reviewer => "Content Reviewer",
        }
    }
}

impl fmt::Display for AgentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One of the ten fixed pipeline positions, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    ContentPlanning,
    ProjectBrief,
    Brainstorm,
    OutlineSelection,
    SubheadingSuggestions,
    OutlineFinalization,
    Drafting,
    Review,
    Revision,
    Compilation,
}

impl Stage {
    /// Number of stages in a run.
    pub const COUNT: usize = 10;

    /// All stages in execution order.
    pub const ALL: [Self; Self::COUNT] = [
        Self::ContentPlanning,
        Self::ProjectBrief,
        Self::Brainstorm,
        Self::OutlineSelection,
        Self::SubheadingSuggestions,
        Self::OutlineFinalization,
        Self::Drafting,
        Self::Review,
        Self::Revision,
        Self::Compilation,
    ];

    /// Zero-based position in the pipeline.
    pub fn index(self) -> usize {
        self as usize
    }

    /// Stage at a zero-based position.
    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// Display name of the stage.
    pub fn name(self) -> &'static str {
        match self {
            Self::ContentPlanning => "Content Planning",
            Self::ProjectBrief => "Workflow Orchestration",
            Self::Brainstorm => "Brainstorming",
            Self::OutlineSelection => "Outline Creation",
            Self::SubheadingSuggestions => "H3 Suggestions",
            Self::OutlineFinalization => "Outline Finalization",
            Self::Drafting => "Content Writing",
            Self::Review => "Content Review",
            Self::Revision => "Revision",
            Self::Compilation => "Final Compilation",
        }
    }

    /// The agent kind that executes this stage.
    pub fn agent(self) -> AgentKind {
        match self {
            Self::ContentPlanning => AgentKind::ContentPlanner,
            Self::ProjectBrief | Self::Compilation => AgentKind::Orchestrator,
            Self::Brainstorm => AgentKind::Brainstormer,
            Self::OutlineSelection | Self::OutlineFinalization => AgentKind::OutlineWriter,
            Self::SubheadingSuggestions | Self::Drafting | Self::Revision => {
                AgentKind::ContentWriter
            }
            Self::Review => AgentKind::Reviewer,
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
