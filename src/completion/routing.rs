//! Agent-kind to model routing.
//!
//! Planning, outlining and reviewing need stronger reasoning and go to the
//! high-capability model; brainstorming and long-form writing go to the
//! faster generation model.

use serde::{Deserialize, Serialize};

use crate::agents::AgentKind;

/// High-capability model used for reasoning-heavy stages.
pub const REASONING_MODEL: &str = "claude-opus-4-1-20250805";

/// Faster model used for generation-heavy stages.
pub const GENERATION_MODEL: &str = "claude-sonnet-4-20250514";

/// Model selection per agent kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelRouting {
    /// Model for the content planner
    #[serde(default = "default_reasoning")]
    pub content_planner: String,

    /// Model for the orchestrator (project brief, compilation)
    #[serde(default = "default_reasoning")]
    pub orchestrator: String,

    /// Model for the brainstormer
    #[serde(default = "default_generation")]
    pub brainstormer: String,

    /// Model for outline selection and finalization
    #[serde(default = "default_reasoning")]
    pub outline_writer: String,

    /// Model for subheadings, drafting and revision
    #[serde(default = "default_generation")]
    pub content_writer: String,

    /// Model for the reviewer
    #[serde(default = "default_reasoning")]
    pub reviewer: String,
}

fn default_reasoning() -> String {
    REASONING_MODEL.to_string()
}
fn default_generation() -> String {
    GENERATION_MODEL.to_string()
}

impl Default for ModelRouting {
    fn default() -> Self {
        Self {
            content_planner: default_reasoning(),
            orchestrator: default_reasoning(),
            brainstormer: default_generation(),
            outline_writer: default_reasoning(),
            content_writer: default_generation(),
            reviewer: default_reasoning(),
        }
    }
}

impl ModelRouting {
    /// Route every agent kind to the same model.
    pub fn uniform(model: impl Into<String>) -> Self {
        let model = model.into();
        Self {
            content_planner: model.clone(),
            orchestrator: model.clone(),
            brainstormer: model.clone(),
            outline_writer: model.clone(),
            content_writer: model.clone(),
            reviewer: model,
        }
    }

    /// Model id for an agent kind.
    pub fn model_for(&self, agent: AgentKind) -> &str {
        match agent {
            AgentKind::ContentPlanner => &self.content_planner,
            AgentKind::Orchestrator => &self.orchestrator,
            AgentKind::Brainstormer => &self.brainstormer,
            AgentKind::OutlineWriter => &self.outline_writer,
            AgentKind::ContentWriter => &self.content_writer,
            AgentKind::Reviewer => &self.reviewer,
        }
    }
}
