//! Brand profile shared by every step handler.
//!
//! The profile is plain configuration: it is loaded from the `[brand]` table
//! of the config file and handed to each handler when the agent set is built.

use serde::{Deserialize, Serialize};

use super::AgentKind;

/// Who the articles are written for and how they should sound.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrandProfile {
    /// Organization or publication name
    pub name: String,

    /// One or two paragraphs describing the organization
    pub description: String,

    /// Voice and tone rules
    pub voice_guidelines: Vec<String>,

    /// Reader groups, most important first
    pub audiences: Vec<String>,

    /// Themes articles should reinforce
    pub messaging_themes: Vec<String>,
}

impl Default for BrandProfile {
    fn default() -> Self {
        Self {
            name: "the publication".to_string(),
            description: String::new(),
            voice_guidelines: vec![
                "Clear and practical: favor concrete examples over abstractions".to_string(),
                "Warm and inclusive: welcome readers of every experience level".to_string(),
                "Credible: make claims the reader can act on or verify".to_string(),
            ],
            audiences: vec!["Curious adult readers looking for practical guidance".to_string()],
            messaging_themes: Vec::new(),
        }
    }
}

impl BrandProfile {
    /// Opening line of a system prompt for an agent kind.
    pub fn role_intro(&self, agent: AgentKind) -> String {
        format!("You are the {} for {}.", agent.display_name(), self.name)
    }

    /// Render the profile as a context block for prompts.
    pub fn render(&self) -> String {
        let mut block = format!("ABOUT {}:\n", self.name.to_uppercase());
        if !self.description.trim().is_empty() {
            block.push_str(self.description.trim());
            block.push('\n');
        }

        push_list(&mut block, "BRAND VOICE GUIDELINES", &self.voice_guidelines);
        push_list(&mut block, "TARGET AUDIENCES", &self.audiences);
        push_list(&mut block, "CORE MESSAGING THEMES", &self.messaging_themes);

        block
    }

    /// Full system prompt: role intro, brand context, then role instructions.
    pub fn system_prompt(&self, agent: AgentKind, instructions: &str) -> String {
        format!("{}\n\n{}\n{}", self.role_intro(agent), self.render(), instructions.trim())
    }
}

fn push_list(block: &mut String, heading: &str, items: &[String]) {
    if items.is_empty() {
        return;
    }
    block.push('\n');
    block.push_str(heading);
    block.push_str(":\n");
    for item in items {
        block.push_str("- ");
        block.push_str(item);
        block.push('\n');
    }
}
