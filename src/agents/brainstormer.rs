//! Brainstorming: heading, introduction and conclusion candidates.

use std::collections::HashSet;
use std::sync::Arc;

use super::{
    AgentError, AgentKind, BlogInputs, BrainstormResult, BrandProfile, Budget, Prompter,
    RunningContext,
};
use crate::completion::CompletionClient;
use crate::text::{extract_section, parse_numbered_list};

const BUDGET: Budget = Budget::new(3000, 0.8);

/// Heading candidates requested.
const TARGET_HEADINGS: usize = 20;

/// Introduction and conclusion approaches requested, each.
const TARGET_APPROACHES: usize = 3;

/// Fewer headings than this is logged as a shortfall.
const MIN_HEADINGS: usize = 15;

const HEADINGS_HEADER: &str = "MAIN H2 HEADINGS";
const INTRO_HEADER: &str = "INTRODUCTION OPTIONS";
const CONCLUSION_HEADER: &str = "CONCLUSION OPTIONS";

const INSTRUCTIONS: &str = "\
You generate creative and diverse content ideas.

BRAINSTORMING PRINCIPLES:
- Focus on practical applications over theoretical concepts
- Generate diverse perspectives and approaches
- Avoid generic, obvious, or overused topics
- Consider both individual and organizational applications
- Emphasize actionable insights and real-world benefits";

/// Produces the candidate pool the outline is selected from.
pub struct Brainstormer {
    prompter: Prompter,
}

impl Brainstormer {
    pub fn new(client: Arc<CompletionClient>, brand: Arc<BrandProfile>) -> Self {
        Self { prompter: Prompter::new(client, brand, AgentKind::Brainstormer) }
    }

    /// Ask for candidates and parse them. Never re-queries on a shortfall.
    pub async fn brainstorm(
        &self,
        context: &RunningContext,
        inputs: &BlogInputs,
    ) -> Result<BrainstormResult, AgentError> {
        let prompt = format!(
            "I need diverse and creative heading options for this blog post.\n\n\
             PROJECT CONTEXT:\n\
             - Title: \"{title}\"\n\
             - Keywords: \"{keywords}\"\n\
             - Context: \"{context}\"\n\n\
             PROJECT BRIEF:\n{brief}\n\n\
             BRAINSTORMING REQUIREMENTS:\n\n\
             **{TARGET_HEADINGS} {HEADINGS_HEADER}** (for article content):\n\
             Generate {TARGET_HEADINGS} diverse H2 headings that could serve as main sections. \
             Focus on practical applications, real-world scenarios, skill development, and \
             creative angles that avoid generic topics.\n\n\
             **{TARGET_APPROACHES} {INTRO_HEADER}** (meta-descriptions only):\n\
             - Hook-focused: start with a compelling statistic or question\n\
             - Story-driven: begin with a relatable scenario\n\
             - Problem-solution: identify pain points and promise solutions\n\n\
             **{TARGET_APPROACHES} {CONCLUSION_HEADER}** (meta-descriptions only):\n\
             - Call-to-action focused: drive specific reader actions\n\
             - Summary and reflection: synthesize key takeaways\n\
             - Forward-looking: inspire continued growth\n\n\
             IMPORTANT GUIDELINES:\n\
             - {research}\n\
             - Ensure headings are diverse and non-repetitive\n\
             - Make headings specific and actionable\n\
             - Include beginner and advanced concepts\n\n\
             Please format your response clearly with numbered lists for each section.",
            title = inputs.title,
            keywords = inputs.keywords,
            context = inputs.context,
            brief = context.brief_text(),
            research = if inputs.allow_web {
                "Draw on current, verifiable information where it helps"
            } else {
                "No web research: rely on original perspectives to avoid copycat content"
            },
        );

        let reply = self.prompter.ask(INSTRUCTIONS, prompt, BUDGET).await?;
        Ok(parse_brainstorm(reply))
    }
}

/// Split a brainstorm reply into its three candidate lists.
///
/// When the headings section is missing entirely, every numbered item in the
/// reply is taken as a heading candidate.
fn parse_brainstorm(reply: String) -> BrainstormResult {
    let section = |header: &str, ends: &[&str]| {
        extract_section(&reply, header, ends).map(|s| parse_numbered_list(&s))
    };

    let h2_options = section(HEADINGS_HEADER, &[INTRO_HEADER, CONCLUSION_HEADER])
        .unwrap_or_else(|| {
            tracing::warn!("Brainstorm reply has no headings section, using every list item");
            parse_numbered_list(&reply)
        });
    let intro_options = section(INTRO_HEADER, &[CONCLUSION_HEADER]).unwrap_or_default();
    let conclusion_options = section(CONCLUSION_HEADER, &[]).unwrap_or_default();

    if h2_options.len() < MIN_HEADINGS {
        tracing::warn!(
            found = h2_options.len(),
            expected = TARGET_HEADINGS,
            "Brainstorm returned fewer headings than requested"
        );
    }
    if intro_options.len() < TARGET_APPROACHES {
        tracing::warn!(found = intro_options.len(), "Brainstorm returned few intro options");
    }
    if conclusion_options.len() < TARGET_APPROACHES {
        tracing::warn!(
            found = conclusion_options.len(),
            "Brainstorm returned few conclusion options"
        );
    }

    let near_duplicates = near_duplicates(&h2_options);
    if !near_duplicates.is_empty() {
        tracing::debug!(count = near_duplicates.len(), "Near-duplicate headings");
    }

    BrainstormResult {
        h2_options,
        intro_options,
        conclusion_options,
        near_duplicates,
        raw_response: reply,
    }
}

/// Headings whose first three normalized words repeat an earlier heading.
fn near_duplicates(headings: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();

    headings
        .iter()
        .filter(|heading| {
            let normalized: String = heading
                .to_lowercase()
                .chars()
                .filter(|c| c.is_alphanumeric() || c.is_whitespace() || *c == '_')
                .collect();
            let key = normalized.split_whitespace().take(3).collect::<Vec<_>>().join(" ");
            !seen.insert(key)
        })
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::super::testing::{client, CannedProvider};
    use super::super::{BriefResult, Stage, StepOutput};
    use super::*;

    fn reply(headings: usize, intros: usize) -> String {
        let mut text = String::from("Here you go!\n\n**MAIN H2 HEADINGS:**\n");
        for i in 1..=headings {
            text.push_str(&format!("{i}. Heading idea number {i}\n"));
        }
        text.push_str("\n**INTRODUCTION OPTIONS:**\n");
        for i in 1..=intros {
            text.push_str(&format!("{i}. Intro approach {i}\n"));
        }
        text
    }

    #[test]
    fn test_parses_twenty_headings_and_three_intros() {
        let result = parse_brainstorm(reply(20, 3));

        assert_eq!(result.h2_options.len(), 20);
        assert_eq!(result.intro_options.len(), 3);
        assert!(result.conclusion_options.is_empty());
        assert_eq!(result.h2_options[0], "Heading idea number 1");
        assert!(result.h2_options.iter().all(|h| !h.is_empty() && h.trim() == h));
        assert_eq!(result.intro_options[2], "Intro approach 3");
    }

    #[test]
    fn test_shortfall_is_not_an_error() {
        let result = parse_brainstorm(reply(4, 1));
        assert_eq!(result.h2_options.len(), 4);
        assert_eq!(result.intro_options.len(), 1);
    }

    #[test]
    fn test_missing_sections_fall_back_to_any_list() {
        let result = parse_brainstorm("1. Listening as a superpower\n2. Yes, and at work".into());
        assert_eq!(result.h2_options.len(), 2);
        assert!(result.intro_options.is_empty());
    }

    #[test]
    fn test_conclusion_section_parsed() {
        let text = format!(
            "{}\nCONCLUSION OPTIONS\n- Call the reader to act\n- Reflect on the journey",
            reply(2, 2)
        );
        let result = parse_brainstorm(text);
        assert_eq!(result.intro_options.len(), 2);
        assert_eq!(
            result.conclusion_options,
            vec!["Call the reader to act", "Reflect on the journey"]
        );
    }

    #[test]
    fn test_near_duplicates() {
        let headings = vec![
            "The Power of Listening".to_string(),
            "The power of listening, revisited".to_string(),
            "Saying Yes, And".to_string(),
        ];
        assert_eq!(near_duplicates(&headings), vec!["The power of listening, revisited"]);
    }

    #[tokio::test]
    async fn test_prompt_includes_brief() {
        let provider = CannedProvider::new(&[reply(20, 3).as_str()]);
        let brainstormer =
            Brainstormer::new(client(provider.clone()), Arc::new(BrandProfile::default()));
        let brief = StepOutput::Brief(BriefResult { brief: "Audience: new managers".into() });
        let context = RunningContext::from_outputs(
            "run",
            Stage::Brainstorm,
            vec![(Stage::ProjectBrief, &brief)],
        );

        let inputs = BlogInputs::new("T", "a,b", "adults").with_web(false);
        let result = brainstormer.brainstorm(&context, &inputs).await.unwrap();

        assert_eq!(result.h2_options.len(), 20);
        let prompt = provider.prompt(0);
        assert!(prompt.contains("Audience: new managers"));
        assert!(prompt.contains("**20 MAIN H2 HEADINGS**"));
        assert!(prompt.contains("No web research"));
        let request = &provider.requests.lock()[0];
        assert_eq!(request.max_tokens, 3000);
        assert!((request.temperature - 0.8).abs() < f32::EPSILON);
    }
}
