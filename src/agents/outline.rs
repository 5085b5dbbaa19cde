//! Outline writing: heading selection (stage 3) and finalization (stage 5).

use std::sync::Arc;

use super::{
    AgentError, AgentKind, BlogInputs, BrandProfile, Budget, FinalOutline, OutlineSection,
    OutlineSelection, Prompter, RunningContext, SubheadingPlan,
};
use crate::completion::CompletionClient;
use crate::text::{extract_choice_number, extract_headings, extract_section};

const SELECT_BUDGET: Budget = Budget::new(2500, 0.6);
const FINALIZE_BUDGET: Budget = Budget::new(2000, 0.5);

/// Most headings an article may carry.
const MAX_HEADINGS: usize = 10;

/// Fewer headings than this is logged as a shortfall.
const MIN_HEADINGS: usize = 5;

const WORDS_PER_H2: usize = 300;
const WORDS_PER_H3: usize = 150;
const WORDS_INTRO_AND_CONCLUSION: usize = 400;

const INTRO_LABELS: [&str; 3] = ["SELECTED INTRODUCTION", "INTRODUCTION", "INTRO"];
const CONCLUSION_LABELS: [&str; 2] = ["SELECTED CONCLUSION", "CONCLUSION"];

/// `##` headings that label parts of the reply rather than article sections.
const META_HEADINGS: [&str; 6] =
    ["introduction", "conclusion", "reasoning", "rationale", "selected", "outline"];

const INSTRUCTIONS: &str = "\
You create structured, logical content outlines that guide readers through a \
complete learning journey.

OUTLINE PRINCIPLES:
- Start with foundational concepts and build progressively
- Create a clear narrative flow from problem to solution
- Balance understanding with practical application
- Ensure each section adds unique value without repetition
- Design for scannability with clear headings";

/// Selects headings from the brainstorm and merges in subheadings.
pub struct OutlineWriter {
    prompter: Prompter,
}

impl OutlineWriter {
    pub fn new(client: Arc<CompletionClient>, brand: Arc<BrandProfile>) -> Self {
        Self { prompter: Prompter::new(client, brand, AgentKind::OutlineWriter) }
    }

    /// Choose 5-10 brainstormed headings in reading order, plus one intro and
    /// one conclusion approach.
    pub async fn select(
        &self,
        context: &RunningContext,
        inputs: &BlogInputs,
    ) -> Result<OutlineSelection, AgentError> {
        let brainstorm = context.brainstorm()?;

        let prompt = format!(
            "I need to select the best H2 headings and create a structured outline.\n\n\
             PROJECT CONTEXT:\n\
             - Title: \"{title}\"\n\
             - Keywords: \"{keywords}\"\n\
             - Target: {target}\n\n\
             PROJECT BRIEF:\n{brief}\n\n\
             AVAILABLE H2 OPTIONS ({count} total):\n{h2s}\n\n\
             AVAILABLE INTRO OPTIONS:\n{intros}\n\n\
             AVAILABLE CONCLUSION OPTIONS:\n{conclusions}\n\n\
             OUTLINE REQUIREMENTS:\n\
             **SELECT {MIN_HEADINGS}-{MAX_HEADINGS} H2 HEADINGS** from the options above that \
             create a complete, logical story, progressing from foundational concepts to \
             advanced applications without repetition.\n\n\
             **FORMAT:**\n\
             - Write each selected H2 on its own line as `## Heading`, in reading order, \
             followed by a brief description of what it covers\n\
             - Do NOT include intro or conclusion headings among the H2s\n\
             - Then write `SELECTED INTRODUCTION: <number>` and `SELECTED CONCLUSION: <number>`\n\
             - Finish with `REASONING:` explaining your selections",
            title = inputs.title,
            keywords = inputs.keywords,
            target = inputs.context,
            brief = context.brief_text(),
            count = brainstorm.h2_options.len(),
            h2s = numbered(&brainstorm.h2_options),
            intros = numbered(&brainstorm.intro_options),
            conclusions = numbered(&brainstorm.conclusion_options),
        );

        let reply = self.prompter.ask(INSTRUCTIONS, prompt, SELECT_BUDGET).await?;

        let mut selected_h2s: Vec<String> =
            extract_headings(&reply, 2).into_iter().filter(|h| !is_meta_heading(h)).collect();

        if selected_h2s.is_empty() {
            let lower = reply.to_lowercase();
            let mut found: Vec<(usize, &String)> = brainstorm
                .h2_options
                .iter()
                .filter_map(|option| lower.find(&option.to_lowercase()).map(|pos| (pos, option)))
                .collect();
            found.sort_by_key(|(pos, _)| *pos);
            selected_h2s = found.into_iter().map(|(_, option)| option.clone()).collect();
            tracing::warn!(
                recovered = selected_h2s.len(),
                "Outline reply has no ## headings, matched candidates by text"
            );
        }

        if selected_h2s.len() > MAX_HEADINGS {
            tracing::warn!(selected = selected_h2s.len(), "Too many headings, keeping the first");
            selected_h2s.truncate(MAX_HEADINGS);
        } else if selected_h2s.len() < MIN_HEADINGS {
            tracing::warn!(selected = selected_h2s.len(), "Fewer headings selected than requested");
        }

        let intro_choice = extract_choice_number(&reply, &INTRO_LABELS);
        let conclusion_choice = extract_choice_number(&reply, &CONCLUSION_LABELS);

        Ok(OutlineSelection {
            selected_intro: pick(&brainstorm.intro_options, intro_choice),
            selected_conclusion: pick(&brainstorm.conclusion_options, conclusion_choice),
            intro_choice,
            conclusion_choice,
            reasoning: extract_section(&reply, "REASONING", &[]).unwrap_or_default(),
            selected_h2s,
            raw_response: reply,
        })
    }

    /// Merge the subheading recommendations into the final outline.
    ///
    /// A reply without any `##` heading is replaced by an outline rendered
    /// from the selection and the recommendations.
    pub async fn finalize(&self, context: &RunningContext) -> Result<FinalOutline, AgentError> {
        let selection = context.selection()?;
        let subheadings = context.subheadings()?;

        let prompt = format!(
            "I need to finalize the complete H2/H3 structure incorporating the H3 suggestions.\n\n\
             CURRENT OUTLINE:\n{outline}\n\n\
             H3 SUGGESTIONS RECEIVED:\n{suggestions}\n\n\
             FINALIZATION TASK:\n\
             1. **Review H3 Suggestions**: evaluate which H3s are essential vs. optional\n\
             2. **Apply Quality Filter**: include H3s only when they add significant value\n\
             3. **Maintain Structure**: keep a logical flow within each H2 section\n\
             4. **Create Final Outline**: complete Markdown, `##` for H2s and `###` for H3s\n\n\
             REMEMBER:\n\
             - 0-5 H3s per H2 maximum\n\
             - Self-contained H2s with 0 H3s are perfectly acceptable\n\
             - Fewer is better than fluff\n\n\
             Please provide only the complete final outline in clean Markdown.",
            outline = selection.raw_response,
            suggestions = render_suggestions(subheadings),
        );

        let reply = self.prompter.ask(INSTRUCTIONS, prompt, FINALIZE_BUDGET).await?;

        let mut outline = canonical_outline(&reply);
        let mut structure = parse_structure(&outline);
        if structure.is_empty() {
            tracing::warn!("Final outline has no ## headings, rendering from selection");
            outline = render_outline(&selection.selected_h2s, subheadings);
            structure = parse_structure(&outline);
        }

        let h2_count = structure.len();
        let h3_count = structure.iter().map(|s| s.subheadings.len()).sum();

        Ok(FinalOutline {
            outline,
            h2_count,
            h3_count,
            estimated_words: estimate_words(h2_count, h3_count),
            structure,
        })
    }
}

fn numbered(items: &[String]) -> String {
    items
        .iter()
        .enumerate()
        .map(|(i, item)| format!("{}. {}", i + 1, item))
        .collect::<Vec<_>>()
        .join("\n")
}

fn is_meta_heading(heading: &str) -> bool {
    let lower = heading.to_lowercase();
    META_HEADINGS.iter().any(|meta| lower.starts_with(meta))
}

/// Option text for a 1-based choice, empty when out of range.
fn pick(options: &[String], choice: Option<usize>) -> String {
    choice
        .and_then(|n| n.checked_sub(1))
        .and_then(|i| options.get(i))
        .cloned()
        .unwrap_or_default()
}

fn render_suggestions(plan: &SubheadingPlan) -> String {
    let mut text = String::new();
    for entry in &plan.suggestions {
        text.push_str(&format!("{} ({} H3s)\n", entry.heading, entry.subheadings.len()));
        for sub in &entry.subheadings {
            text.push_str(&format!("  - {sub}\n"));
        }
    }
    text
}

/// Trim the reply and unwrap a surrounding code fence.
fn canonical_outline(reply: &str) -> String {
    let trimmed = reply.trim();
    let Some(inner) = trimmed.strip_prefix("```") else {
        return trimmed.to_string();
    };

    let body = inner.split_once('\n').map(|(_, rest)| rest).unwrap_or("");
    body.trim_end().trim_end_matches("```").trim().to_string()
}

/// `##` sections with the `###` headings under each.
fn parse_structure(outline: &str) -> Vec<OutlineSection> {
    let mut structure: Vec<OutlineSection> = Vec::new();

    for line in outline.lines() {
        let trimmed = line.trim();
        if let Some(heading) = trimmed.strip_prefix("### ") {
            if let Some(current) = structure.last_mut() {
                current.subheadings.push(heading.trim().to_string());
            }
        } else if let Some(heading) = trimmed.strip_prefix("## ") {
            structure.push(OutlineSection {
                heading: heading.trim().to_string(),
                subheadings: Vec::new(),
            });
        }
    }

    structure
}

fn render_outline(headings: &[String], plan: &SubheadingPlan) -> String {
    let mut outline = String::new();
    for heading in headings {
        outline.push_str(&format!("## {heading}\n"));
        let subs = plan.suggestions.iter().find(|s| &s.heading == heading);
        for sub in subs.map(|s| s.subheadings.as_slice()).unwrap_or_default() {
            outline.push_str(&format!("### {sub}\n"));
        }
        outline.push('\n');
    }
    outline.trim_end().to_string()
}

fn estimate_words(h2_count: usize, h3_count: usize) -> usize {
    h2_count * WORDS_PER_H2 + h3_count * WORDS_PER_H3 + WORDS_INTRO_AND_CONCLUSION
}

#[cfg(test)]
mod tests {
    use super::super::testing::{client, CannedProvider};
    use super::super::{BrainstormResult, HeadingSubheadings, Stage, StepOutput};
    use super::*;

    fn writer(provider: &Arc<CannedProvider>) -> OutlineWriter {
        OutlineWriter::new(client(provider.clone()), Arc::new(BrandProfile::default()))
    }

    fn brainstorm(headings: usize) -> StepOutput {
        StepOutput::Brainstorm(BrainstormResult {
            h2_options: (1..=headings).map(|i| format!("Candidate heading {i}")).collect(),
            intro_options: vec!["Hook with a question".into(), "Tell a story".into()],
            conclusion_options: vec!["Call to action".into(), "Look ahead".into()],
            ..BrainstormResult::default()
        })
    }

    fn selection_context(brainstorm: &StepOutput) -> RunningContext {
        RunningContext::from_outputs(
            "run",
            Stage::OutlineSelection,
            vec![(Stage::Brainstorm, brainstorm)],
        )
    }

    #[tokio::test]
    async fn test_select_reads_heading_lines_and_choices() {
        let reply = "## Outline\n\n## Candidate heading 3\nWhy it matters.\n\n\
                     ## Candidate heading 1\nHow to start.\n\n\
                     SELECTED INTRODUCTION: 2\nSELECTED CONCLUSION: Option 1\n\n\
                     REASONING: Builds from basics to practice.";
        let provider = CannedProvider::new(&[reply]);
        let b = brainstorm(20);
        let context = selection_context(&b);

        let selection =
            writer(&provider).select(&context, &BlogInputs::new("T", "a", "c")).await.unwrap();

        assert_eq!(selection.selected_h2s, vec!["Candidate heading 3", "Candidate heading 1"]);
        assert_eq!(selection.intro_choice, Some(2));
        assert_eq!(selection.selected_intro, "Tell a story");
        assert_eq!(selection.selected_conclusion, "Call to action");
        assert_eq!(selection.reasoning, "Builds from basics to practice.");
        assert!(provider.prompt(0).contains("20. Candidate heading 20"));
    }

    #[tokio::test]
    async fn test_select_truncates_to_ten() {
        let reply: String = (1..=12).map(|i| format!("## Candidate heading {i}\n")).collect();
        let provider = CannedProvider::new(&[reply.as_str()]);
        let b = brainstorm(20);
        let context = selection_context(&b);

        let selection =
            writer(&provider).select(&context, &BlogInputs::new("T", "a", "c")).await.unwrap();

        assert_eq!(selection.selected_h2s.len(), 10);
        assert_eq!(selection.selected_h2s[9], "Candidate heading 10");
        assert_eq!(selection.intro_choice, None);
        assert_eq!(selection.selected_intro, "");
    }

    #[tokio::test]
    async fn test_select_without_markers_matches_candidates() {
        let reply = "I would pick candidate heading 2, then Candidate heading 1.";
        let provider = CannedProvider::new(&[reply]);
        let b = brainstorm(2);
        let context = selection_context(&b);

        let selection =
            writer(&provider).select(&context, &BlogInputs::new("T", "a", "c")).await.unwrap();
        assert_eq!(selection.selected_h2s, vec!["Candidate heading 2", "Candidate heading 1"]);
    }

    #[tokio::test]
    async fn test_select_requires_brainstorm() {
        let provider = CannedProvider::new(&[]);
        let context = RunningContext::from_outputs("run", Stage::OutlineSelection, vec![]);

        let err = writer(&provider)
            .select(&context, &BlogInputs::new("T", "a", "c"))
            .await
            .unwrap_err();
        assert!(matches!(err, AgentError::MissingUpstream { needs: Stage::Brainstorm, .. }));
    }

    fn finalize_context(selection: &StepOutput, plan: &StepOutput) -> RunningContext {
        RunningContext::from_outputs(
            "run",
            Stage::OutlineFinalization,
            vec![(Stage::OutlineSelection, selection), (Stage::SubheadingSuggestions, plan)],
        )
    }

    fn selection_and_plan() -> (StepOutput, StepOutput) {
        let selection = StepOutput::OutlineSelection(OutlineSelection {
            selected_h2s: vec!["First".into(), "Second".into()],
            raw_response: "## First\n## Second".into(),
            ..OutlineSelection::default()
        });
        let plan = StepOutput::Subheadings(SubheadingPlan {
            suggestions: vec![
                HeadingSubheadings {
                    heading: "First".into(),
                    subheadings: vec!["Part A".into(), "Part B".into()],
                    notes: String::new(),
                },
                HeadingSubheadings {
                    heading: "Second".into(),
                    subheadings: Vec::new(),
                    notes: String::new(),
                },
            ],
            total: 2,
            raw_response: String::new(),
        });
        (selection, plan)
    }

    #[tokio::test]
    async fn test_finalize_counts_and_estimates() {
        let reply = "```markdown\n# Title\n## First\n### Part A\n### Part B\n## Second\n```";
        let provider = CannedProvider::new(&[reply]);
        let (selection, plan) = selection_and_plan();

        let context = finalize_context(&selection, &plan);
        let outline = writer(&provider).finalize(&context).await.unwrap();

        assert_eq!(outline.outline, "# Title\n## First\n### Part A\n### Part B\n## Second");
        assert_eq!(outline.h2_count, 2);
        assert_eq!(outline.h3_count, 2);
        assert_eq!(outline.estimated_words, 2 * 300 + 2 * 150 + 400);
        assert_eq!(outline.structure[0].subheadings, vec!["Part A", "Part B"]);
        assert!(provider.prompt(0).contains("First (2 H3s)\n  - Part A"));
    }

    #[tokio::test]
    async fn test_finalize_renders_when_reply_has_no_headings() {
        let provider = CannedProvider::new(&["Looks good to me as-is."]);
        let (selection, plan) = selection_and_plan();

        let context = finalize_context(&selection, &plan);
        let outline = writer(&provider).finalize(&context).await.unwrap();

        assert_eq!(outline.outline, "## First\n### Part A\n### Part B\n\n## Second");
        assert_eq!(outline.h2_count, 2);
        assert_eq!(outline.h3_count, 2);
    }

    #[test]
    fn test_canonical_outline_plain_text() {
        assert_eq!(canonical_outline("  ## A\n"), "## A");
        assert_eq!(canonical_outline("```\n## A\n```"), "## A");
    }

    #[test]
    fn test_meta_headings_skipped() {
        assert!(is_meta_heading("Introduction"));
        assert!(is_meta_heading("Selected H2s"));
        assert!(!is_meta_heading("Why Listening Matters"));
    }
}
